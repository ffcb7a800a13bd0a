//! Route sources.
//!
//! Routes bind a path and a method set to a handler. They come from YAML route tables
//! ([`table::RouteTable`]) or from route attributes on the handlers themselves
//! ([`attribute::AttributeRoutes`]).

pub mod attribute;
pub mod table;

use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Methods in their sort rank order; anything else ranks after them.
pub const METHOD_ORDER: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];

/// Supplies route records.
pub trait RouteSource {
    /// Short label used in logs
    fn name(&self) -> &str;

    fn routes(&self) -> Result<Vec<RouteRecord>>;

    /// Files whose modification invalidates the routes
    fn resources(&self) -> Vec<PathBuf>;
}

/// One route: a path pattern and method set bound to a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub name: String,
    pub path: String,
    /// Upper-case methods; empty means any
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// `::` path of the handler function
    pub handler: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub defaults: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub requirements: IndexMap<String, String>,
}

impl RouteRecord {
    pub fn methods_joined(&self) -> String {
        if self.methods.is_empty() {
            "ANY".to_string()
        } else {
            self.methods.join("|")
        }
    }

    /// Lowest rank of the route's methods in [`METHOD_ORDER`]; 4 when none is listed.
    pub fn method_rank(&self) -> usize {
        self.methods
            .iter()
            .filter_map(|m| METHOD_ORDER.iter().position(|o| o == m))
            .min()
            .unwrap_or(METHOD_ORDER.len())
    }

    /// Names of the `{var}` placeholders in the path, in order.
    pub fn path_variables(&self) -> Vec<String> {
        let mut variables = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    let name = after[..end].trim();
                    if !name.is_empty() {
                        variables.push(name.to_string());
                    }
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }
        variables
    }
}

pub(crate) fn normalize_methods<I, S>(methods: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for method in methods {
        for part in method.as_ref().split('|') {
            let part = part.trim().to_uppercase();
            if !part.is_empty() && part != "ANY" && !normalized.contains(&part) {
                normalized.push(part);
            }
        }
    }
    normalized
}
