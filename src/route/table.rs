use crate::error::{Error, Result};
use crate::route::{normalize_methods, RouteRecord, RouteSource};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Routes declared in a YAML file:
///
/// ```yaml
/// user_show:
///   path: /users/{id}.{_format}
///   methods: [GET]
///   handler: handlers::users::show
///   defaults: { _format: json }
///   requirements: { id: '\d+' }
/// ```
pub struct RouteTable {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RouteSpec {
    path: String,
    #[serde(default)]
    methods: Option<Methods>,
    #[serde(default)]
    host: Option<String>,
    handler: String,
    #[serde(default)]
    defaults: IndexMap<String, serde_yaml::Value>,
    #[serde(default)]
    requirements: IndexMap<String, serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Methods {
    Joined(String),
    List(Vec<String>),
}

impl RouteTable {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Parses route table YAML; `origin` only names the source in errors.
    pub fn parse(content: &str, origin: &std::path::Path) -> Result<Vec<RouteRecord>> {
        let specs: IndexMap<String, RouteSpec> =
            serde_yaml::from_str(content).map_err(|e| Error::ParseError {
                file: origin.to_path_buf(),
                message: format!("Invalid route table: {}", e),
            })?;

        Ok(specs
            .into_iter()
            .map(|(name, spec)| {
                let methods = match spec.methods {
                    Some(Methods::Joined(joined)) => normalize_methods([joined]),
                    Some(Methods::List(list)) => normalize_methods(list),
                    None => Vec::new(),
                };
                RouteRecord {
                    name,
                    path: spec.path,
                    methods,
                    host: spec.host,
                    handler: spec.handler,
                    defaults: scalars(spec.defaults),
                    requirements: scalars(spec.requirements),
                }
            })
            .collect())
    }
}

/// Keeps scalar values as strings; nested values are dropped.
fn scalars(values: IndexMap<String, serde_yaml::Value>) -> IndexMap<String, String> {
    values
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, text))
        })
        .collect()
}

impl RouteSource for RouteTable {
    fn name(&self) -> &str {
        "route table"
    }

    fn routes(&self) -> Result<Vec<RouteRecord>> {
        debug!("Reading route table {}", self.path.display());
        let content = fs::read_to_string(&self.path)?;
        Self::parse(&content, &self.path)
    }

    fn resources(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }
}
