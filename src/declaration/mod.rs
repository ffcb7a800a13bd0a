//! Documentation declarations attached to handlers.
//!
//! A [`Declaration`] is read from a handler's `#[api_doc(...)]` attribute (see [`attribute`]),
//! completed by [`DeclarationHandler`]s such as [`doc::DocCommentHandler`] and bound to the
//! route it documents.

pub mod attribute;
pub mod doc;

use crate::field::FieldMap;
use crate::parser::HandlerDef;
use crate::route::RouteRecord;
use crate::type_ref::RawTypeRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// View every undecorated declaration belongs to.
pub const DEFAULT_VIEW: &str = "default";

pub const DEFAULT_TAG_COLOR: &str = "#d9534f";

/// Documentation metadata of one route/handler pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    /// Methods joined with `|`, or `ANY`
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub filters: FieldMap,
    /// Declared parameters, merged over the ones derived from the input
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: FieldMap,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: FieldMap,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub requirements: FieldMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub status_codes: BTreeMap<u16, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<u64>,
    /// Tag name to display color
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tags: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_description: Option<String>,
    #[serde(default)]
    pub https: bool,
    #[serde(default)]
    pub authentication: bool,
    #[serde(default)]
    pub authentication_roles: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub resource: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<RawTypeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<RawTypeRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<RawTypeRef>,
    /// Per-status response models
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub response_map: BTreeMap<u16, RawTypeRef>,
    /// API version of the bound route (`_version` default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Declaration {
    /// Whether this declaration shows up in `view`. Declarations without views only
    /// belong to [`DEFAULT_VIEW`].
    pub fn in_view(&self, view: &str) -> bool {
        if self.views.is_empty() {
            view == DEFAULT_VIEW
        } else {
            self.views.iter().any(|v| v == view)
        }
    }

    pub fn add_tag(&mut self, name: &str, color: Option<&str>) {
        self.tags.insert(
            name.to_string(),
            color.unwrap_or(DEFAULT_TAG_COLOR).to_string(),
        );
    }

    /// The input references in declaration order: `inputs` if set, else `input`.
    pub fn input_refs(&self) -> Vec<&RawTypeRef> {
        match (&self.inputs, &self.input) {
            (Some(inputs), _) => inputs.iter().collect(),
            (None, Some(input)) => vec![input],
            (None, None) => Vec::new(),
        }
    }

    /// Sets the uri, method, host and version from the route.
    /// `{placeholder}`s in the host are replaced with route defaults.
    pub fn bind_route(&mut self, route: &RouteRecord) {
        self.uri = route.path.clone();
        self.method = route.methods_joined();
        self.host = route.host.as_ref().filter(|h| !h.is_empty()).map(|host| {
            route
                .defaults
                .iter()
                .fold(host.clone(), |host, (key, value)| {
                    host.replace(&format!("{{{}}}", key), value)
                })
        });
        self.version = route.defaults.get("_version").cloned();
    }

    /// Resource path this declaration roots: the explicit name, else the route path
    /// without its `.{_format}` suffix. `None` when not a resource.
    pub fn resource_path(&self, route_path: &str) -> Option<String> {
        if !self.resource {
            return None;
        }
        Some(
            self.resource_name
                .clone()
                .unwrap_or_else(|| route_path.replace(".{_format}", "")),
        )
    }
}

/// Completes a declaration from the handler it is attached to and the route it documents.
pub trait DeclarationHandler {
    fn handle(&self, declaration: &mut Declaration, handler: &HandlerDef, route: &RouteRecord);
}
