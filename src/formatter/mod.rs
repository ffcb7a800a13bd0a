//! Rendering of extracted entries.
//!
//! [`simple::SimpleFormatter`] and [`markdown::MarkdownFormatter`] implement [`Formatter`];
//! [`swagger::SwaggerFormatter`] produces Swagger 1.2 resource listings and API declarations.
//! The helpers here are shared: entry views, flattening of nested fields into
//! `parent[child]` names, version filtering and grouping by section.

pub mod markdown;
pub mod simple;
pub mod swagger;

use crate::declaration::Declaration;
use crate::error::Result;
use crate::extractor::{Entry, StatusResponse};
use crate::field::{DataType, FieldMap};
use crate::version;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Section key of entries declaring none.
pub const OTHERS_SECTION: &str = "_others";

/// Renders entries as text.
pub trait Formatter {
    /// Renders a whole extraction.
    fn format(&self, entries: &[Entry]) -> Result<String>;

    /// Renders a single entry.
    fn format_one(&self, entry: &Entry) -> Result<String>;
}

/// Public form of one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView<'a> {
    /// Operation id, set on processed views
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub method: &'a str,
    pub uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<&'a str>,
    #[serde(skip_serializing_if = "no_fields")]
    pub filters: &'a FieldMap,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: FieldMap,
    #[serde(skip_serializing_if = "no_fields")]
    pub headers: &'a FieldMap,
    #[serde(skip_serializing_if = "no_fields")]
    pub requirements: &'a FieldMap,
    #[serde(skip_serializing_if = "no_strings")]
    pub views: &'a [String],
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub response: FieldMap,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub responses_by_status: BTreeMap<u16, StatusResponse>,
    #[serde(skip_serializing_if = "no_status_codes")]
    pub status_codes: &'a BTreeMap<u16, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<&'a str>,
    #[serde(skip_serializing_if = "no_tags")]
    pub tags: &'a IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<u64>,
    pub https: bool,
    pub authentication: bool,
    #[serde(skip_serializing_if = "no_strings")]
    pub authentication_roles: &'a [String],
    pub deprecated: bool,
}

fn no_fields(fields: &&FieldMap) -> bool {
    fields.is_empty()
}

fn no_strings(values: &&[String]) -> bool {
    values.is_empty()
}

fn no_status_codes(codes: &&BTreeMap<u16, Vec<String>>) -> bool {
    codes.is_empty()
}

fn no_tags(tags: &&IndexMap<String, String>) -> bool {
    tags.is_empty()
}

impl<'a> EntryView<'a> {
    /// The entry as extracted, nested fields included.
    pub fn new(entry: &'a Entry) -> Self {
        let declaration: &'a Declaration = &entry.declaration;
        Self {
            id: None,
            method: &declaration.method,
            uri: &declaration.uri,
            host: declaration.host.as_deref(),
            description: declaration.description.as_deref(),
            link: declaration.link.as_deref(),
            documentation: declaration.documentation.as_deref(),
            filters: &declaration.filters,
            parameters: entry.parameters.clone(),
            headers: &declaration.headers,
            requirements: &declaration.requirements,
            views: &declaration.views,
            response: entry.response.clone(),
            responses_by_status: entry.responses_by_status.clone(),
            status_codes: &declaration.status_codes,
            section: declaration.section.as_deref(),
            tags: &declaration.tags,
            resource_description: declaration.resource_description.as_deref(),
            cache: declaration.cache,
            https: declaration.https,
            authentication: declaration.authentication,
            authentication_roles: &declaration.authentication_roles,
            deprecated: declaration.deprecated,
        }
    }

    /// The entry with flattened fields and an operation id. Input parameters skip the
    /// children of readonly fields. With `api_version`, fields outside their version range
    /// are dropped.
    pub fn processed(entry: &'a Entry, api_version: Option<&str>) -> Self {
        let mut view = Self::new(entry);
        view.id = Some(operation_id(view.method, view.uri));
        view.parameters = flatten(&entry.parameters, None, true, api_version);
        view.response = flatten(&entry.response, None, false, api_version);
        for status in view.responses_by_status.values_mut() {
            status.model = flatten(&status.model, None, false, api_version);
        }
        view
    }
}

/// Entries grouped by section, then resource. Sections are sorted; resources and entries
/// keep their extraction order.
pub type Sections<'a> = BTreeMap<String, IndexMap<String, Vec<EntryView<'a>>>>;

pub fn group_by_section<'a>(entries: &'a [Entry], api_version: Option<&str>) -> Sections<'a> {
    let mut sections: Sections<'a> = BTreeMap::new();
    for entry in entries {
        let section = entry
            .declaration
            .section
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| OTHERS_SECTION.to_string());
        sections
            .entry(section)
            .or_default()
            .entry(entry.resource.clone())
            .or_default()
            .push(EntryView::processed(entry, api_version));
    }
    sections
}

/// `get-/users/{id}` style ids: lowercase method, `/` replaced with `-`.
pub fn operation_id(method: &str, uri: &str) -> String {
    format!("{}-{}", method.to_lowercase(), uri.replace('/', "-"))
}

/// Flattens nested fields into one level named `parent[child]`. Typed collections get a `[]`
/// suffix.
pub fn flatten(
    fields: &FieldMap,
    parent: Option<&str>,
    skip_readonly_children: bool,
    api_version: Option<&str>,
) -> FieldMap {
    let mut flat = FieldMap::new();
    for (name, field) in fields {
        if let Some(api_version) = api_version {
            if !version::in_range(
                api_version,
                field.since_version.as_deref(),
                field.until_version.as_deref(),
            ) {
                continue;
            }
        }

        let flat_name = flat_name(name, field.actual_type, field.sub_type.as_deref(), parent);
        let mut leaf = field.clone();
        leaf.children = None;
        flat.insert(flat_name.clone(), leaf);

        if let Some(children) = &field.children {
            if !field.is_readonly() || !skip_readonly_children {
                flat.extend(flatten(children, Some(&flat_name), skip_readonly_children, api_version));
            }
        }
    }
    flat
}

fn flat_name(name: &str, actual_type: Option<DataType>, sub_type: Option<&str>, parent: Option<&str>) -> String {
    let mut flat = match parent {
        Some(parent) => format!("{}[{}]", parent, name),
        None => name.to_string(),
    };
    if actual_type == Some(DataType::Collection) && sub_type.is_some() {
        flat.push_str("[]");
    }
    flat
}
