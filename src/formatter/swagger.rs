//! Swagger 1.2 output: a resource listing and one API declaration per resource.
//!
//! Nested models are not inlined. Parameters and responses point at entries of the
//! [`ModelRegistry`], which is emptied after every API declaration.

use crate::config::{Delivery, SwaggerConfig, SwaggerInfo};
use crate::declaration::Declaration;
use crate::error::Result;
use crate::extractor::{Entry, StatusResponse};
use crate::field::{DataType, FieldDescriptor, FieldMap};
use crate::registry::{
    enum_values, swagger_format, swagger_type, swagger_type_of_label, Items, Model, ModelRegistry,
};
use crate::serializer;
use crate::type_ref::RawTypeRef;
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{.*?\}").expect("placeholder regex"));

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9a-zA-Z]").expect("alphanumeric regex"));

static REPEATED_DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("dash regex"));

/// `paramType` of body parameters when the input does not name one.
const DEFAULT_PARAM_TYPE: &str = "form";

/// Swagger resource listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceListing {
    pub swagger_version: String,
    pub apis: Vec<ResourceRef>,
    pub api_version: String,
    pub info: SwaggerInfo,
    pub authorizations: IndexMap<String, Authorization>,
}

/// One resource in the listing; `path` is relative to the listing URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRef {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    #[serde(rename = "type")]
    pub kind: String,
    pub pass_as: Delivery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyname: Option<String>,
}

/// Swagger API declaration of one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDeclaration {
    pub swagger_version: String,
    pub api_version: String,
    pub base_path: String,
    pub resource_path: String,
    pub apis: Vec<Api>,
    pub models: IndexMap<String, Model>,
    pub produces: Vec<String>,
    pub consumes: Vec<String>,
    pub authorizations: IndexMap<String, Authorization>,
}

/// Operations sharing a path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Api {
    pub path: String,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub nickname: String,
    pub parameters: Vec<Parameter>,
    pub response_messages: Vec<ResponseMessage>,
    /// Model id of the 200 response
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// `path`, `query`, `form`, `body` or `header`
    pub param_type: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_model: Option<String>,
}

pub struct SwaggerFormatter {
    config: SwaggerConfig,
    registry: ModelRegistry,
}

impl SwaggerFormatter {
    /// # Errors
    ///
    /// Fails on an unknown model naming strategy.
    pub fn new(config: SwaggerConfig, naming_strategy: &str) -> Result<Self> {
        Ok(Self {
            config,
            registry: ModelRegistry::new(naming_strategy)?,
        })
    }

    /// The resource listing without `resource`, else that resource's API declaration, as JSON.
    pub fn format(&mut self, entries: &[Entry], resource: Option<&str>) -> Result<String> {
        match resource {
            None => serializer::serialize_json(&self.resource_listing(entries)),
            Some(resource) => serializer::serialize_json(&self.api_declaration(entries, resource)),
        }
    }

    /// Lists the entries declared as resources, one per normalized path.
    pub fn resource_listing(&self, entries: &[Entry]) -> ResourceListing {
        let mut apis: Vec<ResourceRef> = Vec::new();
        for entry in entries.iter().filter(|e| e.declaration.resource) {
            let path = format!("/{}", normalize_resource_path(self.strip_base_path(&entry.resource)));
            if apis.iter().any(|api| api.path == path) {
                continue;
            }
            apis.push(ResourceRef {
                path,
                description: entry.declaration.resource_description.clone(),
            });
        }

        ResourceListing {
            swagger_version: self.config.swagger_version.clone(),
            apis,
            api_version: self.config.api_version.clone(),
            info: self.config.info.clone(),
            authorizations: self.authorizations(),
        }
    }

    /// Describes the entries whose resource normalizes to `resource` (e.g. `/users`).
    pub fn api_declaration(&mut self, entries: &[Entry], resource: &str) -> ApiDeclaration {
        let mut api_bag: IndexMap<String, Vec<Operation>> = IndexMap::new();

        for entry in entries {
            let item_resource = normalize_resource_path(self.strip_base_path(&entry.resource));
            if format!("/{}", item_resource) != resource {
                continue;
            }

            let path = self.strip_base_path(&entry.route.path).to_string();
            debug!("Describing {} in {}", path, resource);

            let mut parameters = path_parameters(entry);
            parameters.extend(query_parameters(&entry.declaration.filters));
            let param_type = param_type(&entry.declaration);
            parameters.extend(self.body_parameters(&entry.parameters, &param_type));

            let response_messages = self.response_messages(entry);
            let kind = response_messages
                .iter()
                .find(|m| m.code == 200)
                .and_then(|m| m.response_model.clone());

            let operations = api_bag.entry(path).or_default();
            for method in &entry.route.methods {
                operations.push(Operation {
                    method: method.clone(),
                    summary: entry.declaration.description.clone(),
                    nickname: nickname(method, &item_resource),
                    parameters: parameters.clone(),
                    response_messages: response_messages.clone(),
                    kind: kind.clone(),
                });
            }
        }

        let models = self.registry.models().clone();
        self.registry.clear();

        ApiDeclaration {
            swagger_version: self.config.swagger_version.clone(),
            api_version: self.config.api_version.clone(),
            base_path: self.config.base_path.clone(),
            resource_path: resource.to_string(),
            apis: api_bag
                .into_iter()
                .map(|(path, operations)| Api { path, operations })
                .collect(),
            models,
            produces: Vec::new(),
            consumes: Vec::new(),
            authorizations: self.authorizations(),
        }
    }

    fn authorizations(&self) -> IndexMap<String, Authorization> {
        let mut authorizations = IndexMap::new();
        if let Some(auth) = &self.config.authentication {
            if auth.delivery != Delivery::Http {
                authorizations.insert(
                    "apiKey".to_string(),
                    Authorization {
                        kind: "apiKey".to_string(),
                        pass_as: auth.delivery,
                        keyname: auth.name.clone(),
                    },
                );
            }
        }
        authorizations
    }

    fn strip_base_path<'p>(&self, path: &'p str) -> &'p str {
        let base_path = self.config.base_path.as_str();
        if base_path == "/" {
            return path;
        }
        path.strip_prefix(base_path).unwrap_or(path)
    }

    /// Parameters without a Swagger type or model are left out.
    fn body_parameters(&mut self, fields: &FieldMap, param_type: &str) -> Vec<Parameter> {
        let mut parameters = Vec::new();
        for (name, field) in fields {
            let actual_type = field.actual_type.unwrap_or(DataType::String);
            let mut parameter = Parameter {
                param_type: param_type.to_string(),
                name: name.clone(),
                kind: swagger_type(actual_type).map(str::to_string),
                format: swagger_format(actual_type).map(str::to_string),
                default_value: field.default.clone().filter(|d| !d.is_null()),
                description: field.description.clone(),
                ..Default::default()
            };

            match actual_type {
                DataType::Enum => {
                    parameter.kind = Some("string".to_string());
                    parameter.enum_values = field
                        .format
                        .as_deref()
                        .map(enum_values)
                        .filter(|values| !values.is_empty());
                }
                DataType::Model => {
                    let id = self.register_field(field.sub_type.as_deref().unwrap_or("object"), field);
                    parameter.kind = Some(id.clone());
                    parameter.reference = Some(id);
                }
                DataType::Collection => {
                    parameter.kind = Some("array".to_string());
                    parameter.items = Some(match field.sub_type.as_deref() {
                        None => Items::of_type("string"),
                        Some(label) => match swagger_type_of_label(label) {
                            Some(kind) => Items::of_type(kind),
                            None => Items::of_ref(self.register_field(label, field)),
                        },
                    });
                }
                _ => {}
            }

            if parameter.kind.is_none() {
                debug!("Skipping parameter {} without a Swagger type", name);
                continue;
            }
            parameters.push(parameter);
        }
        parameters
    }

    fn register_field(&mut self, class: &str, field: &FieldDescriptor) -> String {
        let description = field
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| field.data_type.clone())
            .unwrap_or_default();
        self.registry.register(class, field.children.as_ref(), &description)
    }

    /// Mapped status codes first, then codes that only carry a description.
    fn response_messages(&mut self, entry: &Entry) -> Vec<ResponseMessage> {
        let status_codes = &entry.declaration.status_codes;
        let mut messages: Vec<ResponseMessage> = entry
            .responses_by_status
            .iter()
            .map(|(&code, status)| ResponseMessage {
                code,
                message: status_message(code, status_codes.get(&code)),
                response_model: Some(self.register_response(status)),
            })
            .collect();

        for (&code, descriptions) in status_codes {
            if entry.responses_by_status.contains_key(&code) {
                continue;
            }
            messages.push(ResponseMessage {
                code,
                message: descriptions.join("; "),
                response_model: None,
            });
        }
        messages
    }

    fn register_response(&mut self, status: &StatusResponse) -> String {
        let type_ref = &status.type_ref;
        let class = if type_ref.form_errors {
            format!("{}.ErrorResponse", type_ref.class)
        } else {
            type_ref.class.clone()
        };

        if !type_ref.collection {
            return self.registry.register(&class, Some(&status.model), "");
        }

        let alias = type_ref.collection_name.as_deref().unwrap_or("items");
        let mut wrapper = FieldDescriptor {
            actual_type: Some(DataType::Collection),
            sub_type: Some(class.clone()),
            required: Some(true),
            readonly: Some(true),
            ..Default::default()
        };
        wrapper.children = status.model.get(alias).and_then(|f| f.children.clone());

        let mut fields = FieldMap::new();
        fields.insert(alias.to_string(), wrapper);
        self.registry
            .register(&format!("{}[{}]", class, alias), Some(&fields), "")
    }
}

/// One string parameter per `{placeholder}`. `_format` lists its allowed values.
fn path_parameters(entry: &Entry) -> Vec<Parameter> {
    entry
        .route
        .path_variables()
        .into_iter()
        .map(|name| {
            let enum_values = if name == "_format" {
                entry
                    .route
                    .requirements
                    .get("_format")
                    .filter(|r| !r.is_empty())
                    .map(|r| r.split('|').map(str::to_string).collect())
            } else {
                None
            };
            Parameter {
                param_type: "path".to_string(),
                name,
                kind: Some("string".to_string()),
                required: Some(true),
                enum_values,
                ..Default::default()
            }
        })
        .collect()
}

fn query_parameters(filters: &FieldMap) -> Vec<Parameter> {
    filters
        .iter()
        .map(|(name, filter)| Parameter {
            param_type: "query".to_string(),
            name: name.clone(),
            kind: Some(
                filter
                    .data_type
                    .as_deref()
                    .and_then(swagger_type_of_label)
                    .unwrap_or("string")
                    .to_string(),
            ),
            description: filter.description.clone(),
            ..Default::default()
        })
        .collect()
}

fn param_type(declaration: &Declaration) -> String {
    declaration
        .input_refs()
        .first()
        .and_then(|input| match input {
            RawTypeRef::Detailed(spec) => spec.param_type.clone(),
            _ => None,
        })
        .unwrap_or_else(|| DEFAULT_PARAM_TYPE.to_string())
}

fn status_message(code: u16, descriptions: Option<&Vec<String>>) -> String {
    match descriptions {
        Some(descriptions) if !descriptions.is_empty() => descriptions.join("; "),
        _ => format!("See standard HTTP status code reason for {}", code),
    }
}

/// `/users/{id}/comments` becomes `users-comments`.
pub fn normalize_resource_path(path: &str) -> String {
    let path = PLACEHOLDERS.replace_all(path, "");
    let path = NON_ALPHANUMERIC.replace_all(&path, "-");
    REPEATED_DASHES
        .replace_all(path.trim_matches('-'), "-")
        .into_owned()
}

pub fn nickname(method: &str, resource: &str) -> String {
    format!("{}_{}", method.to_lowercase(), normalize_resource_path(resource))
}
