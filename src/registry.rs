//! Deduplicated models for referential output formats.
//!
//! The [`ModelRegistry`] turns nested field trees into flat [`Model`]s keyed by a stable id,
//! so an API declaration can point at them with `$ref` instead of repeating them. It is owned
//! by one render and [`ModelRegistry::clear`]ed between independent renders.

use crate::error::{Error, Result};
use crate::field::{DataType, FieldMap};
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::Serialize;
use std::str::FromStr;
use std::sync::LazyLock;

static NON_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\[\]]").expect("id character regex"));

static REPEATED_DOTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.+").expect("dot regex"));

/// How model ids are derived from type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingStrategy {
    /// `app::models::User` becomes `app.models.User`
    DotNotation,
    /// `app::models::User` becomes `User`
    LastSegmentOnly,
}

impl FromStr for NamingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dot_notation" => Ok(NamingStrategy::DotNotation),
            "last_segment_only" => Ok(NamingStrategy::LastSegmentOnly),
            other => Err(Error::InvalidNamingStrategy(other.to_string())),
        }
    }
}

impl NamingStrategy {
    pub fn model_id(&self, class: &str) -> String {
        match self {
            NamingStrategy::DotNotation => {
                let id = NON_ID_CHARS.replace_all(class, ".");
                let id = REPEATED_DOTS.replace_all(&id, ".");
                id.strip_prefix('.').unwrap_or(&id).to_string()
            }
            NamingStrategy::LastSegmentOnly => class
                .rsplit(|c| c == '\\' || c == ':')
                .next()
                .unwrap_or(class)
                .to_string(),
        }
    }
}

/// A registered model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub id: String,
    pub description: String,
    pub properties: IndexMap<String, Property>,
    pub required: Vec<String>,
}

/// One property of a [`Model`], or one Swagger parameter type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Property {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
}

/// Member type of an array property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Items {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Items {
    pub fn of_type(kind: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            reference: None,
        }
    }

    pub fn of_ref(reference: String) -> Self {
        Self {
            kind: None,
            reference: Some(reference),
        }
    }
}

/// Swagger primitive type of a data type.
pub fn swagger_type(actual_type: DataType) -> Option<&'static str> {
    match actual_type {
        DataType::Integer => Some("integer"),
        DataType::Float => Some("number"),
        DataType::String | DataType::File | DataType::Date | DataType::DateTime => Some("string"),
        DataType::Boolean => Some("boolean"),
        _ => None,
    }
}

pub fn swagger_format(actual_type: DataType) -> Option<&'static str> {
    match actual_type {
        DataType::Integer => Some("int32"),
        DataType::Float => Some("float"),
        DataType::File => Some("byte"),
        DataType::Date => Some("date"),
        DataType::DateTime => Some("date-time"),
        _ => None,
    }
}

/// Swagger primitive type of a type label such as a collection's `sub_type`.
pub fn swagger_type_of_label(label: &str) -> Option<&'static str> {
    DataType::from_label(label).and_then(swagger_type)
}

/// Choices of an enum format written as `[a|b|c]`.
pub fn enum_values(format: &str) -> Vec<String> {
    format
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split('|')
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

#[derive(Debug)]
pub struct ModelRegistry {
    strategy: NamingStrategy,
    models: IndexMap<String, Model>,
}

impl ModelRegistry {
    /// # Errors
    ///
    /// Returns [`Error::InvalidNamingStrategy`] for anything but `dot_notation` and
    /// `last_segment_only`.
    pub fn new(strategy: &str) -> Result<Self> {
        Ok(Self::with_strategy(strategy.parse()?))
    }

    pub fn with_strategy(strategy: NamingStrategy) -> Self {
        Self {
            strategy,
            models: IndexMap::new(),
        }
    }

    /// Registers `class` with its fields and returns its id.
    ///
    /// The first registration of an id wins; later ones return the id untouched. Nested
    /// models are registered before the model containing them. Without `fields` only the id
    /// is computed.
    pub fn register(&mut self, class: &str, fields: Option<&FieldMap>, description: &str) -> String {
        let id = self.strategy.model_id(class);
        if self.models.contains_key(&id) {
            return id;
        }
        let Some(fields) = fields else {
            return id;
        };

        let mut properties = IndexMap::new();
        let mut required = Vec::new();

        for (name, field) in fields {
            let nested_description = field
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .or_else(|| field.data_type.clone())
                .unwrap_or_default();
            let sub_type = field.sub_type.as_deref();

            let property = match field.actual_type {
                Some(DataType::Model) => Property {
                    reference: Some(self.register(
                        sub_type.unwrap_or("object"),
                        field.children.as_ref(),
                        &nested_description,
                    )),
                    ..Default::default()
                },
                actual_type => {
                    let mut property = Property {
                        description: field
                            .description
                            .clone()
                            .filter(|d| !d.is_empty())
                            .or_else(|| field.data_type.clone()),
                        ..Default::default()
                    };
                    match actual_type {
                        Some(DataType::Enum) => {
                            property.kind = Some("string".to_string());
                            property.enum_values = field.format.as_deref().map(enum_values);
                        }
                        Some(DataType::Collection) => {
                            property.kind = Some("array".to_string());
                            property.items = Some(match sub_type {
                                None => Items::of_type("string"),
                                Some(label) => match swagger_type_of_label(label) {
                                    Some(kind) => Items::of_type(kind),
                                    None => Items::of_ref(self.register(
                                        label,
                                        field.children.as_ref(),
                                        &nested_description,
                                    )),
                                },
                            });
                        }
                        Some(other) => property.kind = swagger_type(other).map(str::to_string),
                        None => {}
                    }
                    property.format = actual_type.and_then(swagger_format).map(str::to_string);
                    if field.is_required() {
                        required.push(name.clone());
                    }
                    property
                }
            };

            properties.insert(name.clone(), property);
        }

        debug!("Registered model {}", id);
        self.models.insert(
            id.clone(),
            Model {
                id: id.clone(),
                description: description.to_string(),
                properties,
                required,
            },
        );
        id
    }

    pub fn models(&self) -> &IndexMap<String, Model> {
        &self.models
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDescriptor;
    use pretty_assertions::assert_eq;

    fn user_fields() -> FieldMap {
        let mut address = FieldDescriptor::model("app::models::Address");
        let mut address_children = FieldMap::new();
        address_children.insert(
            "city".to_string(),
            FieldDescriptor::of(DataType::String).with_required(true),
        );
        address.children = Some(address_children);

        let mut status = FieldDescriptor::of(DataType::Enum);
        status.format = Some("[active|banned]".to_string());

        let mut fields = FieldMap::new();
        fields.insert(
            "id".to_string(),
            FieldDescriptor::of(DataType::Integer).with_required(true),
        );
        fields.insert(
            "score".to_string(),
            FieldDescriptor::of(DataType::Float).with_description("Ranking score"),
        );
        fields.insert("status".to_string(), status);
        fields.insert("tags".to_string(), FieldDescriptor::collection("string"));
        fields.insert("address".to_string(), address);
        fields
    }

    #[test]
    fn test_naming_strategies() {
        let dots = NamingStrategy::DotNotation;
        assert_eq!(dots.model_id("app::models::User"), "app.models.User");
        assert_eq!(dots.model_id("\\Foo\\Bar[items]"), "Foo.Bar[items]");
        assert_eq!(dots.model_id("Form.FieldErrors[a.b]"), "Form.FieldErrors[a.b]");

        let last = NamingStrategy::LastSegmentOnly;
        assert_eq!(last.model_id("app::models::User"), "User");
        assert_eq!(last.model_id("Foo\\Bar"), "Bar");
    }

    #[test]
    fn test_unknown_strategy_fails_at_construction() {
        match ModelRegistry::new("camel") {
            Err(Error::InvalidNamingStrategy(name)) => assert_eq!(name, "camel"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(ModelRegistry::new("last_segment_only").is_ok());
    }

    #[test]
    fn test_register_flattens_properties() {
        let mut registry = ModelRegistry::new("dot_notation").unwrap();
        let id = registry.register("app::models::User", Some(&user_fields()), "A user");
        assert_eq!(id, "app.models.User");

        let ids: Vec<&str> = registry.models().keys().map(|k| k.as_str()).collect();
        assert_eq!(ids, vec!["app.models.Address", "app.models.User"]);

        let user = &registry.models()["app.models.User"];
        assert_eq!(user.description, "A user");
        assert_eq!(user.required, vec!["id"]);

        let id_property = &user.properties["id"];
        assert_eq!(id_property.kind.as_deref(), Some("integer"));
        assert_eq!(id_property.format.as_deref(), Some("int32"));
        assert_eq!(id_property.description.as_deref(), Some("integer"));

        let score = &user.properties["score"];
        assert_eq!(score.kind.as_deref(), Some("number"));
        assert_eq!(score.description.as_deref(), Some("Ranking score"));

        let status = &user.properties["status"];
        assert_eq!(
            status.enum_values,
            Some(vec!["active".to_string(), "banned".to_string()])
        );

        let tags = &user.properties["tags"];
        assert_eq!(tags.kind.as_deref(), Some("array"));
        assert_eq!(tags.items, Some(Items::of_type("string")));

        assert_eq!(
            user.properties["address"],
            Property {
                reference: Some("app.models.Address".to_string()),
                ..Default::default()
            }
        );
        assert_eq!(registry.models()["app.models.Address"].required, vec!["city"]);
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut registry = ModelRegistry::with_strategy(NamingStrategy::LastSegmentOnly);
        let first = registry.register("app::User", Some(&user_fields()), "first");
        let before = registry.models().clone();

        let mut other = FieldMap::new();
        other.insert("name".to_string(), FieldDescriptor::of(DataType::String));
        let second = registry.register("app::User", Some(&other), "second");

        assert_eq!(first, second);
        assert_eq!(registry.models(), &before);
    }

    #[test]
    fn test_collection_of_models_references_member() {
        let mut member = FieldDescriptor::collection("app::Tag");
        let mut children = FieldMap::new();
        children.insert("label".to_string(), FieldDescriptor::of(DataType::String));
        member.children = Some(children);
        let mut fields = FieldMap::new();
        fields.insert("tags".to_string(), member);

        let mut registry = ModelRegistry::with_strategy(NamingStrategy::LastSegmentOnly);
        registry.register("app::Post", Some(&fields), "");

        assert_eq!(
            registry.models()["Post"].properties["tags"].items,
            Some(Items::of_ref("Tag".to_string()))
        );
        assert!(registry.models().contains_key("Tag"));
    }

    #[test]
    fn test_without_fields_only_computes_id() {
        let mut registry = ModelRegistry::with_strategy(NamingStrategy::DotNotation);
        assert_eq!(registry.register("a::B", None, ""), "a.B");
        assert!(registry.models().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut registry = ModelRegistry::with_strategy(NamingStrategy::DotNotation);
        registry.register("app::User", Some(&user_fields()), "");
        registry.clear();
        assert!(registry.models().is_empty());
    }
}
