//! Field descriptors and the merge rules used to fold parser results together.
//!
//! Every shape parser produces a [`FieldMap`]: an ordered mapping from field name to
//! [`FieldDescriptor`]. Results from several parsers (and human-written overrides on a
//! declaration) are combined with [`merge_fields`].

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Ordered mapping of field name to descriptor.
pub type FieldMap = IndexMap<String, FieldDescriptor>;

/// Incoming side of a merge. A `None` value removes the field from the result.
pub type FieldPatch = IndexMap<String, Option<FieldDescriptor>>;

/// Normalized data types a field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    Float,
    String,
    Boolean,
    File,
    #[serde(alias = "choice")]
    Enum,
    Collection,
    Model,
    Date,
    #[serde(rename = "datetime")]
    DateTime,
    Time,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::File => "file",
            DataType::Enum => "enum",
            DataType::Collection => "collection",
            DataType::Model => "model",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::Time => "time",
        }
    }

    /// Parses a type label as written in declarations (`int`, `bool`, `string`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "integer" | "int" => Some(DataType::Integer),
            "float" | "double" | "number" => Some(DataType::Float),
            "string" => Some(DataType::String),
            "boolean" | "bool" => Some(DataType::Boolean),
            "file" => Some(DataType::File),
            "enum" | "choice" => Some(DataType::Enum),
            "collection" | "array" => Some(DataType::Collection),
            "model" | "object" => Some(DataType::Model),
            "date" => Some(DataType::Date),
            "datetime" => Some(DataType::DateTime),
            "time" => Some(DataType::Time),
            _ => None,
        }
    }

    /// Whether a sub-type names a primitive rather than a model.
    pub fn is_primitive(name: &str) -> bool {
        !matches!(
            Self::from_label(name),
            None | Some(DataType::Model) | Some(DataType::Collection)
        )
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, DataType::Model | DataType::Collection)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of one parameter or property.
///
/// `children` is only ever set when `actual_type` is [`DataType::Model`] or
/// [`DataType::Collection`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Human readable type label (`string`, `object (User)`, `array of integers`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_type: Option<DataType>,
    /// Nested type identifier, or member primitive for collections and enums
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    /// `None` means unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    /// `Some(Value::Null)` is an explicit null default, distinct from no default at all
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<FieldMap>,
    /// Type to expand into `children`; removed once the tree is normalized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl FieldDescriptor {
    /// A descriptor with the given type and its plain label as `data_type`.
    pub fn of(actual_type: DataType) -> Self {
        Self {
            data_type: Some(actual_type.as_str().to_string()),
            actual_type: Some(actual_type),
            ..Default::default()
        }
    }

    /// A model field whose children come from expanding `class`.
    pub fn model(class: &str) -> Self {
        Self {
            actual_type: Some(DataType::Model),
            sub_type: Some(class.to_string()),
            class: Some(class.to_string()),
            ..Default::default()
        }
    }

    /// A collection field. Members are primitive when `member` is a primitive label,
    /// otherwise they are models of type `member`.
    pub fn collection(member: &str) -> Self {
        let class = if DataType::is_primitive(member) {
            None
        } else {
            Some(member.to_string())
        };
        Self {
            actual_type: Some(DataType::Collection),
            sub_type: Some(member.to_string()),
            class,
            ..Default::default()
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly.unwrap_or(false)
    }

    /// Whether this field's children should be expanded from `class`.
    pub fn is_expandable(&self) -> bool {
        self.class.is_some() && self.actual_type.map(|t| t.is_nested()).unwrap_or(false)
    }

    /// Folds `incoming` into `self` subkey by subkey.
    fn absorb(&mut self, incoming: FieldDescriptor) {
        if let Some(children) = incoming.children {
            self.children = Some(match self.children.take() {
                Some(existing) => merge_fields(existing, into_patch(children)),
                None => children,
            });
        }

        if let Some(required) = incoming.required {
            self.required = Some(self.required.unwrap_or(false) || required);
        }
        if let Some(readonly) = incoming.readonly {
            self.readonly = Some(self.readonly.unwrap_or(false) || readonly);
        }

        if let Some(requirement) = incoming.requirement {
            self.requirement = Some(match self.requirement.take() {
                Some(existing) => format!("{}, {}", existing, requirement),
                None => requirement,
            });
        }

        match incoming.default {
            Some(Value::Null) => {
                if self.default.is_none() {
                    self.default = Some(Value::Null);
                }
            }
            Some(value) => self.default = Some(value),
            None => {}
        }

        overwrite(&mut self.data_type, incoming.data_type);
        overwrite(&mut self.actual_type, incoming.actual_type);
        overwrite(&mut self.sub_type, incoming.sub_type);
        overwrite(&mut self.description, incoming.description);
        overwrite(&mut self.format, incoming.format);
        overwrite(&mut self.since_version, incoming.since_version);
        overwrite(&mut self.until_version, incoming.until_version);
        overwrite(&mut self.class, incoming.class);
        overwrite(&mut self.parent_class, incoming.parent_class);
        overwrite(&mut self.field, incoming.field);
    }
}

fn overwrite<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

/// Wraps every descriptor of a map so it can be used as the incoming side of a merge.
pub fn into_patch(map: FieldMap) -> FieldPatch {
    map.into_iter().map(|(name, field)| (name, Some(field))).collect()
}

/// Merges `incoming` on top of `existing`.
///
/// - a `None` entry deletes the field;
/// - a field missing from `existing` is added as is;
/// - otherwise subkeys are folded: `children` deep-merge, `required`/`readonly` are OR-ed,
///   `requirement` accumulates with `", "`, `default` is only replaced by a non-null value
///   (a null default only fills an absent one), everything else is overwritten when set.
pub fn merge_fields(existing: FieldMap, incoming: FieldPatch) -> FieldMap {
    let mut merged = existing;

    for (name, value) in incoming {
        match value {
            None => {
                merged.shift_remove(&name);
            }
            Some(field) => match merged.get_mut(&name) {
                Some(current) => current.absorb(field),
                None => {
                    merged.insert(name, field);
                }
            },
        }
    }

    merged
}
