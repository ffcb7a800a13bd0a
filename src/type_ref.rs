//! Type references: what a declaration says its input or output looks like.
//!
//! A raw reference is either a bare type name (`"app::User"`, `"array<app::User> as users"`)
//! or a detailed form carrying groups, a wrapper name and a parser whitelist. Both are
//! normalized into a [`TypeRef`] before the shape parsers see them.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

static COLLECTION_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^array<([A-Za-z_][A-Za-z0-9_]*(?:(?:\\|\.|::)[A-Za-z_][A-Za-z0-9_]*)*)>(?:\s+as\s+(.+))?$",
    )
    .expect("collection directive regex")
});

/// Group name every field without explicit groups belongs to.
pub const DEFAULT_GROUP: &str = "Default";

/// A type reference as written on a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTypeRef {
    Name(String),
    Detailed(TypeRefSpec),
}

/// Serialization groups, either comma-joined or already split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Groups {
    Joined(String),
    List(Vec<String>),
}

impl Groups {
    fn into_set(self) -> Vec<String> {
        let raw = match self {
            Groups::Joined(joined) => joined.split(',').map(|g| g.to_string()).collect(),
            Groups::List(list) => list,
        };
        let mut groups: Vec<String> = Vec::new();
        for group in raw {
            let group = group.trim();
            if !group.is_empty() && !groups.iter().any(|g| g == group) {
                groups.push(group.to_string());
            }
        }
        groups
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeRefSpec {
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Groups>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub form_errors: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, Value>,
}

impl From<&str> for RawTypeRef {
    fn from(name: &str) -> Self {
        RawTypeRef::Name(name.to_string())
    }
}

impl RawTypeRef {
    /// Normalizes the reference, unwrapping a collection directive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedDirective`] when the class starts with `array<` but does not
    /// follow `array<Identifier>` or `array<Identifier> as alias`.
    pub fn normalize(&self) -> Result<TypeRef> {
        let spec = match self {
            RawTypeRef::Name(name) => TypeRefSpec {
                class: name.clone(),
                ..Default::default()
            },
            RawTypeRef::Detailed(spec) => spec.clone(),
        };

        let mut type_ref = TypeRef {
            class: spec.class.trim().to_string(),
            groups: spec.groups.map(Groups::into_set).unwrap_or_default(),
            options: spec.options,
            collection: false,
            collection_name: None,
            name: spec.name,
            parsers: spec.parsers,
            form_errors: spec.form_errors,
            param_type: spec.param_type,
        };

        if type_ref.class.starts_with("array<") {
            let captures = COLLECTION_DIRECTIVE
                .captures(&type_ref.class)
                .ok_or_else(|| Error::MalformedDirective(type_ref.class.clone()))?;
            let class = captures[1].to_string();
            type_ref.collection_name = captures.get(2).map(|alias| alias.as_str().trim().to_string());
            type_ref.class = class;
            type_ref.collection = true;
        }

        Ok(type_ref)
    }

    /// The class as written, before normalization.
    pub fn class(&self) -> &str {
        match self {
            RawTypeRef::Name(name) => name,
            RawTypeRef::Detailed(spec) => &spec.class,
        }
    }
}

/// A normalized type reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    /// Type identifier, e.g. `app::models::User`
    pub class: String,
    /// Serialization groups; empty means all fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Parser specific pass-through options
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, Value>,
    #[serde(default)]
    pub collection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    /// Wraps the parsed fields into one model field of this name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Restricts parsing to these parser names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsers: Option<Vec<String>>,
    #[serde(default)]
    pub form_errors: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
}

impl TypeRef {
    pub fn new(class: &str) -> Self {
        Self {
            class: class.to_string(),
            ..Default::default()
        }
    }

    /// A reference to a nested type met while expanding fields.
    /// Groups and options carry over, wrapping and whitelists do not.
    pub fn nested(&self, class: &str) -> Self {
        Self {
            class: class.to_string(),
            groups: self.groups.clone(),
            options: self.options.clone(),
            ..Default::default()
        }
    }

    pub fn short_name(&self) -> &str {
        short_name(&self.class)
    }

    /// Whether a field in `field_groups` survives this reference's group filter.
    /// Fields without explicit groups belong to [`DEFAULT_GROUP`].
    pub fn accepts_groups(&self, field_groups: &[String]) -> bool {
        if self.groups.is_empty() {
            return true;
        }
        if field_groups.is_empty() {
            return self.groups.iter().any(|g| g == DEFAULT_GROUP);
        }
        field_groups.iter().any(|g| self.groups.contains(g))
    }
}

/// Last segment of a `::`, `\` or `.` separated identifier.
pub fn short_name(identifier: &str) -> &str {
    identifier
        .rsplit(|c| c == ':' || c == '\\' || c == '.')
        .next()
        .unwrap_or(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name() {
        let type_ref = RawTypeRef::from("app::User").normalize().unwrap();
        assert_eq!(type_ref.class, "app::User");
        assert!(!type_ref.collection);
        assert!(type_ref.groups.is_empty());
    }

    #[test]
    fn test_collection_directive_with_alias() {
        let type_ref = RawTypeRef::from(r"array<Foo\Bar> as items").normalize().unwrap();
        assert_eq!(type_ref.class, r"Foo\Bar");
        assert!(type_ref.collection);
        assert_eq!(type_ref.collection_name.as_deref(), Some("items"));
    }

    #[test]
    fn test_valid_directives() {
        let cases = [
            ("array<User>", "User", None),
            ("array<app::models::User>", "app::models::User", None),
            ("array<app.models.User> as users", "app.models.User", Some("users")),
            (
                r"array<_Vendor\Namespace0\Namespace_2F3\Group> as groups",
                r"_Vendor\Namespace0\Namespace_2F3\Group",
                Some("groups"),
            ),
        ];

        for (input, class, alias) in cases {
            let type_ref = RawTypeRef::from(input).normalize().unwrap();
            assert_eq!(type_ref.class, class, "input: {}", input);
            assert_eq!(type_ref.collection_name.as_deref(), alias, "input: {}", input);
            assert!(type_ref.collection);
        }
    }

    #[test]
    fn test_malformed_directives() {
        let cases = [
            "array<>",
            "array<2Bad>",
            r"array<Vendor\>",
            r"array<2Vendor\>",
            r"array<Vendor\2Class>",
            "array<User> as",
            "array<User> as ",
            "array<User",
        ];

        for input in cases {
            let result = RawTypeRef::from(input).normalize();
            assert!(
                matches!(result, Err(Error::MalformedDirective(_))),
                "expected malformed directive for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_groups_split_and_trimmed() {
        let raw = RawTypeRef::Detailed(TypeRefSpec {
            class: "User".to_string(),
            groups: Some(Groups::Joined("public, admin ,public".to_string())),
            ..Default::default()
        });

        let type_ref = raw.normalize().unwrap();
        assert_eq!(type_ref.groups, vec!["public".to_string(), "admin".to_string()]);
    }

    #[test]
    fn test_detailed_from_json() {
        let raw: RawTypeRef =
            serde_json::from_str(r#"{"class": "array<User> as users", "groups": ["list"]}"#).unwrap();
        let type_ref = raw.normalize().unwrap();
        assert_eq!(type_ref.class, "User");
        assert_eq!(type_ref.groups, vec!["list".to_string()]);

        let bare: RawTypeRef = serde_json::from_str(r#""User""#).unwrap();
        assert_eq!(bare, RawTypeRef::Name("User".to_string()));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("app::models::User"), "User");
        assert_eq!(short_name(r"Foo\Bar"), "Bar");
        assert_eq!(short_name("a.b.C"), "C");
        assert_eq!(short_name("User"), "User");
    }

    #[test]
    fn test_accepts_groups() {
        let all = TypeRef::new("User");
        assert!(all.accepts_groups(&[]));

        let mut public = TypeRef::new("User");
        public.groups = vec!["public".to_string()];
        assert!(public.accepts_groups(&["public".to_string(), "admin".to_string()]));
        assert!(!public.accepts_groups(&["admin".to_string()]));
        assert!(!public.accepts_groups(&[]));

        public.groups.push(DEFAULT_GROUP.to_string());
        assert!(public.accepts_groups(&[]));
    }
}
