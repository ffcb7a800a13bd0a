//! Constraint metadata from `#[validate(...)]` field attributes.

use crate::error::Result;
use crate::field::{DataType, FieldDescriptor, FieldMap};
use crate::parser::SourceIndex;
use crate::shape::structure::{describe_type, SerdeAttrs};
use crate::shape::ShapeParser;
use crate::type_ref::TypeRef;
use log::debug;
use serde_json::Value;
use std::rc::Rc;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Fields, ItemStruct, Lit, Meta, Token, UnOp};

/// Describes constraints of validated structs as field formats.
pub struct ValidationParser {
    index: Rc<SourceIndex>,
}

impl ValidationParser {
    pub fn new(index: Rc<SourceIndex>) -> Self {
        Self { index }
    }

    fn validated_struct(&self, class: &str) -> Option<&ItemStruct> {
        let item = self.index.find_struct(class)?.as_struct()?;
        let Fields::Named(named) = &item.fields else {
            return None;
        };
        named
            .named
            .iter()
            .any(|field| field.attrs.iter().any(is_validate))
            .then_some(item)
    }
}

impl ShapeParser for ValidationParser {
    fn name(&self) -> &str {
        "validation"
    }

    fn supports(&self, type_ref: &TypeRef) -> bool {
        self.validated_struct(&type_ref.class).is_some()
    }

    fn parse(&self, type_ref: &TypeRef) -> Result<FieldMap> {
        let mut fields = FieldMap::new();
        let Some(item) = self.validated_struct(&type_ref.class) else {
            return Ok(fields);
        };
        let Fields::Named(named) = &item.fields else {
            return Ok(fields);
        };
        let container = SerdeAttrs::from_attrs(&item.attrs);

        for field in &named.named {
            let Some(ident) = &field.ident else {
                continue;
            };
            let rules: Vec<Meta> = field
                .attrs
                .iter()
                .filter(|attr| is_validate(attr))
                .flat_map(|attr| rules_of(attr, &type_ref.class))
                .collect();
            if rules.is_empty() {
                continue;
            }
            let Some(name) = SerdeAttrs::from_attrs(&field.attrs).field_name(ident, &container) else {
                continue;
            };

            let mut descriptor = FieldDescriptor::default().with_default(Value::Null);
            let mut formats: Vec<String> = Vec::new();

            for rule in &rules {
                let key = rule.path().get_ident().map(|i| i.to_string()).unwrap_or_default();
                let format = match key.as_str() {
                    "required" => {
                        descriptor.required = Some(true);
                        None
                    }
                    "email" => Some("{email address}".to_string()),
                    "url" => Some("{url}".to_string()),
                    "ip" => Some("{ip address}".to_string()),
                    "length" => bounds(rule, &[("min", "min: "), ("max", "max: "), ("equal", "equal: ")])
                        .map(|b| format!("{{length: {{{}}}}}", b)),
                    "range" => bounds(
                        rule,
                        &[
                            ("min", ">="),
                            ("exclusive_min", ">"),
                            ("max", "<="),
                            ("exclusive_max", "<"),
                        ],
                    )
                    .map(|b| format!("{{range: {{{}}}}}", b)),
                    "regex" => argument(rule, "path").map(|p| format!("{{match: {}}}", p)),
                    "contains" => argument(rule, "pattern").map(|p| format!("{{contains: {}}}", p)),
                    "does_not_contain" => {
                        argument(rule, "pattern").map(|p| format!("{{not contain: {}}}", p))
                    }
                    "must_match" => argument(rule, "other").map(|o| format!("{{must match: {}}}", o)),
                    "custom" => argument(rule, "function").map(|f| format!("{{custom: {}}}", f)),
                    "nested" => {
                        let (nested, _) = describe_type(&self.index, &field.ty);
                        if matches!(nested.actual_type, Some(DataType::Model) | Some(DataType::Collection)) {
                            descriptor.actual_type = nested.actual_type;
                            descriptor.sub_type = nested.sub_type;
                            descriptor.class = nested.class;
                        }
                        None
                    }
                    other => {
                        debug!("Unmapped validation rule `{}` on {}.{}", other, type_ref.class, ident);
                        None
                    }
                };
                if let Some(format) = format {
                    if !formats.contains(&format) {
                        formats.push(format);
                    }
                }
            }

            if !formats.is_empty() {
                descriptor.format = Some(formats.join(", "));
            }
            fields.insert(name, descriptor);
        }

        Ok(fields)
    }
}

fn is_validate(attr: &Attribute) -> bool {
    attr.path().is_ident("validate")
}

fn rules_of(attr: &Attribute, class: &str) -> Vec<Meta> {
    match attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated) {
        Ok(rules) => rules.into_iter().collect(),
        Err(e) => {
            debug!("Ignoring unreadable validate attribute on {}: {}", class, e);
            Vec::new()
        }
    }
}

/// Arguments of a rule: `rule(key = value, ..)`, or `rule = value` for the default key.
fn arguments(rule: &Meta) -> Vec<(String, String)> {
    match rule {
        Meta::List(list) => list
            .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
            .map(|args| {
                args.into_iter()
                    .filter_map(|arg| match arg {
                        Meta::NameValue(nv) => {
                            let key = nv.path.get_ident()?.to_string();
                            Some((key, expr_text(&nv.value)))
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        Meta::NameValue(nv) => vec![(String::new(), expr_text(&nv.value))],
        Meta::Path(_) => Vec::new(),
    }
}

fn argument(rule: &Meta, key: &str) -> Option<String> {
    arguments(rule)
        .into_iter()
        .find(|(name, _)| name == key || name.is_empty())
        .map(|(_, value)| value)
}

fn bounds(rule: &Meta, keys: &[(&str, &str)]) -> Option<String> {
    let arguments = arguments(rule);
    let parts: Vec<String> = keys
        .iter()
        .filter_map(|(key, prefix)| {
            arguments
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| format!("{}{}", prefix, value))
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Source text of the simple expressions used as rule arguments.
fn expr_text(expr: &Expr) -> String {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) => s.value(),
            Lit::Int(i) => i.base10_digits().to_string(),
            Lit::Float(f) => f.base10_digits().to_string(),
            Lit::Bool(b) => b.value.to_string(),
            Lit::Char(c) => c.value().to_string(),
            _ => String::new(),
        },
        Expr::Path(path) => path
            .path
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect::<Vec<_>>()
            .join("::"),
        Expr::Unary(unary) => match unary.op {
            UnOp::Neg(_) => format!("-{}", expr_text(&unary.expr)),
            _ => expr_text(&unary.expr),
        },
        Expr::Reference(reference) => expr_text(&reference.expr),
        Expr::Paren(paren) => expr_text(&paren.expr),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedFile;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn parser_for(source: &str) -> ValidationParser {
        let parsed = ParsedFile {
            path: PathBuf::from("src/forms.rs"),
            module_path: vec!["forms".to_string()],
            syntax_tree: syn::parse_file(source).unwrap(),
        };
        ValidationParser::new(Rc::new(SourceIndex::new(&[parsed])))
    }

    const FORMS: &str = r#"
        #[serde(rename_all = "camelCase")]
        pub struct SignupForm {
            #[validate(required, email)]
            pub email_address: Option<String>,
            #[validate(length(min = 8, max = 64), must_match(other = "password_confirmation"))]
            pub password: String,
            pub password_confirmation: String,
            #[validate(range(min = 18, max = 150))]
            pub age: u8,
            #[validate(regex(path = *USERNAME), contains(pattern = "x"), length(min = 8, max = 64))]
            #[validate(length(min = 8, max = 64))]
            pub username: String,
            #[validate(url, custom(function = "validate_site"))]
            pub website: String,
            #[validate(nested)]
            pub address: Address,
            #[validate(nested)]
            pub tags: Vec<Tag>,
            #[serde(skip)]
            #[validate(length(min = 1))]
            pub internal: String,
        }

        pub struct Address { pub city: String }
        pub struct Tag { pub name: String }
    "#;

    #[test]
    fn test_supports_validated_structs() {
        let parser = parser_for(FORMS);
        assert!(parser.supports(&TypeRef::new("SignupForm")));
        assert!(!parser.supports(&TypeRef::new("Address")));
        assert!(!parser.supports(&TypeRef::new("Missing")));
    }

    #[test]
    fn test_constraint_formats() {
        let parser = parser_for(FORMS);
        let fields = parser.parse(&TypeRef::new("SignupForm")).unwrap();

        let names: Vec<&str> = fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["emailAddress", "password", "age", "username", "website", "address", "tags"]
        );

        let email = &fields["emailAddress"];
        assert_eq!(email.required, Some(true));
        assert_eq!(email.format.as_deref(), Some("{email address}"));
        assert_eq!(email.default, Some(Value::Null));

        assert_eq!(
            fields["password"].format.as_deref(),
            Some("{length: {min: 8, max: 64}}, {must match: password_confirmation}")
        );
        assert_eq!(fields["password"].required, None);
        assert_eq!(fields["age"].format.as_deref(), Some("{range: {>=18, <=150}}"));
        assert_eq!(
            fields["username"].format.as_deref(),
            Some("{match: USERNAME}, {contains: x}, {length: {min: 8, max: 64}}")
        );
        assert_eq!(fields["website"].format.as_deref(), Some("{url}, {custom: validate_site}"));
    }

    #[test]
    fn test_nested_rules_mark_models() {
        let parser = parser_for(FORMS);
        let fields = parser.parse(&TypeRef::new("SignupForm")).unwrap();

        assert_eq!(fields["address"].actual_type, Some(DataType::Model));
        assert_eq!(fields["address"].class.as_deref(), Some("Address"));
        assert_eq!(fields["tags"].actual_type, Some(DataType::Collection));
        assert_eq!(fields["tags"].sub_type.as_deref(), Some("Tag"));
        assert_eq!(fields["address"].format, None);
    }
}
