use crate::error::Result;
use crate::field::{DataType, FieldDescriptor, FieldMap, FieldPatch};
use crate::shape::{PostShapeParser, ShapeParser};
use crate::type_ref::TypeRef;
use serde_json::json;

/// Replaces the fields of a `form_errors` reference with the shape of a validation error
/// response: `status_code`, `message` and per-field `errors`.
pub struct FormErrorsParser;

impl ShapeParser for FormErrorsParser {
    fn name(&self) -> &str {
        "form_errors"
    }

    fn supports(&self, type_ref: &TypeRef) -> bool {
        type_ref.form_errors
    }

    fn parse(&self, _type_ref: &TypeRef) -> Result<FieldMap> {
        Ok(FieldMap::new())
    }

    fn as_post_parser(&self) -> Option<&dyn PostShapeParser> {
        Some(self)
    }
}

impl PostShapeParser for FormErrorsParser {
    fn post_parse(&self, type_ref: &TypeRef, fields: &FieldMap) -> Result<FieldPatch> {
        let mut patch: FieldPatch = fields.keys().map(|name| (name.clone(), None)).collect();

        patch.insert(
            "status_code".to_string(),
            Some(FieldDescriptor {
                required: Some(false),
                readonly: Some(true),
                description: Some("The status code".to_string()),
                default: Some(json!(400)),
                ..FieldDescriptor::of(DataType::Integer)
            }),
        );
        patch.insert(
            "message".to_string(),
            Some(FieldDescriptor {
                required: Some(false),
                description: Some("The error message".to_string()),
                default: Some(json!("Validation failed.")),
                ..FieldDescriptor::of(DataType::String)
            }),
        );
        patch.insert(
            "errors".to_string(),
            Some(FieldDescriptor {
                data_type: Some("errors".to_string()),
                actual_type: Some(DataType::Model),
                sub_type: Some(format!("{}.FormErrors", type_ref.class)),
                required: Some(false),
                readonly: Some(true),
                description: Some("Errors".to_string()),
                children: Some(field_errors(fields, &[])),
                ..Default::default()
            }),
        );

        Ok(patch)
    }
}

/// Mirrors `fields` as error holders. Model fields recurse into their children.
fn field_errors(fields: &FieldMap, path: &[&str]) -> FieldMap {
    fields
        .iter()
        .map(|(name, field)| {
            let mut errors = FieldDescriptor {
                data_type: Some("parameter errors".to_string()),
                actual_type: Some(DataType::Model),
                sub_type: Some("FieldErrors".to_string()),
                required: Some(false),
                readonly: Some(true),
                description: Some("Errors on the parameter".to_string()),
                ..Default::default()
            };

            let nested = field.children.as_ref().filter(|_| field.actual_type == Some(DataType::Model));
            errors.children = Some(match nested {
                Some(children) => {
                    let mut property_path = path.to_vec();
                    property_path.push(name);
                    errors.sub_type = Some(format!(
                        "{}.FieldErrors[{}]",
                        field.sub_type.as_deref().unwrap_or("object"),
                        property_path.join(".")
                    ));
                    field_errors(children, &property_path)
                }
                None => {
                    let mut list = FieldMap::new();
                    list.insert(
                        "errors".to_string(),
                        FieldDescriptor {
                            data_type: Some("array of errors".to_string()),
                            required: Some(false),
                            readonly: Some(true),
                            ..FieldDescriptor::collection(DataType::String.as_str())
                        },
                    );
                    list
                }
            });

            (name.clone(), errors)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::merge_fields;

    fn form_fields() -> FieldMap {
        let mut address = FieldDescriptor::model("Address");
        let mut address_children = FieldMap::new();
        address_children.insert("city".to_string(), FieldDescriptor::of(DataType::String));
        address.children = Some(address_children);

        let mut fields = FieldMap::new();
        fields.insert("name".to_string(), FieldDescriptor::of(DataType::String));
        fields.insert("address".to_string(), address);
        fields
    }

    #[test]
    fn test_supports_only_form_errors() {
        let mut type_ref = TypeRef::new("UserForm");
        assert!(!FormErrorsParser.supports(&type_ref));
        type_ref.form_errors = true;
        assert!(FormErrorsParser.supports(&type_ref));
        assert!(FormErrorsParser.parse(&type_ref).unwrap().is_empty());
    }

    #[test]
    fn test_post_parse_replaces_fields() {
        let mut type_ref = TypeRef::new("UserForm");
        type_ref.form_errors = true;
        let fields = form_fields();

        let patch = FormErrorsParser.post_parse(&type_ref, &fields).unwrap();
        let merged = merge_fields(fields, patch);

        let names: Vec<&str> = merged.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["status_code", "message", "errors"]);
        assert_eq!(merged["status_code"].default, Some(json!(400)));
        assert_eq!(merged["message"].default, Some(json!("Validation failed.")));

        let errors = &merged["errors"];
        assert_eq!(errors.sub_type.as_deref(), Some("UserForm.FormErrors"));

        let children = errors.children.as_ref().unwrap();
        let name = &children["name"];
        assert_eq!(name.sub_type.as_deref(), Some("FieldErrors"));
        let list = &name.children.as_ref().unwrap()["errors"];
        assert_eq!(list.actual_type, Some(DataType::Collection));
        assert_eq!(list.sub_type.as_deref(), Some("string"));

        let address = &children["address"];
        assert_eq!(address.sub_type.as_deref(), Some("Address.FieldErrors[address]"));
        let city = &address.children.as_ref().unwrap()["city"];
        assert_eq!(city.data_type.as_deref(), Some("parameter errors"));
    }
}
