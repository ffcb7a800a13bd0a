use crate::error::Result;
use crate::extractor::Entry;
use crate::formatter::{EntryView, Formatter};
use crate::serializer::{self, Encoding};
use indexmap::IndexMap;

/// Entries grouped by resource, encoded as JSON or YAML without further processing.
pub struct SimpleFormatter {
    encoding: Encoding,
}

impl SimpleFormatter {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    pub fn json() -> Self {
        Self::new(Encoding::Json)
    }

    pub fn yaml() -> Self {
        Self::new(Encoding::Yaml)
    }
}

impl Formatter for SimpleFormatter {
    /// Per-status responses are left out of the grouped listing.
    fn format(&self, entries: &[Entry]) -> Result<String> {
        let mut grouped: IndexMap<&str, Vec<EntryView<'_>>> = IndexMap::new();
        for entry in entries {
            let mut view = EntryView::new(entry);
            view.responses_by_status.clear();
            grouped.entry(entry.resource.as_str()).or_default().push(view);
        }
        serializer::serialize(&grouped, self.encoding)
    }

    fn format_one(&self, entry: &Entry) -> Result<String> {
        serializer::serialize(&EntryView::new(entry), self.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::StatusResponse;
    use crate::field::{DataType, FieldDescriptor, FieldMap};
    use crate::formatter::tests::entry;
    use crate::type_ref::TypeRef;
    use pretty_assertions::assert_eq;

    fn with_status(mut entry: Entry) -> Entry {
        let mut model = FieldMap::new();
        model.insert("id".to_string(), FieldDescriptor::of(DataType::Integer));
        entry.responses_by_status.insert(
            200,
            StatusResponse {
                model: model.clone(),
                type_ref: TypeRef::default(),
            },
        );
        entry.response = model;
        entry
    }

    #[test]
    fn test_groups_by_resource_in_order() {
        let entries = vec![
            with_status(entry("GET", "/users", "/users", None)),
            entry("GET", "/ping", "others", None),
            entry("POST", "/users", "/users", None),
        ];
        let json = SimpleFormatter::json().format(&entries).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["/users"].as_array().unwrap().len(), 2);
        assert_eq!(value["/users"][1]["method"], "POST");
        assert_eq!(value["others"][0]["uri"], "/ping");
        assert!(value["/users"][0].get("responsesByStatus").is_none());
        assert_eq!(value["/users"][0]["response"]["id"]["dataType"], "integer");

        let users = json.find("\"/users\"").unwrap();
        let others = json.find("\"others\"").unwrap();
        assert!(users < others);
    }

    #[test]
    fn test_single_entry_keeps_status_responses() {
        let single = with_status(entry("GET", "/users", "/users", None));
        let json = SimpleFormatter::json().format_one(&single).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(value["responsesByStatus"].get("200").is_some());
    }

    #[test]
    fn test_yaml_encoding() {
        let entries = vec![entry("DELETE", "/users/{id}", "/users", None)];
        let yaml = SimpleFormatter::yaml().format(&entries).unwrap();

        assert!(yaml.contains("/users:"));
        assert!(yaml.contains("method: DELETE"));
    }
}
