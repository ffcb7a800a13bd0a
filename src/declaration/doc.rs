use crate::declaration::{Declaration, DeclarationHandler};
use crate::field::FieldDescriptor;
use crate::parser::{doc_text, HandlerDef};
use crate::route::RouteRecord;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static ARGUMENT_BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[*-]\s+`?([A-Za-z_][A-Za-z0-9_]*)`?\s*(?:-|:)\s*(.*)$")
        .expect("argument bullet regex")
});

static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_`*]+").expect("emphasis regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Fills a declaration from the handler's rustdoc and the route it is bound to.
///
/// - the doc comment becomes `documentation`, its first line the `description` when none
///   was declared;
/// - `#[deprecated]` marks the declaration deprecated;
/// - route requirements and path variables become requirements, described from the
///   `# Arguments` section of the doc comment.
pub struct DocCommentHandler;

impl DeclarationHandler for DocCommentHandler {
    fn handle(&self, declaration: &mut Declaration, handler: &HandlerDef, route: &RouteRecord) {
        let lines = handler.doc();
        declaration.documentation = doc_text(&handler.attrs);

        if declaration.description.is_none() {
            if let Some(first) = lines.iter().map(|l| l.trim()).find(|l| !l.is_empty()) {
                let summary = EMPHASIS.replace_all(first, "");
                let summary = WHITESPACE.replace_all(summary.trim(), " ").to_string();
                if !summary.starts_with('#') && !summary.starts_with('@') && !summary.is_empty() {
                    declaration.description = Some(summary);
                }
            }
        }

        if handler.attrs.iter().any(|attr| attr.path().is_ident("deprecated")) {
            declaration.deprecated = true;
        }

        for (name, value) in &route.requirements {
            if name == "_method" || name == "_scheme" || declaration.requirements.contains_key(name) {
                continue;
            }
            declaration.requirements.insert(
                name.clone(),
                FieldDescriptor {
                    requirement: Some(value.clone()),
                    ..Default::default()
                },
            );
        }

        let arguments = argument_docs(&lines);
        for variable in route.path_variables() {
            let entry = declaration
                .requirements
                .entry(variable.clone())
                .or_default();
            if let Some(description) = arguments.get(&variable) {
                if entry.description.is_none() && !description.is_empty() {
                    entry.description = Some(description.clone());
                }
            }
            if entry.requirement.is_none() {
                entry.requirement = Some(String::new());
            }
        }
    }
}

/// Bullets of the `# Arguments` section: ``* `id` - The user id``.
fn argument_docs(lines: &[String]) -> HashMap<String, String> {
    let mut docs = HashMap::new();
    let mut in_arguments = false;

    for line in lines {
        let line = line.trim();
        if let Some(heading) = line.strip_prefix('#') {
            in_arguments = heading.trim_start_matches('#').trim().eq_ignore_ascii_case("arguments");
            continue;
        }
        if !in_arguments {
            continue;
        }
        if let Some(captures) = ARGUMENT_BULLET.captures(line) {
            docs.insert(captures[1].to_string(), captures[2].trim().to_string());
        }
    }

    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_ref::RawTypeRef;
    use indexmap::IndexMap;
    use std::path::PathBuf;

    fn handler(source: &str) -> HandlerDef {
        let item: syn::ItemFn = syn::parse_str(source).unwrap();
        HandlerDef {
            name: item.sig.ident.to_string(),
            owner: None,
            module_path: vec!["handlers".to_string()],
            attrs: item.attrs,
            file: PathBuf::from("src/handlers.rs"),
        }
    }

    fn route(path: &str) -> RouteRecord {
        RouteRecord {
            name: "r".to_string(),
            path: path.to_string(),
            methods: vec!["GET".to_string()],
            host: None,
            handler: "handlers::show".to_string(),
            defaults: IndexMap::new(),
            requirements: IndexMap::new(),
        }
    }

    #[test]
    fn test_description_from_first_doc_line() {
        let handler = handler(
            r#"
            /// Shows a  *single*   `user`.
            ///
            /// Longer text.
            fn show() {}
            "#,
        );
        let mut declaration = Declaration::default();
        DocCommentHandler.handle(&mut declaration, &handler, &route("/users"));

        assert_eq!(declaration.description.as_deref(), Some("Shows a single user."));
        assert_eq!(
            declaration.documentation.as_deref(),
            Some("Shows a  *single*   `user`.\n\nLonger text.")
        );
    }

    #[test]
    fn test_declared_description_wins() {
        let handler = handler("/// From docs\nfn show() {}");
        let mut declaration = Declaration {
            description: Some("Declared".to_string()),
            output: Some(RawTypeRef::from("User")),
            ..Default::default()
        };
        DocCommentHandler.handle(&mut declaration, &handler, &route("/users"));

        assert_eq!(declaration.description.as_deref(), Some("Declared"));
    }

    #[test]
    fn test_heading_is_not_a_description() {
        let handler = handler("/// # Arguments\nfn show() {}");
        let mut declaration = Declaration::default();
        DocCommentHandler.handle(&mut declaration, &handler, &route("/users"));

        assert_eq!(declaration.description, None);
    }

    #[test]
    fn test_deprecated_attribute() {
        let handler = handler("#[deprecated] fn show() {}");
        let mut declaration = Declaration::default();
        DocCommentHandler.handle(&mut declaration, &handler, &route("/users"));

        assert!(declaration.deprecated);
        assert_eq!(declaration.documentation, None);
    }

    #[test]
    fn test_requirements_from_route_and_arguments() {
        let handler = handler(
            r#"
            /// Shows a post.
            ///
            /// # Arguments
            ///
            /// * `id` - The user id
            /// * `slug` - ignored, not a path variable
            fn show() {}
            "#,
        );
        let mut r = route("/users/{id}/posts/{post}");
        r.requirements.insert("id".to_string(), "\\d+".to_string());
        r.requirements.insert("_method".to_string(), "GET".to_string());

        let mut declaration = Declaration::default();
        declaration.requirements.insert(
            "post".to_string(),
            FieldDescriptor::default().with_description("Declared post"),
        );
        DocCommentHandler.handle(&mut declaration, &handler, &r);

        let names: Vec<&str> = declaration.requirements.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["post", "id"]);
        assert_eq!(declaration.requirements["id"].requirement.as_deref(), Some("\\d+"));
        assert_eq!(declaration.requirements["id"].description.as_deref(), Some("The user id"));
        assert_eq!(declaration.requirements["post"].description.as_deref(), Some("Declared post"));
        assert_eq!(declaration.requirements["post"].requirement.as_deref(), Some(""));
    }
}
