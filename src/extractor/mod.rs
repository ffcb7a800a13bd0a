//! Extraction of documentation entries from routes and their handlers.
//!
//! The [`Extractor`] walks every route of its [`RouteSource`]s, resolves the handler in the
//! [`SourceIndex`], reads its `#[api_doc]` declaration and turns it into an [`Entry`]:
//! parameters parsed from the input references, the response parsed from the output and
//! one field tree per documented status code.
//!
//! # Example
//!
//! ```no_run
//! use apidoc_from_source::extractor::Extractor;
//! use apidoc_from_source::parser::{AstParser, SourceIndex};
//! use apidoc_from_source::route::table::RouteTable;
//! use apidoc_from_source::shape::{structure::StructParser, ShapeParsers};
//! use std::path::{Path, PathBuf};
//! use std::rc::Rc;
//!
//! let root = Path::new("./my-project");
//! let parsed = AstParser::parse_files(&[root.join("src/handlers.rs")], root);
//! let index = Rc::new(SourceIndex::new(&parsed));
//!
//! let mut parsers = ShapeParsers::new();
//! parsers.register(Box::new(StructParser::new(index.clone())));
//!
//! let extractor = Extractor::new(index, parsers)
//!     .with_source(Box::new(RouteTable::new(PathBuf::from("routes.yaml"))));
//! let entries = extractor.all("default").unwrap();
//! println!("Found {} documented routes", entries.len());
//! ```

pub mod caching;
pub mod normalize;

use crate::declaration::attribute::parse_declaration;
use crate::declaration::doc::DocCommentHandler;
use crate::declaration::{Declaration, DeclarationHandler};
use crate::error::Result;
use crate::field::{merge_fields, into_patch, FieldMap};
use crate::parser::{HandlerDef, SourceIndex};
use crate::route::{RouteRecord, RouteSource};
use crate::shape::ShapeParsers;
use crate::type_ref::{RawTypeRef, TypeRef};
use crate::version;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

/// Resource group of entries that match no declared resource.
pub const OTHERS_RESOURCE: &str = "others";

/// A documented route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub declaration: Declaration,
    pub route: RouteRecord,
    /// Resource group this entry is listed under
    pub resource: String,
    /// Input fields, with declared parameters merged on top
    #[serde(default)]
    pub parameters: FieldMap,
    /// Output fields
    #[serde(default)]
    pub response: FieldMap,
    #[serde(default)]
    pub responses_by_status: BTreeMap<u16, StatusResponse>,
}

/// Field tree and type reference documented for one status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub model: FieldMap,
    pub type_ref: TypeRef,
}

/// Which side of the exchange a field tree describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

/// Builds [`Entry`] lists from route sources, handler declarations and shape parsers.
pub struct Extractor {
    index: Rc<SourceIndex>,
    parsers: ShapeParsers,
    sources: Vec<Box<dyn RouteSource>>,
    handlers: Vec<Box<dyn DeclarationHandler>>,
    exclude_sections: Vec<String>,
}

impl Extractor {
    /// An extractor without route sources, completing declarations from doc comments.
    pub fn new(index: Rc<SourceIndex>, parsers: ShapeParsers) -> Self {
        Self {
            index,
            parsers,
            sources: Vec::new(),
            handlers: vec![Box::new(DocCommentHandler)],
            exclude_sections: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Box<dyn RouteSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_handler(mut self, handler: Box<dyn DeclarationHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Declarations in these sections are left out.
    pub fn with_excluded_sections(mut self, sections: Vec<String>) -> Self {
        self.exclude_sections = sections;
        self
    }

    pub fn parsers(&self) -> &ShapeParsers {
        &self.parsers
    }

    /// Routes of every source, in source order.
    pub fn routes(&self) -> Result<Vec<RouteRecord>> {
        let mut routes = Vec::new();
        for source in &self.sources {
            let found = source.routes()?;
            debug!("{} supplied {} routes", source.name(), found.len());
            routes.extend(found);
        }
        Ok(routes)
    }

    /// Files whose changes invalidate extracted entries: route source resources and the
    /// source files of documented handlers.
    pub fn resources(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = Vec::new();
        for source in &self.sources {
            files.extend(source.resources());
        }
        for route in self.routes()? {
            if let Some(handler) = self.index.resolve_handler(&route.handler) {
                if parse_declaration(&handler.attrs, &handler.qualified_name())?.is_some() {
                    files.push(handler.file.clone());
                }
            }
        }

        let mut unique: Vec<PathBuf> = Vec::new();
        for file in files {
            if !unique.contains(&file) {
                unique.push(file);
            }
        }
        Ok(unique)
    }

    /// Every documented route visible in `view`, grouped by resource and sorted.
    ///
    /// # Errors
    ///
    /// Fails on unreadable route sources, malformed declarations and malformed collection
    /// directives.
    pub fn all(&self, view: &str) -> Result<Vec<Entry>> {
        let routes = self.routes()?;
        self.extract_entries(&routes, view)
    }

    /// Like [`Extractor::all`], without routes pinned to another API version through
    /// their `_version` default.
    pub fn all_for_version(&self, api_version: &str, view: &str) -> Result<Vec<Entry>> {
        let mut entries = self.all(view)?;
        retain_version(&mut entries, api_version);
        Ok(entries)
    }

    /// The entry of one handler bound to the route named `route_name`.
    pub fn get(&self, handler: &str, route_name: &str) -> Result<Option<Entry>> {
        let Some(handler) = self.index.resolve_handler(handler) else {
            return Ok(None);
        };
        let Some(route) = self.routes()?.into_iter().find(|route| route.name == route_name) else {
            return Ok(None);
        };
        let name = handler.qualified_name();
        let Some(declaration) = parse_declaration(&handler.attrs, &name)? else {
            return Ok(None);
        };

        let resource = declaration
            .resource_path(&route.path)
            .unwrap_or_else(|| OTHERS_RESOURCE.to_string());
        let mut entry = self.extract_data(declaration, handler, &route)?;
        entry.resource = resource;
        Ok(Some(entry))
    }

    /// Extracts the entries of `routes` visible in `view`.
    pub fn extract_entries(&self, routes: &[RouteRecord], view: &str) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        let mut resources: Vec<String> = Vec::new();

        for route in routes {
            let Some(handler) = self.index.resolve_handler(&route.handler) else {
                warn!("Skipping route {}: handler {} not found", route.name, route.handler);
                continue;
            };
            let name = handler.qualified_name();
            let Some(declaration) = parse_declaration(&handler.attrs, &name)? else {
                debug!("Skipping route {}: {} has no api_doc", route.name, name);
                continue;
            };

            if let Some(section) = &declaration.section {
                if self.exclude_sections.contains(section) {
                    debug!("Skipping route {}: section {} is excluded", route.name, section);
                    continue;
                }
            }
            if !declaration.in_view(view) {
                continue;
            }

            if let Some(resource) = declaration.resource_path(&route.path) {
                resources.push(resource);
            }
            entries.push(self.extract_data(declaration, handler, route)?);
        }

        assign_resources(&mut entries, resources);
        sort_entries(&mut entries);

        info!("Extracted {} entries for view {}", entries.len(), view);
        Ok(entries)
    }

    fn extract_data(&self, mut declaration: Declaration, handler: &HandlerDef, route: &RouteRecord) -> Result<Entry> {
        let name = handler.qualified_name();
        for declaration_handler in &self.handlers {
            declaration_handler.handle(&mut declaration, handler, route);
        }
        declaration.bind_route(route);

        let declared = std::mem::take(&mut declaration.parameters);
        let inputs = declaration.input_refs();
        let parameters = if inputs.is_empty() {
            declared
        } else {
            let mut parameters = FieldMap::new();
            for input in inputs {
                let parsed = self.parse_ref(input, Direction::Input).map_err(|e| e.in_handler(&name))?;
                parameters = merge_fields(parameters, into_patch(parsed.1));
            }
            if declaration.method == "PATCH" {
                normalize::relax_required(&mut parameters);
            }
            merge_fields(parameters, into_patch(declared))
        };

        let mut response = FieldMap::new();
        let mut responses_by_status = BTreeMap::new();
        if let Some(output) = &declaration.output {
            let (type_ref, fields) = self.parse_ref(output, Direction::Output).map_err(|e| e.in_handler(&name))?;
            response = fields.clone();
            responses_by_status.insert(200, StatusResponse { model: fields, type_ref });
        }
        for (code, model) in &declaration.response_map {
            if *code == 200 && declaration.output.is_some() {
                continue;
            }
            let (type_ref, fields) = self.parse_ref(model, Direction::Output).map_err(|e| e.in_handler(&name))?;
            responses_by_status.insert(*code, StatusResponse { model: fields, type_ref });
        }

        Ok(Entry {
            declaration,
            route: route.clone(),
            resource: OTHERS_RESOURCE.to_string(),
            parameters,
            response,
            responses_by_status,
        })
    }

    /// Normalizes and parses one reference, then tidies the resulting tree.
    fn parse_ref(&self, raw: &RawTypeRef, direction: Direction) -> Result<(TypeRef, FieldMap)> {
        let type_ref = raw.normalize()?;
        let mut fields = self.parsers.parse(&type_ref)?;
        if fields.is_empty() {
            debug!("No fields for {:?} reference {}", direction, type_ref.class);
        }

        normalize::stamp_parents(&mut fields);
        normalize::clear_classes(&mut fields);
        normalize::humanize(&mut fields, &|class| self.parsers.is_known(class));
        Ok((type_ref, fields))
    }
}

/// Drops entries whose route is pinned to a version other than `api_version`.
pub fn retain_version(entries: &mut Vec<Entry>, api_version: &str) {
    entries.retain(|entry| match entry.route.defaults.get("_version") {
        Some(route_version) if !route_version.is_empty() => {
            version::compare(api_version, route_version) == Ordering::Equal
        }
        _ => true,
    });
}

/// Assigns every entry to the first matching resource, most specific first.
fn assign_resources(entries: &mut [Entry], mut resources: Vec<String>) {
    resources.sort_by(|a, b| b.cmp(a));

    for entry in entries.iter_mut() {
        entry.resource = resources
            .iter()
            .find(|resource| {
                entry.route.path.starts_with(resource.as_str())
                    || entry.declaration.resource_name.as_deref() == Some(resource.as_str())
            })
            .cloned()
            .unwrap_or_else(|| OTHERS_RESOURCE.to_string());
    }
}

/// Resource, then path, then method rank, then joined methods.
fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        a.resource
            .cmp(&b.resource)
            .then_with(|| a.route.path.cmp(&b.route.path))
            .then_with(|| a.route.method_rank().cmp(&b.route.method_rank()))
            .then_with(|| a.route.methods_joined().cmp(&b.route.methods_joined()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::DataType;
    use crate::parser::ParsedFile;
    use crate::route::table::RouteTable;
    use crate::error::Error;
    use crate::shape::structure::StructParser;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    struct StaticRoutes(Vec<RouteRecord>);

    impl RouteSource for StaticRoutes {
        fn name(&self) -> &str {
            "static"
        }

        fn routes(&self) -> Result<Vec<RouteRecord>> {
            Ok(self.0.clone())
        }

        fn resources(&self) -> Vec<PathBuf> {
            vec![PathBuf::from("routes.yaml")]
        }
    }

    const SOURCE: &str = r#"
        pub struct Article {
            pub id: u64,
            pub title: String,
            pub author: Author,
        }

        pub struct Author {
            pub name: String,
        }

        /// Lists articles.
        #[api_doc(resource, output = "array<Article> as articles")]
        pub fn list() {}

        #[api_doc(input = "Article", parameter(name = "force", data_type = "bool"))]
        pub fn update() {}

        #[api_doc(section = "Internal")]
        pub fn purge() {}

        #[api_doc(views("premium"))]
        pub fn premium() {}

        #[api_doc(resource = "/authors")]
        pub fn authors() {}

        #[api_doc(output = "array<>")]
        pub fn broken() {}

        #[api_doc(status(code = 200, model = "Article"), status(code = 404, description = "Missing"), status(code = 400, model(class = "Article", form_errors)))]
        pub fn show() {}

        pub fn undocumented() {}
    "#;

    fn route(name: &str, path: &str, methods: &[&str], handler: &str) -> RouteRecord {
        RouteRecord {
            name: name.to_string(),
            path: path.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            host: None,
            handler: handler.to_string(),
            defaults: IndexMap::new(),
            requirements: IndexMap::new(),
        }
    }

    fn extractor(routes: Vec<RouteRecord>) -> Extractor {
        let parsed = ParsedFile {
            path: PathBuf::from("src/api.rs"),
            module_path: vec!["api".to_string()],
            syntax_tree: syn::parse_file(SOURCE).unwrap(),
        };
        let index = Rc::new(SourceIndex::new(&[parsed]));
        let mut parsers = ShapeParsers::new();
        parsers.register(Box::new(StructParser::new(index.clone())));
        parsers.register(Box::new(crate::shape::form_errors::FormErrorsParser));

        Extractor::new(index, parsers)
            .with_source(Box::new(StaticRoutes(routes)))
            .with_excluded_sections(vec!["Internal".to_string()])
    }

    fn paths(entries: &[Entry]) -> Vec<(String, String, String)> {
        entries
            .iter()
            .map(|e| (e.resource.clone(), e.route.path.clone(), e.declaration.method.clone()))
            .collect()
    }

    #[test]
    fn test_all_filters_groups_and_sorts() {
        let extractor = extractor(vec![
            route("update", "/articles/{id}", &["PUT"], "api::update"),
            route("list", "/articles.{_format}", &["GET"], "api::list"),
            route("show", "/articles/{id}", &["GET"], "api::show"),
            route("purge", "/purge", &["DELETE"], "api::purge"),
            route("premium", "/premium", &["GET"], "api::premium"),
            route("authors", "/people", &["GET"], "api::authors"),
            route("plain", "/plain", &["GET"], "api::undocumented"),
            route("missing", "/missing", &["GET"], "api::nothing"),
        ]);

        let entries = extractor.all("default").unwrap();
        assert_eq!(
            paths(&entries),
            vec![
                ("/articles".to_string(), "/articles.{_format}".to_string(), "GET".to_string()),
                ("/articles".to_string(), "/articles/{id}".to_string(), "GET".to_string()),
                ("/articles".to_string(), "/articles/{id}".to_string(), "PUT".to_string()),
                ("/authors".to_string(), "/people".to_string(), "GET".to_string()),
            ]
        );

        let premium = extractor.all("premium").unwrap();
        assert_eq!(premium.len(), 1);
        assert_eq!(premium[0].route.path, "/premium");
        assert_eq!(premium[0].resource, OTHERS_RESOURCE);
    }

    #[test]
    fn test_most_specific_resource_wins() {
        let mut entries = vec![Entry {
            declaration: Declaration::default(),
            route: route("c", "/a/b/c", &["GET"], "h"),
            resource: String::new(),
            parameters: FieldMap::new(),
            response: FieldMap::new(),
            responses_by_status: BTreeMap::new(),
        }];
        assign_resources(&mut entries, vec!["/a".to_string(), "/a/b".to_string()]);
        assert_eq!(entries[0].resource, "/a/b");
    }

    #[test]
    fn test_method_rank_breaks_ties() {
        let entry = |methods: &[&str]| Entry {
            declaration: Declaration::default(),
            route: route("r", "/same", methods, "h"),
            resource: "r".to_string(),
            parameters: FieldMap::new(),
            response: FieldMap::new(),
            responses_by_status: BTreeMap::new(),
        };
        let mut entries = vec![
            entry(&["PATCH"]),
            entry(&["DELETE"]),
            entry(&["OPTIONS"]),
            entry(&["GET"]),
        ];
        sort_entries(&mut entries);

        let methods: Vec<String> = entries.iter().map(|e| e.route.methods_joined()).collect();
        assert_eq!(methods, vec!["GET", "DELETE", "OPTIONS", "PATCH"]);
    }

    #[test]
    fn test_output_is_wrapped_and_humanized() {
        let extractor = extractor(vec![route("list", "/articles", &["GET"], "api::list")]);
        let entries = extractor.all("default").unwrap();
        let entry = &entries[0];

        assert_eq!(entry.declaration.description.as_deref(), Some("Lists articles."));
        let articles = &entry.response["articles"];
        assert_eq!(articles.data_type.as_deref(), Some("array of objects (Article)"));
        assert_eq!(articles.class, None);

        let article = articles.children.as_ref().unwrap();
        assert_eq!(article["id"].parent_class.as_deref(), Some("Article"));
        assert_eq!(article["author"].data_type.as_deref(), Some("object (Author)"));
        assert_eq!(entry.responses_by_status[&200].type_ref.collection_name.as_deref(), Some("articles"));
    }

    #[test]
    fn test_declared_parameters_merge_over_input() {
        let extractor = extractor(vec![route("update", "/articles/{id}", &["PATCH"], "api::update")]);
        let entries = extractor.all("default").unwrap();
        let parameters = &entries[0].parameters;

        let names: Vec<&str> = parameters.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["id", "title", "author", "force"]);
        assert_eq!(parameters["id"].required, Some(false));
        assert_eq!(parameters["title"].required, Some(false));
        assert_eq!(parameters["force"].actual_type, Some(DataType::Boolean));
        assert!(entries[0].declaration.parameters.is_empty());
    }

    #[test]
    fn test_put_keeps_required_fields() {
        let extractor = extractor(vec![route("update", "/articles/{id}", &["PUT"], "api::update")]);
        let entries = extractor.all("default").unwrap();
        assert_eq!(entries[0].parameters["id"].required, Some(true));
    }

    #[test]
    fn test_status_responses() {
        let extractor = extractor(vec![route("show", "/articles/{id}", &["GET"], "api::show")]);
        let entries = extractor.all("default").unwrap();
        let entry = &entries[0];

        assert!(entry.response.contains_key("title"));
        let statuses: Vec<u16> = entry.responses_by_status.keys().copied().collect();
        assert_eq!(statuses, vec![200, 400]);
        let errors = &entry.responses_by_status[&400].model;
        assert!(errors.contains_key("status_code"));
        assert_eq!(entry.declaration.status_codes[&404], vec!["Missing"]);
        assert_eq!(
            entry.declaration.requirements["id"].requirement.as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_malformed_directive_names_handler() {
        let extractor = extractor(vec![route("broken", "/broken", &["GET"], "api::broken")]);
        match extractor.all("default") {
            Err(Error::InvalidDeclaration { handler, message }) => {
                assert_eq!(handler, "api::broken");
                assert!(message.contains("Malformed collection directive: array<>"));
            }
            other => panic!("unexpected result: {:?}", other.map(|e| e.len())),
        }
    }

    #[test]
    fn test_all_for_version() {
        let mut v1 = route("v1", "/articles", &["GET"], "api::list");
        v1.defaults.insert("_version".to_string(), "1.0".to_string());
        let mut v2 = route("v2", "/v2/articles", &["GET"], "api::list");
        v2.defaults.insert("_version".to_string(), "2".to_string());
        let unversioned = route("authors", "/people", &["GET"], "api::authors");

        let extractor = extractor(vec![v1, v2, unversioned]);
        let names: Vec<String> = extractor
            .all_for_version("1", "default")
            .unwrap()
            .into_iter()
            .map(|e| e.route.name)
            .collect();
        assert_eq!(names, vec!["v1", "authors"]);
    }

    #[test]
    fn test_get_single_entry() {
        let extractor = extractor(vec![route("list", "/articles.{_format}", &["GET"], "api::list")]);

        let entry = extractor.get("api::list", "list").unwrap().unwrap();
        assert_eq!(entry.resource, "/articles");
        assert!(extractor.get("api::list", "nope").unwrap().is_none());
        assert!(extractor.get("api::undocumented", "list").unwrap().is_none());
    }

    #[test]
    fn test_resources_include_documented_handler_files() {
        let extractor = extractor(vec![
            route("list", "/articles", &["GET"], "api::list"),
            route("plain", "/plain", &["GET"], "api::undocumented"),
        ]);
        assert_eq!(
            extractor.resources().unwrap(),
            vec![PathBuf::from("routes.yaml"), PathBuf::from("src/api.rs")]
        );
    }

    #[test]
    fn test_route_table_source() {
        let table = RouteTable::parse(
            "list:\n  path: /articles\n  methods: [GET]\n  handler: crate::api::list\n",
            std::path::Path::new("routes.yaml"),
        )
        .unwrap();
        let extractor = extractor(table);
        assert_eq!(extractor.all("default").unwrap().len(), 1);
    }
}
