use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use syn::visit::{self, Visit};
use syn::{Attribute, Expr, Lit, Meta};

/// AST parser for Rust source files.
///
/// The `AstParser` uses `syn` to parse source files and derives each file's module path
/// from its location under the project root.
///
/// # Example
///
/// ```no_run
/// use apidoc_from_source::parser::AstParser;
/// use std::path::Path;
///
/// let root = Path::new("./my-project");
/// let parsed = AstParser::parse_file(&root.join("src/handlers/users.rs"), root).unwrap();
/// assert_eq!(parsed.module_path, vec!["handlers", "users"]);
/// ```
pub struct AstParser;

/// A successfully parsed Rust file.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Module path derived from the file location (`src/a/b.rs` is `a::b`)
    pub module_path: Vec<String>,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl AstParser {
    /// Parses a single Rust source file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid Rust syntax.
    pub fn parse_file(path: &Path, root: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)?;
        let syntax_tree = syn::parse_file(&content).map_err(|e| Error::ParseError {
            file: path.to_path_buf(),
            message: format!("Failed to parse Rust syntax: {}", e),
        })?;

        Ok(ParsedFile {
            path: path.to_path_buf(),
            module_path: module_path_for(path, root),
            syntax_tree,
        })
    }

    /// Parses every file, skipping (with a warning) those that fail.
    pub fn parse_files(paths: &[PathBuf], root: &Path) -> Vec<ParsedFile> {
        debug!("Parsing {} files", paths.len());

        let parsed: Vec<ParsedFile> = paths
            .iter()
            .filter_map(|path| match Self::parse_file(path, root) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        debug!(
            "Parsing complete: {} succeeded, {} failed",
            parsed.len(),
            paths.len() - parsed.len()
        );
        parsed
    }
}

/// `src/handlers/users.rs` → `handlers::users`; `mod.rs`, `lib.rs` and `main.rs` name
/// their directory.
fn module_path_for(path: &Path, root: &Path) -> Vec<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut segments: Vec<String> = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();

    if segments.first().map(|s| s == "src").unwrap_or(false) {
        segments.remove(0);
    }
    if matches!(
        segments.last().map(|s| s.as_str()),
        Some("mod") | Some("lib") | Some("main")
    ) {
        segments.pop();
    }
    segments
}

/// A function that can be bound to a route.
#[derive(Debug, Clone)]
pub struct HandlerDef {
    pub name: String,
    /// Type of the `impl` block for methods
    pub owner: Option<String>,
    pub module_path: Vec<String>,
    pub attrs: Vec<Attribute>,
    pub file: PathBuf,
}

impl HandlerDef {
    /// `module::Owner::name`
    pub fn qualified_name(&self) -> String {
        self.segments().join("::")
    }

    fn segments(&self) -> Vec<String> {
        let mut segments = self.module_path.clone();
        if let Some(owner) = &self.owner {
            segments.push(owner.clone());
        }
        segments.push(self.name.clone());
        segments
    }

    pub fn doc(&self) -> Vec<String> {
        doc_lines(&self.attrs)
    }
}

#[derive(Debug, Clone)]
pub enum TypeItem {
    Struct(syn::ItemStruct),
    Enum(syn::ItemEnum),
}

/// A struct or enum definition.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub module_path: Vec<String>,
    pub item: TypeItem,
    pub file: PathBuf,
}

impl TypeDef {
    pub fn ident(&self) -> String {
        match &self.item {
            TypeItem::Struct(s) => s.ident.to_string(),
            TypeItem::Enum(e) => e.ident.to_string(),
        }
    }

    pub fn qualified_name(&self) -> String {
        let mut segments = self.module_path.clone();
        segments.push(self.ident());
        segments.join("::")
    }

    pub fn as_struct(&self) -> Option<&syn::ItemStruct> {
        match &self.item {
            TypeItem::Struct(s) => Some(s),
            TypeItem::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&syn::ItemEnum> {
        match &self.item {
            TypeItem::Enum(e) => Some(e),
            TypeItem::Struct(_) => None,
        }
    }
}

/// Handlers and type definitions of a whole project.
#[derive(Debug, Default)]
pub struct SourceIndex {
    handlers: Vec<HandlerDef>,
    types: Vec<TypeDef>,
}

impl SourceIndex {
    pub fn new(files: &[ParsedFile]) -> Self {
        let mut index = SourceIndex::default();
        for file in files {
            let mut visitor = IndexVisitor {
                index: &mut index,
                file: &file.path,
                module_path: file.module_path.clone(),
            };
            visitor.visit_file(&file.syntax_tree);
        }
        debug!(
            "Indexed {} handlers and {} types",
            index.handlers.len(),
            index.types.len()
        );
        index
    }

    pub fn handlers(&self) -> &[HandlerDef] {
        &self.handlers
    }

    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    /// Finds the first handler whose qualified path ends with `reference`.
    /// A leading `crate::` is ignored.
    pub fn resolve_handler(&self, reference: &str) -> Option<&HandlerDef> {
        let wanted = reference_segments(reference);
        if wanted.is_empty() {
            return None;
        }
        self.handlers
            .iter()
            .find(|handler| ends_with(&handler.segments(), &wanted))
    }

    /// Finds a type by identifier, qualified with `::`, `\` or `.`.
    pub fn find_type(&self, class: &str) -> Option<&TypeDef> {
        let wanted = reference_segments(class);
        if wanted.is_empty() {
            return None;
        }
        self.types.iter().find(|def| {
            let mut segments = def.module_path.clone();
            segments.push(def.ident());
            ends_with(&segments, &wanted)
        })
    }

    pub fn find_struct(&self, class: &str) -> Option<&TypeDef> {
        self.find_type(class).filter(|def| def.as_struct().is_some())
    }
}

fn reference_segments(reference: &str) -> Vec<String> {
    let mut segments: Vec<String> = reference
        .split(|c| c == ':' || c == '\\' || c == '.')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().to_string())
        .collect();
    if segments.first().map(|s| s == "crate").unwrap_or(false) {
        segments.remove(0);
    }
    segments
}

fn ends_with(haystack: &[String], needle: &[String]) -> bool {
    needle.len() <= haystack.len() && haystack[haystack.len() - needle.len()..] == *needle
}

struct IndexVisitor<'a> {
    index: &'a mut SourceIndex,
    file: &'a Path,
    module_path: Vec<String>,
}

impl<'a, 'ast> Visit<'ast> for IndexVisitor<'a> {
    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        if node.content.is_some() {
            self.module_path.push(node.ident.to_string());
            visit::visit_item_mod(self, node);
            self.module_path.pop();
        }
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.index.handlers.push(HandlerDef {
            name: node.sig.ident.to_string(),
            owner: None,
            module_path: self.module_path.clone(),
            attrs: node.attrs.clone(),
            file: self.file.to_path_buf(),
        });
    }

    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        let owner = match node.self_ty.as_ref() {
            syn::Type::Path(type_path) => type_path
                .path
                .segments
                .last()
                .map(|segment| segment.ident.to_string()),
            _ => None,
        };
        let Some(owner) = owner else {
            return;
        };

        for item in &node.items {
            if let syn::ImplItem::Fn(method) = item {
                self.index.handlers.push(HandlerDef {
                    name: method.sig.ident.to_string(),
                    owner: Some(owner.clone()),
                    module_path: self.module_path.clone(),
                    attrs: method.attrs.clone(),
                    file: self.file.to_path_buf(),
                });
            }
        }
    }

    fn visit_item_struct(&mut self, node: &'ast syn::ItemStruct) {
        self.index.types.push(TypeDef {
            module_path: self.module_path.clone(),
            item: TypeItem::Struct(node.clone()),
            file: self.file.to_path_buf(),
        });
    }

    fn visit_item_enum(&mut self, node: &'ast syn::ItemEnum) {
        self.index.types.push(TypeDef {
            module_path: self.module_path.clone(),
            item: TypeItem::Enum(node.clone()),
            file: self.file.to_path_buf(),
        });
    }
}

/// Lines of `///` doc comments, with the single leading space removed.
pub fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(expr_lit) => match &expr_lit.lit {
                    Lit::Str(s) => Some(s.value()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .flat_map(|text| {
            text.lines()
                .map(|line| line.strip_prefix(' ').unwrap_or(line).trim_end().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Doc comment joined into one trimmed block, `None` when absent.
pub fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let text = doc_lines(attrs).join("\n").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    fn index_of(dir: &TempDir, files: &[(&str, &str)]) -> SourceIndex {
        let paths: Vec<PathBuf> = files
            .iter()
            .map(|(name, content)| create_temp_file(dir, name, content))
            .collect();
        SourceIndex::new(&AstParser::parse_files(&paths, dir.path()))
    }

    #[test]
    fn test_module_paths() {
        let root = Path::new("/p");
        assert_eq!(module_path_for(Path::new("/p/src/lib.rs"), root), Vec::<String>::new());
        assert_eq!(
            module_path_for(Path::new("/p/src/handlers/users.rs"), root),
            vec!["handlers", "users"]
        );
        assert_eq!(
            module_path_for(Path::new("/p/src/handlers/mod.rs"), root),
            vec!["handlers"]
        );
        assert_eq!(module_path_for(Path::new("/p/demo/app.rs"), root), vec!["demo", "app"]);
    }

    #[test]
    fn test_parse_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_temp_file(&temp_dir, "src/bad.rs", "pub fn broken( {");

        let result = AstParser::parse_file(&path, temp_dir.path());
        match result {
            Err(Error::ParseError { file, message }) => {
                assert_eq!(file, path);
                assert!(message.contains("Failed to parse Rust syntax"));
            }
            other => panic!("unexpected result: {:?}", other.map(|p| p.path)),
        }
    }

    #[test]
    fn test_parse_files_skips_failures() {
        let temp_dir = TempDir::new().unwrap();
        let good = create_temp_file(&temp_dir, "src/good.rs", "pub fn ok() {}");
        let bad = create_temp_file(&temp_dir, "src/bad.rs", "struct Missing }");

        let parsed = AstParser::parse_files(&[good.clone(), bad], temp_dir.path());

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].path, good);
        assert_eq!(parsed[0].module_path, vec!["good"]);
    }

    #[test]
    fn test_index_handlers_and_methods() {
        let temp_dir = TempDir::new().unwrap();
        let index = index_of(
            &temp_dir,
            &[(
                "src/handlers/users.rs",
                r#"
                pub fn list() {}

                pub struct UserController;

                impl UserController {
                    pub fn show(&self) {}
                }

                pub mod admin {
                    pub fn purge() {}
                }
                "#,
            )],
        );

        let names: Vec<String> = index.handlers().iter().map(|h| h.qualified_name()).collect();
        assert_eq!(
            names,
            vec![
                "handlers::users::list",
                "handlers::users::UserController::show",
                "handlers::users::admin::purge",
            ]
        );
    }

    #[test]
    fn test_resolve_handler_by_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let index = index_of(
            &temp_dir,
            &[
                ("src/users.rs", "pub fn list() {}"),
                ("src/orders.rs", "pub fn list() {}"),
            ],
        );

        let handler = index.resolve_handler("crate::orders::list").unwrap();
        assert_eq!(handler.qualified_name(), "orders::list");
        assert!(index.resolve_handler("users::list").is_some());
        assert!(index.resolve_handler("missing::list").is_none());
        assert!(index.resolve_handler("").is_none());
    }

    #[test]
    fn test_find_type() {
        let temp_dir = TempDir::new().unwrap();
        let index = index_of(
            &temp_dir,
            &[(
                "src/models.rs",
                "pub struct User { pub id: u32 } pub enum Status { Active, Banned }",
            )],
        );

        assert_eq!(index.find_type("User").unwrap().qualified_name(), "models::User");
        assert!(index.find_type("crate::models::User").is_some());
        assert!(index.find_type(r"models\User").is_some());
        assert!(index.find_struct("Status").is_none());
        assert!(index.find_type("Status").unwrap().as_enum().is_some());
        assert!(index.find_type("Order").is_none());
    }

    #[test]
    fn test_doc_lines() {
        let item: syn::ItemFn = syn::parse_str(
            r#"
            /// Lists users.
            ///
            /// Paged.
            fn list() {}
            "#,
        )
        .unwrap();

        assert_eq!(doc_lines(&item.attrs), vec!["Lists users.", "", "Paged."]);
        assert_eq!(doc_text(&item.attrs).as_deref(), Some("Lists users.\n\nPaged."));
    }
}
