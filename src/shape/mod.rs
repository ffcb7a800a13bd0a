//! Shape parsers derive field descriptors from type references.
//!
//! Parsers are registered in a [`ShapeParsers`] chain. For one reference the chain:
//!
//! 1. selects the parsers that support it (restricted to the reference's whitelist, if any);
//! 2. folds their [`ShapeParser::parse`] results together with [`merge_fields`];
//! 3. expands nested model and collection fields by parsing their `class` the same way,
//!    skipping any class already on the current expansion path;
//! 4. folds in the [`PostShapeParser::post_parse`] overlays of the selected parsers;
//! 5. wraps the result for `array<X> as alias` and named references.

pub mod form_errors;
pub mod json_sample;
pub mod structure;
pub mod validation;

use crate::error::Result;
use crate::field::{into_patch, merge_fields, FieldDescriptor, FieldMap, FieldPatch};
use crate::type_ref::TypeRef;
use log::debug;

/// Key a collection reference without alias is wrapped under.
pub const DEFAULT_COLLECTION_NAME: &str = "items";

/// Derives fields from one source of type metadata.
pub trait ShapeParser {
    /// Name used in parser whitelists (`parsers("struct", ..)`)
    fn name(&self) -> &str;

    fn supports(&self, type_ref: &TypeRef) -> bool;

    /// Shallow fields of the referenced type. Nested types are marked with their `class`
    /// and expanded by the chain.
    fn parse(&self, type_ref: &TypeRef) -> Result<FieldMap>;

    /// The post-parse capability, for parsers that have one.
    fn as_post_parser(&self) -> Option<&dyn PostShapeParser> {
        None
    }
}

/// Second pass run after all parsers, seeing their combined result.
pub trait PostShapeParser {
    fn post_parse(&self, type_ref: &TypeRef, fields: &FieldMap) -> Result<FieldPatch>;
}

/// Ordered chain of shape parsers.
#[derive(Default)]
pub struct ShapeParsers {
    parsers: Vec<Box<dyn ShapeParser>>,
}

impl ShapeParsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parser. Parsers run in registration order.
    pub fn register(&mut self, parser: Box<dyn ShapeParser>) {
        debug!("Registering shape parser: {}", parser.name());
        self.parsers.push(parser);
    }

    pub fn names(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    fn selected(&self, type_ref: &TypeRef) -> Vec<&dyn ShapeParser> {
        self.parsers
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| match &type_ref.parsers {
                Some(whitelist) => whitelist.iter().any(|name| name == p.name()),
                None => true,
            })
            .filter(|p| p.supports(type_ref))
            .collect()
    }

    /// Whether any parser can describe `class`.
    pub fn is_known(&self, class: &str) -> bool {
        let type_ref = TypeRef::new(class);
        self.parsers.iter().any(|p| p.supports(&type_ref))
    }

    /// Parses a normalized reference into its field tree.
    /// An unsupported reference yields an empty map.
    pub fn parse(&self, type_ref: &TypeRef) -> Result<FieldMap> {
        let mut path = vec![type_ref.class.clone()];
        let fields = self.parse_with(type_ref, &mut path)?;
        Ok(wrap(type_ref, fields))
    }

    fn parse_with(&self, type_ref: &TypeRef, path: &mut Vec<String>) -> Result<FieldMap> {
        let parsers = self.selected(type_ref);
        if parsers.is_empty() {
            debug!("No shape parser supports {}", type_ref.class);
            return Ok(FieldMap::new());
        }

        let mut fields = FieldMap::new();
        for parser in &parsers {
            debug!("Parsing {} with {}", type_ref.class, parser.name());
            fields = merge_fields(fields, into_patch(parser.parse(type_ref)?));
        }

        let mut fields = self.expand(type_ref, fields, path)?;

        for parser in &parsers {
            if let Some(post) = parser.as_post_parser() {
                let overlay = post.post_parse(type_ref, &fields)?;
                fields = merge_fields(fields, overlay);
            }
        }

        Ok(fields)
    }

    fn expand(&self, type_ref: &TypeRef, fields: FieldMap, path: &mut Vec<String>) -> Result<FieldMap> {
        let mut expanded = FieldMap::new();

        for (name, mut field) in fields {
            let own = match field.children.take() {
                Some(children) => Some(self.expand(type_ref, children, path)?),
                None => None,
            };

            let nested = match field.class.clone().filter(|_| field.is_expandable()) {
                Some(class) if path.contains(&class) => {
                    debug!("{} is already being expanded, leaving {} unexpanded", class, name);
                    None
                }
                Some(class) => {
                    path.push(class.clone());
                    let result = self.parse_with(&type_ref.nested(&class), path);
                    path.pop();
                    Some(result?).filter(|nested| !nested.is_empty())
                }
                None => None,
            };

            field.children = match (nested, own) {
                (Some(nested), Some(own)) => Some(merge_fields(nested, into_patch(own))),
                (Some(nested), None) => Some(nested),
                (None, own) => own,
            };
            expanded.insert(name, field);
        }

        Ok(expanded)
    }
}

/// Wraps parsed fields for collection and named references.
fn wrap(type_ref: &TypeRef, fields: FieldMap) -> FieldMap {
    let (key, mut wrapper) = if type_ref.collection {
        let key = type_ref
            .collection_name
            .clone()
            .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string());
        (key, FieldDescriptor::collection(&type_ref.class))
    } else if let Some(name) = &type_ref.name {
        (name.clone(), FieldDescriptor::model(&type_ref.class))
    } else {
        return fields;
    };

    if !fields.is_empty() {
        wrapper.children = Some(fields);
    }
    let mut wrapped = FieldMap::new();
    wrapped.insert(key, wrapper);
    wrapped
}
