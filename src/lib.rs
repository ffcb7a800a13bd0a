//! API documentation from annotated Rust web handlers.
//!
//! Handlers carry an `#[api_doc(...)]` attribute describing what they do, what they take and
//! what they return. Routes come from YAML route tables or from route attributes such as
//! `#[get("/users")]`. The library binds the two together, derives field-level metadata for
//! the referenced input and output types, and renders the result as JSON, YAML, Markdown or
//! Swagger 1.2.
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively scans project directories for source and sample files
//! 2. [`parser`] - Parses Rust source files and indexes handlers and types
//! 3. [`route`] - Route sources: YAML route tables and route attributes
//! 4. [`declaration`] - Reads `#[api_doc]` declarations and completes them from doc comments
//! 5. [`shape`] - Shape parsers deriving [`field::FieldDescriptor`]s from type references
//! 6. [`extractor`] - Builds sorted, resource-grouped entries, optionally cached on disk
//! 7. [`registry`] - Deduplicated models referenced by id
//! 8. [`formatter`] - Simple, Markdown and Swagger renderings
//! 9. [`serializer`] - JSON/YAML encoding and file output
//!
//! # Example Usage
//!
//! ```no_run
//! use apidoc_from_source::{
//!     extractor::Extractor,
//!     formatter::{markdown::MarkdownFormatter, Formatter},
//!     parser::{AstParser, SourceIndex},
//!     route::attribute::AttributeRoutes,
//!     scanner::FileScanner,
//!     shape::{structure::StructParser, ShapeParsers},
//! };
//! use std::path::PathBuf;
//! use std::rc::Rc;
//!
//! let root = PathBuf::from("./my-project");
//! let scan_result = FileScanner::new(root.clone()).scan().unwrap();
//! let parsed = AstParser::parse_files(&scan_result.files, &root);
//! let index = Rc::new(SourceIndex::new(&parsed));
//!
//! let mut parsers = ShapeParsers::new();
//! parsers.register(Box::new(StructParser::new(index.clone())));
//!
//! let extractor = Extractor::new(index.clone(), parsers)
//!     .with_source(Box::new(AttributeRoutes::new(index)));
//! let entries = extractor.all("default").unwrap();
//!
//! let markdown = MarkdownFormatter::new().format(&entries).unwrap();
//! println!("{}", markdown);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod config;
pub mod declaration;
pub mod error;
pub mod extractor;
pub mod field;
pub mod formatter;
pub mod parser;
pub mod registry;
pub mod route;
pub mod scanner;
pub mod serializer;
pub mod shape;
pub mod type_ref;
pub mod version;
