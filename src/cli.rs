use crate::config::DocConfig;
use crate::declaration::DEFAULT_VIEW;
use crate::extractor::caching::CachingExtractor;
use crate::extractor::{Entry, Extractor};
use crate::formatter::markdown::MarkdownFormatter;
use crate::formatter::simple::SimpleFormatter;
use crate::formatter::swagger::SwaggerFormatter;
use crate::formatter::Formatter;
use crate::parser::{AstParser, SourceIndex};
use crate::route::attribute::AttributeRoutes;
use crate::route::table::RouteTable;
use crate::scanner::FileScanner;
use crate::serializer::write_to_file;
use crate::shape::form_errors::FormErrorsParser;
use crate::shape::json_sample::JsonSampleParser;
use crate::shape::structure::StructParser;
use crate::shape::validation::ValidationParser;
use crate::shape::ShapeParsers;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Base path of cache artifacts when the config names none, relative to the project root.
pub const DEFAULT_CACHE_FILE: &str = "target/apidoc/entries";

/// API doc generator - documentation from `#[api_doc]` annotated Rust handlers
#[derive(Parser, Debug)]
#[command(name = "apidoc-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Rust project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// YAML route table, in addition to the configured ones (repeatable)
    #[arg(short = 'r', long = "routes", value_name = "FILE")]
    pub routes: Vec<PathBuf>,

    /// Only document handlers belonging to this view
    #[arg(long = "view", default_value = DEFAULT_VIEW)]
    pub view: String,

    /// Only document routes of this API version
    #[arg(long = "api-version", value_name = "VERSION")]
    pub api_version: Option<String>,

    /// Swagger API declaration to produce, e.g. `/users` (default: the resource listing)
    #[arg(long = "resource", value_name = "PATH")]
    pub resource: Option<String>,

    /// Config file (default: apidoc.yaml in the project directory)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ignore and do not write the extraction cache
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Entries grouped by resource, as JSON
    Json,
    /// Entries grouped by resource, as YAML
    Yaml,
    /// Markdown document
    Markdown,
    /// Swagger 1.2 JSON
    Swagger,
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    if args.resource.is_some() && args.output_format != OutputFormat::Swagger {
        anyhow::bail!("--resource only applies to the swagger format");
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }
    info!("View: {}", args.view);
    if let Some(ref api_version) = args.api_version {
        info!("API version: {}", api_version);
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting API documentation generation...");
    let root = args.project_path.as_path();

    let config = DocConfig::load(root, args.config.as_deref())
        .context("Failed to load configuration")?;
    debug!("Configuration: {:?}", config);

    // Step 1: Scan directory for Rust files
    info!("Scanning project directory...");
    let scan_result = FileScanner::new(root.to_path_buf()).scan()?;
    info!("Found {} Rust files", scan_result.files.len());
    if scan_result.files.is_empty() {
        anyhow::bail!("No Rust files found in the project directory");
    }

    // Step 2: Parse and index handlers and types
    info!("Parsing Rust files...");
    let parsed_files = AstParser::parse_files(&scan_result.files, root);
    info!("Successfully parsed {} files", parsed_files.len());
    if parsed_files.is_empty() {
        anyhow::bail!("No files could be parsed successfully");
    }
    let index = Rc::new(SourceIndex::new(&parsed_files));

    // Step 3: Shape parsers and route sources
    let parsers = build_parsers(&config, root, &index)?;
    info!("Shape parsers: {:?}", parsers.names());
    let extractor = build_extractor(&config, &args, root, index, parsers);

    // Step 4: Extract entries
    info!("Extracting documentation entries...");
    let entries = extract(extractor, &config, &args, root)?;
    info!("Extracted {} entries", entries.len());
    if entries.is_empty() {
        warn!("No documented routes found in the project");
    }

    // Step 5: Render
    info!("Rendering {:?} output...", args.output_format);
    let content = render(&entries, &config, &args)?;

    // Step 6: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote documentation to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Files scanned: {}", scan_result.files.len());
    info!("  - Files parsed: {}", parsed_files.len());
    info!("  - Entries documented: {}", entries.len());

    Ok(())
}

/// Parsers in precedence order: struct, validation, json samples (when configured), form errors.
fn build_parsers(config: &DocConfig, root: &Path, index: &Rc<SourceIndex>) -> Result<ShapeParsers> {
    let mut parsers = ShapeParsers::new();
    parsers.register(Box::new(StructParser::new(index.clone())));
    parsers.register(Box::new(ValidationParser::new(index.clone())));
    if let Some(samples_dir) = &config.samples_dir {
        let dir = root.join(samples_dir);
        let samples = JsonSampleParser::load(&dir)
            .with_context(|| format!("Failed to load samples from {}", dir.display()))?;
        parsers.register(Box::new(samples));
    }
    parsers.register(Box::new(FormErrorsParser));
    Ok(parsers)
}

/// Configured route tables are relative to the project root, `-r` ones to the working directory.
fn build_extractor(
    config: &DocConfig,
    args: &CliArgs,
    root: &Path,
    index: Rc<SourceIndex>,
    parsers: ShapeParsers,
) -> Extractor {
    let mut extractor = Extractor::new(index.clone(), parsers)
        .with_excluded_sections(config.exclude_sections.clone());

    let tables = config
        .routes
        .iter()
        .map(|path| root.join(path))
        .chain(args.routes.iter().cloned());
    for table in tables {
        debug!("Route table: {}", table.display());
        extractor = extractor.with_source(Box::new(RouteTable::new(table)));
    }

    if config.attribute_routes {
        extractor = extractor.with_source(Box::new(AttributeRoutes::new(index)));
    }
    extractor
}

fn extract(extractor: Extractor, config: &DocConfig, args: &CliArgs, root: &Path) -> Result<Vec<Entry>> {
    let view = args.view.as_str();

    if !config.cache.enabled || args.no_cache {
        let entries = match &args.api_version {
            Some(api_version) => extractor.all_for_version(api_version, view)?,
            None => extractor.all(view)?,
        };
        return Ok(entries);
    }

    let cache_file = root.join(
        config
            .cache
            .file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE)),
    );
    let caching = CachingExtractor::new(extractor, cache_file, config.cache.debug);
    let extraction = match &args.api_version {
        Some(api_version) => caching.all_for_version(api_version, view)?,
        None => caching.all(view)?,
    };
    Ok(extraction.entries)
}

fn render(entries: &[Entry], config: &DocConfig, args: &CliArgs) -> Result<String> {
    let content = match args.output_format {
        OutputFormat::Json => SimpleFormatter::json().format(entries)?,
        OutputFormat::Yaml => SimpleFormatter::yaml().format(entries)?,
        OutputFormat::Markdown => {
            let formatter = match &args.api_version {
                Some(api_version) => MarkdownFormatter::new().with_api_version(api_version.clone()),
                None => MarkdownFormatter::new(),
            };
            formatter.format(entries)?
        }
        OutputFormat::Swagger => {
            let mut formatter = SwaggerFormatter::new(config.swagger.clone(), &config.naming_strategy)
                .context("Invalid swagger configuration")?;
            formatter.format(entries, args.resource.as_deref())?
        }
    };
    Ok(content)
}
