//! Fields derived from sample JSON documents of plain serializable types.

use crate::error::{Error, Result};
use crate::field::{DataType, FieldDescriptor, FieldMap};
use crate::scanner::FileScanner;
use crate::shape::ShapeParser;
use crate::type_ref::{short_name, TypeRef};
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Sample documents keyed by type name. A sample for `User` lives in `<dir>/User.json`.
#[derive(Debug, Default)]
pub struct JsonSampleParser {
    samples: IndexMap<String, Value>,
}

impl JsonSampleParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` file under `dir`. Unreadable samples are skipped with a warning.
    pub fn load(dir: &Path) -> Result<Self> {
        let scan = FileScanner::new(dir.to_path_buf()).with_extension("json").scan()?;
        for warning in &scan.warnings {
            warn!("{}", warning);
        }

        let mut parser = Self::new();
        for file in scan.files {
            let Some(name) = file.file_stem().map(|stem| stem.to_string_lossy().to_string()) else {
                continue;
            };
            let sample = fs::read_to_string(&file).map_err(Error::from).and_then(|content| {
                serde_json::from_str::<Value>(&content).map_err(|e| Error::ParseError {
                    file: file.clone(),
                    message: format!("Invalid JSON sample: {}", e),
                })
            });
            match sample {
                Ok(value) => parser.insert(&name, value),
                Err(e) => warn!("Skipping sample {}: {}", file.display(), e),
            }
        }

        debug!("Loaded {} JSON samples from {}", parser.samples.len(), dir.display());
        Ok(parser)
    }

    pub fn insert(&mut self, name: &str, sample: Value) {
        self.samples.insert(name.to_string(), sample);
    }

    fn sample(&self, class: &str) -> Option<&Map<String, Value>> {
        self.samples
            .get(class)
            .or_else(|| self.samples.get(short_name(class)))
            .and_then(Value::as_object)
    }
}

impl ShapeParser for JsonSampleParser {
    fn name(&self) -> &str {
        "json_sample"
    }

    fn supports(&self, type_ref: &TypeRef) -> bool {
        self.sample(&type_ref.class).is_some()
    }

    fn parse(&self, type_ref: &TypeRef) -> Result<FieldMap> {
        Ok(self.sample(&type_ref.class).map(fields_of).unwrap_or_default())
    }
}

fn fields_of(object: &Map<String, Value>) -> FieldMap {
    object
        .iter()
        .map(|(name, value)| (name.clone(), describe(value)))
        .collect()
}

fn describe(value: &Value) -> FieldDescriptor {
    match value {
        Value::Null => FieldDescriptor::default(),
        Value::Bool(_) => FieldDescriptor::of(DataType::Boolean).with_default(value.clone()),
        Value::Number(n) if n.is_f64() => FieldDescriptor::of(DataType::Float).with_default(value.clone()),
        Value::Number(_) => FieldDescriptor::of(DataType::Integer).with_default(value.clone()),
        Value::String(_) => FieldDescriptor::of(DataType::String).with_default(value.clone()),
        Value::Array(items) => match items.first() {
            Some(Value::Object(first)) => FieldDescriptor {
                data_type: Some("array of objects".to_string()),
                actual_type: Some(DataType::Collection),
                children: Some(fields_of(first)).filter(|children| !children.is_empty()),
                ..Default::default()
            },
            Some(first) => match describe(first).actual_type {
                Some(member) if !member.is_nested() => FieldDescriptor::collection(member.as_str()),
                _ => FieldDescriptor::of(DataType::Collection),
            },
            None => FieldDescriptor::of(DataType::Collection),
        },
        Value::Object(object) => FieldDescriptor {
            data_type: Some("object".to_string()),
            actual_type: Some(DataType::Model),
            children: Some(fields_of(object)).filter(|children| !children.is_empty()),
            ..Default::default()
        },
    }
}
