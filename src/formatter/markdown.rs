use crate::error::Result;
use crate::extractor::{Entry, OTHERS_RESOURCE};
use crate::field::{FieldDescriptor, FieldMap};
use crate::formatter::{group_by_section, EntryView, Formatter, OTHERS_SECTION};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Renders entries as a Markdown document, one `#` heading per section and one `##` heading
/// per resource.
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormatter {
    api_version: Option<String>,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops fields outside their version range for `api_version`.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }
}

impl Formatter for MarkdownFormatter {
    fn format(&self, entries: &[Entry]) -> Result<String> {
        let mut out = String::new();
        for (section, resources) in group_by_section(entries, self.api_version.as_deref()) {
            if section != OTHERS_SECTION {
                let _ = write!(out, "\n# {} #\n\n", section);
            }
            for (resource, views) in resources {
                if resource != OTHERS_RESOURCE {
                    let _ = write!(out, "## {} ##\n\n", resource);
                }
                for view in &views {
                    out.push_str(&render(view));
                }
            }
        }
        Ok(out.trim().to_string())
    }

    fn format_one(&self, entry: &Entry) -> Result<String> {
        Ok(render(&EntryView::processed(entry, self.api_version.as_deref())))
    }
}

fn render(view: &EntryView<'_>) -> String {
    let mut out = format!("### `{}` {} ###\n\n", view.method, view.uri);

    if view.deprecated {
        out.push_str("### This method is deprecated ###\n\n");
    }
    if let Some(description) = view.description {
        let _ = write!(out, "_{}_\n\n", description);
    }
    if let Some(documentation) = view.documentation {
        let _ = write!(out, "{}\n\n", documentation.trim());
    }

    if !view.requirements.is_empty() {
        out.push_str("#### Requirements ####\n");
        for (name, requirement) in view.requirements {
            let _ = write!(out, "\n**{}**\n\n", name);
            if let Some(pattern) = requirement.requirement.as_deref().filter(|r| !r.is_empty()) {
                let _ = writeln!(out, "  - Requirement: {}", pattern);
            }
            if let Some(data_type) = &requirement.data_type {
                let _ = writeln!(out, "  - Type: {}", data_type);
            }
            if let Some(description) = &requirement.description {
                let _ = writeln!(out, "  - Description: {}", description);
            }
        }
        out.push('\n');
    }

    if !view.filters.is_empty() {
        out.push_str("#### Filters ####\n");
        for (name, filter) in view.filters {
            let _ = write!(out, "\n{}:\n\n", name);
            if let Some(data_type) = &filter.data_type {
                let _ = writeln!(out, "  * DataType: {}", data_type);
            }
            if let Some(description) = &filter.description {
                let _ = writeln!(out, "  * Description: {}", description);
            }
            if let Some(pattern) = &filter.format {
                let _ = writeln!(out, "  * Pattern: {}", pattern);
            }
            if let Some(default) = &filter.default {
                let _ = writeln!(out, "  * Default: {}", default);
            }
        }
        out.push('\n');
    }

    if !view.parameters.is_empty() {
        out.push_str("#### Parameters ####\n");
        write_fields(&mut out, &view.parameters, true);
    }
    if !view.response.is_empty() {
        out.push_str("#### Response ####\n");
        write_fields(&mut out, &view.response, false);
    }
    if !view.status_codes.is_empty() {
        out.push_str("#### Status Codes ####\n\n");
        write_status_codes(&mut out, view.status_codes);
    }

    out
}

fn write_fields(out: &mut String, fields: &FieldMap, with_required: bool) {
    for (name, field) in fields {
        let _ = write!(out, "\n{}:\n\n", name);
        if let Some(data_type) = type_label(field) {
            let _ = writeln!(out, "  * type: {}", data_type);
        }
        if with_required {
            let _ = writeln!(out, "  * required: {}", field.is_required());
        }
        if let Some(description) = &field.description {
            let _ = writeln!(out, "  * description: {}", description);
        }
        if let Some(versions) = versions(field) {
            let _ = writeln!(out, "  * versions: {}", versions);
        }
    }
    out.push('\n');
}

fn write_status_codes(out: &mut String, status_codes: &BTreeMap<u16, Vec<String>>) {
    for (code, descriptions) in status_codes {
        let _ = writeln!(out, "  * {}", code);
        for description in descriptions {
            let _ = writeln!(out, "    * {}", description);
        }
    }
    out.push('\n');
}

fn type_label(field: &FieldDescriptor) -> Option<&str> {
    field
        .data_type
        .as_deref()
        .or_else(|| field.actual_type.map(|t| t.as_str()))
}

/// `>=since, <=until`, either side optional.
fn versions(field: &FieldDescriptor) -> Option<String> {
    let bounds: Vec<String> = [
        field.since_version.as_ref().map(|v| format!(">={}", v)),
        field.until_version.as_ref().map(|v| format!("<={}", v)),
    ]
    .into_iter()
    .flatten()
    .collect();
    (!bounds.is_empty()).then(|| bounds.join(", "))
}
