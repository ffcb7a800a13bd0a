//! Reading `#[api_doc(...)]` attributes.
//!
//! ```ignore
//! #[api_doc(
//!     resource,
//!     description = "Update a user",
//!     section = "Users",
//!     input(class = "models::UserForm", groups = "update"),
//!     output = "models::User",
//!     status(code = 200, description = "Returned when successful"),
//!     status(code = 404, description = "Returned when the user is not found"),
//!     requirement(name = "id", requirement = "\\d+", data_type = "integer"),
//!     filter(name = "page", data_type = "integer", pattern = "\\d+", default = 1),
//! )]
//! ```

use crate::declaration::Declaration;
use crate::error::{Error, Result};
use crate::field::{DataType, FieldDescriptor};
use crate::type_ref::{Groups, RawTypeRef, TypeRefSpec};
use serde_json::Value;
use syn::meta::ParseNestedMeta;
use syn::punctuated::Punctuated;
use syn::{Attribute, Lit, LitBool, LitStr, Meta, Token};

const ATTRIBUTE: &str = "api_doc";

/// Whether `attr` is an `#[api_doc]` attribute (possibly path-qualified).
pub fn is_api_doc(attr: &Attribute) -> bool {
    attr.path()
        .segments
        .last()
        .map(|segment| segment.ident == ATTRIBUTE)
        .unwrap_or(false)
}

/// Reads the declaration attached to a handler, if any.
///
/// # Errors
///
/// Returns [`Error::InvalidDeclaration`] naming `handler` when the attribute is malformed.
pub fn parse_declaration(attrs: &[Attribute], handler: &str) -> Result<Option<Declaration>> {
    let Some(attr) = attrs.iter().find(|attr| is_api_doc(attr)) else {
        return Ok(None);
    };

    let mut declaration = Declaration::default();
    if let Meta::List(_) = attr.meta {
        attr.parse_nested_meta(|meta| read_key(&mut declaration, meta))
            .map_err(|e| Error::InvalidDeclaration {
                handler: handler.to_string(),
                message: e.to_string(),
            })?;
    }

    if let (None, Some(model)) = (&declaration.output, declaration.response_map.get(&200)) {
        declaration.output = Some(model.clone());
    }

    Ok(Some(declaration))
}

fn read_key(declaration: &mut Declaration, meta: ParseNestedMeta) -> syn::Result<()> {
    let key = meta
        .path
        .get_ident()
        .map(|ident| ident.to_string())
        .unwrap_or_default();

    match key.as_str() {
        "resource" => {
            if meta.input.peek(Token![=]) && meta.input.peek2(LitStr) {
                declaration.resource = true;
                declaration.resource_name = Some(string(&meta)?);
            } else {
                declaration.resource = flag(&meta)?;
            }
        }
        "description" => declaration.description = Some(string(&meta)?),
        "section" => declaration.section = Some(string(&meta)?),
        "link" => declaration.link = Some(string(&meta)?),
        "resource_description" => declaration.resource_description = Some(string(&meta)?),
        "deprecated" => declaration.deprecated = flag(&meta)?,
        "https" => declaration.https = flag(&meta)?,
        "authentication" => declaration.authentication = flag(&meta)?,
        "authentication_roles" => declaration.authentication_roles.extend(string_list(&meta)?),
        "cache" => {
            let value: syn::LitInt = meta.value()?.parse()?;
            declaration.cache = Some(value.base10_parse()?);
        }
        "view" => declaration.views.push(string(&meta)?),
        "views" => declaration.views.extend(string_list(&meta)?),
        "tag" => {
            if meta.input.peek(Token![=]) {
                let name = string(&meta)?;
                declaration.add_tag(&name, None);
            } else {
                let mut name = None;
                let mut color = None;
                meta.parse_nested_meta(|inner| {
                    match inner_key(&inner).as_str() {
                        "name" => name = Some(string(&inner)?),
                        "color" => color = Some(string(&inner)?),
                        other => return Err(inner.error(format!("unknown tag key `{}`", other))),
                    }
                    Ok(())
                })?;
                let name = name.ok_or_else(|| meta.error("a `tag` element has to contain a `name`"))?;
                declaration.add_tag(&name, color.as_deref());
            }
        }
        "input" => declaration.input = Some(type_ref(&meta)?),
        "inputs" => declaration.inputs = Some(string_list(&meta)?.into_iter().map(RawTypeRef::Name).collect()),
        "output" => declaration.output = Some(type_ref(&meta)?),
        "status" => read_status(declaration, &meta)?,
        "filter" => {
            let (name, field) = read_field(&meta, "filter", &["data_type", "description", "pattern", "default"])?;
            declaration.filters.insert(name, field);
        }
        "parameter" => {
            let (name, field) = read_field(
                &meta,
                "parameter",
                &[
                    "data_type",
                    "required",
                    "readonly",
                    "description",
                    "format",
                    "since_version",
                    "until_version",
                ],
            )?;
            if field.data_type.is_none() {
                return Err(meta.error(format!(
                    "\"{}\" parameter element has to contain a `data_type`",
                    name
                )));
            }
            declaration.parameters.insert(name, field);
        }
        "header" => {
            let (name, field) = read_field(&meta, "header", &["description", "required", "default"])?;
            declaration.headers.insert(name, field);
        }
        "requirement" => {
            let (name, field) = read_field(&meta, "requirement", &["requirement", "data_type", "description"])?;
            declaration.requirements.insert(name, field);
        }
        other => return Err(meta.error(format!("unknown api_doc key `{}`", other))),
    }

    Ok(())
}

pub(crate) fn inner_key(meta: &ParseNestedMeta) -> String {
    meta.path
        .get_ident()
        .map(|ident| ident.to_string())
        .unwrap_or_default()
}

pub(crate) fn string(meta: &ParseNestedMeta) -> syn::Result<String> {
    let value: LitStr = meta.value()?.parse()?;
    Ok(value.value())
}

/// `key` alone, or `key = true|false`.
pub(crate) fn flag(meta: &ParseNestedMeta) -> syn::Result<bool> {
    if meta.input.peek(Token![=]) {
        let value: LitBool = meta.value()?.parse()?;
        Ok(value.value)
    } else {
        Ok(true)
    }
}

/// `key("a", "b")`
pub(crate) fn string_list(meta: &ParseNestedMeta) -> syn::Result<Vec<String>> {
    let content;
    syn::parenthesized!(content in meta.input);
    let items = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
    Ok(items.into_iter().map(|lit| lit.value()).collect())
}

fn literal(meta: &ParseNestedMeta) -> syn::Result<Value> {
    let lit: Lit = meta.value()?.parse()?;
    let value = match lit {
        Lit::Str(s) => Value::String(s.value()),
        Lit::Bool(b) => Value::Bool(b.value),
        Lit::Int(i) => Value::from(i.base10_parse::<i64>()?),
        Lit::Float(f) => serde_json::Number::from_f64(f.base10_parse::<f64>()?)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        other => return Err(syn::Error::new(other.span(), "unsupported literal")),
    };
    Ok(value)
}

/// `key = "Type"` or `key(class = .., groups = .., name = .., parsers(..), form_errors, param_type = ..)`
fn type_ref(meta: &ParseNestedMeta) -> syn::Result<RawTypeRef> {
    if meta.input.peek(Token![=]) {
        return Ok(RawTypeRef::Name(string(meta)?));
    }

    let mut spec = TypeRefSpec::default();
    let mut has_class = false;
    meta.parse_nested_meta(|inner| {
        match inner_key(&inner).as_str() {
            "class" => {
                spec.class = string(&inner)?;
                has_class = true;
            }
            "groups" => {
                spec.groups = Some(if inner.input.peek(Token![=]) {
                    Groups::Joined(string(&inner)?)
                } else {
                    Groups::List(string_list(&inner)?)
                });
            }
            "name" => spec.name = Some(string(&inner)?),
            "parsers" => spec.parsers = Some(string_list(&inner)?),
            "form_errors" => spec.form_errors = flag(&inner)?,
            "param_type" => spec.param_type = Some(string(&inner)?),
            other => return Err(inner.error(format!("unknown type reference key `{}`", other))),
        }
        Ok(())
    })?;

    if !has_class {
        return Err(meta.error("a type reference has to contain a `class`"));
    }
    Ok(RawTypeRef::Detailed(spec))
}

fn read_status(declaration: &mut Declaration, meta: &ParseNestedMeta) -> syn::Result<()> {
    let mut code: Option<u16> = None;
    let mut descriptions = Vec::new();
    let mut model = None;
    meta.parse_nested_meta(|inner| {
        match inner_key(&inner).as_str() {
            "code" => {
                let value: syn::LitInt = inner.value()?.parse()?;
                code = Some(value.base10_parse()?);
            }
            "description" => descriptions.push(string(&inner)?),
            "model" => model = Some(type_ref(&inner)?),
            other => return Err(inner.error(format!("unknown status key `{}`", other))),
        }
        Ok(())
    })?;

    let code = code.ok_or_else(|| meta.error("a `status` element has to contain a `code`"))?;
    if !descriptions.is_empty() {
        declaration
            .status_codes
            .entry(code)
            .or_default()
            .extend(descriptions);
    }
    if let Some(model) = model {
        declaration.response_map.insert(code, model);
    }
    Ok(())
}

/// Reads `element(name = .., <allowed keys>)` into a named descriptor.
fn read_field(
    meta: &ParseNestedMeta,
    element: &str,
    allowed: &[&str],
) -> syn::Result<(String, FieldDescriptor)> {
    let mut name = None;
    let mut field = FieldDescriptor::default();
    meta.parse_nested_meta(|inner| {
        let key = inner_key(&inner);
        if key == "name" {
            name = Some(string(&inner)?);
            return Ok(());
        }
        if !allowed.contains(&key.as_str()) {
            return Err(inner.error(format!("unknown {} key `{}`", element, key)));
        }
        match key.as_str() {
            "data_type" => {
                let label = string(&inner)?;
                field.actual_type = DataType::from_label(&label);
                field.data_type = Some(label);
            }
            "required" => field.required = Some(flag(&inner)?),
            "readonly" => field.readonly = Some(flag(&inner)?),
            "description" => field.description = Some(string(&inner)?),
            "format" | "pattern" => field.format = Some(string(&inner)?),
            "requirement" => field.requirement = Some(string(&inner)?),
            "since_version" => field.since_version = Some(string(&inner)?),
            "until_version" => field.until_version = Some(string(&inner)?),
            "default" => field.default = Some(literal(&inner)?),
            _ => {}
        }
        Ok(())
    })?;

    let name = name.ok_or_else(|| {
        meta.error(format!("a `{}` element has to contain a `name`", element))
    })?;
    Ok((name, field))
}
