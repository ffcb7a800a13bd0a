//! Fields of Rust structs, read through their serde attributes.

use crate::declaration::attribute::{flag, inner_key, string, string_list};
use crate::error::{Error, Result};
use crate::field::{DataType, FieldDescriptor, FieldMap};
use crate::parser::{doc_text, SourceIndex, TypeDef};
use crate::shape::ShapeParser;
use crate::type_ref::TypeRef;
use log::debug;
use std::rc::Rc;
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Fields, GenericArgument, Lit, Meta, PathArguments, Token, Type};

/// Parser for structs with named fields found in the [`SourceIndex`].
pub struct StructParser {
    index: Rc<SourceIndex>,
}

impl StructParser {
    pub fn new(index: Rc<SourceIndex>) -> Self {
        Self { index }
    }

    fn fields_of(&self, def: &TypeDef, type_ref: &TypeRef, path: &mut Vec<String>) -> Result<FieldMap> {
        let mut fields = FieldMap::new();
        let Some(item) = def.as_struct() else {
            return Ok(fields);
        };
        let Fields::Named(named) = &item.fields else {
            return Ok(fields);
        };
        let container = SerdeAttrs::from_attrs(&item.attrs);

        for field in &named.named {
            let Some(ident) = &field.ident else {
                continue;
            };
            let serde = SerdeAttrs::from_attrs(&field.attrs);
            if serde.skip || serde.skip_serializing {
                continue;
            }
            let api = ApiField::from_attrs(&field.attrs).map_err(|e| Error::ParseError {
                file: def.file.clone(),
                message: format!("Invalid api_field on {}.{}: {}", def.ident(), ident, e),
            })?;
            if !type_ref.accepts_groups(&api.groups) {
                debug!("Field {}.{} is outside the requested groups", def.ident(), ident);
                continue;
            }

            if serde.flatten {
                let (inner, _) = describe_type(&self.index, &field.ty);
                let class = inner.class.filter(|_| inner.actual_type == Some(DataType::Model));
                match class.and_then(|class| self.index.find_struct(&class).map(|def| (class, def))) {
                    Some((class, _)) if path.contains(&class) => {
                        debug!("Not flattening {} into itself", class);
                    }
                    Some((class, flattened)) => {
                        path.push(class);
                        let result = self.fields_of(flattened, type_ref, path);
                        path.pop();
                        fields.extend(result?);
                    }
                    None => debug!("Cannot flatten {}.{}: not a known struct", def.ident(), ident),
                }
                continue;
            }

            let name = serde
                .rename
                .unwrap_or_else(|| rename(&ident.unraw().to_string(), container.rename_all.as_deref()));
            let (mut descriptor, optional) = describe_type(&self.index, &field.ty);
            descriptor.required = Some(!(optional || serde.default || container.default));
            descriptor.readonly = Some(serde.skip_deserializing || api.readonly);
            descriptor.description = api.description.or_else(|| doc_text(&field.attrs));
            descriptor.since_version = api.since_version;
            descriptor.until_version = api.until_version;
            fields.insert(name, descriptor);
        }

        Ok(fields)
    }
}

impl ShapeParser for StructParser {
    fn name(&self) -> &str {
        "struct"
    }

    fn supports(&self, type_ref: &TypeRef) -> bool {
        self.index
            .find_struct(&type_ref.class)
            .and_then(|def| def.as_struct())
            .map(|item| matches!(item.fields, Fields::Named(_)))
            .unwrap_or(false)
    }

    fn parse(&self, type_ref: &TypeRef) -> Result<FieldMap> {
        let Some(def) = self.index.find_struct(&type_ref.class) else {
            return Ok(FieldMap::new());
        };
        let mut path = vec![type_ref.class.clone()];
        self.fields_of(def, type_ref, &mut path)
    }
}

/// Describes a Rust type as a field. The flag is true for `Option<T>`.
pub(crate) fn describe_type(index: &SourceIndex, ty: &Type) -> (FieldDescriptor, bool) {
    match ty {
        Type::Reference(reference) => describe_type(index, &reference.elem),
        Type::Paren(paren) => describe_type(index, &paren.elem),
        Type::Group(group) => describe_type(index, &group.elem),
        Type::Slice(slice) => (collection_of(index, &slice.elem), false),
        Type::Array(array) => (collection_of(index, &array.elem), false),
        Type::Path(type_path) => describe_path(index, &type_path.path),
        _ => (FieldDescriptor::default(), false),
    }
}

fn describe_path(index: &SourceIndex, path: &syn::Path) -> (FieldDescriptor, bool) {
    let Some(last) = path.segments.last() else {
        return (FieldDescriptor::default(), false);
    };
    let ident = last.ident.to_string();
    let argument = first_type_argument(&last.arguments);

    match (ident.as_str(), argument) {
        ("Option", Some(inner)) => (describe_type(index, inner).0, true),
        ("Box" | "Rc" | "Arc" | "Cow", Some(inner)) => describe_type(index, inner),
        ("Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet", Some(inner)) => {
            (collection_of(index, inner), false)
        }
        ("HashMap" | "BTreeMap" | "IndexMap", _) => (
            FieldDescriptor {
                data_type: Some("object".to_string()),
                actual_type: Some(DataType::Model),
                ..Default::default()
            },
            false,
        ),
        _ => {
            if let Some(primitive) = primitive(&ident) {
                return (FieldDescriptor::of(primitive), false);
            }
            let class = path_text(path);
            if let Some(item) = index.find_type(&class).and_then(|def| def.as_enum()) {
                return (enum_field(item), false);
            }
            (FieldDescriptor::model(&class), false)
        }
    }
}

fn collection_of(index: &SourceIndex, element: &Type) -> FieldDescriptor {
    let (member, _) = describe_type(index, element);
    match (member.actual_type, member.class) {
        (Some(DataType::Model), Some(class)) => FieldDescriptor::collection(&class),
        (Some(DataType::Enum), _) => FieldDescriptor::collection(DataType::String.as_str()),
        (Some(DataType::Model) | Some(DataType::Collection) | None, _) => FieldDescriptor {
            actual_type: Some(DataType::Collection),
            ..Default::default()
        },
        (Some(primitive), _) => FieldDescriptor::collection(primitive.as_str()),
    }
}

fn first_type_argument(arguments: &PathArguments) -> Option<&Type> {
    match arguments {
        PathArguments::AngleBracketed(args) => args.args.iter().find_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        }),
        _ => None,
    }
}

fn primitive(ident: &str) -> Option<DataType> {
    let data_type = match ident {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128"
        | "usize" => DataType::Integer,
        "f32" | "f64" => DataType::Float,
        "String" | "str" | "char" | "Uuid" => DataType::String,
        "bool" => DataType::Boolean,
        "NaiveDate" => DataType::Date,
        "DateTime" | "NaiveDateTime" | "SystemTime" => DataType::DateTime,
        "NaiveTime" => DataType::Time,
        _ => return None,
    };
    Some(data_type)
}

/// `crate::models::User` → `models::User`
fn path_text(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .skip_while(|segment| segment == "crate" || segment == "self" || segment == "super")
        .collect::<Vec<_>>()
        .join("::")
}

fn enum_field(item: &syn::ItemEnum) -> FieldDescriptor {
    let container = SerdeAttrs::from_attrs(&item.attrs);
    let variants: Vec<String> = item
        .variants
        .iter()
        .filter_map(|variant| {
            let serde = SerdeAttrs::from_attrs(&variant.attrs);
            if serde.skip || serde.skip_serializing {
                return None;
            }
            Some(
                serde
                    .rename
                    .unwrap_or_else(|| rename(&variant.ident.to_string(), container.rename_all.as_deref())),
            )
        })
        .collect();

    let mut field = FieldDescriptor::of(DataType::Enum);
    field.format = Some(format!("[{}]", variants.join("|")));
    field
}

/// The serde attributes that change a field's name or presence.
#[derive(Debug, Default)]
pub(crate) struct SerdeAttrs {
    pub rename: Option<String>,
    pub rename_all: Option<String>,
    pub skip: bool,
    pub skip_serializing: bool,
    pub skip_deserializing: bool,
    pub flatten: bool,
    pub default: bool,
}

impl SerdeAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> Self {
        let mut serde = SerdeAttrs::default();

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
            let metas = match attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated) {
                Ok(metas) => metas,
                Err(e) => {
                    debug!("Ignoring unreadable serde attribute: {}", e);
                    continue;
                }
            };
            for meta in metas {
                let key = meta.path().get_ident().map(|i| i.to_string()).unwrap_or_default();
                match key.as_str() {
                    "rename" => serde.rename = renamed(&meta),
                    "rename_all" => serde.rename_all = renamed(&meta),
                    "skip" => serde.skip = true,
                    "skip_serializing" => serde.skip_serializing = true,
                    "skip_deserializing" => serde.skip_deserializing = true,
                    "flatten" => serde.flatten = true,
                    "default" => serde.default = true,
                    _ => {}
                }
            }
        }

        serde
    }

    /// Serialized name of a field, `None` when serde never writes it.
    pub fn field_name(&self, ident: &syn::Ident, container: &SerdeAttrs) -> Option<String> {
        if self.skip || self.skip_serializing || self.flatten {
            return None;
        }
        Some(
            self.rename
                .clone()
                .unwrap_or_else(|| rename(&ident.unraw().to_string(), container.rename_all.as_deref())),
        )
    }
}

/// `rename = "x"` or `rename(serialize = "x", ..)`.
fn renamed(meta: &Meta) -> Option<String> {
    match meta {
        Meta::NameValue(nv) => lit_str(&nv.value),
        Meta::List(list) => list
            .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
            .ok()?
            .into_iter()
            .find_map(|inner| match inner {
                Meta::NameValue(nv) if nv.path.is_ident("serialize") => lit_str(&nv.value),
                _ => None,
            }),
        Meta::Path(_) => None,
    }
}

fn lit_str(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        _ => None,
    }
}

/// Applies a serde `rename_all` rule to a field or variant name.
pub(crate) fn rename(name: &str, rule: Option<&str>) -> String {
    let Some(rule) = rule else {
        return name.to_string();
    };
    let words = words(name);
    let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
    let upper: Vec<String> = words.iter().map(|w| w.to_uppercase()).collect();

    match rule {
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        "camelCase" => lower
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
            .collect(),
        "PascalCase" => lower.iter().map(|w| capitalize(w)).collect(),
        "snake_case" => lower.join("_"),
        "SCREAMING_SNAKE_CASE" => upper.join("_"),
        "kebab-case" => lower.join("-"),
        "SCREAMING-KEBAB-CASE" => upper.join("-"),
        _ => name.to_string(),
    }
}

/// `user_name` and `UserName` both split into `["user", "name"]`-like words.
fn words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();

    for c in name.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let after_lower = current.chars().last().map(|l| !l.is_uppercase()).unwrap_or(false);
        if c.is_uppercase() && after_lower {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `#[api_field(groups("a", ..), since_version = "1.0", until_version = "2.0", readonly, description = "..")]`
#[derive(Debug, Default)]
struct ApiField {
    groups: Vec<String>,
    since_version: Option<String>,
    until_version: Option<String>,
    readonly: bool,
    description: Option<String>,
}

impl ApiField {
    fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut api = ApiField::default();

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("api_field")) {
            attr.parse_nested_meta(|meta| {
                match inner_key(&meta).as_str() {
                    "groups" => {
                        let groups = if meta.input.peek(Token![=]) {
                            string(&meta)?.split(',').map(|g| g.trim().to_string()).collect()
                        } else {
                            string_list(&meta)?
                        };
                        api.groups.extend(groups.into_iter().filter(|g| !g.is_empty()));
                    }
                    "since_version" => api.since_version = Some(string(&meta)?),
                    "until_version" => api.until_version = Some(string(&meta)?),
                    "readonly" => api.readonly = flag(&meta)?,
                    "description" => api.description = Some(string(&meta)?),
                    other => return Err(meta.error(format!("unknown api_field key `{}`", other))),
                }
                Ok(())
            })?;
        }

        Ok(api)
    }
}
