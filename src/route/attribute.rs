use crate::error::Result;
use crate::parser::{HandlerDef, SourceIndex};
use crate::route::{normalize_methods, RouteRecord, RouteSource};
use indexmap::IndexMap;
use log::{debug, warn};
use std::path::PathBuf;
use std::rc::Rc;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Lit, Token};

/// Routes declared with attributes on the handlers:
/// `#[get("/users")]` or `#[route("/users", method = "GET", method = "HEAD")]`.
pub struct AttributeRoutes {
    index: Rc<SourceIndex>,
}

impl AttributeRoutes {
    pub fn new(index: Rc<SourceIndex>) -> Self {
        Self { index }
    }

    fn handler_routes(handler: &HandlerDef) -> Vec<RouteRecord> {
        let name = handler.qualified_name();
        handler
            .attrs
            .iter()
            .filter_map(|attr| match parse_route_attribute(attr) {
                Ok(route) => route,
                Err(e) => {
                    warn!("Ignoring route attribute on {}: {}", name, e);
                    None
                }
            })
            .map(|(path, methods)| RouteRecord {
                name: name.clone(),
                path,
                methods,
                host: None,
                handler: name.clone(),
                defaults: IndexMap::new(),
                requirements: IndexMap::new(),
            })
            .collect()
    }

    fn documented_handlers(&self) -> impl Iterator<Item = &HandlerDef> {
        self.index
            .handlers()
            .iter()
            .filter(|handler| handler.attrs.iter().any(|attr| route_kind(attr).is_some()))
    }
}

impl RouteSource for AttributeRoutes {
    fn name(&self) -> &str {
        "route attributes"
    }

    fn routes(&self) -> Result<Vec<RouteRecord>> {
        let routes: Vec<RouteRecord> = self
            .documented_handlers()
            .flat_map(Self::handler_routes)
            .collect();
        debug!("Found {} attribute routes", routes.len());
        Ok(routes)
    }

    fn resources(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = Vec::new();
        for handler in self.documented_handlers() {
            if !files.contains(&handler.file) {
                files.push(handler.file.clone());
            }
        }
        files
    }
}

enum RouteKind {
    Method(&'static str),
    Generic,
}

fn route_kind(attr: &Attribute) -> Option<RouteKind> {
    let name = attr.path().segments.last()?.ident.to_string();
    let kind = match name.as_str() {
        "get" => RouteKind::Method("GET"),
        "post" => RouteKind::Method("POST"),
        "put" => RouteKind::Method("PUT"),
        "delete" => RouteKind::Method("DELETE"),
        "patch" => RouteKind::Method("PATCH"),
        "head" => RouteKind::Method("HEAD"),
        "options" => RouteKind::Method("OPTIONS"),
        "route" => RouteKind::Generic,
        _ => return None,
    };
    Some(kind)
}

/// Path and methods of a route attribute; `Ok(None)` for unrelated attributes.
fn parse_route_attribute(attr: &Attribute) -> syn::Result<Option<(String, Vec<String>)>> {
    let Some(kind) = route_kind(attr) else {
        return Ok(None);
    };

    let args = attr.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated)?;
    let mut args = args.into_iter();

    let path = match args.next() {
        Some(Expr::Lit(expr)) => match expr.lit {
            Lit::Str(s) => s.value(),
            other => return Err(syn::Error::new(other.span(), "expected a path string")),
        },
        _ => return Err(syn::Error::new_spanned(attr, "expected a path string")),
    };

    let mut methods = Vec::new();
    if let RouteKind::Method(method) = kind {
        methods.push(method.to_string());
    }
    for arg in args {
        if let Expr::Assign(assign) = arg {
            let is_method = matches!(assign.left.as_ref(), Expr::Path(p) if p.path.is_ident("method"));
            if let (true, Expr::Lit(expr)) = (is_method, assign.right.as_ref()) {
                if let Lit::Str(s) = &expr.lit {
                    methods.push(s.value());
                }
            }
        }
    }

    Ok(Some((path, normalize_methods(methods))))
}
