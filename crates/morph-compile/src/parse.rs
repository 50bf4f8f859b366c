//! Per-file parsing: source text to declarations.
//!
//! Each file is parsed on its own so that a syntax error in one file still
//! lets every other file report its problems.

use crate::diagnostic::{Diagnostics, Location};
use morph_build::SourceFile;
use morph_schema::vocab::{ATTR_ACCESSOR, ATTR_COLUMN, ATTR_ENTITY, ATTR_RELATION, ATTR_ROOT};
use std::collections::BTreeMap;
use syn::{
    Attribute, Expr, ExprLit, FnArg, Ident, ImplItem, Item, ItemImpl, ItemStruct, Lit, LitStr, Pat,
    ReturnType, Type, spanned::Spanned,
};

pub(crate) struct ParsedFile {
    pub(crate) entities: Vec<EntityDecl>,
    pub(crate) accessors: Vec<AccessorDecl>,
    pub(crate) impls: Vec<ImplDecl>,
}

pub(crate) struct EntityDecl {
    pub(crate) ident: String,
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) members: Vec<MemberDecl>,
    pub(crate) location: Location,
}

pub(crate) struct MemberDecl {
    pub(crate) ident: String,
    pub(crate) ty: Type,
    pub(crate) marker: MemberMarker,
    pub(crate) location: Location,
}

pub(crate) enum MemberMarker {
    Column { name: String },
    Relation { target: String, cardinality: String },
    Unmarked,
    Conflicting,
}

pub(crate) struct AccessorDecl {
    pub(crate) ident: String,
    pub(crate) namespace: String,
    pub(crate) members: Vec<MemberDecl>,
    pub(crate) location: Location,
}

pub(crate) struct ImplDecl {
    pub(crate) self_ty: String,
    pub(crate) consts: Vec<ConstDecl>,
    pub(crate) fns: Vec<FnDecl>,
    pub(crate) location: Location,
}

pub(crate) struct ConstDecl {
    pub(crate) ident: String,
    pub(crate) value: Option<String>,
    pub(crate) location: Location,
}

pub(crate) struct FnDecl {
    pub(crate) ident: String,
    pub(crate) params: Vec<(String, Type)>,
    pub(crate) has_receiver: bool,
    pub(crate) returns_self: bool,
    pub(crate) body: syn::Block,
    pub(crate) location: Location,
}

/// Parse one file. Returns `None` when the file is not syntactically valid;
/// the reason is recorded in `diags`.
pub(crate) fn parse_source(file: &SourceFile, diags: &mut Diagnostics) -> Option<ParsedFile> {
    let syntax = match syn::parse_file(file.text()) {
        Ok(syntax) => syntax,
        Err(err) => {
            for e in err {
                diags.error(
                    Location::from_span(file.name(), e.span()),
                    format!("syntax error: {e}"),
                );
            }
            return None;
        }
    };

    let mut parsed = ParsedFile {
        entities: Vec::new(),
        accessors: Vec::new(),
        impls: Vec::new(),
    };

    for item in syntax.items {
        match item {
            Item::Struct(item) => parse_struct(file.name(), item, &mut parsed, diags),
            Item::Impl(item) => {
                if let Some(decl) = parse_impl(file.name(), item, diags) {
                    parsed.impls.push(decl);
                }
            }
            other => diags.warning(
                Location::from_span(file.name(), other.span()),
                "unsupported item ignored",
            ),
        }
    }

    Some(parsed)
}

// `#[morph::<kind>(...)]` -> `Some(kind)`
fn marker_kind(attr: &Attribute) -> Option<String> {
    let segments: Vec<String> = attr
        .path()
        .segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect();

    match segments.as_slice() {
        [root, kind] if root == ATTR_ROOT => Some(kind.clone()),
        _ => None,
    }
}

// Parse `key = "value"` pairs, rejecting keys outside `allowed`.
fn marker_args(attr: &Attribute, allowed: &[&str]) -> syn::Result<BTreeMap<String, String>> {
    let mut args = BTreeMap::new();

    attr.parse_nested_meta(|meta| {
        let key = meta
            .path
            .get_ident()
            .map(Ident::to_string)
            .unwrap_or_default();
        if !allowed.contains(&key.as_str()) {
            return Err(meta.error(format!("unknown marker key `{key}`")));
        }

        let value: LitStr = meta.value()?.parse()?;
        args.insert(key, value.value());

        Ok(())
    })?;

    Ok(args)
}

fn parse_struct(file: &str, item: ItemStruct, parsed: &mut ParsedFile, diags: &mut Diagnostics) {
    let location = Location::from_span(file, item.ident.span());
    let ident = item.ident.to_string();

    let mut entity_args = None;
    let mut accessor_args = None;
    for attr in &item.attrs {
        let Some(kind) = marker_kind(attr) else {
            continue;
        };
        let allowed: &[&str] = match kind.as_str() {
            ATTR_ENTITY => &["name", "namespace"],
            ATTR_ACCESSOR => &["namespace"],
            _ => {
                diags.warning(
                    Location::from_span(file, attr.span()),
                    format!("unknown marker `{ATTR_ROOT}::{kind}` ignored"),
                );
                continue;
            }
        };

        match marker_args(attr, allowed) {
            Ok(args) if kind == ATTR_ENTITY => entity_args = Some(args),
            Ok(args) => accessor_args = Some(args),
            Err(e) => diags.error(Location::from_span(file, e.span()), e.to_string()),
        }
    }

    let syn::Fields::Named(fields) = item.fields else {
        diags.error(location, format!("`{ident}` must declare named members"));
        return;
    };
    let members = fields
        .named
        .into_iter()
        .filter_map(|field| parse_member(file, field, diags))
        .collect();

    match (entity_args, accessor_args) {
        (Some(_), Some(_)) => diags.error(
            location,
            format!("`{ident}` cannot be both an entity and an accessor"),
        ),
        (Some(mut args), None) => {
            let Some(namespace) = args.remove("namespace") else {
                diags.error(location, format!("entity `{ident}` has no namespace"));
                return;
            };
            parsed.entities.push(EntityDecl {
                name: args.remove("name").unwrap_or_else(|| ident.clone()),
                ident,
                namespace,
                members,
                location,
            });
        }
        (None, Some(mut args)) => {
            let Some(namespace) = args.remove("namespace") else {
                diags.error(location, format!("accessor `{ident}` has no namespace"));
                return;
            };
            parsed.accessors.push(AccessorDecl {
                ident,
                namespace,
                members,
                location,
            });
        }
        (None, None) => diags.warning(
            location,
            format!("struct `{ident}` has no morph marker and is ignored"),
        ),
    }
}

fn parse_member(file: &str, field: syn::Field, diags: &mut Diagnostics) -> Option<MemberDecl> {
    let ident = field.ident.as_ref()?;
    let location = Location::from_span(file, ident.span());

    let mut marker = MemberMarker::Unmarked;
    for attr in &field.attrs {
        let Some(kind) = marker_kind(attr) else {
            continue;
        };

        let parsed = match kind.as_str() {
            ATTR_COLUMN => marker_args(attr, &["name"]).map(|mut args| MemberMarker::Column {
                name: args.remove("name").unwrap_or_else(|| ident.to_string()),
            }),
            ATTR_RELATION => {
                marker_args(attr, &["target", "cardinality"]).map(|mut args| {
                    MemberMarker::Relation {
                        target: args.remove("target").unwrap_or_default(),
                        cardinality: args.remove("cardinality").unwrap_or_default(),
                    }
                })
            }
            _ => {
                diags.warning(
                    Location::from_span(file, attr.span()),
                    format!("unknown marker `{ATTR_ROOT}::{kind}` ignored"),
                );
                continue;
            }
        };

        match parsed {
            Ok(next) => {
                marker = match marker {
                    MemberMarker::Unmarked => next,
                    _ => MemberMarker::Conflicting,
                };
            }
            Err(e) => diags.error(Location::from_span(file, e.span()), e.to_string()),
        }
    }

    Some(MemberDecl {
        ident: ident.to_string(),
        ty: field.ty,
        marker,
        location,
    })
}

fn parse_impl(file: &str, item: ItemImpl, diags: &mut Diagnostics) -> Option<ImplDecl> {
    let location = Location::from_span(file, item.self_ty.span());

    if item.trait_.is_some() {
        diags.error(location, "trait implementations are not supported");
        return None;
    }
    let Type::Path(self_ty) = item.self_ty.as_ref() else {
        diags.error(location, "impl target must be a plain type name");
        return None;
    };
    let Some(self_ident) = self_ty.path.get_ident() else {
        diags.error(location, "impl target must be a plain type name");
        return None;
    };

    let mut decl = ImplDecl {
        self_ty: self_ident.to_string(),
        consts: Vec::new(),
        fns: Vec::new(),
        location,
    };

    for impl_item in item.items {
        match impl_item {
            ImplItem::Const(item) => {
                let value = match &item.expr {
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(s), ..
                    }) if is_str_ref(&item.ty) => Some(s.value()),
                    _ => None,
                };
                decl.consts.push(ConstDecl {
                    ident: item.ident.to_string(),
                    value,
                    location: Location::from_span(file, item.ident.span()),
                });
            }
            ImplItem::Fn(item) => {
                let mut params = Vec::new();
                let mut has_receiver = false;
                for input in &item.sig.inputs {
                    match input {
                        FnArg::Receiver(_) => has_receiver = true,
                        FnArg::Typed(pat) => {
                            let name = match pat.pat.as_ref() {
                                Pat::Ident(p) => p.ident.to_string(),
                                _ => "_".to_string(),
                            };
                            params.push((name, (*pat.ty).clone()));
                        }
                    }
                }

                let returns_self = match &item.sig.output {
                    ReturnType::Type(_, ty) => is_self(ty),
                    ReturnType::Default => false,
                };

                decl.fns.push(FnDecl {
                    ident: item.sig.ident.to_string(),
                    params,
                    has_receiver,
                    returns_self,
                    body: item.block,
                    location: Location::from_span(file, item.sig.ident.span()),
                });
            }
            other => diags.warning(
                Location::from_span(file, other.span()),
                "unsupported impl item ignored",
            ),
        }
    }

    Some(decl)
}

/// `&str` or `&'static str`.
pub(crate) fn is_str_ref(ty: &Type) -> bool {
    match ty {
        Type::Reference(r) => r.mutability.is_none() && is_path_ident(&r.elem, "str"),
        _ => false,
    }
}

fn is_self(ty: &Type) -> bool {
    is_path_ident(ty, "Self")
}

fn is_path_ident(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Path(p) => p.qself.is_none() && p.path.is_ident(name),
        _ => false,
    }
}
