//! Whole-unit symbol resolution and lowering into a [`ModuleImage`].

use crate::{
    diagnostic::{Diagnostics, Location},
    image::{
        AccessorDef, ConnectionArg, ConstructorDef, EntityDef, FieldDef, Import, ModuleImage,
        RelationDef, SetDef,
    },
    parse::{
        AccessorDecl, EntityDecl, FnDecl, ImplDecl, MemberDecl, MemberMarker, ParsedFile,
        is_str_ref,
    },
    unit::{ExportKind, ReferenceSet},
};
use morph_schema::vocab::{CONNECT, ENTITY_SET, LAZY, REF, REF_LIST, RUNTIME_LIB};
use morph_schema::types::{Cardinality, ScalarType};
use std::collections::{BTreeMap, BTreeSet};
use syn::{Expr, GenericArgument, PathArguments, Stmt, Type};

///
/// Shape
///
/// The only type forms generated code may use.
///

enum Shape<'a> {
    Extern {
        lib: String,
        sym: String,
        args: Vec<&'a Type>,
    },
    Local(String),
    Option(&'a Type),
}

fn shape(ty: &Type) -> Option<Shape<'_>> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }

    let segments: Vec<_> = path.path.segments.iter().collect();
    let last = segments.last()?;
    let args: Vec<&Type> = match &last.arguments {
        PathArguments::None => Vec::new(),
        PathArguments::AngleBracketed(a) => a
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(t) => Some(t),
                _ => None,
            })
            .collect(),
        PathArguments::Parenthesized(_) => return None,
    };

    match (path.path.leading_colon.is_some(), segments.as_slice()) {
        (true, [lib, sym]) if lib.arguments.is_none() => Some(Shape::Extern {
            lib: lib.ident.to_string(),
            sym: sym.ident.to_string(),
            args,
        }),
        (false, [only]) if only.ident == "Option" && args.len() == 1 => {
            Some(Shape::Option(args[0]))
        }
        (false, [only]) if args.is_empty() => Some(Shape::Local(only.ident.to_string())),
        _ => None,
    }
}

///
/// Resolver
///

pub(crate) struct Resolver<'a> {
    references: &'a ReferenceSet,
    diags: &'a mut Diagnostics,
    imports: BTreeSet<Import>,

    // generated type identifier -> logical entity name
    entities: BTreeMap<String, String>,
}

impl<'a> Resolver<'a> {
    pub(crate) const fn new(references: &'a ReferenceSet, diags: &'a mut Diagnostics) -> Self {
        Self {
            references,
            diags,
            imports: BTreeSet::new(),
            entities: BTreeMap::new(),
        }
    }

    /// Resolve every declaration of the unit. Returns `None` when an error
    /// was recorded.
    pub(crate) fn resolve(
        mut self,
        files: Vec<ParsedFile>,
        source_digest: String,
    ) -> Option<ModuleImage> {
        let mut entity_decls = Vec::new();
        let mut accessor_decls = Vec::new();
        let mut impl_decls = Vec::new();
        for file in files {
            entity_decls.extend(file.entities);
            accessor_decls.extend(file.accessors);
            impl_decls.extend(file.impls);
        }

        // symbol table first so that member types can reference any entity
        let mut symbols: BTreeSet<String> = BTreeSet::new();
        let mut unique_entities = Vec::with_capacity(entity_decls.len());
        for decl in entity_decls {
            if !symbols.insert(decl.ident.clone()) {
                self.diags.error(
                    decl.location.clone(),
                    format!("duplicate symbol `{}`", decl.ident),
                );
                continue;
            }
            self.entities.insert(decl.ident.clone(), decl.name.clone());
            unique_entities.push(decl);
        }

        let accessor = self.single_accessor(accessor_decls, &symbols);
        let namespace = accessor.as_ref().map(|a| a.namespace.as_str());

        let entities: Vec<EntityDef> = unique_entities
            .iter()
            .map(|decl| self.lower_entity(decl, namespace))
            .collect();

        let accessor_def = accessor.as_ref().map(|decl| {
            let constructors = self.lower_impls(decl, impl_decls);
            self.lower_accessor(decl, &entities, constructors)
        });

        if self.diags.has_errors() {
            return None;
        }
        let (accessor, accessor_def) = (accessor?, accessor_def?);

        Some(ModuleImage {
            namespace: accessor.namespace.clone(),
            source_digest,
            entities,
            accessor: accessor_def,
            imports: self.imports.into_iter().collect(),
        })
    }

    fn single_accessor(
        &mut self,
        decls: Vec<AccessorDecl>,
        symbols: &BTreeSet<String>,
    ) -> Option<AccessorDecl> {
        let mut decls = decls.into_iter();
        let Some(first) = decls.next() else {
            self.diags
                .error(Location::unit(), "unit declares no accessor");
            return None;
        };
        for extra in decls {
            self.diags.error(
                extra.location.clone(),
                format!(
                    "unit declares more than one accessor (`{}` and `{}`)",
                    first.ident, extra.ident
                ),
            );
        }
        if symbols.contains(&first.ident) {
            self.diags.error(
                first.location.clone(),
                format!("duplicate symbol `{}`", first.ident),
            );
        }

        Some(first)
    }

    fn import(&mut self, lib: &str, sym: &str, kind: ExportKind, location: &Location) -> bool {
        let Some(library) = self.references.get(lib) else {
            self.diags
                .error(location.clone(), format!("unresolved library `{lib}`"));
            return false;
        };
        let Some(export) = library.find(sym) else {
            self.diags.error(
                location.clone(),
                format!("library `{lib}` does not export `{sym}`"),
            );
            return false;
        };
        if export.kind != kind {
            self.diags.error(
                location.clone(),
                format!("`{lib}::{sym}` is a {:?} export, expected {kind:?}", export.kind),
            );
            return false;
        }

        self.imports.insert(Import {
            library: lib.to_string(),
            symbol: sym.to_string(),
            version: library.version,
        });

        true
    }

    fn lower_entity(&mut self, decl: &EntityDecl, namespace: Option<&str>) -> EntityDef {
        if let Some(namespace) = namespace
            && namespace != decl.namespace
        {
            self.diags.error(
                decl.location.clone(),
                format!(
                    "entity `{}` is in namespace `{}` but the accessor is in `{namespace}`",
                    decl.ident, decl.namespace
                ),
            );
        }
        if decl.members.is_empty() {
            self.diags.warning(
                decl.location.clone(),
                format!("entity `{}` declares no members", decl.ident),
            );
        }

        let mut fields = Vec::new();
        let mut relations = Vec::new();
        for member in &decl.members {
            match &member.marker {
                MemberMarker::Column { name } => {
                    let resolved = self.resolve_scalar(&member.ty, &member.location);
                    if let Some((scalar, nullable)) = resolved {
                        fields.push(FieldDef {
                            member: member.ident.clone(),
                            column: name.clone(),
                            scalar,
                            nullable,
                        });
                    }
                }
                MemberMarker::Relation {
                    target,
                    cardinality,
                } => {
                    if let Some(relation) = self.resolve_relation(member, target, cardinality) {
                        relations.push(relation);
                    }
                }
                MemberMarker::Unmarked => self.diags.error(
                    member.location.clone(),
                    format!(
                        "member `{}` has neither a column nor a relation marker",
                        member.ident
                    ),
                ),
                MemberMarker::Conflicting => self.diags.error(
                    member.location.clone(),
                    format!("member `{}` carries more than one marker", member.ident),
                ),
            }
        }

        EntityDef {
            name: decl.name.clone(),
            symbol: decl.ident.clone(),
            fields,
            relations,
        }
    }

    fn resolve_scalar(&mut self, ty: &Type, location: &Location) -> Option<(ScalarType, bool)> {
        match shape(ty) {
            Some(Shape::Option(inner)) => match shape(inner) {
                Some(Shape::Option(_)) => {
                    self.diags
                        .error(location.clone(), "nested `Option` is not supported");
                    None
                }
                _ => self
                    .resolve_scalar(inner, location)
                    .map(|(scalar, _)| (scalar, true)),
            },
            Some(Shape::Extern { lib, sym, args }) if args.is_empty() => {
                if !self.import(&lib, &sym, ExportKind::Scalar, location) {
                    return None;
                }
                let scalar = ScalarType::from_symbol(&sym);
                if scalar.is_none() {
                    self.diags
                        .error(location.clone(), format!("`{sym}` is not a known scalar"));
                }

                scalar.map(|scalar| (scalar, false))
            }
            Some(Shape::Local(ident)) if self.entities.contains_key(&ident) => {
                self.diags.error(
                    location.clone(),
                    format!("`{ident}` is an entity; reference it through a relation marker"),
                );
                None
            }
            Some(Shape::Local(ident)) => {
                self.diags
                    .error(location.clone(), format!("unresolved type `{ident}`"));
                None
            }
            _ => {
                self.diags
                    .error(location.clone(), "unsupported member type");
                None
            }
        }
    }

    fn resolve_relation(
        &mut self,
        member: &MemberDecl,
        target: &str,
        cardinality: &str,
    ) -> Option<RelationDef> {
        let location = &member.location;

        let (wrapper, deferred) = match shape(&member.ty) {
            Some(Shape::Extern { lib, sym, args }) if sym == LAZY && args.len() == 1 => {
                if !self.import(&lib, &sym, ExportKind::Wrapper, location) {
                    return None;
                }
                (shape(args[0]), true)
            }
            other => (other, false),
        };

        let Some(Shape::Extern { lib, sym, args }) = wrapper else {
            self.diags.error(
                location.clone(),
                format!("relation `{}` must use `{REF}` or `{REF_LIST}`", member.ident),
            );
            return None;
        };
        let resolved = match sym.as_str() {
            REF => Cardinality::One,
            REF_LIST => Cardinality::Many,
            _ => {
                self.diags.error(
                    location.clone(),
                    format!("relation `{}` must use `{REF}` or `{REF_LIST}`", member.ident),
                );
                return None;
            }
        };
        if !self.import(&lib, &sym, ExportKind::Wrapper, location) {
            return None;
        }

        if resolved.to_string() != cardinality {
            self.diags.error(
                location.clone(),
                format!(
                    "relation `{}` declares cardinality `{cardinality}` but its type is `{sym}`",
                    member.ident
                ),
            );
        }

        let target_ident = match args.as_slice() {
            [arg] => match shape(arg) {
                Some(Shape::Local(ident)) => ident,
                _ => String::new(),
            },
            _ => String::new(),
        };
        let Some(logical) = self.entities.get(&target_ident).cloned() else {
            self.diags.error(
                location.clone(),
                format!("relation `{}` targets an unknown entity", member.ident),
            );
            return None;
        };
        if logical != target {
            self.diags.error(
                location.clone(),
                format!(
                    "relation `{}` declares target `{target}` but its type refers to `{logical}`",
                    member.ident
                ),
            );
        }

        Some(RelationDef {
            member: member.ident.clone(),
            target: logical,
            cardinality: resolved,
            deferred,
        })
    }

    fn lower_accessor(
        &mut self,
        decl: &AccessorDecl,
        entities: &[EntityDef],
        constructors: Vec<ConstructorDef>,
    ) -> AccessorDef {
        let mut sets = Vec::new();
        let mut exposed = BTreeSet::new();

        for member in &decl.members {
            if !matches!(member.marker, MemberMarker::Unmarked) {
                self.diags.warning(
                    member.location.clone(),
                    format!("marker on accessor member `{}` is ignored", member.ident),
                );
            }

            let entity = match shape(&member.ty) {
                Some(Shape::Extern { lib, sym, args }) if sym == ENTITY_SET && args.len() == 1 => {
                    if !self.import(&lib, &sym, ExportKind::Wrapper, &member.location) {
                        continue;
                    }
                    match shape(args[0]) {
                        Some(Shape::Local(ident)) => self.entities.get(&ident).cloned(),
                        _ => None,
                    }
                }
                _ => {
                    self.diags.error(
                        member.location.clone(),
                        format!("accessor member `{}` must be an `{ENTITY_SET}`", member.ident),
                    );
                    continue;
                }
            };

            let Some(entity) = entity else {
                self.diags.error(
                    member.location.clone(),
                    format!("accessor member `{}` refers to an unknown entity", member.ident),
                );
                continue;
            };
            if !exposed.insert(entity.clone()) {
                self.diags.error(
                    member.location.clone(),
                    format!("entity `{entity}` is exposed more than once"),
                );
                continue;
            }

            sets.push(SetDef {
                member: member.ident.clone(),
                entity,
            });
        }

        for entity in entities {
            if !exposed.contains(&entity.name) {
                self.diags.warning(
                    decl.location.clone(),
                    format!("entity `{}` has no collection on the accessor", entity.name),
                );
            }
        }

        AccessorDef {
            symbol: decl.ident.clone(),
            sets,
            constructors,
        }
    }

    fn lower_impls(
        &mut self,
        accessor: &AccessorDecl,
        impls: Vec<ImplDecl>,
    ) -> Vec<ConstructorDef> {
        let mut constructors: Vec<ConstructorDef> = Vec::new();

        for decl in impls {
            if decl.self_ty != accessor.ident {
                self.diags.error(
                    decl.location.clone(),
                    format!(
                        "impl for `{}`: only the accessor may have an impl block",
                        decl.self_ty
                    ),
                );
                continue;
            }

            let mut consts = BTreeMap::new();
            for c in &decl.consts {
                match &c.value {
                    Some(value) => {
                        consts.insert(c.ident.clone(), value.clone());
                    }
                    None => self.diags.error(
                        c.location.clone(),
                        format!("constant `{}` must be a `&str` literal", c.ident),
                    ),
                }
            }

            for f in &decl.fns {
                let Some(ctor) = self.lower_constructor(f, &consts) else {
                    continue;
                };
                if constructors.iter().any(|c| c.name == ctor.name) {
                    self.diags.error(
                        f.location.clone(),
                        format!("duplicate constructor `{}`", ctor.name),
                    );
                    continue;
                }
                constructors.push(ctor);
            }
        }

        if constructors.is_empty() {
            self.diags.warning(
                accessor.location.clone(),
                format!("accessor `{}` has no constructors", accessor.ident),
            );
        }

        constructors
    }

    fn lower_constructor(
        &mut self,
        f: &FnDecl,
        consts: &BTreeMap<String, String>,
    ) -> Option<ConstructorDef> {
        if f.has_receiver || !f.returns_self {
            self.diags.error(
                f.location.clone(),
                format!("`{}` must be a constructor returning `Self`", f.ident),
            );
            return None;
        }

        let mut params = Vec::with_capacity(f.params.len());
        for (name, ty) in &f.params {
            if !is_str_ref(ty) {
                self.diags.error(
                    f.location.clone(),
                    format!("constructor parameter `{name}` must be `&str`"),
                );
                return None;
            }
            params.push(name.clone());
        }

        let unsupported = |diags: &mut Diagnostics| {
            diags.error(
                f.location.clone(),
                format!(
                    "constructor `{}` must consist of a single `Self::{CONNECT}(..)` call",
                    f.ident
                ),
            );
        };

        let call = match f.body.stmts.as_slice() {
            [Stmt::Expr(Expr::Call(call), None)] => call,
            _ => {
                unsupported(&mut *self.diags);
                return None;
            }
        };
        let callee_ok = matches!(call.func.as_ref(), Expr::Path(p)
            if p.qself.is_none()
                && p.path.segments.len() == 2
                && p.path.segments[0].ident == "Self"
                && p.path.segments[1].ident == CONNECT);
        if !callee_ok || call.args.len() != 1 {
            unsupported(&mut *self.diags);
            return None;
        }
        if !self.import(RUNTIME_LIB, CONNECT, ExportKind::Intrinsic, &f.location) {
            return None;
        }

        let connection = match &call.args[0] {
            Expr::Lit(lit) => match &lit.lit {
                syn::Lit::Str(s) => Some(ConnectionArg::Literal(s.value())),
                _ => None,
            },
            Expr::Path(p) if p.qself.is_none() => {
                let segments: Vec<String> = p
                    .path
                    .segments
                    .iter()
                    .map(|s| s.ident.to_string())
                    .collect();
                match segments.as_slice() {
                    [param] => params
                        .iter()
                        .position(|name| name == param)
                        .map(ConnectionArg::Param),
                    [owner, name] if owner == "Self" => {
                        consts.get(name).cloned().map(ConnectionArg::Literal)
                    }
                    _ => None,
                }
            }
            _ => None,
        };

        let Some(connection) = connection else {
            self.diags.error(
                f.location.clone(),
                format!(
                    "constructor `{}` passes an unresolved connection argument",
                    f.ident
                ),
            );
            return None;
        };

        Some(ConstructorDef {
            name: f.ident.clone(),
            params,
            connection,
        })
    }
}
