use crate::plan::{EntityPlan, NamePlan, PropertyPlan, RelationPlan};
use morph_schema::{
    prelude::*,
    vocab::{
        CONNECT, CONNECTION_CONST, CTOR_DEFAULT, CTOR_WITH_CONNECTION, ENTITY_SET, LAZY, PROXY_LIB,
        REF, REF_LIST, RUNTIME_LIB,
    },
};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

const HEADER: &str = "// @generated by morph-build. Do not edit.";

///
/// SourceWriter
///
/// Line-oriented assembly of token fragments so that every member lands on
/// its own line and compiler diagnostics point somewhere useful.
///

struct SourceWriter {
    lines: Vec<String>,
}

impl SourceWriter {
    fn new() -> Self {
        Self {
            lines: vec![HEADER.to_string()],
        }
    }

    fn line(&mut self, indent: usize, tokens: impl ToString) {
        self.lines
            .push(format!("{}{}", "    ".repeat(indent), tokens.to_string()));
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');

        text
    }
}

// scalar members resolve against the runtime library
fn scalar_type(ty: ScalarType, nullable: bool) -> TokenStream {
    let lib = format_ident!("{}", RUNTIME_LIB);
    let sym = format_ident!("{}", ty.symbol());
    let scalar = quote!(::#lib::#sym);

    if nullable {
        quote!(Option<#scalar>)
    } else {
        scalar
    }
}

fn relation_type(relation: &RelationPlan, lazy: bool) -> TokenStream {
    let lib = format_ident!("{}", RUNTIME_LIB);
    let target = format_ident!("{}", relation.target_ident);
    let wrapper = match relation.cardinality {
        Cardinality::One => format_ident!("{}", REF),
        Cardinality::Many => format_ident!("{}", REF_LIST),
    };
    let reference = quote!(::#lib::#wrapper<#target>);

    if lazy {
        let proxy = format_ident!("{}", PROXY_LIB);
        let lazy = format_ident!("{}", LAZY);
        quote!(::#proxy::#lazy<#reference>)
    } else {
        reference
    }
}

fn property_lines(out: &mut SourceWriter, property: &PropertyPlan) {
    let column = &property.column;
    let member = format_ident!("{}", property.member);
    let ty = scalar_type(property.ty, property.nullable);

    out.line(1, quote!(#[morph::column(name = #column)]));
    out.line(1, quote!(pub #member: #ty,));
}

fn relation_lines(out: &mut SourceWriter, relation: &RelationPlan, lazy: bool) {
    let target = &relation.target_logical;
    let cardinality = relation.cardinality.to_string();
    let member = format_ident!("{}", relation.member);
    let ty = relation_type(relation, lazy);

    out.line(
        1,
        quote!(#[morph::relation(target = #target, cardinality = #cardinality)]),
    );
    out.line(1, quote!(pub #member: #ty,));
}

/// Emit the source for one entity type.
pub(crate) fn entity_source(entity: &EntityPlan, options: &GenerationOptions) -> String {
    let name = &entity.logical;
    let namespace = &options.root_namespace;
    let ident = format_ident!("{}", entity.ident);

    let mut out = SourceWriter::new();
    out.line(0, quote!(#[morph::entity(name = #name, namespace = #namespace)]));
    out.line(0, quote!(pub struct #ident));
    out.line(0, "{");
    for property in &entity.properties {
        property_lines(&mut out, property);
    }
    for relation in &entity.relations {
        relation_lines(&mut out, relation, options.lazy_materialization);
    }
    out.line(0, "}");

    out.finish()
}

/// Emit the accessor source: one collection per entity plus constructors.
pub(crate) fn accessor_source(plan: &NamePlan, options: &GenerationOptions) -> String {
    let namespace = &options.root_namespace;
    let connection = &options.connection;
    let ident = format_ident!("{}", plan.accessor);
    let lib = format_ident!("{}", RUNTIME_LIB);
    let set = format_ident!("{}", ENTITY_SET);
    let connect = format_ident!("{}", CONNECT);
    let conn_const = format_ident!("{}", CONNECTION_CONST);
    let ctor_default = format_ident!("{}", CTOR_DEFAULT);
    let ctor_with = format_ident!("{}", CTOR_WITH_CONNECTION);

    let mut out = SourceWriter::new();
    out.line(0, quote!(#[morph::accessor(namespace = #namespace)]));
    out.line(0, quote!(pub struct #ident));
    out.line(0, "{");
    for entity in &plan.entities {
        let member = format_ident!("{}", entity.set_member);
        let target = format_ident!("{}", entity.ident);
        out.line(1, quote!(pub #member: ::#lib::#set<#target>,));
    }
    out.line(0, "}");
    out.blank();

    out.line(0, quote!(impl #ident));
    out.line(0, "{");
    out.line(1, quote!(pub const #conn_const: &'static str = #connection;));
    out.blank();
    out.line(
        1,
        quote!(pub fn #ctor_default() -> Self { Self::#connect(Self::#conn_const) }),
    );
    out.blank();
    out.line(
        1,
        quote!(pub fn #ctor_with(connection: &str) -> Self { Self::#connect(connection) }),
    );
    out.line(0, "}");

    out.finish()
}
