use super::*;
use morph_build::{GeneratedSourceSet, SourceFile, generate};
use morph_schema::prelude::*;
use std::time::Duration;

fn customer_order() -> SchemaDescriptor {
    SchemaDescriptor::new()
        .entity(
            EntityDescriptor::new("Customer")
                .property(PropertyDescriptor::new("id", "int64"))
                .property(PropertyDescriptor::new("name", "text").nullable())
                .relationship(RelationshipDescriptor::many("Order")),
        )
        .entity(
            EntityDescriptor::new("Order")
                .property(PropertyDescriptor::new("id", "int64"))
                .relationship(RelationshipDescriptor::one("Customer")),
        )
}

fn references() -> ReferenceSet {
    ReferenceSet::new()
        .with(LibraryRef::runtime(1))
        .with(LibraryRef::proxy(1))
}

fn unit_for(options: &GenerationOptions) -> CompilationUnit {
    let sources = generate(&customer_order(), options).expect("generate");

    CompilationUnit::new(sources, references())
}

fn unit_from(files: &[(&str, &str)]) -> CompilationUnit {
    let files = files
        .iter()
        .map(|(name, text)| SourceFile::new(*name, *text))
        .collect();

    CompilationUnit::new(GeneratedSourceSet::from_files(files), references())
}

const ACCESSOR: &str = r#"
#[morph::accessor(namespace = "acme")]
pub struct Ctx {
    pub customers: ::morph_runtime::EntitySet<Customer>,
}

impl Ctx {
    pub fn new() -> Self { Self::connect("memory://") }
}
"#;

#[test]
fn generated_sources_compile_cleanly() {
    let module = compile(&unit_for(&GenerationOptions::new().with_namespace("acme::crm")));
    assert!(!module.has_errors(), "{:?}", module.diagnostics());

    let image = image::decode(module.bytes()).expect("decode");
    let names: Vec<_> = image.entities.iter().map(|e| e.name.as_str()).collect();

    assert_eq!(names, vec!["Customer", "Order"]);
    assert_eq!(image.module_name(), "acme::crm::DataContext");
    assert_eq!(image.accessor.sets.len(), 2);

    let ctors: Vec<_> = image
        .accessor
        .constructors
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(ctors, vec!["new", "with_connection"]);
    assert!(image.imports.iter().all(|i| i.library == "morph_runtime"));
}

#[test]
fn nullable_and_relations_are_lowered() {
    let module = compile(&unit_for(&GenerationOptions::new()));
    let image = image::decode(module.bytes()).expect("decode");
    let customer = image.entity("Customer").expect("customer");

    let name = customer.fields.iter().find(|f| f.column == "name").expect("name");
    assert!(name.nullable);
    assert_eq!(customer.relations[0].target, "Order");
    assert_eq!(customer.relations[0].cardinality, Cardinality::Many);
    assert!(!customer.relations[0].deferred);
}

#[test]
fn compilation_is_deterministic() {
    let a = compile(&unit_for(&GenerationOptions::new()));
    let b = compile(&unit_for(&GenerationOptions::new()));

    assert_eq!(a.bytes(), b.bytes());
}

#[test]
fn lazy_relations_import_the_proxy_library() {
    let module = compile(&unit_for(
        &GenerationOptions::new().with_lazy_materialization(true),
    ));
    let image = image::decode(module.bytes()).expect("decode");

    assert!(image.imports.iter().any(|i| i.library == "morph_proxy"));
    assert!(image.entities.iter().all(|e| e.relations.iter().all(|r| r.deferred)));
}

#[test]
fn connection_constant_is_inlined_into_default_constructor() {
    let options = GenerationOptions::new().with_connection("memory://crm");
    let image = image::decode(compile(&unit_for(&options)).bytes()).expect("decode");

    let ctor = &image.accessor.constructors[0];
    assert_eq!(ctor.connection, image::ConnectionArg::Literal("memory://crm".into()));

    let ctor = &image.accessor.constructors[1];
    assert_eq!(ctor.params, vec!["connection".to_string()]);
    assert_eq!(ctor.connection, image::ConnectionArg::Param(0));
}

#[test]
fn diagnostics_are_collected_across_files() {
    let unit = unit_from(&[
        ("broken.rs", "pub struct {"),
        (
            "customer.rs",
            r#"
#[morph::entity(name = "Customer", namespace = "acme")]
pub struct Customer {
    #[morph::column(name = "id")]
    pub id: ::morph_runtime::Money,
}
"#,
        ),
        ("ctx.rs", ACCESSOR),
    ]);

    let err = compile(&unit).into_result().expect_err("two errors");
    let files: Vec<_> = err.errors().map(|d| d.location.file.as_str()).collect();

    assert!(files.contains(&"broken.rs"), "{err}");
    assert!(files.contains(&"customer.rs"), "{err}");
    assert!(err.to_string().contains("does not export `Money`"), "{err}");
}

#[test]
fn failed_compilation_produces_no_binary() {
    let unit = unit_from(&[("ctx.rs", "pub struct {")]);
    let module = compile(&unit);

    assert!(module.has_errors());
    assert!(module.bytes().is_empty());
}

#[test]
fn missing_accessor_is_a_unit_error() {
    let unit = unit_from(&[(
        "customer.rs",
        r#"
#[morph::entity(name = "Customer", namespace = "acme")]
pub struct Customer {
    #[morph::column(name = "id")]
    pub id: ::morph_runtime::Int64,
}
"#,
    )]);

    let err = compile(&unit).into_result().expect_err("no accessor");
    let diagnostic = err.errors().next().expect("one error");

    assert_eq!(diagnostic.location, Location::unit());
    assert!(diagnostic.message.contains("no accessor"));
}

#[test]
fn unknown_library_is_reported() {
    let sources = generate(&customer_order(), &GenerationOptions::new()).expect("generate");
    let unit = CompilationUnit::new(sources, ReferenceSet::new());

    let err = compile(&unit).into_result().expect_err("no libraries");
    assert!(err.to_string().contains("unresolved library `morph_runtime`"), "{err}");
}

#[test]
fn relation_marker_must_match_type() {
    let unit = unit_from(&[
        (
            "customer.rs",
            r#"
#[morph::entity(name = "Customer", namespace = "acme")]
pub struct Customer {
    #[morph::relation(target = "Customer", cardinality = "many")]
    pub parent: ::morph_runtime::Ref<Customer>,
}
"#,
        ),
        ("ctx.rs", ACCESSOR),
    ]);

    let err = compile(&unit).into_result().expect_err("cardinality mismatch");
    assert!(err.to_string().contains("cardinality `many`"), "{err}");
}

#[test]
fn unexposed_entity_is_a_warning() {
    let unit = unit_from(&[
        (
            "customer.rs",
            r#"
#[morph::entity(name = "Customer", namespace = "acme")]
pub struct Customer {
    #[morph::column(name = "id")]
    pub id: ::morph_runtime::Int64,
}

#[morph::entity(name = "Audit", namespace = "acme")]
pub struct Audit {
    #[morph::column(name = "id")]
    pub id: ::morph_runtime::Int64,
}
"#,
        ),
        ("ctx.rs", ACCESSOR),
    ]);

    let module = compile(&unit);
    assert!(!module.has_errors(), "{:?}", module.diagnostics());
    assert!(module.warnings().any(|w| w.message.contains("Audit")));
}

#[test]
fn cancelled_token_stops_compilation() {
    let token = CancelToken::new();
    token.cancel();

    assert!(compile_cancellable(&unit_for(&GenerationOptions::new()), &token).is_none());
}

#[test]
fn background_compile_delivers_module() {
    let task = spawn_compile(unit_for(&GenerationOptions::new()));
    let module = task
        .join_timeout(Duration::from_secs(30))
        .expect("compile finished");

    assert!(!module.has_errors());
}

#[test]
fn fingerprint_tracks_sources_and_references() {
    let a = unit_for(&GenerationOptions::new());
    let b = unit_for(&GenerationOptions::new().with_connection("memory://other"));
    let c = CompilationUnit::new(a.sources().clone(), ReferenceSet::new());

    assert_eq!(a.fingerprint(), unit_for(&GenerationOptions::new()).fingerprint());
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}
