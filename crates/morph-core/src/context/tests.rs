use super::*;
use crate::{
    error::AccessError,
    facade::DynamicAccessFacade,
    source::{MemoryConnector, MemoryStore},
    value::Record,
};
use morph_build::generate;
use morph_compile::{CompilationUnit, compile};
use morph_schema::prelude::*;
use std::{sync::Barrier, thread};

fn schema() -> SchemaDescriptor {
    SchemaDescriptor::new()
        .entity(
            EntityDescriptor::new("Customer")
                .property(PropertyDescriptor::new("id", "int64"))
                .property(PropertyDescriptor::new("name", "text")),
        )
        .entity(
            EntityDescriptor::new("Order")
                .property(PropertyDescriptor::new("id", "int64"))
                .property(PropertyDescriptor::new("customerId", "int64"))
                .relationship(RelationshipDescriptor::one("Customer")),
        )
}

fn module(host: &Host, options: &GenerationOptions) -> CompiledModule {
    let sources = generate(&schema(), options).expect("generate");

    compile(&CompilationUnit::new(sources, host.references()))
}

fn host() -> Host {
    Host::new(Arc::new(MemoryConnector::new()))
}

fn loaded(host: &Host) -> (ModuleContext, LoadedTypes) {
    let ctx = host.create_context("cycle", ContextKind::Reclaimable);
    let types = ctx
        .load(&module(host, &GenerationOptions::new()))
        .expect("load");

    (ctx, types)
}

#[test]
fn load_returns_entities_then_accessor() {
    let host = host();
    let (ctx, types) = loaded(&host);

    let names: Vec<_> = types.iter().map(TypeHandle::name).collect();
    assert_eq!(names, vec!["Customer", "Order", "DataContext"]);
    assert!(types.accessor().is_accessor());
    assert_eq!(ctx.status(), ContextStatus::Loaded);
    assert_eq!(ctx.module_name().as_deref(), Some("morph_gen::DataContext"));
    assert_eq!(host.live_modules(), 1);
}

#[test]
fn loading_twice_fails() {
    let host = host();
    let (ctx, _) = loaded(&host);

    let err = ctx
        .load(&module(&host, &GenerationOptions::new()))
        .expect_err("second load");
    assert!(matches!(err, Error::Load(LoadError::AlreadyLoaded { .. })), "{err}");
}

#[test]
fn modules_with_errors_are_not_loaded() {
    let host = host();
    let ctx = host.create_context("cycle", ContextKind::Reclaimable);

    // compiled against a reference set lacking the runtime library
    let sources = generate(&schema(), &GenerationOptions::new()).expect("generate");
    let broken = compile(&CompilationUnit::new(sources, Default::default()));

    let err = ctx.load(&broken).expect_err("errors present");
    assert!(matches!(err, Error::Load(LoadError::Diagnostics { .. })), "{err}");
    assert_eq!(ctx.status(), ContextStatus::Empty);
}

#[test]
fn missing_resident_library_names_the_symbol() {
    let full = host();
    let compiled = module(&full, &GenerationOptions::new());

    let bare = Host::bare(Arc::new(MemoryConnector::new()));
    let ctx = bare.create_context("cycle", ContextKind::Reclaimable);

    let err = ctx.load(&compiled).expect_err("no runtime");
    let Error::Load(LoadError::MissingDependency { library, symbol }) = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(library, "morph_runtime");
    assert!(!symbol.is_empty());
    assert_eq!(bare.live_modules(), 0);
}

#[test]
fn lazy_module_conflicts_with_reclaimable_context() {
    let host = host();
    let lazy = module(&host, &GenerationOptions::new().with_lazy_materialization(true));

    let reclaimable = host.create_context("cycle", ContextKind::Reclaimable);
    let err = reclaimable.load(&lazy).expect_err("pinning import");
    assert!(matches!(err, Error::ConfigurationConflict(_)), "{err}");

    let resident = host.create_context("resident", ContextKind::Resident);
    resident.load(&lazy).expect("resident context may pin");
}

#[test]
fn instantiate_selects_constructor_by_arguments() {
    let host = host();
    let (ctx, types) = loaded(&host);

    let default = ctx.instantiate(types.accessor(), &[]).expect("new");
    assert_eq!(default.constructor().as_deref(), Some("new"));

    let explicit = ctx
        .instantiate(types.accessor(), &[Value::from("memory://other")])
        .expect("with_connection");
    assert_eq!(explicit.constructor().as_deref(), Some("with_connection"));
    assert_eq!(ctx.instance_count(), 2);
}

#[test]
fn instantiate_rejects_entities_and_bad_arguments() {
    let host = host();
    let (ctx, types) = loaded(&host);

    let err = ctx
        .instantiate(&types.entities()[0], &[])
        .expect_err("entity is not the accessor");
    assert!(matches!(err, Error::Construction(ConstructionError::NotAccessor(_))), "{err}");

    let err = ctx
        .instantiate(types.accessor(), &[Value::Int(1)])
        .expect_err("no int constructor");
    assert!(
        matches!(
            err,
            Error::Construction(ConstructionError::NoMatchingConstructor { arity: 1, .. })
        ),
        "{err}"
    );
}

#[test]
fn connector_failure_is_a_construction_error() {
    let host = Host::new(Arc::new(MemoryConnector::strict()));
    let (ctx, types) = loaded(&host);

    let err = ctx.instantiate(types.accessor(), &[]).expect_err("strict connector");
    assert!(matches!(err, Error::Construction(ConstructionError::Connect { .. })), "{err}");
}

#[test]
fn unload_invalidates_instances_and_releases_module() {
    let host = host();
    let (ctx, types) = loaded(&host);
    let instance = ctx.instantiate(types.accessor(), &[]).expect("new");

    ctx.unload().expect("unload");

    assert_eq!(ctx.status(), ContextStatus::Unloaded);
    assert!(!instance.is_live());
    assert_eq!(host.live_modules(), 0);

    let err = ctx.instantiate(types.accessor(), &[]).expect_err("stale");
    assert!(matches!(err, Error::StaleContext(_)), "{err}");
    let err = ctx.unload().expect_err("already unloaded");
    assert!(matches!(err, Error::StaleContext(_)), "{err}");
    let err = ctx
        .load(&module(&host, &GenerationOptions::new()))
        .expect_err("terminal state");
    assert!(matches!(err, Error::StaleContext(_)), "{err}");
}

#[test]
fn empty_context_unloads_directly() {
    let host = host();
    let ctx = host.create_context("cycle", ContextKind::Reclaimable);

    ctx.unload().expect("unload");
    assert_eq!(ctx.status(), ContextStatus::Unloaded);
}

#[test]
fn resident_context_cannot_unload() {
    let host = host();
    let ctx = host.create_context("resident", ContextKind::Resident);

    let err = ctx.unload().expect_err("resident");
    assert!(matches!(err, Error::ConfigurationConflict(_)), "{err}");
    assert_eq!(ctx.status(), ContextStatus::Empty);
}

#[test]
fn concurrent_instantiates_race_one_unload() {
    const THREADS: usize = 8;

    let host = host();
    let (ctx, types) = loaded(&host);
    let barrier = Barrier::new(THREADS + 1);

    let results: Vec<Result<InstanceHandle, Error>> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    ctx.instantiate(types.accessor(), &[])
                })
            })
            .collect();

        barrier.wait();
        ctx.unload().expect("unload");

        workers
            .into_iter()
            .map(|w| w.join().expect("worker panicked"))
            .collect()
    });

    for result in results {
        match result {
            Ok(instance) => assert!(!instance.is_live(), "instance outlived its context"),
            Err(err) => assert!(matches!(err, Error::StaleContext(_)), "{err}"),
        }
    }
    assert_eq!(ctx.status(), ContextStatus::Unloaded);
    assert_eq!(host.live_modules(), 0);
}

//
// FACADE
//

fn facade(ctx: &ModuleContext, types: &LoadedTypes) -> DynamicAccessFacade {
    DynamicAccessFacade::new(ctx.instantiate(types.accessor(), &[]).expect("new"))
}

#[test]
fn facade_lists_entities_in_schema_order() {
    let host = host();
    let (ctx, types) = loaded(&host);
    let facade = facade(&ctx, &types);

    let names: Vec<_> = facade
        .list_entity_types()
        .expect("list")
        .iter()
        .map(|h| h.name().to_string())
        .collect();
    assert_eq!(names, vec!["Customer", "Order"]);
    assert_eq!(facade.count("Customer").expect("count"), 0);
}

#[test]
fn unknown_names_and_foreign_handles_are_rejected() {
    let host = host();
    let (ctx, types) = loaded(&host);
    let (other, other_types) = loaded(&host);
    let facade = facade(&ctx, &types);

    let err = facade.query_by_name("Invoice").expect_err("unknown");
    assert!(matches!(err, Error::UnknownEntity(UnknownEntityError::NoSuchEntity(_))), "{err}");

    let err = facade
        .query_by_type(&other_types.entities()[0])
        .expect_err("foreign handle");
    assert!(
        matches!(err, Error::UnknownEntity(UnknownEntityError::ForeignHandle { .. })),
        "{err}"
    );
    drop(other);
}

#[test]
fn cursors_evaluate_lazily() {
    let store = Arc::new(MemoryStore::new());
    let host = Host::new(Arc::new(MemoryConnector::new().with_store("", Arc::clone(&store))));
    let (ctx, types) = loaded(&host);
    let facade = facade(&ctx, &types);

    let cursor = facade.query_by_type(&types.entities()[0]).expect("query");
    assert!(!cursor.is_evaluated());

    store.insert(
        "Customer",
        Record::from([
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::from("Ada")),
        ]),
    );

    let rows: Vec<_> = cursor.collect::<Result<_, _>>().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::from("Ada")));

    // every query call evaluates afresh
    store.insert(
        "Customer",
        Record::from([
            ("id".to_string(), Value::Int(2)),
            ("name".to_string(), Value::from("Bo")),
        ]),
    );
    assert_eq!(facade.count("Customer").expect("count"), 2);
}

#[test]
fn count_accepts_a_cursor() {
    let store = Arc::new(MemoryStore::new());
    store.insert(
        "Order",
        Record::from([
            ("id".to_string(), Value::Int(1)),
            ("customerId".to_string(), Value::Int(1)),
            ("customer".to_string(), Value::Int(1)),
        ]),
    );
    let host = Host::new(Arc::new(MemoryConnector::new().with_store("", store)));
    let (ctx, types) = loaded(&host);
    let facade = facade(&ctx, &types);

    let cursor = facade.query_by_name("Order").expect("query");
    assert_eq!(facade.count(cursor).expect("count"), 1);
}

#[test]
fn cursor_from_unloaded_context_is_stale() {
    let host = host();
    let (ctx, types) = loaded(&host);
    let facade = facade(&ctx, &types);
    let mut cursor = facade.query_by_name("Order").expect("query");

    ctx.unload().expect("unload");

    let err = cursor.next().expect("one item").expect_err("stale");
    assert!(matches!(err, Error::StaleContext(_)), "{err}");
    assert!(cursor.next().is_none());

    let err = facade.list_entity_types().expect_err("stale facade");
    assert!(matches!(err, Error::StaleContext(_)), "{err}");
}

#[test]
fn bad_rows_surface_as_access_errors() {
    let store = Arc::new(MemoryStore::new());
    store.insert("Customer", Record::from([("name".to_string(), Value::from("no id"))]));
    let host = Host::new(Arc::new(MemoryConnector::new().with_store("", store)));
    let (ctx, types) = loaded(&host);
    let facade = facade(&ctx, &types);

    let err = facade.count("Customer").expect_err("missing id");
    assert!(matches!(err, Error::Access(AccessError::MissingValue { .. })), "{err}");
}
