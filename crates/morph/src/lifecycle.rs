//! Cycle orchestration: residency check, generate, compile, load,
//! instantiate, and the matching teardown.

use crate::error::Error;
use morph_build::generate;
use morph_compile::{
    CompilationUnit, CompileDiagnosticError, CompiledModule, Diagnostic, Location, compile,
    spawn_compile,
};
use morph_core::{
    ContextKind, ContextStatus, DynamicAccessFacade, Host, InstanceHandle, LoadedTypes,
    ModuleContext,
};
use morph_schema::{
    node::SchemaDescriptor, options::GenerationOptions, residency::check_residency,
};
use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info, warn};

/// Compiled modules kept by default.
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

///
/// Cycle
///
/// One generation of the access layer: its context, the accessor instance
/// and the facade over it. Clones share the same context.
///

#[derive(Clone)]
pub struct Cycle {
    number: u64,
    fingerprint: u64,
    context: Arc<ModuleContext>,
    types: LoadedTypes,
    facade: DynamicAccessFacade,
}

impl Cycle {
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }

    /// Compile-cache key of the unit this cycle was built from.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    #[must_use]
    pub fn context(&self) -> &ModuleContext {
        &self.context
    }

    #[must_use]
    pub const fn types(&self) -> &LoadedTypes {
        &self.types
    }

    #[must_use]
    pub const fn facade(&self) -> &DynamicAccessFacade {
        &self.facade
    }

    #[must_use]
    pub const fn instance(&self) -> &InstanceHandle {
        self.facade.instance()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.context.status() == ContextStatus::Loaded
    }
}

impl fmt::Debug for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cycle")
            .field("number", &self.number)
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint))
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

///
/// CompileCache
///
/// Compiled modules keyed by unit fingerprint, oldest evicted first.
/// Only modules without error diagnostics are stored.
///

#[derive(Debug, Default)]
struct CompileCache {
    capacity: usize,
    modules: BTreeMap<u64, CompiledModule>,
    order: VecDeque<u64>,
    hits: u64,
    misses: u64,
}

impl CompileCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    fn get(&mut self, key: u64) -> Option<CompiledModule> {
        let module = self.modules.get(&key).cloned();
        if module.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }

        module
    }

    fn insert(&mut self, key: u64, module: &CompiledModule) {
        if self.capacity == 0 || module.has_errors() || self.modules.contains_key(&key) {
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.modules.remove(&oldest);
            }
        }

        self.order.push_back(key);
        self.modules.insert(key, module.clone());
    }
}

///
/// CacheStats
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

///
/// LifecycleManager
///
/// Owns at most one active cycle. Starting a cycle while another is active
/// ends the previous one once the replacement module has compiled.
///

pub struct LifecycleManager {
    host: Host,
    kind: ContextKind,
    compile_timeout: Option<Duration>,
    cache: CompileCache,
    active: Option<Cycle>,
    cycles: u64,
}

impl LifecycleManager {
    /// Manager creating reclaimable contexts on `host`.
    #[must_use]
    pub fn new(host: Host) -> Self {
        Self {
            host,
            kind: ContextKind::Reclaimable,
            compile_timeout: None,
            cache: CompileCache::new(DEFAULT_CACHE_CAPACITY),
            active: None,
            cycles: 0,
        }
    }

    /// Kind of context created for each cycle.
    #[must_use]
    pub fn with_context_kind(mut self, kind: ContextKind) -> Self {
        self.kind = kind;
        self
    }

    /// Compile on a worker thread and abandon it after `timeout`.
    #[must_use]
    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = Some(timeout);
        self
    }

    /// Number of compiled modules to keep; zero disables caching.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = CompileCache::new(capacity);
        self
    }

    #[must_use]
    pub const fn host(&self) -> &Host {
        &self.host
    }

    #[must_use]
    pub const fn context_kind(&self) -> ContextKind {
        self.kind
    }

    #[must_use]
    pub const fn active(&self) -> Option<&Cycle> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.modules.len(),
            hits: self.cache.hits,
            misses: self.cache.misses,
        }
    }

    /// Run a full cycle for `schema`. On failure nothing created by this
    /// call survives, and the error carries the failing stage's kind.
    ///
    /// An active cycle survives failures up to and including compilation;
    /// it is ended just before the new module is loaded.
    pub fn start_cycle(
        &mut self,
        schema: &SchemaDescriptor,
        options: &GenerationOptions,
    ) -> Result<Cycle, Error> {
        check_residency(options, self.kind)?;

        let sources = generate(schema, options)?;
        let unit = CompilationUnit::new(sources, self.host.references());
        let fingerprint = unit.fingerprint();
        let module = self.compile(unit, fingerprint)?;

        if let Some(previous) = self.active.take() {
            debug!(cycle = previous.number, "replacing active cycle");
            if let Err(err) = Self::release(&previous) {
                self.active = Some(previous);
                return Err(err);
            }
        }

        self.cycles += 1;
        let number = self.cycles;
        let context = Arc::new(
            self.host
                .create_context(format!("cycle-{number}"), self.kind),
        );

        let (types, instance) = match Self::materialize(&context, &module) {
            Ok(parts) => parts,
            Err(err) => {
                Self::discard(&context);
                warn!(cycle = number, kind = %err.kind(), "cycle failed: {err}");
                return Err(err);
            }
        };

        let cycle = Cycle {
            number,
            fingerprint,
            context,
            types,
            facade: DynamicAccessFacade::new(instance),
        };
        self.active = Some(cycle.clone());

        info!(
            cycle = number,
            entities = cycle.types.entities().len(),
            live_modules = self.host.live_modules(),
            "cycle started"
        );

        Ok(cycle)
    }

    /// End `cycle`. Ending a cycle that has already ended is a no-op.
    pub fn end_cycle(&mut self, cycle: &Cycle) -> Result<(), Error> {
        if self
            .active
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(&active.context, &cycle.context))
        {
            self.active = None;
        }

        Self::release(cycle)
    }

    /// End the active cycle, if any.
    pub fn end_active(&mut self) -> Result<(), Error> {
        match self.active.take() {
            Some(cycle) => Self::release(&cycle),
            None => Ok(()),
        }
    }

    fn release(cycle: &Cycle) -> Result<(), Error> {
        if cycle.context.status() == ContextStatus::Unloaded {
            return Ok(());
        }

        cycle.context.unload()?;
        info!(cycle = cycle.number, "cycle ended");

        Ok(())
    }

    fn compile(
        &mut self,
        unit: CompilationUnit,
        fingerprint: u64,
    ) -> Result<CompiledModule, CompileDiagnosticError> {
        if let Some(module) = self.cache.get(fingerprint) {
            debug!(fingerprint = %format_args!("{fingerprint:016x}"), "compile cache hit");
            return Ok(module);
        }

        let module = match self.compile_timeout {
            None => compile(&unit),
            Some(timeout) => spawn_compile(unit)
                .join_timeout(timeout)
                .ok_or_else(|| CompileDiagnosticError {
                    diagnostics: vec![Diagnostic::error(
                        Location::unit(),
                        format!("compilation abandoned after {timeout:?}"),
                    )],
                })?,
        };

        self.cache.insert(fingerprint, &module);

        module.into_result()
    }

    fn materialize(
        context: &ModuleContext,
        module: &CompiledModule,
    ) -> Result<(LoadedTypes, InstanceHandle), Error> {
        let types = context.load(module)?;
        let instance = context.instantiate(types.accessor(), &[])?;

        Ok((types, instance))
    }

    // Release a context a failed cycle created.
    fn discard(context: &ModuleContext) {
        if !context.kind().is_reclaimable() {
            return;
        }
        if let Err(err) = context.unload() {
            warn!(context = %context.id(), "cleanup after failed cycle: {err}");
        }
    }
}

impl fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("kind", &self.kind)
            .field("active", &self.active)
            .field("cycles", &self.cycles)
            .field("cache", &self.cache_stats())
            .finish_non_exhaustive()
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        if !self.kind.is_reclaimable() {
            return;
        }
        if let Err(err) = self.end_active() {
            warn!("active cycle not released on drop: {err}");
        }
    }
}
