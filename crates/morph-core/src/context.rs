//! Isolated loading scopes.
//!
//! A context moves through `Empty -> Loaded -> Unloading -> Unloaded`; the
//! last state is terminal. Instantiation shares the read lock, load and
//! unload take the write lock.

use crate::{
    error::{ConstructionError, Error, LoadError, StaleContextError, UnknownEntityError},
    handle::{AccessorInstance, InstanceHandle, LoadedTypes, TypeHandle},
    host::{Host, LiveModule},
    registry::DispatchRegistry,
    value::Value,
};
use derive_more::Display;
use morph_compile::{
    CompiledModule, LibraryRef, ModuleImage,
    image::{self, ConnectionArg, ConstructorDef},
};
use morph_schema::residency::{ConfigurationConflictError, ContextKind};
use std::{
    fmt, mem,
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, info};

///
/// ContextId
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("ctx-{_0}")]
pub struct ContextId(pub(crate) u64);

///
/// ContextStatus
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ContextStatus {
    #[display("empty")]
    Empty,
    #[display("loaded")]
    Loaded,
    #[display("unloading")]
    Unloading,
    #[display("unloaded")]
    Unloaded,
}

enum ContextState {
    Empty,
    Loaded(LoadedModule),
    Unloading,
    Unloaded,
}

impl ContextState {
    const fn status(&self) -> ContextStatus {
        match self {
            Self::Empty => ContextStatus::Empty,
            Self::Loaded(_) => ContextStatus::Loaded,
            Self::Unloading => ContextStatus::Unloading,
            Self::Unloaded => ContextStatus::Unloaded,
        }
    }
}

///
/// LoadedModule
///
/// Everything owned on behalf of one loaded module. Dropping it releases
/// the instances, the dispatch registry and the linked libraries.
///

struct LoadedModule {
    image: ModuleImage,
    registry: Arc<DispatchRegistry>,
    instances: Mutex<Vec<Arc<AccessorInstance>>>,

    // resident libraries this module links against
    _libraries: Vec<Arc<LibraryRef>>,
    _live: LiveModule,
}

///
/// ModuleContext
///

pub struct ModuleContext {
    id: ContextId,
    name: String,
    kind: ContextKind,
    host: Host,
    state: RwLock<ContextState>,
}

impl ModuleContext {
    pub(crate) const fn new(id: ContextId, name: String, kind: ContextKind, host: Host) -> Self {
        Self {
            id,
            name,
            kind,
            host,
            state: RwLock::new(ContextState::Empty),
        }
    }

    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> ContextKind {
        self.kind
    }

    #[must_use]
    pub fn status(&self) -> ContextStatus {
        self.read().status()
    }

    /// Fully qualified accessor name of the loaded module.
    #[must_use]
    pub fn module_name(&self) -> Option<String> {
        match &*self.read() {
            ContextState::Loaded(module) => Some(module.image.module_name()),
            _ => None,
        }
    }

    /// Number of live accessor instances owned by this context.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        match &*self.read() {
            ContextState::Loaded(module) => lock(&module.instances).len(),
            _ => 0,
        }
    }

    /// Load a compiled module into this context.
    pub fn load(&self, module: &CompiledModule) -> Result<LoadedTypes, Error> {
        let mut state = self.write();
        match &*state {
            ContextState::Empty => {}
            ContextState::Loaded(_) => {
                return Err(LoadError::AlreadyLoaded { context: self.id }.into());
            }
            ContextState::Unloading | ContextState::Unloaded => return Err(self.stale().into()),
        }

        let errors = module.errors().count();
        if errors > 0 {
            return Err(LoadError::Diagnostics { errors }.into());
        }

        let image = image::decode(module.bytes()).map_err(LoadError::from)?;
        let libraries = self.link(&image)?;
        let registry = Arc::new(DispatchRegistry::build(self.id, &image));
        let types = LoadedTypes::from_image(self.id, &image);

        info!(
            context = %self.id,
            name = %self.name,
            kind = %self.kind,
            module = %image.module_name(),
            entities = image.entities.len(),
            "loaded module"
        );

        *state = ContextState::Loaded(LoadedModule {
            image,
            registry,
            instances: Mutex::new(Vec::new()),
            _libraries: libraries,
            _live: self.host.track_module(),
        });

        Ok(types)
    }

    // Resolve every import against the host's resident libraries.
    fn link(&self, image: &ModuleImage) -> Result<Vec<Arc<LibraryRef>>, Error> {
        let mut linked: Vec<Arc<LibraryRef>> = Vec::new();

        for import in &image.imports {
            let missing = || LoadError::MissingDependency {
                library: import.library.clone(),
                symbol: import.symbol.clone(),
            };

            let library = self.host.library(&import.library).ok_or_else(missing)?;
            if library.find(&import.symbol).is_none() {
                return Err(missing().into());
            }
            if library.version != import.version {
                return Err(LoadError::VersionMismatch {
                    library: library.name.clone(),
                    expected: import.version,
                    resident: library.version,
                }
                .into());
            }
            if library.pins_dependents && self.kind.is_reclaimable() {
                return Err(ConfigurationConflictError::new(
                    format!("{}::{}", import.library, import.symbol),
                    self.kind,
                    format!(
                        "library `{}` keeps references to the modules importing it",
                        library.name
                    ),
                )
                .into());
            }

            if !linked.iter().any(|l| l.name == library.name) {
                linked.push(library);
            }
        }

        Ok(linked)
    }

    /// Construct the accessor type with `args`.
    pub fn instantiate(
        &self,
        handle: &TypeHandle,
        args: &[Value],
    ) -> Result<InstanceHandle, Error> {
        let state = self.read();
        let module = match &*state {
            ContextState::Loaded(module) => module,
            ContextState::Empty => return Err(ConstructionError::NotLoaded(self.id).into()),
            ContextState::Unloading | ContextState::Unloaded => return Err(self.stale().into()),
        };

        if handle.context() != self.id {
            return Err(UnknownEntityError::ForeignHandle {
                name: handle.name().to_string(),
                owner: handle.context(),
                context: self.id,
            }
            .into());
        }
        let accessor = &module.image.accessor;
        if !handle.is_accessor() || handle.symbol() != accessor.symbol {
            return Err(ConstructionError::NotAccessor(handle.name().to_string()).into());
        }

        let (constructor, connection) = select_constructor(&accessor.constructors, args)
            .ok_or_else(|| ConstructionError::NoMatchingConstructor {
                accessor: accessor.symbol.clone(),
                arity: args.len(),
            })?;

        let source = self.host.connector().connect(&connection).map_err(|source| {
            ConstructionError::Connect {
                constructor: constructor.name.clone(),
                source,
            }
        })?;

        let instance = Arc::new(AccessorInstance {
            context: self.id,
            constructor: constructor.name.clone(),
            source,
            registry: Arc::clone(&module.registry),
        });
        let handle = InstanceHandle::new(&instance);
        lock(&module.instances).push(instance);

        debug!(context = %self.id, constructor = %constructor.name, "instantiated accessor");

        Ok(handle)
    }

    /// Drop every instance and the loaded module, then become terminal.
    pub fn unload(&self) -> Result<(), Error> {
        if !self.kind.is_reclaimable() {
            return Err(ConfigurationConflictError::new(
                "unload",
                self.kind,
                "resident contexts live for the remainder of the process",
            )
            .into());
        }

        let module = {
            let mut state = self.write();
            match mem::replace(&mut *state, ContextState::Unloading) {
                ContextState::Loaded(module) => module,
                ContextState::Empty => {
                    *state = ContextState::Unloaded;
                    return Ok(());
                }
                previous @ (ContextState::Unloading | ContextState::Unloaded) => {
                    *state = previous;
                    return Err(self.stale().into());
                }
            }
        };

        let instances = lock(&module.instances).len();
        drop(module);
        *self.write() = ContextState::Unloaded;

        info!(context = %self.id, name = %self.name, instances, "unloaded module");

        Ok(())
    }

    const fn stale(&self) -> StaleContextError {
        StaleContextError { context: self.id }
    }

    fn read(&self) -> RwLockReadGuard<'_, ContextState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ContextState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// First constructor whose arity matches and whose arguments are all text.
fn select_constructor<'a>(
    constructors: &'a [ConstructorDef],
    args: &[Value],
) -> Option<(&'a ConstructorDef, String)> {
    let texts: Vec<&str> = args.iter().map(Value::as_text).collect::<Option<_>>()?;

    constructors
        .iter()
        .filter(|c| c.params.len() == texts.len())
        .find_map(|c| {
            let connection = match &c.connection {
                ConnectionArg::Literal(s) => s.clone(),
                ConnectionArg::Param(i) => (*texts.get(*i)?).to_string(),
            };

            Some((c, connection))
        })
}

///
/// TESTS
///

#[cfg(test)]
mod tests;
