use crate::{
    context::{ContextId, ModuleContext},
    source::Connector,
};
use morph_compile::{LibraryRef, ReferenceSet};
use morph_schema::residency::ContextKind;
use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};
use tracing::debug;

/// Version of the standard runtime library exposed by [`Host::new`].
pub const RUNTIME_VERSION: u32 = 1;

/// Version of the deferred-loading proxy library exposed by [`Host::new`].
pub const PROXY_VERSION: u32 = 1;

///
/// Host
///
/// Process-wide owner of the permanently-resident libraries and the
/// connector used by accessor constructors. Contexts created from a host
/// may import from its libraries; the host never refers back to them.
///

#[derive(Clone)]
pub struct Host {
    shared: Arc<HostShared>,
}

struct HostShared {
    libraries: RwLock<BTreeMap<String, Arc<LibraryRef>>>,
    connector: Arc<dyn Connector>,
    live_modules: AtomicUsize,
    next_context: AtomicU64,
}

impl Host {
    /// Host with the standard runtime and proxy libraries resident.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        let host = Self::bare(connector);
        host.register_library(LibraryRef::runtime(RUNTIME_VERSION));
        host.register_library(LibraryRef::proxy(PROXY_VERSION));

        host
    }

    /// Host with no resident libraries.
    #[must_use]
    pub fn bare(connector: Arc<dyn Connector>) -> Self {
        Self {
            shared: Arc::new(HostShared {
                libraries: RwLock::new(BTreeMap::new()),
                connector,
                live_modules: AtomicUsize::new(0),
                next_context: AtomicU64::new(1),
            }),
        }
    }

    /// Make `library` resident, replacing any library of the same name.
    pub fn register_library(&self, library: LibraryRef) {
        debug!(library = %library.name, version = library.version, "registered resident library");

        self.shared
            .libraries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(library.name.clone(), Arc::new(library));
    }

    #[must_use]
    pub fn library(&self, name: &str) -> Option<Arc<LibraryRef>> {
        self.shared
            .libraries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// The resident libraries as a compiler reference set.
    #[must_use]
    pub fn references(&self) -> ReferenceSet {
        self.shared
            .libraries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .fold(ReferenceSet::new(), |set, lib| set.with(LibraryRef::clone(lib)))
    }

    #[must_use]
    pub fn connector(&self) -> &dyn Connector {
        self.shared.connector.as_ref()
    }

    /// Create an empty context of the given kind.
    #[must_use]
    pub fn create_context(&self, name: impl Into<String>, kind: ContextKind) -> ModuleContext {
        let id = ContextId(self.shared.next_context.fetch_add(1, Ordering::Relaxed));

        ModuleContext::new(id, name.into(), kind, self.clone())
    }

    /// Number of modules currently loaded in contexts of this host.
    #[must_use]
    pub fn live_modules(&self) -> usize {
        self.shared.live_modules.load(Ordering::Acquire)
    }

    pub(crate) fn track_module(&self) -> LiveModule {
        self.shared.live_modules.fetch_add(1, Ordering::AcqRel);

        LiveModule {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let libraries = self
            .shared
            .libraries
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        f.debug_struct("Host")
            .field("libraries", &libraries.keys().collect::<Vec<_>>())
            .field("live_modules", &self.live_modules())
            .finish_non_exhaustive()
    }
}

///
/// LiveModule
///
/// Accounting guard held by every loaded module; dropping it releases the
/// module's slot in the host's live count.
///

pub(crate) struct LiveModule {
    shared: Arc<HostShared>,
}

impl Drop for LiveModule {
    fn drop(&mut self) {
        self.shared.live_modules.fetch_sub(1, Ordering::AcqRel);
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryConnector;
    use morph_schema::vocab::{PROXY_LIB, RUNTIME_LIB};

    #[test]
    fn standard_host_exposes_runtime_and_proxy() {
        let host = Host::new(Arc::new(MemoryConnector::new()));
        let refs = host.references();

        assert!(refs.get(RUNTIME_LIB).is_some());
        assert!(refs.get(PROXY_LIB).is_some_and(|lib| lib.pins_dependents));
    }

    #[test]
    fn live_count_follows_guards() {
        let host = Host::bare(Arc::new(MemoryConnector::new()));
        let a = host.track_module();
        let b = host.track_module();
        assert_eq!(host.live_modules(), 2);

        drop(a);
        drop(b);
        assert_eq!(host.live_modules(), 0);
    }

    #[test]
    fn context_ids_are_unique() {
        let host = Host::bare(Arc::new(MemoryConnector::new()));
        let a = host.create_context("a", ContextKind::Reclaimable);
        let b = host.create_context("b", ContextKind::Reclaimable);

        assert_ne!(a.id(), b.id());
    }
}
