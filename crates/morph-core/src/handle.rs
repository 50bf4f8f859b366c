use crate::{
    context::ContextId,
    error::StaleContextError,
    registry::DispatchRegistry,
    source::DataSource,
};
use derive_more::Display;
use morph_compile::ModuleImage;
use std::{
    fmt,
    sync::{Arc, Weak},
};

///
/// TypeKind
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum TypeKind {
    #[display("entity")]
    Entity,
    #[display("accessor")]
    Accessor,
}

///
/// TypeHandle
///
/// Runtime handle to one type of a loaded module. Only meaningful for the
/// context that produced it.
///

#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
#[display("{name}")]
pub struct TypeHandle {
    context: ContextId,
    name: String,
    symbol: String,
    kind: TypeKind,
}

impl TypeHandle {
    pub(crate) const fn new(
        context: ContextId,
        name: String,
        symbol: String,
        kind: TypeKind,
    ) -> Self {
        Self {
            context,
            name,
            symbol,
            kind,
        }
    }

    #[must_use]
    pub const fn context(&self) -> ContextId {
        self.context
    }

    /// Logical name; the schema name for entities.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generated type identifier.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        self.kind
    }

    #[must_use]
    pub fn is_accessor(&self) -> bool {
        self.kind == TypeKind::Accessor
    }
}

///
/// LoadedTypes
///
/// Handles returned by a successful load: entities in declaration order,
/// then the accessor.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadedTypes {
    entities: Vec<TypeHandle>,
    accessor: TypeHandle,
}

impl LoadedTypes {
    pub(crate) fn from_image(context: ContextId, image: &ModuleImage) -> Self {
        let entities = image
            .entities
            .iter()
            .map(|e| TypeHandle::new(context, e.name.clone(), e.symbol.clone(), TypeKind::Entity))
            .collect();
        let accessor = TypeHandle::new(
            context,
            image.accessor.symbol.clone(),
            image.accessor.symbol.clone(),
            TypeKind::Accessor,
        );

        Self { entities, accessor }
    }

    #[must_use]
    pub fn entities(&self) -> &[TypeHandle] {
        &self.entities
    }

    #[must_use]
    pub const fn accessor(&self) -> &TypeHandle {
        &self.accessor
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeHandle> {
        self.entities.iter().chain(std::iter::once(&self.accessor))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len() + 1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

///
/// AccessorInstance
///
/// A constructed accessor, owned by its context. Callers only ever see an
/// [`InstanceHandle`].
///

pub(crate) struct AccessorInstance {
    pub(crate) context: ContextId,
    pub(crate) constructor: String,
    pub(crate) source: Arc<dyn DataSource>,
    pub(crate) registry: Arc<DispatchRegistry>,
}

///
/// InstanceHandle
///
/// Weak reference to an accessor instance. Goes stale the moment the owning
/// context unloads.
///

#[derive(Clone)]
pub struct InstanceHandle {
    context: ContextId,
    instance: Weak<AccessorInstance>,
}

impl InstanceHandle {
    pub(crate) fn new(instance: &Arc<AccessorInstance>) -> Self {
        Self {
            context: instance.context,
            instance: Arc::downgrade(instance),
        }
    }

    #[must_use]
    pub const fn context(&self) -> ContextId {
        self.context
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.instance.strong_count() > 0
    }

    /// Name of the constructor that built the instance, while it is live.
    #[must_use]
    pub fn constructor(&self) -> Option<String> {
        self.instance.upgrade().map(|i| i.constructor.clone())
    }

    pub(crate) fn upgrade(&self) -> Result<Arc<AccessorInstance>, StaleContextError> {
        self.instance.upgrade().ok_or(StaleContextError {
            context: self.context,
        })
    }

    pub(crate) fn downgrade(&self) -> Weak<AccessorInstance> {
        Weak::clone(&self.instance)
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("context", &self.context)
            .field("live", &self.is_live())
            .finish()
    }
}
