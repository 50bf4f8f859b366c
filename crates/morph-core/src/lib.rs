//! Runtime side of the morph pipeline: resident host libraries, isolated
//! module contexts, accessor instances and the dynamic query facade.

mod context;
mod cursor;
mod error;
mod facade;
mod handle;
mod host;
mod registry;
mod source;
mod value;

pub use context::{ContextId, ContextStatus, ModuleContext};
pub use cursor::Cursor;
pub use error::{
    AccessError, ConnectError, ConstructionError, Error, LoadError, StaleContextError,
    UnknownEntityError,
};
pub use facade::{CountTarget, DynamicAccessFacade};
pub use handle::{InstanceHandle, LoadedTypes, TypeHandle, TypeKind};
pub use host::{Host, PROXY_VERSION, RUNTIME_VERSION};
pub use source::{Connector, DataSource, MemoryConnector, MemoryStore};
pub use value::{Record, Row, Value, ValueTag};

pub use morph_schema::residency::{ConfigurationConflictError, ContextKind};
