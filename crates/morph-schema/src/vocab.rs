//! Vocabulary shared between generated sources and the compiler that reads
//! them: attribute names, runtime library names and their exported symbols.

/// Attribute namespace of every generated marker (`#[morph::...]`).
pub const ATTR_ROOT: &str = "morph";

pub const ATTR_ENTITY: &str = "entity";
pub const ATTR_ACCESSOR: &str = "accessor";
pub const ATTR_COLUMN: &str = "column";
pub const ATTR_RELATION: &str = "relation";

/// Runtime library every generated module imports from.
pub const RUNTIME_LIB: &str = "morph_runtime";

/// Proxy library backing deferred relationship loading.
pub const PROXY_LIB: &str = "morph_proxy";

pub const ENTITY_SET: &str = "EntitySet";
pub const REF: &str = "Ref";
pub const REF_LIST: &str = "RefList";
pub const LAZY: &str = "Lazy";

/// Intrinsic that binds an accessor to a connection.
pub const CONNECT: &str = "connect";

/// Name of the constant carrying the configured connection parameters.
pub const CONNECTION_CONST: &str = "CONNECTION";

/// Constructor names emitted for every accessor.
pub const CTOR_DEFAULT: &str = "new";
pub const CTOR_WITH_CONNECTION: &str = "with_connection";

/// Member names an accessor reserves for itself.
pub const RESERVED_ACCESSOR_MEMBERS: &[&str] = &[
    "connect",
    "connection",
    "count",
    "entities",
    "entity_types",
    "new",
    "query",
    "with_connection",
];

/// Type names generated entities may not shadow.
pub const RESERVED_TYPE_NAMES: &[&str] = &[
    "EntitySet",
    "Lazy",
    "Option",
    "Ref",
    "RefList",
    "Self",
];
