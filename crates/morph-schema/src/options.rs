use serde::{Deserialize, Serialize};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "morph_gen";

/// Accessor type name used when none is configured.
pub const DEFAULT_ACCESSOR_NAME: &str = "DataContext";

///
/// GenerationOptions
///
/// Knobs recognised by the code generator. `connection` is opaque and is
/// passed through into the generated accessor untouched.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub root_namespace: String,
    pub accessor_name: String,
    pub connection: String,
    pub lazy_materialization: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            root_namespace: DEFAULT_NAMESPACE.to_string(),
            accessor_name: DEFAULT_ACCESSOR_NAME.to_string(),
            connection: String::new(),
            lazy_materialization: false,
        }
    }
}

impl GenerationOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.root_namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_accessor_name(mut self, name: impl Into<String>) -> Self {
        self.accessor_name = name.into();
        self
    }

    #[must_use]
    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    #[must_use]
    pub const fn with_lazy_materialization(mut self, enabled: bool) -> Self {
        self.lazy_materialization = enabled;
        self
    }
}
