//! Data sources behind accessor instances.
//!
//! Query semantics live outside the pipeline; all it needs is "fetch the
//! collection for entity T". The in-memory implementation backs tests and
//! the CLI.

use crate::{
    error::{AccessError, ConnectError},
    value::Record,
};
use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

///
/// DataSource
///

pub trait DataSource: Send + Sync {
    /// Fetch every record of the collection backing `entity`.
    fn fetch(&self, entity: &str) -> Result<Vec<Record>, AccessError>;
}

///
/// Connector
///
/// Turns the opaque connection parameters baked into generated accessors
/// into a live data source.
///

pub trait Connector: Send + Sync {
    fn connect(&self, connection: &str) -> Result<Arc<dyn DataSource>, ConnectError>;
}

///
/// MemoryStore
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Record>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entity: impl Into<String>, record: Record) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(entity.into())
            .or_default()
            .push(record);
    }

    pub fn extend(&self, entity: impl Into<String>, records: impl IntoIterator<Item = Record>) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(entity.into())
            .or_default()
            .extend(records);
    }

    #[must_use]
    pub fn len(&self, entity: &str) -> usize {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .map_or(0, Vec::len)
    }
}

impl DataSource for MemoryStore {
    fn fetch(&self, entity: &str) -> Result<Vec<Record>, AccessError> {
        Ok(self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .cloned()
            .unwrap_or_default())
    }
}

///
/// MemoryConnector
///
/// Maps connection strings to shared in-memory stores. In the default open
/// mode an unknown connection gets a fresh empty store; in strict mode only
/// registered connections can be opened.
///

#[derive(Default)]
pub struct MemoryConnector {
    stores: RwLock<BTreeMap<String, Arc<MemoryStore>>>,
    strict: bool,
}

impl MemoryConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Register `store` under `connection`, replacing any previous store.
    #[must_use]
    pub fn with_store(self, connection: impl Into<String>, store: Arc<MemoryStore>) -> Self {
        self.register(connection, store);
        self
    }

    pub fn register(&self, connection: impl Into<String>, store: Arc<MemoryStore>) {
        self.stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection.into(), store);
    }

    #[must_use]
    pub fn store(&self, connection: &str) -> Option<Arc<MemoryStore>> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(connection)
            .cloned()
    }
}

impl fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);

        f.debug_struct("MemoryConnector")
            .field("connections", &stores.keys().collect::<Vec<_>>())
            .field("strict", &self.strict)
            .finish()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, connection: &str) -> Result<Arc<dyn DataSource>, ConnectError> {
        if let Some(store) = self.store(connection) {
            return Ok(store);
        }
        if self.strict {
            return Err(ConnectError::new(connection, "no store registered"));
        }

        let store = Arc::new(MemoryStore::new());
        self.register(connection, Arc::clone(&store));

        Ok(store)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn open_connector_reuses_store_per_connection() {
        let connector = MemoryConnector::new();
        connector.connect("memory://a").expect("open");

        let store = connector.store("memory://a").expect("registered");
        store.insert("Customer", Record::from([("id".to_string(), Value::Int(1))]));

        let source = connector.connect("memory://a").expect("reopen");
        assert_eq!(source.fetch("Customer").expect("fetch").len(), 1);
        assert!(source.fetch("Order").expect("fetch").is_empty());
    }

    #[test]
    fn strict_connector_rejects_unknown_connections() {
        let connector = MemoryConnector::strict().with_store("known", Arc::new(MemoryStore::new()));

        assert!(connector.connect("known").is_ok());
        let err = connector.connect("unknown").err().expect("must fail");
        assert_eq!(err.connection, "unknown");
    }
}
