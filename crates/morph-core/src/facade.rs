//! Uniform query surface over one accessor instance.
//!
//! Callers never see generated symbol names: entities are addressed by
//! their schema name or by a [`TypeHandle`] from the same context.

use crate::{
    cursor::Cursor,
    error::Error,
    handle::{InstanceHandle, TypeHandle},
    registry::Fetch,
};
use tracing::debug;

///
/// CountTarget
///

#[derive(Debug)]
pub enum CountTarget<'a> {
    Name(&'a str),
    Cursor(Cursor),
}

impl<'a> From<&'a str> for CountTarget<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl From<Cursor> for CountTarget<'_> {
    fn from(cursor: Cursor) -> Self {
        Self::Cursor(cursor)
    }
}

///
/// DynamicAccessFacade
///

#[derive(Clone, Debug)]
pub struct DynamicAccessFacade {
    instance: InstanceHandle,
}

impl DynamicAccessFacade {
    #[must_use]
    pub const fn new(instance: InstanceHandle) -> Self {
        Self { instance }
    }

    #[must_use]
    pub const fn instance(&self) -> &InstanceHandle {
        &self.instance
    }

    /// Entity handles in schema declaration order.
    pub fn list_entity_types(&self) -> Result<Vec<TypeHandle>, Error> {
        let instance = self.instance.upgrade()?;

        Ok(instance.registry.entities().to_vec())
    }

    /// Query by entity name. Evaluation is deferred to the cursor.
    pub fn query_by_name(&self, name: &str) -> Result<Cursor, Error> {
        let fetch = self.instance.upgrade()?.registry.by_name(name)?;

        Ok(self.cursor(name, fetch))
    }

    /// Query by a handle obtained from the same context.
    pub fn query_by_type(&self, handle: &TypeHandle) -> Result<Cursor, Error> {
        let fetch = self.instance.upgrade()?.registry.by_handle(handle)?;

        Ok(self.cursor(handle.name(), fetch))
    }

    /// Count rows of an entity, or the rows a cursor has left.
    pub fn count<'a>(&self, target: impl Into<CountTarget<'a>>) -> Result<usize, Error> {
        let cursor = match target.into() {
            CountTarget::Name(name) => self.query_by_name(name)?,
            CountTarget::Cursor(cursor) => cursor,
        };

        let mut count = 0;
        for row in cursor {
            row?;
            count += 1;
        }

        Ok(count)
    }

    fn cursor(&self, entity: &str, fetch: Fetch) -> Cursor {
        debug!(context = %self.instance.context(), entity, "query");

        Cursor::new(
            entity.to_string(),
            self.instance.context(),
            self.instance.downgrade(),
            fetch,
        )
    }
}
