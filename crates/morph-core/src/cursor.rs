use crate::{
    context::ContextId,
    error::{Error, StaleContextError},
    handle::AccessorInstance,
    registry::Fetch,
    value::Row,
};
use std::{fmt, sync::Weak, vec};

///
/// Cursor
///
/// Lazy, single-pass sequence of rows. Nothing is fetched until the first
/// call to `next`; once the owning context unloads the cursor yields a
/// [`StaleContextError`] and ends.
///

pub struct Cursor {
    entity: String,
    context: ContextId,
    instance: Weak<AccessorInstance>,
    fetch: Option<Fetch>,
    rows: Option<vec::IntoIter<Row>>,
    done: bool,
}

impl Cursor {
    pub(crate) const fn new(
        entity: String,
        context: ContextId,
        instance: Weak<AccessorInstance>,
        fetch: Fetch,
    ) -> Self {
        Self {
            entity,
            context,
            instance,
            fetch: Some(fetch),
            rows: None,
            done: false,
        }
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Whether the underlying query has run.
    #[must_use]
    pub const fn is_evaluated(&self) -> bool {
        self.rows.is_some()
    }

    fn fail(&mut self, err: impl Into<Error>) -> Option<Result<Row, Error>> {
        self.done = true;
        self.rows = None;

        Some(Err(err.into()))
    }
}

impl Iterator for Cursor {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let Some(instance) = self.instance.upgrade() else {
            return self.fail(StaleContextError {
                context: self.context,
            });
        };

        if self.rows.is_none() {
            let fetch = self.fetch.take()?;
            match fetch(instance.source.as_ref()) {
                Ok(rows) => self.rows = Some(rows.into_iter()),
                Err(err) => return self.fail(err),
            }
        }

        let row = self.rows.as_mut().and_then(Iterator::next);
        if row.is_none() {
            self.done = true;
        }

        row.map(Ok)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("entity", &self.entity)
            .field("context", &self.context)
            .field("evaluated", &self.is_evaluated())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
