use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

/// Push a formatted message onto an [`ErrorTree`].
#[macro_export]
macro_rules! err {
    ($errs:expr, $($arg:tt)*) => {
        $errs.add(format!($($arg)*))
    };
}

///
/// ErrorTree
///
/// Route-keyed aggregation of validation messages. Children are keyed by the
/// entity or member name they describe, so a flattened message reads
/// `Customer.email: ...`.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorTree {
    messages: Vec<String>,
    children: BTreeMap<String, Self>,
}

impl ErrorTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: impl ToString) {
        self.messages.push(message.to_string());
    }

    /// Record an error message under a child route.
    pub fn add_at(&mut self, route: impl Into<String>, message: impl ToString) {
        self.children
            .entry(route.into())
            .or_default()
            .add(message);
    }

    /// Merge a child tree under `route`, skipping it when empty.
    pub fn merge_at(&mut self, route: impl Into<String>, child: Self) {
        if child.is_empty() {
            return;
        }

        let entry = self.children.entry(route.into()).or_default();
        entry.messages.extend(child.messages);
        for (key, grandchild) in child.children {
            entry.merge_at(key, grandchild);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.values().all(Self::is_empty)
    }

    /// Convert into a result, `Ok` when no message was recorded.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Flatten into `(route, message)` pairs, routes joined with `.`.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);

        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        for message in &self.messages {
            out.push((prefix.to_string(), message.clone()));
        }

        for (key, child) in &self.children {
            let route = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            child.flatten_into(&route, out);
        }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.flatten();
        for (i, (route, message)) in lines.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            if route.is_empty() {
                write!(f, "{message}")?;
            } else {
                write!(f, "{route}: {message}")?;
            }
        }

        Ok(())
    }
}

///
/// SchemaIssue
///
/// One validation failure with the entity (and optionally the member) that
/// caused it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SchemaIssue {
    pub entity: Option<String>,
    pub member: Option<String>,
    pub message: String,
}

///
/// SchemaError
///
/// Malformed or ambiguous schema input. Never retried.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("invalid schema: {errors}")]
pub struct SchemaError {
    pub errors: ErrorTree,
}

impl SchemaError {
    #[must_use]
    pub const fn new(errors: ErrorTree) -> Self {
        Self { errors }
    }

    /// Build an error carrying a single message routed at `entity[.member]`.
    #[must_use]
    pub fn at(entity: &str, member: Option<&str>, message: impl ToString) -> Self {
        let mut errors = ErrorTree::new();
        match member {
            Some(member) => {
                let mut child = ErrorTree::new();
                child.add_at(member, message);
                errors.merge_at(entity, child);
            }
            None => errors.add_at(entity, message),
        }

        Self { errors }
    }

    /// Structured view of every recorded failure.
    #[must_use]
    pub fn issues(&self) -> Vec<SchemaIssue> {
        self.errors
            .flatten()
            .into_iter()
            .map(|(route, message)| {
                let mut parts = route.splitn(2, '.');
                let entity = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
                let member = parts.next().map(str::to_string);

                SchemaIssue {
                    entity,
                    member,
                    message,
                }
            })
            .collect()
    }
}

impl From<ErrorTree> for SchemaError {
    fn from(errors: ErrorTree) -> Self {
        Self::new(errors)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_is_ok() {
        let mut tree = ErrorTree::new();
        tree.merge_at("Customer", ErrorTree::new());

        assert!(tree.is_empty());
        assert!(tree.result().is_ok());
    }

    #[test]
    fn flatten_joins_routes_with_dots() {
        let mut child = ErrorTree::new();
        child.add_at("email", "unsupported type tag 'money'");
        child.add("entity has no properties");

        let mut tree = ErrorTree::new();
        tree.merge_at("Customer", child);
        err!(tree, "schema has {} problems", 2);

        let flat = tree.flatten();
        assert_eq!(
            flat,
            vec![
                (String::new(), "schema has 2 problems".to_string()),
                ("Customer".to_string(), "entity has no properties".to_string()),
                (
                    "Customer.email".to_string(),
                    "unsupported type tag 'money'".to_string()
                ),
            ]
        );
    }

    #[test]
    fn issues_identify_entity_and_member() {
        let err = SchemaError::at("Order", Some("total"), "unsupported type tag 'money'");
        let issues = err.issues();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].entity.as_deref(), Some("Order"));
        assert_eq!(issues[0].member.as_deref(), Some("total"));
        assert!(err.to_string().contains("Order.total: unsupported type tag"));
    }
}
