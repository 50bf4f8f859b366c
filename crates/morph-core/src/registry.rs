//! Dispatch registry: one type-erased fetch closure per exposed entity,
//! built once when a module is loaded.

use crate::{
    context::ContextId,
    error::{AccessError, UnknownEntityError},
    handle::{TypeHandle, TypeKind},
    source::DataSource,
    value::{Record, Row, Value},
};
use morph_compile::{ModuleImage, image::EntityDef};
use morph_schema::types::Cardinality;
use std::{collections::BTreeMap, sync::Arc};

/// Fetch and materialize every row of one entity collection.
pub(crate) type Fetch = Arc<dyn Fn(&dyn DataSource) -> Result<Vec<Row>, AccessError> + Send + Sync>;

///
/// DispatchRegistry
///

pub(crate) struct DispatchRegistry {
    context: ContextId,
    order: Vec<TypeHandle>,
    entries: BTreeMap<String, Fetch>,
}

impl DispatchRegistry {
    /// Register every entity the accessor exposes, in declaration order.
    pub(crate) fn build(context: ContextId, image: &ModuleImage) -> Self {
        let mut order = Vec::new();
        let mut entries = BTreeMap::new();

        for entity in &image.entities {
            if !image.accessor.sets.iter().any(|set| set.entity == entity.name) {
                continue;
            }

            order.push(TypeHandle::new(
                context,
                entity.name.clone(),
                entity.symbol.clone(),
                TypeKind::Entity,
            ));
            entries.insert(entity.name.clone(), fetcher(entity));
        }

        Self {
            context,
            order,
            entries,
        }
    }

    pub(crate) fn entities(&self) -> &[TypeHandle] {
        &self.order
    }

    pub(crate) fn by_name(&self, name: &str) -> Result<Fetch, UnknownEntityError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| UnknownEntityError::NoSuchEntity(name.to_string()))
    }

    pub(crate) fn by_handle(&self, handle: &TypeHandle) -> Result<Fetch, UnknownEntityError> {
        if handle.context() != self.context {
            return Err(UnknownEntityError::ForeignHandle {
                name: handle.name().to_string(),
                owner: handle.context(),
                context: self.context,
            });
        }
        if handle.kind() != TypeKind::Entity {
            return Err(UnknownEntityError::NoSuchEntity(handle.name().to_string()));
        }

        self.by_name(handle.name())
    }
}

fn fetcher(entity: &EntityDef) -> Fetch {
    let layout = Arc::new(entity.clone());

    Arc::new(move |source: &dyn DataSource| -> Result<Vec<Row>, AccessError> {
        source
            .fetch(&layout.name)?
            .into_iter()
            .map(|record| materialize(&layout, record))
            .collect()
    })
}

/// Shape one raw record into a row following the entity layout.
pub(crate) fn materialize(layout: &EntityDef, mut record: Record) -> Result<Row, AccessError> {
    let mut fields = Vec::with_capacity(layout.fields.len() + layout.relations.len());

    for field in &layout.fields {
        let value = record.remove(&field.column).unwrap_or(Value::Null);

        if value.is_null() {
            if !field.nullable {
                return Err(AccessError::MissingValue {
                    entity: layout.name.clone(),
                    column: field.column.clone(),
                });
            }
        } else if !value.fits(field.scalar) {
            return Err(AccessError::TypeMismatch {
                entity: layout.name.clone(),
                column: field.column.clone(),
                expected: field.scalar.to_string(),
                found: value.tag().to_string(),
            });
        }

        fields.push((field.column.clone(), value));
    }

    for relation in &layout.relations {
        let value = if relation.deferred {
            Value::Deferred {
                target: relation.target.clone(),
            }
        } else {
            let raw = record.remove(&relation.member).unwrap_or(Value::Null);

            match (relation.cardinality, raw) {
                (Cardinality::One, v) if v.is_null() || v.is_key() => v,
                (Cardinality::Many, Value::Null) => Value::List(Vec::new()),
                (Cardinality::Many, Value::List(keys)) if keys.iter().all(Value::is_key) => {
                    Value::List(keys)
                }
                (cardinality, other) => {
                    return Err(AccessError::TypeMismatch {
                        entity: layout.name.clone(),
                        column: relation.member.clone(),
                        expected: match cardinality {
                            Cardinality::One => "reference key".to_string(),
                            Cardinality::Many => "list of reference keys".to_string(),
                        },
                        found: other.tag().to_string(),
                    });
                }
            }
        };

        fields.push((relation.member.clone(), value));
    }

    Ok(Row::new(layout.name.clone(), fields))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use morph_compile::image::{FieldDef, RelationDef};
    use morph_schema::types::ScalarType;

    fn order(deferred: bool) -> EntityDef {
        EntityDef {
            name: "Order".to_string(),
            symbol: "Order".to_string(),
            fields: vec![
                FieldDef {
                    member: "id".to_string(),
                    column: "id".to_string(),
                    scalar: ScalarType::Int64,
                    nullable: false,
                },
                FieldDef {
                    member: "note".to_string(),
                    column: "note".to_string(),
                    scalar: ScalarType::Text,
                    nullable: true,
                },
            ],
            relations: vec![RelationDef {
                member: "customer".to_string(),
                target: "Customer".to_string(),
                cardinality: Cardinality::One,
                deferred,
            }],
        }
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn missing_nullable_becomes_null() {
        let row = materialize(&order(false), record(&[("id", Value::Int(1))])).expect("row");

        assert_eq!(row.get("note"), Some(&Value::Null));
        assert_eq!(row.get("customer"), Some(&Value::Null));
        let names: Vec<_> = row.fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["id", "note", "customer"]);
    }

    #[test]
    fn missing_required_value_is_an_access_error() {
        let err = materialize(&order(false), record(&[("note", Value::from("x"))]))
            .expect_err("id is required");

        assert!(matches!(err, AccessError::MissingValue { ref column, .. } if column == "id"));
    }

    #[test]
    fn mistyped_value_is_an_access_error() {
        let err = materialize(&order(false), record(&[("id", Value::from("one"))]))
            .expect_err("id must be an int");

        assert!(err.to_string().contains("expects int64, found text"), "{err}");
    }

    #[test]
    fn deferred_relations_are_not_read() {
        let row = materialize(
            &order(true),
            record(&[("id", Value::Int(1)), ("customer", Value::from(true))]),
        )
        .expect("row");

        assert_eq!(
            row.get("customer"),
            Some(&Value::Deferred {
                target: "Customer".to_string()
            })
        );
    }
}
