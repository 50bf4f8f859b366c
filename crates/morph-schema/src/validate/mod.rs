//! Schema validation orchestration.

pub mod entity;
pub mod naming;
pub mod relation;

use crate::{error::ErrorTree, node::SchemaDescriptor};

/// Run full schema validation in a staged, deterministic order.
pub(crate) fn validate_schema(schema: &SchemaDescriptor) -> Result<(), ErrorTree> {
    // Phase 1: validate each entity in isolation.
    let mut errors = ErrorTree::new();
    for entity in &schema.entities {
        errors.merge_at(entity.name.clone(), entity::validate_entity(entity));
    }

    // Phase 2: enforce schema-wide invariants.
    naming::validate_entity_naming(schema, &mut errors);
    relation::validate_relationship_targets(schema, &mut errors);

    errors.result()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn customer_order() -> SchemaDescriptor {
        SchemaDescriptor::new()
            .entity(
                EntityDescriptor::new("Customer")
                    .property(PropertyDescriptor::new("id", "int64"))
                    .property(PropertyDescriptor::new("name", "text"))
                    .relationship(RelationshipDescriptor::many("Order")),
            )
            .entity(
                EntityDescriptor::new("Order")
                    .property(PropertyDescriptor::new("id", "int64"))
                    .property(PropertyDescriptor::new("customerId", "int64"))
                    .relationship(RelationshipDescriptor::one("Customer")),
            )
    }

    #[test]
    fn valid_schema_passes() {
        customer_order().validate().expect("schema should validate");
    }

    #[test]
    fn all_problems_are_reported_together() {
        let schema = customer_order()
            .entity(
                EntityDescriptor::new("Invoice")
                    .property(PropertyDescriptor::new("total", "money"))
                    .relationship(RelationshipDescriptor::one("Ledger")),
            )
            .entity(EntityDescriptor::new("order"));

        let err = schema.validate().expect_err("schema should fail");
        let text = err.to_string();

        assert!(text.contains("Invoice.total: unsupported type tag 'money'"), "{text}");
        assert!(text.contains("unknown target entity 'Ledger'"), "{text}");
        assert!(text.contains("duplicate entity name 'Order'"), "{text}");
    }

    #[test]
    fn schema_round_trips_through_json() {
        let json = r#"{
            "entities": [
                { "name": "Customer",
                  "properties": [ { "name": "id", "type": "int64" },
                                  { "name": "email", "type": "text", "nullable": true } ],
                  "relationships": [ { "target": "Order", "cardinality": "many" } ] },
                { "name": "Order", "properties": [ { "name": "id", "type": "int64" } ] }
            ]
        }"#;

        let schema: SchemaDescriptor = serde_json::from_str(json).expect("json should parse");
        assert_eq!(schema.entities.len(), 2);
        assert!(schema.entities[0].properties[1].nullable);
        assert_eq!(
            schema.entities[0].relationships[0].cardinality,
            Cardinality::Many
        );
        schema.validate().expect("parsed schema should validate");
    }
}
