use crate::{error::ErrorTree, naming::normalize_entity_name, node::SchemaDescriptor};
use std::collections::BTreeSet;

/// Every relationship must point at an entity declared in the same schema.
pub fn validate_relationship_targets(schema: &SchemaDescriptor, errs: &mut ErrorTree) {
    let known: BTreeSet<String> = schema
        .entities
        .iter()
        .map(|e| normalize_entity_name(&e.name))
        .collect();

    for entity in &schema.entities {
        for relationship in &entity.relationships {
            if !known.contains(&normalize_entity_name(&relationship.target)) {
                errs.add_at(
                    entity.name.clone(),
                    format!(
                        "relationship has unknown target entity '{}'",
                        relationship.target
                    ),
                );
            }
        }
    }
}
