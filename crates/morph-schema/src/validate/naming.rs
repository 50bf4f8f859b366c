use crate::{err, error::ErrorTree, naming::normalize_entity_name, node::SchemaDescriptor};
use std::collections::BTreeMap;

/// Two entities may not share a name once normalized into a type identifier.
pub fn validate_entity_naming(schema: &SchemaDescriptor, errs: &mut ErrorTree) {
    let mut by_name: BTreeMap<String, String> = BTreeMap::new();

    for entity in &schema.entities {
        let name = normalize_entity_name(&entity.name);

        if let Some(prev) = by_name.insert(name.clone(), entity.name.clone()) {
            err!(
                errs,
                "duplicate entity name '{name}' after normalization of '{prev}' and '{}'",
                entity.name
            );
        }
    }
}
