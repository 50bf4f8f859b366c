use crate::{
    MAX_ENTITY_NAME_LEN, MAX_MEMBER_NAME_LEN, err,
    error::ErrorTree,
    naming::{is_valid_ident, normalize_entity_name, normalize_member_name},
    node::EntityDescriptor,
};
use std::collections::BTreeMap;

/// Validate one entity's own name and members.
pub fn validate_entity(entity: &EntityDescriptor) -> ErrorTree {
    let mut errs = ErrorTree::new();

    if let Err(msg) = validate_entity_name(&entity.name) {
        errs.add(msg);
    }

    // normalized member name -> declared name
    let mut members: BTreeMap<String, String> = BTreeMap::new();

    for property in &entity.properties {
        if let Err(msg) = validate_member_name(&property.name) {
            errs.add_at(property.name.clone(), msg);
        }

        if property.scalar_type().is_err() {
            errs.add_at(
                property.name.clone(),
                format!("unsupported type tag '{}'", property.type_tag),
            );
        }

        let normalized = normalize_member_name(&property.name);
        if let Some(prev) = members.insert(normalized.clone(), property.name.clone()) {
            err!(
                errs,
                "duplicate property '{normalized}' declared as '{prev}' and '{}'",
                property.name
            );
        }
    }

    for relationship in &entity.relationships {
        let Some(name) = &relationship.name else {
            continue;
        };

        if let Err(msg) = validate_member_name(name) {
            errs.add_at(name.clone(), msg);
        }
    }

    errs
}

/// Ensure entity names are non-empty, ASCII identifiers within the length cap.
pub(crate) fn validate_entity_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("entity name is empty".to_string());
    }
    if name.len() > MAX_ENTITY_NAME_LEN {
        return Err(format!(
            "entity name '{name}' exceeds max length {MAX_ENTITY_NAME_LEN}"
        ));
    }
    if !is_valid_ident(name) {
        return Err(format!("entity name '{name}' is not a valid identifier"));
    }
    let (type_ident, member_ident) = (normalize_entity_name(name), normalize_member_name(name));
    if !is_valid_ident(&type_ident) || !is_valid_ident(&member_ident) {
        return Err(format!(
            "entity name '{name}' does not normalize to a usable identifier"
        ));
    }

    Ok(())
}

pub(crate) fn validate_member_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("member name is empty".to_string());
    }
    if name.len() > MAX_MEMBER_NAME_LEN {
        return Err(format!(
            "member name '{name}' exceeds max length {MAX_MEMBER_NAME_LEN}"
        ));
    }
    if !is_valid_ident(name) {
        return Err(format!("member name '{name}' is not a valid identifier"));
    }
    if !is_valid_ident(&normalize_member_name(name)) {
        return Err(format!(
            "member name '{name}' does not normalize to a usable identifier"
        ));
    }

    Ok(())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PropertyDescriptor;

    #[test]
    fn duplicate_properties_after_normalization_are_rejected() {
        let entity = EntityDescriptor::new("Customer")
            .property(PropertyDescriptor::new("customerId", "int64"))
            .property(PropertyDescriptor::new("customer_id", "int64"));

        let errs = validate_entity(&entity);
        assert!(errs.to_string().contains("duplicate property 'customer_id'"));
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert!(validate_entity_name("").is_err());
        assert!(validate_entity_name("2fast").is_err());
        assert!(validate_entity_name(&"a".repeat(MAX_ENTITY_NAME_LEN + 1)).is_err());
        assert!(validate_member_name("first name").is_err());
        assert!(validate_entity_name("Customer").is_ok());
    }

    #[test]
    fn underscore_only_names_are_rejected() {
        for name in ["_", "__"] {
            let err = validate_entity_name(name).expect_err(name);
            assert!(err.contains("usable identifier"), "{err}");
            assert!(validate_member_name(name).is_err(), "{name}");
        }
        assert!(validate_entity_name("_Audit").is_ok());
        assert!(validate_member_name("_version").is_ok());
    }

    #[test]
    fn underscore_property_is_routed_at_the_property() {
        let entity =
            EntityDescriptor::new("Customer").property(PropertyDescriptor::new("_", "int64"));

        let errs = validate_entity(&entity);
        assert!(errs.to_string().contains("_: member name '_'"), "{errs}");
    }
}
