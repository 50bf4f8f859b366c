use morph_schema::{
    naming::{Disambiguator, normalize_entity_name, normalize_member_name, pluralize},
    prelude::*,
    vocab::{RESERVED_ACCESSOR_MEMBERS, RESERVED_TYPE_NAMES},
};
use std::collections::BTreeMap;

///
/// NamePlan
///
/// Every identifier the emitters need, decided up front so that collision
/// handling happens in one place and in declaration order.
///

pub(crate) struct NamePlan {
    pub(crate) accessor: String,
    pub(crate) accessor_file: String,
    pub(crate) entities: Vec<EntityPlan>,
}

pub(crate) struct EntityPlan {
    pub(crate) logical: String,
    pub(crate) ident: String,
    pub(crate) file: String,
    pub(crate) set_member: String,
    pub(crate) properties: Vec<PropertyPlan>,
    pub(crate) relations: Vec<RelationPlan>,
}

pub(crate) struct PropertyPlan {
    pub(crate) column: String,
    pub(crate) member: String,
    pub(crate) ty: ScalarType,
    pub(crate) nullable: bool,
}

pub(crate) struct RelationPlan {
    pub(crate) member: String,
    pub(crate) target_ident: String,
    pub(crate) target_logical: String,
    pub(crate) cardinality: Cardinality,
}

impl NamePlan {
    /// Build the plan for an already-validated schema.
    pub(crate) fn build(
        schema: &SchemaDescriptor,
        options: &GenerationOptions,
    ) -> Result<Self, SchemaError> {
        let accessor = options.accessor_name.clone();

        // type identifiers, keyed by normalized entity name for relation lookup
        let mut types = Disambiguator::new(
            RESERVED_TYPE_NAMES
                .iter()
                .map(|s| (*s).to_string())
                .chain(ScalarType::ALL.iter().map(|ty| ty.symbol().to_string()))
                .chain([accessor.clone()]),
        );
        let mut files = Disambiguator::new(Vec::<String>::new());
        let accessor_file = files.claim(&normalize_member_name(&accessor));

        let mut idents = BTreeMap::new();
        let mut typed = Vec::with_capacity(schema.entities.len());
        for entity in &schema.entities {
            let normalized = normalize_entity_name(&entity.name);
            let ident = types.claim(&normalized);
            idents.insert(normalized, (ident.clone(), entity.name.clone()));
            typed.push((entity, ident));
        }

        let mut sets = Disambiguator::new(RESERVED_ACCESSOR_MEMBERS.iter().copied());
        let mut entities = Vec::with_capacity(typed.len());

        for (entity, ident) in typed {
            let file = files.claim(&normalize_member_name(&ident));
            let set_member = sets.claim(&pluralize(&normalize_member_name(&entity.name)));

            let mut members = Disambiguator::new(Vec::<String>::new());
            let mut properties = Vec::with_capacity(entity.properties.len());
            for property in &entity.properties {
                let ty = property.scalar_type().map_err(|tag| {
                    SchemaError::at(
                        &entity.name,
                        Some(&property.name),
                        format!("unsupported type tag '{}'", tag.0),
                    )
                })?;

                properties.push(PropertyPlan {
                    column: property.name.clone(),
                    member: members.claim(&normalize_member_name(&property.name)),
                    ty,
                    nullable: property.nullable,
                });
            }

            let mut relations = Vec::with_capacity(entity.relationships.len());
            for relationship in &entity.relationships {
                let (target_ident, target_logical) = idents
                    .get(&normalize_entity_name(&relationship.target))
                    .cloned()
                    .ok_or_else(|| {
                        SchemaError::at(
                            &entity.name,
                            None,
                            format!(
                                "relationship has unknown target entity '{}'",
                                relationship.target
                            ),
                        )
                    })?;

                let base = relationship.name.as_deref().map_or_else(
                    || {
                        let target = normalize_member_name(&target_logical);
                        match relationship.cardinality {
                            Cardinality::One => target,
                            Cardinality::Many => pluralize(&target),
                        }
                    },
                    normalize_member_name,
                );

                relations.push(RelationPlan {
                    member: members.claim(&base),
                    target_ident,
                    target_logical,
                    cardinality: relationship.cardinality,
                });
            }

            entities.push(EntityPlan {
                logical: entity.name.clone(),
                ident,
                file,
                set_member,
                properties,
                relations,
            });
        }

        Ok(Self {
            accessor,
            accessor_file,
            entities,
        })
    }
}
