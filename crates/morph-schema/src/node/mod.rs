mod entity;
mod property;
mod relationship;
mod schema;

pub use entity::EntityDescriptor;
pub use property::PropertyDescriptor;
pub use relationship::RelationshipDescriptor;
pub use schema::SchemaDescriptor;
