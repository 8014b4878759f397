pub mod entity;
pub mod entity_type;
pub mod id;
pub mod time;
pub mod url;

pub use entity::{EntityRef, NamedEntity, Observation, PropertyBag};
pub use entity_type::EntityType;
pub use id::{Id, IdManager, LongIdManager, StringIdManager};
pub use time::{TimeFormat, TimeInstant, TimeInterval, TimeValue};
