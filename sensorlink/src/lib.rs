//! sensorlink is the data-access core of a SensorThings style observation API.
//!
//! It provides the positional `dataArray` codec used to ingest and emit observations in bulk
//! (see [`array`]), and the custom-link resolver that derives navigation links from
//! `name.EntityType@iot.id` keys inside property documents (see [`links`]).
//! A thin axum surface in [`rest`] wires both into `CreateObservations` and a read endpoint.
//!

pub mod array;
pub mod error;
pub mod links;
pub mod logger;
pub mod model;
pub mod rest;
pub mod settings;

pub use array::{ArrayCodec, DataArrayResult, DataArrayValue, DecodedGroup, ParentRef, Registry};
pub use error::AppError;
pub use links::{CustomLinks, LinkPattern, LinkToken};
pub use model::{EntityRef, EntityType, Id, IdManager, NamedEntity, Observation, PropertyBag};
pub use rest::{build_router, serve, MemorySink, ObservationSink, RequestState};
pub use settings::AppConfig;
pub use serde_json;
