//! ATOM entity management plumbing: request pipeline, entity manager, wire
//! model and the ISO 8601 duration codec.

pub mod duration;
pub mod entity_manager;
pub mod errors;
pub mod middleware;
pub mod models;

pub use duration::{
    DurationError, MAX_DURATION, MAX_DURATION_ISO8601, duration_to_iso8601, iso8601_to_duration,
};
pub use entity_manager::{EntityManager, deserialize_body, format_management_error};
pub use errors::{AtomError, ResponseError, not_found};
pub use middleware::{Handler, HttpTransport, Middleware, Request, Response};
pub use models::*;
