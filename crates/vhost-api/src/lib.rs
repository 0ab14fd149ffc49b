//! Control-plane HTTP API over a `vhost_gateway::Gateway`.

mod dto;
mod error;
mod routes;

pub use dto::{AddRequest, AddResponse, HealthResponse, ListHost, ListResponse, RandomRequest};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use routes::build_router;
