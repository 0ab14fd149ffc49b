//! Vhost registry: binds a single public listener via `vhost-mux` and
//! reverse-proxies each named virtual host to its configured upstream.

mod error;
mod error_loop;
mod gateway;
mod host;
mod proxy;
mod shutdown;
mod signal;

pub use error::Error;
pub use gateway::{Gateway, GatewayOptions};
pub use host::{Host, VhostUri};
