//! Host-header TCP demultiplexer: peeks the `Host` header off an inbound
//! connection and routes it to one of several per-name virtual listeners.

mod buffered;
mod demuxer;
mod error;
mod listener;

pub use buffered::PeekedStream;
pub use demuxer::{Demuxer, DEFAULT_PEEK_TIMEOUT};
pub use error::{BindError, DemuxError};
pub use listener::{ListenerClosed, VirtualListener};
