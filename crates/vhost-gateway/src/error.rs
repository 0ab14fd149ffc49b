use std::io;

/// Error kinds exported from the registry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no such vhost")]
    NotFound,
    #[error("vhost name already bound")]
    AlreadyExists,
    #[error("gateway is already closed")]
    AlreadyClosed,
    #[error(transparent)]
    Io(#[from] io::Error),
}
