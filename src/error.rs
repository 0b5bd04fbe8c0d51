use std::io;

use crate::addr::{Address, AddressError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cipher method or the secret can't be turned into an encryption key
    #[error("invalid key, {0}")]
    InvalidKey(String),

    #[error("payload too large, sealed packet would be {size} bytes, but at most {max} bytes allowed")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("packet too short, at least {min} bytes, but found {found} bytes")]
    FrameTooShort { min: usize, found: usize },

    /// Tag verification failed. Wrong key, corruption and tampering all look the same.
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("malformed address in packet, {0}")]
    MalformedAddress(AddressError),

    #[error("invalid destination, {0}")]
    InvalidDestination(AddressError),

    /// The caller's buffer was filled with the first `copied` bytes of a
    /// `required` bytes payload received from `addr`.
    #[error("buffer too small, copied {copied} of {required} bytes from {addr}")]
    BufferTooSmall {
        copied: usize,
        required: usize,
        addr: Address,
    },

    #[error("salt has been seen before, possible replay")]
    Replayed,

    #[error("could not connect to endpoint, {0}")]
    EndpointUnreachable(io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) | Error::EndpointUnreachable(err) => err,
            Error::BufferTooSmall { .. } => io::Error::new(io::ErrorKind::Other, err),
            Error::InvalidKey(_) | Error::InvalidDestination(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            _ => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}
