//! Raw packet transports
//!
//! A [`PacketEndpoint`] knows how to reach a remote peer and hands out a
//! connected [`DatagramConn`]. The connection sends and receives whole
//! datagrams, exactly like a connected UDP socket. Nothing here encrypts
//! anything, higher layers wrap the connection.

mod endpoint;
mod option;
mod sys;

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::net::UdpSocket;

pub use endpoint::UdpEndpoint;
pub use option::ConnectOpts;
pub use sys::{create_udp_socket, AddrFamily};

/// A connected datagram channel.
///
/// Every `send` writes exactly one datagram and every `recv` reads exactly
/// one. Dropping the connection closes it, any pending operation on another
/// task fails with the error reported by the underlying transport.
pub trait DatagramConn: Send + Sync {
    /// Send one datagram to the connected peer, returns the bytes written
    fn send(&self, buf: &[u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Receive one datagram from the connected peer into `buf`, returns its length.
    ///
    /// Bytes beyond `buf.len()` are discarded by the transport.
    fn recv(&self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;
}

/// Something that can be connected to with a datagram channel.
pub trait PacketEndpoint: Send + Sync {
    type Conn: DatagramConn;

    /// Create a new datagram channel connected to this endpoint
    fn connect_packet(&self) -> impl Future<Output = io::Result<Self::Conn>> + Send;
}

impl DatagramConn for UdpSocket {
    #[inline]
    fn send(&self, buf: &[u8]) -> impl Future<Output = io::Result<usize>> + Send {
        UdpSocket::send(self, buf)
    }

    #[inline]
    fn recv(&self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send {
        UdpSocket::recv(self, buf)
    }
}

impl<T: DatagramConn> DatagramConn for Arc<T> {
    #[inline]
    fn send(&self, buf: &[u8]) -> impl Future<Output = io::Result<usize>> + Send {
        (**self).send(buf)
    }

    #[inline]
    fn recv(&self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send {
        (**self).recv(buf)
    }
}
