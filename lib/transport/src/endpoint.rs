use std::io;
use std::net::SocketAddr;

use tokio::net::{lookup_host, UdpSocket};
use tracing::debug;

use crate::option::ConnectOpts;
use crate::sys::create_udp_socket;
use crate::PacketEndpoint;

/// A UDP endpoint addressed by `host:port`, the host could be an IP or a domain name.
#[derive(Clone, Debug)]
pub struct UdpEndpoint {
    addr: String,
    opts: ConnectOpts,
}

impl UdpEndpoint {
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_opts(addr, ConnectOpts::default())
    }

    pub fn with_opts(addr: impl Into<String>, opts: ConnectOpts) -> Self {
        Self {
            addr: addr.into(),
            opts,
        }
    }

    /// The `host:port` this endpoint connects to
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect_addr(&self, remote: SocketAddr) -> io::Result<UdpSocket> {
        let socket = create_udp_socket(remote.into(), &self.opts).await?;
        socket.connect(remote).await?;
        Ok(socket)
    }
}

impl PacketEndpoint for UdpEndpoint {
    type Conn = UdpSocket;

    /// Resolve the endpoint and connect to the first address that accepts.
    async fn connect_packet(&self) -> io::Result<UdpSocket> {
        let mut last_err = None;

        for remote in lookup_host(self.addr.as_str()).await? {
            match self.connect_addr(remote).await {
                Ok(socket) => {
                    debug!(message = "udp endpoint connected", endpoint = %self.addr, %remote);
                    return Ok(socket);
                }
                Err(err) => {
                    debug!(message = "connect udp endpoint failed", endpoint = %self.addr, %remote, ?err);
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} resolved to no address", self.addr),
            )
        }))
    }
}
