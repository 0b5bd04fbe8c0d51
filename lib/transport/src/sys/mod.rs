#[cfg(target_os = "linux")]
mod linux;

use std::net::SocketAddr;

#[cfg(target_os = "linux")]
pub use linux::create_udp_socket;

#[cfg(not(target_os = "linux"))]
pub use fallback::create_udp_socket;

/// Address family `AF_INET`, `AF_INET6`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddrFamily {
    /// `AF_INET`
    Ipv4,
    /// `AF_INET6`
    Ipv6,
}

impl From<&SocketAddr> for AddrFamily {
    fn from(addr: &SocketAddr) -> AddrFamily {
        match *addr {
            SocketAddr::V4(..) => AddrFamily::Ipv4,
            SocketAddr::V6(..) => AddrFamily::Ipv6,
        }
    }
}

impl From<SocketAddr> for AddrFamily {
    fn from(addr: SocketAddr) -> AddrFamily {
        AddrFamily::from(&addr)
    }
}

#[cfg(not(target_os = "linux"))]
mod fallback {
    use std::io;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

    use tokio::net::UdpSocket;

    use super::AddrFamily;
    use crate::option::ConnectOpts;

    /// Create a `UdpSocket` for connecting to an address of family `af`
    pub async fn create_udp_socket(af: AddrFamily, opts: &ConnectOpts) -> io::Result<UdpSocket> {
        let bind_addr = match (af, opts.bind_local_addr) {
            (AddrFamily::Ipv4, Some(IpAddr::V4(ip))) => SocketAddr::new(ip.into(), 0),
            (AddrFamily::Ipv6, Some(IpAddr::V6(ip))) => SocketAddr::new(ip.into(), 0),
            (AddrFamily::Ipv4, ..) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            (AddrFamily::Ipv6, ..) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
        };

        UdpSocket::bind(bind_addr).await
    }
}
