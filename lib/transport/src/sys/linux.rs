use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::os::unix::io::AsRawFd;
use std::{io, mem};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, error, warn};

use super::AddrFamily;
use crate::option::ConnectOpts;

/// Bind `socket` to `addr`, IPv6 sockets try dual-stack first.
fn socket_bind(socket: &Socket, af: AddrFamily, addr: &SocketAddr) -> io::Result<()> {
    let saddr = SockAddr::from(*addr);

    if af == AddrFamily::Ipv4 {
        return socket.bind(&saddr);
    }

    if let Err(err) = socket.set_only_v6(false) {
        // This is not a fatal error, just warn and skip
        warn!(message = "failed to set IPV6_V6ONLY: false for socket", ?err);
    }

    match socket.bind(&saddr) {
        Ok(()) => Ok(()),
        Err(ref err) if err.kind() == ErrorKind::AddrInUse => {
            debug!(
                message = "dual-stack address may have already been occupied, retry with IPV6_V6ONLY",
                port = addr.port()
            );

            if let Err(err) = socket.set_only_v6(true) {
                warn!(message = "failed to set IPV6_V6ONLY: true for socket", ?err);
            }

            socket.bind(&saddr)
        }
        Err(err) => Err(err),
    }
}

fn setsockopt<S: AsRawFd, T>(
    socket: &S,
    level: libc::c_int,
    name: libc::c_int,
    value: &T,
) -> io::Result<()> {
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            level,
            name,
            value as *const T as *const libc::c_void,
            mem::size_of_val(value) as libc::socklen_t,
        )
    };

    if ret < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Disable IP fragmentation, oversized datagrams are rejected instead of silently split
fn set_disable_ip_fragmentation<S: AsRawFd>(af: AddrFamily, socket: &S) -> io::Result<()> {
    // For Linux, IP_MTU_DISCOVER should be enabled for both IPv4 and IPv6 sockets
    // https://man7.org/linux/man-pages/man7/ip.7.html
    let value: libc::c_int = libc::IP_PMTUDISC_DO;
    setsockopt(socket, libc::IPPROTO_IP, libc::IP_MTU_DISCOVER, &value)?;

    if af == AddrFamily::Ipv6 {
        let value: libc::c_int = libc::IP_PMTUDISC_DO;
        setsockopt(socket, libc::IPPROTO_IPV6, libc::IPV6_MTU_DISCOVER, &value)?;
    }

    Ok(())
}

fn set_bindtodevice<S: AsRawFd>(socket: &S, iface: &str) -> io::Result<()> {
    let iface_bytes = iface.as_bytes();

    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            iface_bytes.as_ptr() as *const libc::c_void,
            iface_bytes.len() as libc::socklen_t,
        )
    };

    if ret != 0 {
        let err = io::Error::last_os_error();
        error!(message = "set SO_BINDTODEVICE failed", iface, ?err);
        return Err(err);
    }

    Ok(())
}

/// Create a `UdpSocket` for connecting to an address of family `af`
pub async fn create_udp_socket(af: AddrFamily, opts: &ConnectOpts) -> io::Result<UdpSocket> {
    let bind_addr = match (af, opts.bind_local_addr) {
        (AddrFamily::Ipv4, Some(IpAddr::V4(ip))) => SocketAddr::new(ip.into(), 0),
        (AddrFamily::Ipv6, Some(IpAddr::V6(ip))) => SocketAddr::new(ip.into(), 0),
        (AddrFamily::Ipv4, ..) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
        (AddrFamily::Ipv6, ..) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
    };

    let socket = Socket::new(
        Domain::for_address(bind_addr),
        Type::DGRAM,
        Some(Protocol::UDP),
    )?;

    if let Err(err) = set_disable_ip_fragmentation(af, &socket) {
        warn!(message = "failed to disable IP fragmentation", ?err);
    }

    // Set SO_MARK for mark-based routing on Linux (since 2.6.25)
    // NOTE: This will require CAP_NET_ADMIN capability (root in most cases)
    if let Some(mark) = opts.fwmark {
        if let Err(err) = setsockopt(&socket, libc::SOL_SOCKET, libc::SO_MARK, &mark) {
            error!(message = "set SO_MARK failed", mark, ?err);
            return Err(err);
        }
    }

    // Set SO_BINDTODEVICE for binding to a specific interface
    if let Some(ref iface) = opts.bind_interface {
        set_bindtodevice(&socket, iface)?;
    }

    socket_bind(&socket, af, &bind_addr)?;

    // UdpSocket::from_std requires socket to be non-blocked
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}
