use std::net::IpAddr;

/// Options for the socket created when connecting to an endpoint
#[derive(Clone, Debug, Default)]
pub struct ConnectOpts {
    /// Linux mark based routing, going to set by `setsockopt` with `SO_MARK` option
    #[cfg(target_os = "linux")]
    pub fwmark: Option<u32>,

    /// Outbound socket binds to this IP address, mostly for choosing network interfaces
    ///
    /// It only affects sockets that trying to connect to addresses with the same family
    pub bind_local_addr: Option<IpAddr>,

    /// Outbound socket binds to interface
    #[cfg(target_os = "linux")]
    pub bind_interface: Option<String>,
}
