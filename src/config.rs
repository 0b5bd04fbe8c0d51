use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use base64::alphabet::URL_SAFE;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tracing::error;
use transport::{ConnectOpts, UdpEndpoint};
use url::Url;

use crate::addr::Address;
use crate::crypto::{CipherKind, EncryptionKey};
use crate::udp::PacketListener;
use crate::Error;

const DEFAULT_PORT: u16 = 8388;

/// URL safe base64, with or without padding
const URL_SAFE_INDIFFERENT: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Shadowsocks URL parsing Error
#[derive(Debug, thiserror::Error)]
pub enum UrlParseError {
    #[error("invalid url, {0}")]
    Parse(#[from] url::ParseError),

    #[error("scheme must be ss")]
    InvalidScheme,

    #[error("invalid user info")]
    InvalidUserInfo,

    #[error("missing host")]
    MissingHost,

    #[error("invalid method or password")]
    InvalidAuthInfo,

    #[error("invalid server address")]
    InvalidServerAddr,

    #[error("unsupported method {0}")]
    InvalidMethod(String),

    #[error(transparent)]
    Key(#[from] Error),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServerConfig {
    server: String,
    server_port: u16,
    password: String,
    method: String,
    #[serde(default)]
    remarks: Option<String>,
}

/// A ShadowSocks server and the key to talk to it
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawServerConfig")]
pub struct ServerConfig {
    /// Server address
    addr: Address,
    /// Encryption password
    password: String,
    /// Encryption type method
    method: CipherKind,
    /// Master key derived from password
    key: Arc<EncryptionKey>,
    /// Remark (Profile Name), normally used as an identifier of this server
    remarks: Option<String>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("addr", &self.addr)
            .field("method", &self.method)
            .field("remarks", &self.remarks)
            .finish_non_exhaustive()
    }
}

impl TryFrom<RawServerConfig> for ServerConfig {
    type Error = Error;

    fn try_from(raw: RawServerConfig) -> Result<Self, Self::Error> {
        let method = raw.method.parse::<CipherKind>()?;
        let addr = match raw.server.parse::<IpAddr>() {
            Ok(ip) => Address::SocketAddress(SocketAddr::new(ip, raw.server_port)),
            Err(_) => Address::DomainNameAddress(raw.server, raw.server_port),
        };

        let mut config = ServerConfig::new(addr, raw.password, method)?;
        config.remarks = raw.remarks;

        Ok(config)
    }
}

impl ServerConfig {
    pub fn new<A, P>(addr: A, password: P, method: CipherKind) -> Result<ServerConfig, Error>
    where
        A: Into<Address>,
        P: Into<String>,
    {
        let password = password.into();
        let key = EncryptionKey::new(method, &password)?;

        Ok(ServerConfig {
            addr: addr.into(),
            password,
            method,
            key: Arc::new(key),
            remarks: None,
        })
    }

    /// Get server address
    pub fn addr(&self) -> &Address {
        &self.addr
    }

    /// Get encryption key
    pub fn key(&self) -> &Arc<EncryptionKey> {
        &self.key
    }

    /// Get method
    pub fn kind(&self) -> CipherKind {
        self.method
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    /// Build a [`PacketListener`] connecting to this server with `opts`
    pub fn listener(&self, opts: ConnectOpts) -> PacketListener<UdpEndpoint> {
        let endpoint = UdpEndpoint::with_opts(self.addr.to_string(), opts);
        PacketListener::new(endpoint, self.key.clone())
    }

    /// Parse from [SIP002](https://github.com/shadowsocks/shadowsocks-org/issues/27) URL
    ///
    /// Extended formats:
    ///
    /// 1. QRCode URL supported by shadowsocks-android, https://github.com/shadowsocks/shadowsocks-android/issues/51
    /// 2. Plain userinfo:password format supported by go2-shadowsocks2
    pub fn from_url(encoded: &str) -> Result<ServerConfig, UrlParseError> {
        let parsed = Url::parse(encoded)?;

        if parsed.scheme() != "ss" {
            return Err(UrlParseError::InvalidScheme);
        }

        let user_info = parsed.username();
        if user_info.is_empty() {
            // ss://BASE64-URL-ENCODE(method:password@hostname:port)
            let encoded = match parsed.host_str() {
                Some(e) => e,
                None => return Err(UrlParseError::MissingHost),
            };

            let mut decoded = match URL_SAFE_INDIFFERENT.decode(encoded) {
                Ok(b) => match String::from_utf8(b) {
                    Ok(b) => b,
                    Err(..) => return Err(UrlParseError::InvalidServerAddr),
                },
                Err(err) => {
                    error!(message = "decode legacy ss://ENCODED failed", ?err);
                    return Err(UrlParseError::InvalidServerAddr);
                }
            };

            decoded.insert_str(0, "ss://");
            return ServerConfig::from_url(&decoded);
        }

        let (method, password) = match parsed.password() {
            Some(password) => {
                // Plain method:password without base64 encoded
                let method = percent_decode_str(user_info).decode_utf8().map_err(|err| {
                    error!(message = "decode percent-encoded method failed", ?err);
                    UrlParseError::InvalidAuthInfo
                })?;
                let password = percent_decode_str(password).decode_utf8().map_err(|err| {
                    error!(message = "decode percent-encoded password failed", ?err);
                    UrlParseError::InvalidAuthInfo
                })?;

                (method.into_owned(), password.into_owned())
            }
            None => {
                let account = match URL_SAFE_INDIFFERENT.decode(user_info) {
                    Ok(account) => match String::from_utf8(account) {
                        Ok(account) => account,
                        Err(..) => return Err(UrlParseError::InvalidUserInfo),
                    },
                    Err(err) => {
                        error!(message = "decode user info failed", ?err);
                        return Err(UrlParseError::InvalidUserInfo);
                    }
                };

                match account.split_once(':') {
                    Some((m, p)) => (m.to_owned(), p.to_owned()),
                    None => return Err(UrlParseError::InvalidUserInfo),
                }
            }
        };

        let host = match parsed.host_str() {
            Some(host) => host,
            None => return Err(UrlParseError::MissingHost),
        };

        let port = parsed.port().unwrap_or(DEFAULT_PORT);
        let addr = format!("{}:{}", host, port);
        let addr = match addr.parse::<Address>() {
            Ok(a) => a,
            Err(err) => {
                error!(message = "parse server address failed", %addr, ?err);
                return Err(UrlParseError::InvalidServerAddr);
            }
        };

        let method = method
            .parse::<CipherKind>()
            .map_err(|_| UrlParseError::InvalidMethod(method))?;
        let mut config = ServerConfig::new(addr, password, method)?;

        if let Some(frag) = parsed.fragment() {
            config.remarks = Some(percent_decode_str(frag).decode_utf8_lossy().to_string());
        }

        Ok(config)
    }
}
