//! Target address, SOCKS5 style
//!
//! ```plain
//! +------+----------+----------+
//! | ATYP | DST.ADDR | DST.PORT |
//! +------+----------+----------+
//! |  1   | Variable |    2     |
//! +------+----------+----------+
//! ```
//!
//! `DST.ADDR` is 4 bytes for IPv4, 16 bytes for IPv6, or a length byte
//! followed by the domain name. `DST.PORT` is big endian.

use std::fmt;
use std::fmt::Formatter;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::str::FromStr;

use bytes::BufMut;

const ADDR_TYPE_IPV4: u8 = 0x01;
const ADDR_TYPE_DOMAIN_NAME: u8 = 0x03;
const ADDR_TYPE_IPV6: u8 = 0x04;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// Socket address (IP Address)
    SocketAddress(SocketAddr),

    /// Domain name address
    DomainNameAddress(String, u16),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address type {0:#x} not supported")]
    TypeNotSupported(u8),
    #[error("address too short, at least {0} bytes, but found {1} bytes")]
    TooShort(usize, usize),
    #[error("address domain name must be UTF-8 encoding")]
    DomainInvalidEncoding,
    #[error("domain name length must be in 1..=255, but found {0}")]
    DomainLength(usize),
    #[error("invalid port")]
    InvalidPort,
    #[error("missing domain")]
    MissingDomain,
    #[error("missing port")]
    WithoutPort,
}

impl From<SocketAddr> for Address {
    fn from(sa: SocketAddr) -> Self {
        Self::SocketAddress(sa)
    }
}

impl From<(&str, u16)> for Address {
    fn from((dn, port): (&str, u16)) -> Self {
        Self::DomainNameAddress(dn.to_owned(), port)
    }
}

impl From<(String, u16)> for Address {
    fn from((dn, port): (String, u16)) -> Self {
        Self::DomainNameAddress(dn, port)
    }
}

impl Address {
    pub fn port(&self) -> u16 {
        match *self {
            Address::SocketAddress(addr) => addr.port(),
            Address::DomainNameAddress(_, port) => port,
        }
    }

    /// Get required buffer size for serializing
    #[inline]
    pub fn serialized_len(&self) -> usize {
        match self {
            Address::SocketAddress(SocketAddr::V4(_)) => 1 + 4 + 2,
            Address::SocketAddress(SocketAddr::V6(_)) => 1 + 8 * 2 + 2,
            Address::DomainNameAddress(ref domain, _) => 1 + 1 + domain.len() + 2,
        }
    }

    /// Serialize into the front of `buf`, returns the written length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, AddressError> {
        if let Address::DomainNameAddress(ref domain, _) = *self {
            if domain.is_empty() || domain.len() > u8::MAX as usize {
                return Err(AddressError::DomainLength(domain.len()));
            }
        }

        let len = self.serialized_len();
        if buf.len() < len {
            return Err(AddressError::TooShort(len, buf.len()));
        }

        let mut dst = &mut buf[..len];
        self.write_to_buf(&mut dst);

        Ok(len)
    }

    /// `buf` must have enough room, domain length must be checked already
    fn write_to_buf<B: BufMut>(&self, buf: &mut B) {
        match *self {
            Address::SocketAddress(SocketAddr::V4(ref addr)) => {
                buf.put_u8(ADDR_TYPE_IPV4);
                buf.put_slice(&addr.ip().octets());
                buf.put_u16(addr.port());
            }
            Address::SocketAddress(SocketAddr::V6(ref addr)) => {
                buf.put_u8(ADDR_TYPE_IPV6);
                buf.put_slice(&addr.ip().octets());
                buf.put_u16(addr.port());
            }
            Address::DomainNameAddress(ref domain, port) => {
                buf.put_u8(ADDR_TYPE_DOMAIN_NAME);
                buf.put_u8(domain.len() as u8);
                buf.put_slice(domain.as_bytes());
                buf.put_u16(port);
            }
        }
    }

    /// Parse an address from the front of `buf`.
    ///
    /// Returns the address and how many bytes it occupied, the rest of `buf`
    /// is left untouched.
    pub fn decode(buf: &[u8]) -> Result<(Address, usize), AddressError> {
        let addr_type = match buf.first() {
            Some(t) => *t,
            None => return Err(AddressError::TooShort(1, 0)),
        };

        match addr_type {
            ADDR_TYPE_IPV4 => {
                let len = 1 + 4 + 2;
                if buf.len() < len {
                    return Err(AddressError::TooShort(len, buf.len()));
                }

                let ip = Ipv4Addr::new(buf[1], buf[2], buf[3], buf[4]);
                let port = u16::from_be_bytes([buf[5], buf[6]]);

                Ok((SocketAddr::V4(SocketAddrV4::new(ip, port)).into(), len))
            }

            ADDR_TYPE_IPV6 => {
                let len = 1 + 16 + 2;
                if buf.len() < len {
                    return Err(AddressError::TooShort(len, buf.len()));
                }

                let mut octets = [0u8; 16];
                octets.copy_from_slice(&buf[1..17]);
                let ip = Ipv6Addr::from(octets);
                let port = u16::from_be_bytes([buf[17], buf[18]]);

                Ok((SocketAddr::V6(SocketAddrV6::new(ip, port, 0, 0)).into(), len))
            }

            ADDR_TYPE_DOMAIN_NAME => {
                if buf.len() < 2 {
                    return Err(AddressError::TooShort(2, buf.len()));
                }

                let domain_len = buf[1] as usize;
                if domain_len == 0 {
                    return Err(AddressError::DomainLength(0));
                }

                // Type + Len(Domain) + Domain + Port
                let len = 1 + 1 + domain_len + 2;
                if buf.len() < len {
                    return Err(AddressError::TooShort(len, buf.len()));
                }

                let domain = std::str::from_utf8(&buf[2..2 + domain_len])
                    .map_err(|_| AddressError::DomainInvalidEncoding)?;
                let port = u16::from_be_bytes([buf[len - 2], buf[len - 1]]);

                Ok((Address::DomainNameAddress(domain.to_owned(), port), len))
            }

            // Only IPv4, IPv6 and domain name supported
            _ => Err(AddressError::TypeNotSupported(addr_type)),
        }
    }
}

impl fmt::Display for Address {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            Address::SocketAddress(ref addr) => write!(f, "{}", addr),
            Address::DomainNameAddress(ref addr, ref port) => write!(f, "{}:{}", addr, port),
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(Address::SocketAddress(addr));
        }

        match s.rsplit_once(':') {
            Some((dn, port)) => {
                if dn.is_empty() {
                    return Err(AddressError::MissingDomain);
                }

                match port.parse::<u16>() {
                    Ok(port) => Ok(Address::DomainNameAddress(dn.to_owned(), port)),
                    Err(_) => Err(AddressError::InvalidPort),
                }
            }
            None => Err(AddressError::WithoutPort),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_ipv4() {
        let addr: Address = "93.184.216.34:443".parse().unwrap();
        let mut buf = [0u8; 32];

        let n = addr.encode(&mut buf).unwrap();
        assert_eq!(n, 7);
        assert_eq!(&buf[..n], &[0x01, 93, 184, 216, 34, 0x01, 0xbb]);

        let (decoded, consumed) = Address::decode(&buf[..n]).unwrap();
        assert_eq!(consumed, 7);
        assert_eq!(decoded, addr);
    }

    #[test]
    fn encode_ipv6() {
        let addr: Address = "[2001:db8::1]:53".parse().unwrap();
        let mut buf = [0u8; 32];

        let n = addr.encode(&mut buf).unwrap();
        assert_eq!(n, 19);
        assert_eq!(buf[0], ADDR_TYPE_IPV6);
        assert_eq!(&buf[1..3], &[0x20, 0x01]);
        assert_eq!(&buf[16..19], &[0x01, 0x00, 0x35]);

        let (decoded, consumed) = Address::decode(&buf[..n]).unwrap();
        assert_eq!(consumed, 19);
        assert_eq!(decoded, addr);
    }

    #[test]
    fn encode_domain() {
        let addr = Address::from(("example.com", 80));
        let mut buf = [0u8; 32];

        let n = addr.encode(&mut buf).unwrap();
        assert_eq!(n, 1 + 1 + 11 + 2);
        assert_eq!(buf[0], ADDR_TYPE_DOMAIN_NAME);
        assert_eq!(buf[1], 11);
        assert_eq!(&buf[2..13], b"example.com");
        assert_eq!(&buf[13..15], &[0x00, 0x50]);
    }

    #[test]
    fn encode_rejects_bad_domain() {
        let mut buf = [0u8; 512];

        let long = Address::from(("a".repeat(256), 80));
        assert_eq!(long.encode(&mut buf), Err(AddressError::DomainLength(256)));

        let empty = Address::from(("", 80));
        assert_eq!(empty.encode(&mut buf), Err(AddressError::DomainLength(0)));

        let max = Address::from(("a".repeat(255), 80));
        assert_eq!(max.encode(&mut buf), Ok(1 + 1 + 255 + 2));
    }

    #[test]
    fn encode_short_buffer() {
        let addr: Address = "1.2.3.4:5".parse().unwrap();
        let mut buf = [0u8; 6];
        assert_eq!(addr.encode(&mut buf), Err(AddressError::TooShort(7, 6)));
    }

    #[test]
    fn decode_leaves_payload() {
        let buf = [0x01, 127, 0, 0, 1, 0x1f, 0x90, b'p', b'i', b'n', b'g'];
        let (addr, n) = Address::decode(&buf).unwrap();

        assert_eq!(addr.to_string(), "127.0.0.1:8080");
        assert_eq!(&buf[n..], b"ping");
    }

    #[test]
    fn decode_errors() {
        assert_eq!(Address::decode(&[]), Err(AddressError::TooShort(1, 0)));
        assert_eq!(
            Address::decode(&[0x02, 0, 0]),
            Err(AddressError::TypeNotSupported(0x02))
        );
        assert_eq!(
            Address::decode(&[0x01, 1, 2, 3]),
            Err(AddressError::TooShort(7, 4))
        );
        assert_eq!(
            Address::decode(&[0x04, 0, 0]),
            Err(AddressError::TooShort(19, 3))
        );
        assert_eq!(Address::decode(&[0x03]), Err(AddressError::TooShort(2, 1)));
        assert_eq!(
            Address::decode(&[0x03, 4, b'a', b'b']),
            Err(AddressError::TooShort(8, 4))
        );
        assert_eq!(
            Address::decode(&[0x03, 2, 0xff, 0xfe, 0, 80]),
            Err(AddressError::DomainInvalidEncoding)
        );
        assert_eq!(
            Address::decode(&[0x03, 0, 0, 80]),
            Err(AddressError::DomainLength(0))
        );
    }

    #[test]
    fn from_str() {
        let tests = [
            ("1.2.3.4:80", Ok(Address::SocketAddress("1.2.3.4:80".parse().unwrap()))),
            ("[::1]:443", Ok(Address::SocketAddress("[::1]:443".parse().unwrap()))),
            ("example.com:53", Ok(Address::from(("example.com", 53)))),
            (":53", Err(AddressError::MissingDomain)),
            ("example.com:http", Err(AddressError::InvalidPort)),
            ("example.com", Err(AddressError::WithoutPort)),
        ];

        for (input, want) in tests {
            assert_eq!(input.parse::<Address>(), want, "input: {}", input);
        }
    }
}
