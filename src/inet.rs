//! Internet addresses
//!
//! Typed IPv4/IPv6 values with parse, byte conversion, ordering and
//! IPv4-mapped IPv6 conversion.

use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid IP address: {0:?}")]
    Invalid(String),

    #[error("Invalid {family} address: {text:?}")]
    WrongFamily { family: Family, text: String },

    #[error("Invalid address bytes: expected 4 or 16, got {0}")]
    InvalidBytes(usize),
}

/// Address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Inet,
    Inet6,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Inet => f.write_str("inet"),
            Family::Inet6 => f.write_str("inet6"),
        }
    }
}

/// An IPv4 or IPv6 address.
///
/// Addresses of the same family order by their network-order bytes; IPv4
/// sorts before IPv6.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IpAddress(IpAddr);

impl IpAddress {
    /// Parse an IPv4 or IPv6 literal. Hostnames and integers are rejected.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        if let Ok(v4) = text.parse::<Ipv4Addr>() {
            return Ok(Self(IpAddr::V4(v4)));
        }
        text.parse::<Ipv6Addr>()
            .map(|v6| Self(IpAddr::V6(v6)))
            .map_err(|_| AddressError::Invalid(text.to_string()))
    }

    pub fn parse_v4(text: &str) -> Result<Self, AddressError> {
        text.parse::<Ipv4Addr>()
            .map(|v4| Self(IpAddr::V4(v4)))
            .map_err(|_| AddressError::WrongFamily {
                family: Family::Inet,
                text: text.to_string(),
            })
    }

    pub fn parse_v6(text: &str) -> Result<Self, AddressError> {
        text.parse::<Ipv6Addr>()
            .map(|v6| Self(IpAddr::V6(v6)))
            .map_err(|_| AddressError::WrongFamily {
                family: Family::Inet6,
                text: text.to_string(),
            })
    }

    /// Build an address from its network-order bytes (4 for IPv4, 16 for IPv6).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
            return Ok(Self(IpAddr::V4(Ipv4Addr::from(octets))));
        }
        <[u8; 16]>::try_from(bytes)
            .map(|octets| Self(IpAddr::V6(Ipv6Addr::from(octets))))
            .map_err(|_| AddressError::InvalidBytes(bytes.len()))
    }

    /// Network-order byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.0 {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        }
    }

    pub fn family(&self) -> Family {
        match self.0 {
            IpAddr::V4(_) => Family::Inet,
            IpAddr::V6(_) => Family::Inet6,
        }
    }

    pub fn is_v4(&self) -> bool {
        self.family() == Family::Inet
    }

    /// IPv4-mapped IPv6 form (`::ffff:a.b.c.d`); IPv6 addresses are returned as-is.
    pub fn to_v6(&self) -> Self {
        match self.0 {
            IpAddr::V4(v4) => Self(IpAddr::V6(v4.to_ipv6_mapped())),
            IpAddr::V6(_) => *self,
        }
    }

    pub fn as_std(&self) -> IpAddr {
        self.0
    }
}

impl FromStr for IpAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<IpAddr> for IpAddress {
    fn from(addr: IpAddr) -> Self {
        Self(addr)
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self(IpAddr::V4(addr))
    }
}

impl From<Ipv6Addr> for IpAddress {
    fn from(addr: Ipv6Addr) -> Self {
        Self(IpAddr::V6(addr))
    }
}

impl From<IpAddress> for IpAddr {
    fn from(addr: IpAddress) -> Self {
        addr.0
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            IpAddr::V4(v4) => write!(f, "V4Address('{}')", v4),
            IpAddr::V6(v6) => write!(f, "V6Address('{}')", v6),
        }
    }
}

// Text that is not a valid address is never equal and never ordered.
impl PartialEq<str> for IpAddress {
    fn eq(&self, other: &str) -> bool {
        IpAddress::parse(other).map_or(false, |o| *self == o)
    }
}

impl PartialEq<&str> for IpAddress {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

impl PartialEq<IpAddress> for &str {
    fn eq(&self, other: &IpAddress) -> bool {
        *other == **self
    }
}

impl PartialOrd<&str> for IpAddress {
    fn partial_cmp(&self, other: &&str) -> Option<Ordering> {
        IpAddress::parse(other).ok().map(|o| self.cmp(&o))
    }
}

impl PartialOrd<IpAddress> for &str {
    fn partial_cmp(&self, other: &IpAddress) -> Option<Ordering> {
        IpAddress::parse(self).ok().map(|s| s.cmp(other))
    }
}
