//! Target enumeration.
//!
//! Expands a CIDR block or an inclusive start/end address pair into an
//! ordered stream of [`Target`]s. Nothing here touches the network.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;
use netsweep_core::error::{NetsweepError, Result};
use netsweep_core::Target;

/// A parsed scan target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTarget {
    /// Network block; stored with host bits cleared.
    Cidr(Ipv4Net),
    /// Inclusive address range, `start <= end`.
    Range { start: Ipv4Addr, end: Ipv4Addr },
}

impl ScanTarget {
    /// Parses IPv4 CIDR notation such as `192.168.1.0/24`.
    pub fn cidr(input: &str) -> Result<Self> {
        let net: Ipv4Net = input
            .trim()
            .parse()
            .map_err(|e: ipnet::AddrParseError| NetsweepError::InvalidCidr {
                input: input.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::Cidr(net.trunc()))
    }

    /// Parses an inclusive address pair.
    pub fn range(start: &str, end: &str) -> Result<Self> {
        let invalid = |reason: String| NetsweepError::InvalidRange {
            input: format!("{}-{}", start.trim(), end.trim()),
            reason,
        };

        let start_addr: Ipv4Addr = start
            .trim()
            .parse()
            .map_err(|_| invalid(format!("'{}' is not an IPv4 address", start.trim())))?;
        let end_addr: Ipv4Addr = end
            .trim()
            .parse()
            .map_err(|_| invalid(format!("'{}' is not an IPv4 address", end.trim())))?;

        if u32::from(start_addr) > u32::from(end_addr) {
            return Err(invalid("start address is after end address".to_string()));
        }

        Ok(Self::Range {
            start: start_addr,
            end: end_addr,
        })
    }

    /// Yields candidate addresses in ascending order without materializing
    /// them.
    ///
    /// CIDR blocks of prefix 30 or shorter exclude the network and broadcast
    /// addresses; /31 and /32 yield every address. Ranges are inclusive.
    pub fn iter(&self) -> impl Iterator<Item = Target> + Send + 'static {
        let (first, last) = match self {
            Self::Cidr(net) => {
                let network = u32::from(net.network());
                let broadcast = u32::from(net.broadcast());
                if net.prefix_len() >= 31 {
                    (network, broadcast)
                } else {
                    (network + 1, broadcast - 1)
                }
            }
            Self::Range { start, end } => (u32::from(*start), u32::from(*end)),
        };

        (first..=last)
            .enumerate()
            .map(|(index, raw)| Target::new(Ipv4Addr::from(raw), index))
    }

    /// Collects [`iter`](Self::iter).
    pub fn enumerate(&self) -> Vec<Target> {
        self.iter().collect()
    }

    /// Number of addresses [`iter`](Self::iter) will produce.
    pub fn len(&self) -> u64 {
        match self {
            Self::Cidr(net) => {
                let total = 1u64 << (32 - u32::from(net.prefix_len()));
                if net.prefix_len() >= 31 {
                    total
                } else {
                    total - 2
                }
            }
            Self::Range { start, end } => u64::from(u32::from(*end) - u32::from(*start)) + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for ScanTarget {
    type Err = NetsweepError;

    /// Accepts `a.b.c.d/n`, `a.b.c.d-e.f.g.h` (whitespace around the dash is
    /// allowed), or a single address.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.contains('/') {
            return Self::cidr(trimmed);
        }
        if let Some((start, end)) = trimmed.split_once('-') {
            return Self::range(start, end);
        }
        match trimmed.parse::<Ipv4Addr>() {
            Ok(addr) => Ok(Self::Range {
                start: addr,
                end: addr,
            }),
            Err(_) => Err(NetsweepError::InvalidRange {
                input: s.to_string(),
                reason: "expected CIDR, start-end range, or IPv4 address".to_string(),
            }),
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cidr(net) => write!(f, "{net}"),
            Self::Range { start, end } if start == end => write!(f, "{start}"),
            Self::Range { start, end } => write!(f, "{start}-{end}"),
        }
    }
}
