//! Local subnet detection for scans run without an explicit target.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};

use crate::error::{Result, ScanError};

/// An IPv4 address configured on a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetInfo {
    pub interface_name: String,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    /// Network block with host bits cleared.
    pub cidr: Ipv4Net,
}

impl SubnetInfo {
    pub fn new(interface_name: &str, address: Ipv4Addr, prefix_len: u8) -> Option<Self> {
        let net = Ipv4Net::new(address, prefix_len).ok()?;
        Some(Self {
            interface_name: interface_name.to_string(),
            address,
            netmask: net.netmask(),
            cidr: net.trunc(),
        })
    }

    fn is_usable(&self) -> bool {
        !self.address.is_loopback() && !self.address.is_link_local()
    }
}

/// Source of locally configured subnets.
pub trait InterfaceSource: Send + Sync {
    fn subnets(&self) -> Result<Vec<SubnetInfo>>;
}

/// Reads interfaces from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsInterfaces;

impl InterfaceSource for OsInterfaces {
    fn subnets(&self) -> Result<Vec<SubnetInfo>> {
        let interfaces =
            NetworkInterface::show().map_err(|e| ScanError::Interface(e.to_string()))?;

        let subnets = interfaces
            .iter()
            .flat_map(|iface| {
                iface.addr.iter().filter_map(move |addr| match addr {
                    Addr::V4(v4) => {
                        let mask = v4.netmask?;
                        let prefix = u32::from(mask).leading_ones() as u8;
                        SubnetInfo::new(&iface.name, v4.ip, prefix)
                    }
                    Addr::V6(_) => None,
                })
            })
            .collect();

        Ok(subnets)
    }
}

/// Picks the subnet to scan: private `192.168.*` or `10.*` first, otherwise
/// the first usable entry. Loopback and link-local addresses never qualify.
pub fn select_default_subnet(subnets: &[SubnetInfo]) -> Option<&SubnetInfo> {
    let mut usable = subnets.iter().filter(|s| s.is_usable()).peekable();
    let first = *usable.peek()?;

    usable
        .find(|s| {
            let [a, b, _, _] = s.address.octets();
            (a == 192 && b == 168) || a == 10
        })
        .or(Some(first))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(name: &str, addr: [u8; 4], prefix: u8) -> SubnetInfo {
        SubnetInfo::new(name, Ipv4Addr::from(addr), prefix).unwrap()
    }

    #[test]
    fn host_bits_are_cleared() {
        let info = subnet("en0", [192, 168, 1, 42], 24);
        assert_eq!(info.cidr.to_string(), "192.168.1.0/24");
        assert_eq!(info.netmask, Ipv4Addr::new(255, 255, 255, 0));
    }

    #[test]
    fn prefers_private_ranges() {
        let subnets = vec![
            subnet("lo", [127, 0, 0, 1], 8),
            subnet("docker0", [172, 17, 0, 1], 16),
            subnet("wlan0", [192, 168, 0, 12], 24),
        ];
        let chosen = select_default_subnet(&subnets).unwrap();
        assert_eq!(chosen.interface_name, "wlan0");

        let corp = vec![
            subnet("eth1", [172, 20, 0, 5], 16),
            subnet("eth0", [10, 1, 2, 3], 16),
        ];
        assert_eq!(select_default_subnet(&corp).unwrap().interface_name, "eth0");
    }

    #[test]
    fn falls_back_to_first_usable() {
        let subnets = vec![
            subnet("lo", [127, 0, 0, 1], 8),
            subnet("eth0", [169, 254, 3, 4], 16),
            subnet("eth1", [172, 16, 5, 9], 20),
        ];
        let chosen = select_default_subnet(&subnets).unwrap();
        assert_eq!(chosen.interface_name, "eth1");
        assert_eq!(chosen.cidr.to_string(), "172.16.0.0/20");
    }

    #[test]
    fn nothing_usable() {
        assert!(select_default_subnet(&[]).is_none());
        assert!(select_default_subnet(&[subnet("lo", [127, 0, 0, 1], 8)]).is_none());
    }
}
