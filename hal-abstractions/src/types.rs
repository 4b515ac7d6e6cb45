//! Value types shared between the manager and its collaborators

use core::net::Ipv4Addr;

/// Number of Ethernet interfaces a device can expose
pub const MAX_INTERFACES: usize = 2;

/// 6-byte hardware address
pub type MacAddress = [u8; 6];

/// Ethernet interface index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EthInterface {
    Eth0 = 0,
    Eth1 = 1,
}

impl EthInterface {
    /// All interfaces, in monitor polling order
    pub const ALL: [EthInterface; MAX_INTERFACES] = [EthInterface::Eth0, EthInterface::Eth1];

    /// Map a raw index onto an interface, `None` when out of range
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Eth0),
            1 => Some(Self::Eth1),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Duplex mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Duplex {
    Half,
    Full,
    /// Let auto-negotiation decide
    Auto,
}

/// PHY line rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhySpeed {
    M10,
    M100,
    M1000,
    /// Let auto-negotiation decide
    Auto,
}

/// MAC to PHY interface wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpeedType {
    Mii,
    Gmii,
    Rgmii,
    Rmii,
}

/// Requested PHY properties for one interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhyConfig {
    pub interface: SpeedType,
    pub speed: PhySpeed,
    pub duplex: Duplex,
}

impl PhyConfig {
    /// True when either speed or duplex is left to auto-negotiation
    pub const fn is_auto(&self) -> bool {
        matches!(self.speed, PhySpeed::Auto) || matches!(self.duplex, Duplex::Auto)
    }
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            interface: SpeedType::Rgmii,
            speed: PhySpeed::Auto,
            duplex: Duplex::Auto,
        }
    }
}

/// Validated static IPv4 settings handed to the network stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Settings {
    pub address: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl Ipv4Settings {
    /// Prefix length of a contiguous netmask, `None` otherwise
    pub fn prefix_len(&self) -> Option<u8> {
        let mask = u32::from(self.netmask);
        let ones = mask.leading_ones();
        if mask.checked_shl(ones).unwrap_or(0) == 0 {
            Some(ones as u8)
        } else {
            None
        }
    }
}

/// Which address field a MAC filter entry compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterType {
    /// Match the destination address
    Destination,
    /// Match the source address
    Source,
}

/// One hardware MAC address filter entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilterAddress {
    pub filter_type: FilterType,
    pub address: MacAddress,
    /// Bit N set means byte N of `address` is not compared
    pub ignore_bytes: u8,
}
