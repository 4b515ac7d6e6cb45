//! Board network configuration

use ecm_core::hal_abstractions::{Duplex, EthInterface, MacAddress, PhyConfig, PhySpeed, SpeedType};
use ecm_core::{EcmConfig, InterfaceConfig, StaticIpSettings};

use crate::device_id;

/// The W5500's embedded PHY is a fixed 10/100 MII part
const W5500_PHY: PhyConfig = PhyConfig {
    interface: SpeedType::Mii,
    speed: PhySpeed::M100,
    duplex: Duplex::Full,
};

/// Network stack configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// MAC address for Ethernet
    pub mac_addr: MacAddress,
    /// Random seed for network stack
    pub seed: u64,
    /// `None` runs DHCP
    pub static_ip: Option<StaticIpSettings>,
}

impl NetworkConfig {
    /// DHCP configuration keyed to this chip's unique ID
    pub fn from_device() -> Self {
        let uid = device_id::uid();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&uid[4..]);
        Self {
            mac_addr: device_id::mac_from_uid(uid),
            seed: u64::from_le_bytes(seed),
            static_ip: None,
        }
    }

    /// Connection manager configuration; only `Eth0` exists on this board
    pub fn ecm_config(&self) -> EcmConfig {
        let eth0 = InterfaceConfig {
            mac_address: self.mac_addr,
            phy: W5500_PHY,
            ..InterfaceConfig::for_interface(EthInterface::Eth0)
        };
        EcmConfig::default().with_interface(EthInterface::Eth0, eth0)
    }
}
