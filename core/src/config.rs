//! Connection manager configuration structures

use embassy_time::Duration;
use hal_abstractions::{EthInterface, MacAddress, PhyConfig, MAX_INTERFACES};

/// Default MAC address prefix for generated interface addresses
pub const DEFAULT_MAC_PREFIX: [u8; 5] = [0x00, 0x03, 0x19, 0x45, 0x00];

/// Per-interface hardware configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceConfig {
    /// Address programmed into the MAC and handed to the stack
    pub mac_address: MacAddress,
    /// Requested PHY wiring, speed and duplex
    pub phy: PhyConfig,
    /// Promiscuous mode applied at create
    pub promiscuous: bool,
    /// Broadcast acceptance applied at create
    pub accept_broadcast: bool,
}

impl InterfaceConfig {
    /// Default configuration for `iface`, MAC address derived from its index
    pub fn for_interface(iface: EthInterface) -> Self {
        let p = DEFAULT_MAC_PREFIX;
        Self {
            mac_address: [p[0], p[1], p[2], p[3], p[4], iface.index() as u8],
            phy: PhyConfig::default(),
            promiscuous: false,
            accept_broadcast: true,
        }
    }
}

/// Polling intervals and ceilings for every bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Link monitor tick
    pub link_poll_interval: Duration,
    /// Link status poll step inside connect and link queries
    pub link_poll_step: Duration,
    /// Ceiling for link-up waits
    pub link_wait_timeout: Duration,
    /// Address poll step while waiting for DHCP
    pub dhcp_poll_interval: Duration,
    /// Ceiling for DHCP address assignment
    pub dhcp_timeout: Duration,
    /// Delay between starting auto-negotiation and the first status read
    pub autoneg_settle: Duration,
    pub autoneg_poll: Duration,
    pub autoneg_timeout: Duration,
    /// Non-fatal link wait at the end of interface bring-up
    pub startup_link_wait: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            link_poll_interval: Duration::from_secs(1),
            link_poll_step: Duration::from_millis(100),
            link_wait_timeout: Duration::from_secs(10),
            dhcp_poll_interval: Duration::from_millis(10),
            dhcp_timeout: Duration::from_secs(60),
            autoneg_settle: Duration::from_millis(100),
            autoneg_poll: Duration::from_millis(100),
            autoneg_timeout: Duration::from_secs(5),
            startup_link_wait: Duration::from_secs(10),
        }
    }
}

/// Connection manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EcmConfig {
    /// Enabled interfaces; `create` rejects an index whose entry is `None`
    pub interfaces: [Option<InterfaceConfig>; MAX_INTERFACES],
    pub timing: Timing,
    /// Bound on global lock acquisition, `None` waits forever
    pub lock_timeout: Option<Duration>,
}

impl EcmConfig {
    /// Configuration for `iface`, if enabled
    pub fn interface(&self, iface: EthInterface) -> Option<&InterfaceConfig> {
        self.interfaces[iface.index()].as_ref()
    }

    /// Enable `iface` with `config`
    pub fn with_interface(mut self, iface: EthInterface, config: InterfaceConfig) -> Self {
        self.interfaces[iface.index()] = Some(config);
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }
}

impl Default for EcmConfig {
    fn default() -> Self {
        Self {
            interfaces: [Some(InterfaceConfig::for_interface(EthInterface::Eth0)), None],
            timing: Timing::default(),
            lock_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_first_interface_only() {
        let config = EcmConfig::default();
        let eth0 = config.interface(EthInterface::Eth0).copied();
        assert_eq!(eth0.map(|c| c.mac_address), Some([0x00, 0x03, 0x19, 0x45, 0x00, 0x00]));
        assert!(config.interface(EthInterface::Eth1).is_none());
    }

    #[test]
    fn test_default_timing_ceilings() {
        let timing = Timing::default();
        assert_eq!(timing.link_poll_interval, Duration::from_secs(1));
        assert_eq!(timing.link_wait_timeout, Duration::from_secs(10));
        assert_eq!(timing.dhcp_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_with_interface() {
        let eth1 = InterfaceConfig::for_interface(EthInterface::Eth1);
        let config = EcmConfig::default().with_interface(EthInterface::Eth1, eth1);
        assert_eq!(
            config.interface(EthInterface::Eth1).map(|c| c.mac_address[5]),
            Some(1)
        );
        assert!(config.interface(EthInterface::Eth1).is_some_and(|c| c.accept_broadcast));
    }
}
