//! PHY operation table
//!
//! The manager treats every failure here as "status unknown", never as a
//! link-down determination, except inside its bounded wait loops.

use crate::types::{Duplex, EthInterface, PhySpeed};

/// PHY driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhyError {
    /// Management bus (MDIO/SPI) transaction failed
    Bus,
    /// No PHY answered at the expected address
    NotFound,
    /// Requested mode is not supported by this PHY
    Unsupported,
}

impl core::fmt::Display for PhyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus => write!(f, "PHY bus error"),
            Self::NotFound => write!(f, "PHY not found"),
            Self::Unsupported => write!(f, "PHY mode unsupported"),
        }
    }
}

impl core::error::Error for PhyError {}

/// The nine PHY operations the manager needs per interface
///
/// All operations are blocking register accesses. Delays between them are
/// owned by the caller.
pub trait PhyDriver {
    /// Bring the PHY out of power-down and apply vendor defaults
    fn init(&mut self, iface: EthInterface) -> Result<(), PhyError>;

    /// Program duplex and speed; `Auto` for both starts auto-negotiation
    fn configure(
        &mut self,
        iface: EthInterface,
        duplex: Duplex,
        speed: PhySpeed,
    ) -> Result<(), PhyError>;

    /// Soft reset
    fn reset(&mut self, iface: EthInterface) -> Result<(), PhyError>;

    /// Locate the PHY on the management bus
    fn discover(&mut self, iface: EthInterface) -> Result<(), PhyError>;

    /// Enable vendor extended registers for the given line rate
    fn enable_extended_registers(
        &mut self,
        iface: EthInterface,
        speed: PhySpeed,
    ) -> Result<(), PhyError>;

    /// True once auto-negotiation has completed
    fn auto_negotiation_complete(&mut self, iface: EthInterface) -> Result<bool, PhyError>;

    /// Best mode advertised by the link partner
    fn link_partner_capability(
        &mut self,
        iface: EthInterface,
    ) -> Result<(Duplex, PhySpeed), PhyError>;

    /// Currently active duplex and speed
    fn link_speed(&mut self, iface: EthInterface) -> Result<(Duplex, PhySpeed), PhyError>;

    /// True when carrier is detected
    fn link_status(&mut self, iface: EthInterface) -> Result<bool, PhyError>;
}
