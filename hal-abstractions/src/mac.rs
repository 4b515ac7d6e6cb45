//! MAC block abstraction
//!
//! A `MacDriver` value is the exclusive hardware reference of one interface:
//! the manager owns it from `create` until `destroy`.

use crate::types::FilterAddress;

/// MAC driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacError {
    /// Controller rejected the configuration
    Config,
    /// Filter slot index out of range
    InvalidSlot,
    /// Feature not available on this controller
    Unsupported,
}

impl core::fmt::Display for MacError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Config => write!(f, "MAC configuration rejected"),
            Self::InvalidSlot => write!(f, "Invalid MAC filter slot"),
            Self::Unsupported => write!(f, "MAC feature unsupported"),
        }
    }
}

impl core::error::Error for MacError {}

/// MAC/PHY interface selection derived from wiring and line rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacInterfaceSelect {
    Mii10,
    Mii100,
    Gmii1000,
    Rgmii10,
    Rgmii100,
    Rgmii1000,
    Rmii10,
    Rmii100,
}

/// Everything the MAC needs to start its clocks and DMA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacLinkConfig {
    pub select: MacInterfaceSelect,
    /// Divider applied to the reference clock to obtain the TX clock
    pub ref_clock_div: u8,
}

/// Per-interface MAC controller
pub trait MacDriver {
    /// Initialize the controller for the given link configuration and
    /// register its frame callbacks
    fn configure(&mut self, link: &MacLinkConfig) -> Result<(), MacError>;

    /// Accept all frames regardless of destination
    fn set_promiscuous(&mut self, enable: bool) -> Result<(), MacError>;

    /// Reject broadcast frames when `reject` is true
    fn set_broadcast_reject(&mut self, reject: bool) -> Result<(), MacError>;

    /// Program hardware filter `slot` (1-based)
    fn set_filter_address(&mut self, slot: u8, filter: &FilterAddress) -> Result<(), MacError>;

    /// Detach the frame callbacks; the controller is left idle
    fn release(&mut self);
}
