//! Hardware abstraction traits for the Ethernet connection manager
//!
//! This crate defines the collaborator boundaries the connection manager
//! drives. Boards implement these traits; `ecm-core` only ever talks to
//! hardware and to the IP stack through them.
//!
//! - **`phy`**: `PhyDriver`, the nine-operation PHY table
//! - **`mac`**: `MacDriver`, the per-interface MAC block (the "hardware reference")
//! - **`stack`**: `NetworkStack`, interface attach/detach, IP bring-up, queries
//! - **`types`**: value types shared by all three

#![no_std]
#![deny(unsafe_code)]

pub mod mac;
pub mod phy;
pub mod stack;
pub mod types;

pub use mac::{MacDriver, MacError, MacInterfaceSelect, MacLinkConfig};
pub use phy::{PhyDriver, PhyError};
pub use stack::{InterfaceKind, Ipv6Scope, NetworkStack, StackError};
pub use types::{
    Duplex, EthInterface, FilterAddress, FilterType, Ipv4Settings, MacAddress, PhyConfig,
    PhySpeed, SpeedType, MAX_INTERFACES,
};
