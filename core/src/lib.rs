//! Platform-agnostic Ethernet connection manager
//!
//! This crate owns the connection lifecycle of up to two wired interfaces:
//! hardware bring-up, stack attach and address acquisition, link monitoring
//! and event fan-out. It has NO hardware dependencies; boards supply the
//! PHY, MAC and IP stack through the `hal-abstractions` traits.
//!
//! # Usage
//!
//! ```ignore
//! let manager = EthManager::new(stack, EcmConfig::default());
//! join(manager.run_link_monitor(), async {
//!     manager.init().await?;
//!     let eth0 = manager.create(EthInterface::Eth0, mac, phy).await?;
//!     manager.register_listener(&eth0, &LOGGER).await?;
//!     let ip = manager.connect(&eth0, None).await?;
//!     // ...
//! })
//! .await;
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to the other modules
mod fmt;

mod bringup;
pub mod config;
pub mod connect;
pub mod dispatch;
pub mod error;
pub mod manager;
mod monitor;
pub mod retry;
pub mod speed;

pub use config::{EcmConfig, InterfaceConfig, Timing};
pub use connect::StaticIpSettings;
pub use dispatch::{EcmEvent, EventListener, Listener, MAX_CALLBACKS};
pub use error::EcmError;
pub use manager::{EthManager, InterfaceHandle, MAX_FILTER_ADDRESSES};

pub use hal_abstractions;
