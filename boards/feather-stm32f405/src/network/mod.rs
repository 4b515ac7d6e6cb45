//! Connection manager integration for the W5500 FeatherWing
//!
//! - **`phy`** / **`mac`**: the W5500 seen through the manager's driver traits
//! - **`stack`**: embassy-net as the manager's `NetworkStack`
//! - **`events`**: listener that queues link events for the application
//! - **`app`**: connect/reconnect loop driving the manager
//! - **`config`**: board addressing and manager configuration
//!
//! embassy-net-wiznet owns the chip's registers; the adapters only see what
//! embassy-net exposes (link state and IPv4 configuration), so filter,
//! promiscuous and ping requests report `Unsupported`.

pub mod app;
pub mod config;
pub mod events;
pub mod mac;
pub mod phy;
pub mod stack;

pub use config::NetworkConfig;
pub use mac::W5500Mac;
pub use phy::W5500Phy;
pub use stack::EmbassyNetStack;
