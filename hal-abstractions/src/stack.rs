//! IP stack abstraction
//!
//! Methods take `&self`: stacks such as lwIP or embassy-net synchronize
//! internally, and the manager queries them from both foreground calls and
//! the link monitor.

use core::future::Future;
use core::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use embassy_time::Duration;

use crate::types::{EthInterface, Ipv4Settings, MacAddress};

/// Network stack errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackError {
    /// Stack could not be brought up
    InitFailed,
    /// Interface could not be registered
    AttachFailed,
    /// DHCP client failed to start
    DhcpStart,
    /// DHCP client gave up waiting for an offer
    DhcpTimeout,
    /// Requested address is not (yet) available
    NotReady,
    /// Echo request timed out or was unanswered
    Timeout,
    /// Operation not supported by this stack
    Unsupported,
}

impl core::fmt::Display for StackError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InitFailed => write!(f, "Network stack init failed"),
            Self::AttachFailed => write!(f, "Interface attach failed"),
            Self::DhcpStart => write!(f, "DHCP start failed"),
            Self::DhcpTimeout => write!(f, "DHCP timeout"),
            Self::NotReady => write!(f, "Address not ready"),
            Self::Timeout => write!(f, "Request timeout"),
            Self::Unsupported => write!(f, "Unsupported by stack"),
        }
    }
}

impl core::error::Error for StackError {}

/// Kind of link being attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterfaceKind {
    Ethernet,
}

/// IPv6 address scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ipv6Scope {
    LinkLocal,
    Global,
}

/// Trait for the IP stack the manager attaches interfaces to
pub trait NetworkStack {
    /// Opaque per-interface handle into the stack, owned by the manager
    /// while the interface is attached
    type Context;

    /// Bring the stack up
    fn init(&self) -> Result<(), StackError>;

    /// Tear the stack down
    fn deinit(&self);

    /// Register an interface; `static_ip` of `None` selects DHCP
    fn attach(
        &self,
        kind: InterfaceKind,
        iface: EthInterface,
        mac: MacAddress,
        static_ip: Option<&Ipv4Settings>,
    ) -> Result<Self::Context, StackError>;

    /// Unregister an interface
    fn detach(&self, ctx: Self::Context) -> Result<(), StackError>;

    /// Bring the IP layer up (static assignment or DHCP discovery start)
    fn ip_up(&self, ctx: &Self::Context) -> impl Future<Output = Result<(), StackError>>;

    /// Bring the IP layer down
    fn ip_down(&self, ctx: &Self::Context) -> Result<(), StackError>;

    fn ipv4_address(&self, ctx: &Self::Context) -> Result<Ipv4Addr, StackError>;

    fn ipv6_address(&self, ctx: &Self::Context, scope: Ipv6Scope)
        -> Result<Ipv6Addr, StackError>;

    fn gateway(&self, ctx: &Self::Context) -> Result<Ipv4Addr, StackError>;

    fn netmask(&self, ctx: &Self::Context) -> Result<Ipv4Addr, StackError>;

    /// Hardware address of the default gateway (ARP cache)
    fn gateway_mac(&self, ctx: &Self::Context) -> Result<MacAddress, StackError>;

    /// Enable or disable IP change tracking on `ctx`
    fn register_ip_change(&self, ctx: &Self::Context, enable: bool);

    /// Returns true once per address change observed on a tracked context
    fn take_ip_change(&self, ctx: &Self::Context) -> bool;

    /// Send one echo request; returns the round-trip time
    fn ping(
        &self,
        ctx: &Self::Context,
        addr: IpAddr,
        timeout: Duration,
    ) -> impl Future<Output = Result<Duration, StackError>>;
}
