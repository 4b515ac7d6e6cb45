//! Connection manager error types

/// Errors returned by every fallible `EthManager` operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EcmError {
    /// Bad interface index, stale handle, or malformed argument
    InvalidArgument,
    /// Manager (or the addressed interface) is not initialized
    NotInitialized,
    /// `init` called twice
    AlreadyInitialized,
    /// Interface already created, or resources still held
    AlreadyInUse,
    /// Interface is already connected
    AlreadyConnected,
    /// Interface is not connected
    NotConnected,
    /// Global lock could not be acquired in time
    LockError,
    /// Physical link did not come up in time
    LinkTimeout,
    /// No address assigned by DHCP in time
    DhcpTimeout,
    /// DHCP client could not be started
    DhcpStartError,
    /// Hardware or stack rejected an interface operation
    InterfaceError,
    /// IP address query failed
    IpAddressError,
    /// Gateway or netmask query failed
    GatewayAddressError,
    /// IPv6 link-local address not yet available
    Ipv6NotReady,
    /// Static configuration contains IPv6 parts
    StaticIpNotSupported,
    /// Global IPv6 scope requested
    Ipv6GlobalNotSupported,
    /// Echo request failed or timed out
    PingFailure,
    /// All listener slots are occupied
    TooManyCallbacks,
}

impl core::fmt::Display for EcmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::NotInitialized => write!(f, "Not initialized"),
            Self::AlreadyInitialized => write!(f, "Already initialized"),
            Self::AlreadyInUse => write!(f, "Already in use"),
            Self::AlreadyConnected => write!(f, "Already connected"),
            Self::NotConnected => write!(f, "Not connected"),
            Self::LockError => write!(f, "Lock acquisition failed"),
            Self::LinkTimeout => write!(f, "Link up timeout"),
            Self::DhcpTimeout => write!(f, "DHCP timeout"),
            Self::DhcpStartError => write!(f, "DHCP start failed"),
            Self::InterfaceError => write!(f, "Interface error"),
            Self::IpAddressError => write!(f, "IP address query failed"),
            Self::GatewayAddressError => write!(f, "Gateway address query failed"),
            Self::Ipv6NotReady => write!(f, "IPv6 address not ready"),
            Self::StaticIpNotSupported => write!(f, "Static IPv6 not supported"),
            Self::Ipv6GlobalNotSupported => write!(f, "Global IPv6 not supported"),
            Self::PingFailure => write!(f, "Ping failed"),
            Self::TooManyCallbacks => write!(f, "Too many callbacks"),
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for EcmError {}
