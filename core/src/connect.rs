//! Connect and disconnect orchestration
//!
//! `connect` attaches the interface to the stack, waits for carrier, brings
//! IP up and waits for an address. Each wait is bounded and every failure
//! after the attach rolls the attachment back before returning.

use core::net::{IpAddr, Ipv4Addr};
use core::sync::atomic::Ordering;

use hal_abstractions::{
    EthInterface, InterfaceKind, Ipv4Settings, MacDriver, NetworkStack, PhyDriver, StackError,
};

use crate::error::EcmError;
use crate::manager::{check_handle, EthManager, InterfaceHandle};
use crate::retry::{poll_until, PollPolicy};

/// Caller supplied static address configuration
///
/// Fields are `IpAddr` so callers can pass whatever they parsed; only
/// IPv4 is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticIpSettings {
    pub address: IpAddr,
    pub gateway: IpAddr,
    pub netmask: IpAddr,
}

impl StaticIpSettings {
    pub fn v4(address: Ipv4Addr, gateway: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self {
            address: IpAddr::V4(address),
            gateway: IpAddr::V4(gateway),
            netmask: IpAddr::V4(netmask),
        }
    }

    /// Check and narrow to IPv4 settings for the stack
    pub fn to_ipv4(&self) -> Result<Ipv4Settings, EcmError> {
        let (IpAddr::V4(address), IpAddr::V4(gateway), IpAddr::V4(netmask)) =
            (self.address, self.gateway, self.netmask)
        else {
            return Err(EcmError::StaticIpNotSupported);
        };

        let settings = Ipv4Settings {
            address,
            gateway,
            netmask,
        };
        if address.is_unspecified() || settings.prefix_len().is_none() {
            return Err(EcmError::InvalidArgument);
        }
        Ok(settings)
    }
}

fn ip_up_error(e: StackError) -> EcmError {
    match e {
        StackError::DhcpStart => EcmError::DhcpStartError,
        StackError::DhcpTimeout => EcmError::DhcpTimeout,
        _ => EcmError::InterfaceError,
    }
}

/// Stack attachment owned by a connect still in progress
///
/// Dropping it, on an error return or when the connect future is
/// cancelled, rolls the attachment back.
struct PendingAttach<'a, S: NetworkStack, M: MacDriver, P: PhyDriver> {
    mgr: &'a EthManager<S, M, P>,
    iface: EthInterface,
    ctx: Option<S::Context>,
    ip_up: bool,
}

impl<S: NetworkStack, M: MacDriver, P: PhyDriver> PendingAttach<'_, S, M, P> {
    fn context(&self) -> Result<&S::Context, EcmError> {
        self.ctx.as_ref().ok_or(EcmError::InterfaceError)
    }

    /// Hand the context over to the port
    fn release(&mut self) -> Option<S::Context> {
        self.ctx.take()
    }
}

impl<S: NetworkStack, M: MacDriver, P: PhyDriver> Drop for PendingAttach<'_, S, M, P> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.mgr.abandon(self.iface, ctx, self.ip_up);
        }
    }
}

impl<S, M, P> EthManager<S, M, P>
where
    S: NetworkStack,
    M: MacDriver,
    P: PhyDriver,
{
    /// Connect the interface, statically when `static_ip` is given and
    /// through DHCP otherwise. Returns the interface address.
    pub async fn connect(
        &self,
        handle: &InterfaceHandle,
        static_ip: Option<&StaticIpSettings>,
    ) -> Result<IpAddr, EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        let index = iface.index();
        let timing = self.config.timing;

        let mac_address = self
            .with_port(iface, |port| {
                if port.connected || port.context.is_some() {
                    warn!("{}: already connected", iface);
                    return Err(EcmError::AlreadyConnected);
                }
                Ok(port.mac_address)
            })
            .await?;

        let settings = static_ip.map(StaticIpSettings::to_ipv4).transpose()?;

        let ctx = self
            .stack
            .attach(InterfaceKind::Ethernet, iface, mac_address, settings.as_ref())
            .map_err(|e| {
                error!("{}: attach failed: {}", iface, e);
                EcmError::InterfaceError
            })?;
        self.stack.register_ip_change(&ctx, true);
        let mut pending = PendingAttach {
            mgr: self,
            iface,
            ctx: Some(ctx),
            ip_up: false,
        };

        if !self.link_up[index].load(Ordering::Acquire) {
            info!("{}: waiting for link", iface);
            let policy = PollPolicy::new(timing.link_poll_step, timing.link_wait_timeout);
            let this = self;
            if poll_until(policy, move || this.probe_link(iface)).await.is_none() {
                error!("{}: link did not come up", iface);
                return Err(EcmError::LinkTimeout);
            }
            self.link_up[index].store(true, Ordering::Release);
        }

        let ctx = pending.context()?;
        if let Err(e) = self.stack.ip_up(ctx).await {
            error!("{}: IP up failed: {}", iface, e);
            return Err(ip_up_error(e));
        }
        pending.ip_up = true;

        let address = match settings {
            Some(settings) => settings.address,
            None => {
                info!("{}: waiting for DHCP", iface);
                let policy = PollPolicy::new(timing.dhcp_poll_interval, timing.dhcp_timeout);
                let stack = &self.stack;
                let ctx = pending.context()?;
                let leased = poll_until(policy, move || {
                    let addr = stack
                        .ipv4_address(ctx)
                        .ok()
                        .filter(|addr| !addr.is_unspecified());
                    async move { addr }
                })
                .await;
                match leased {
                    Some(addr) => addr,
                    None => {
                        error!("{}: no DHCP lease", iface);
                        return Err(EcmError::DhcpTimeout);
                    }
                }
            }
        };

        let mut guard = self.ports[index].lock().await;
        let port = guard.as_mut().ok_or(EcmError::NotInitialized)?;
        port.context = pending.release();
        port.ip_subscribed = true;
        port.connected = true;

        let o = address.octets();
        info!("{}: connected, IP {}.{}.{}.{}", iface, o[0], o[1], o[2], o[3]);
        Ok(IpAddr::V4(address))
    }

    /// Disconnect the interface; the handle stays usable for a later connect
    pub async fn disconnect(&self, handle: &InterfaceHandle) -> Result<(), EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;

        let ctx = self
            .with_port(iface, |port| {
                port.connected_context()?;
                let ctx = port.context.take().ok_or(EcmError::NotConnected)?;
                port.ip_subscribed = false;
                port.connected = false;
                Ok(ctx)
            })
            .await?;

        self.abandon(iface, ctx, true);
        info!("{}: disconnected", iface);
        Ok(())
    }
}
