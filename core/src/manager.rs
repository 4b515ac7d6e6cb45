//! Connection manager context object
//!
//! `EthManager` owns all manager state. API calls serialize on the global
//! lock for their whole duration; per-interface fields sit behind a
//! per-port lock that is only held for short register-access sections and
//! a bounded ping, so the link monitor never waits behind a long-running
//! `connect`.

use core::cell::RefCell;
use core::net::{IpAddr, Ipv6Addr};
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{with_timeout, Duration};
use hal_abstractions::{
    Duplex, EthInterface, FilterAddress, Ipv6Scope, MacAddress, MacDriver, NetworkStack,
    PhyConfig, PhyDriver, PhySpeed, MAX_INTERFACES,
};

use crate::bringup::bring_up;
use crate::config::EcmConfig;
use crate::dispatch::{deliver, CallbackSlots, EcmEvent, Listener, MAX_CALLBACKS};
use crate::error::EcmError;
use crate::monitor::MonitorControl;
use crate::retry::{poll_until, PollPolicy};

/// Maximum number of hardware address filter entries per interface
pub const MAX_FILTER_ADDRESSES: usize = 4;

/// Token for one live interface
///
/// Returned by [`EthManager::create`] and consumed by
/// [`EthManager::destroy`]. Handles from before a `deinit`/`init` cycle are
/// rejected.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceHandle {
    interface: EthInterface,
    generation: u32,
}

impl InterfaceHandle {
    pub fn interface(&self) -> EthInterface {
        self.interface
    }
}

/// State guarded by the global lock
#[derive(Debug, Default)]
pub(crate) struct GlobalState {
    pub(crate) initialized: bool,
    pub(crate) stack_up: bool,
    pub(crate) generation: u32,
    pub(crate) initiated: [bool; MAX_INTERFACES],
    pub(crate) monitor_refcount: u8,
    pub(crate) mac_configured: [bool; MAX_INTERFACES],
}

/// Per-interface state guarded by the port lock
pub(crate) struct Port<C, M, P> {
    pub(crate) mac: M,
    pub(crate) phy: P,
    pub(crate) mac_address: MacAddress,
    /// Stack attachment, `Some` while connected
    pub(crate) context: Option<C>,
    pub(crate) ip_subscribed: bool,
    pub(crate) connected: bool,
    pub(crate) resolved: PhyConfig,
}

impl<C, M, P> Port<C, M, P> {
    pub(crate) fn connected_context(&self) -> Result<&C, EcmError> {
        match (&self.context, self.connected) {
            (Some(ctx), true) => Ok(ctx),
            _ => Err(EcmError::NotConnected),
        }
    }
}

pub(crate) type PortSlot<S, M, P> =
    Mutex<CriticalSectionRawMutex, Option<Port<<S as NetworkStack>::Context, M, P>>>;

pub(crate) fn check_handle(
    state: &GlobalState,
    handle: &InterfaceHandle,
) -> Result<EthInterface, EcmError> {
    if !state.initialized {
        return Err(EcmError::NotInitialized);
    }
    if handle.generation != state.generation {
        warn!("Stale interface handle for {}", handle.interface);
        return Err(EcmError::InvalidArgument);
    }
    if !state.initiated[handle.interface.index()] {
        return Err(EcmError::NotInitialized);
    }
    Ok(handle.interface)
}

/// Ethernet connection manager
///
/// `S` is the IP stack, `M` and `P` the per-interface MAC and PHY drivers.
/// Place it where both the application and the monitor task can borrow it,
/// then run [`EthManager::run_link_monitor`] next to the application.
pub struct EthManager<S: NetworkStack, M, P> {
    pub(crate) stack: S,
    pub(crate) config: EcmConfig,
    pub(crate) state: Mutex<CriticalSectionRawMutex, GlobalState>,
    pub(crate) ports: [PortSlot<S, M, P>; MAX_INTERFACES],
    pub(crate) link_up: [AtomicBool; MAX_INTERFACES],
    pub(crate) callbacks:
        BlockingMutex<CriticalSectionRawMutex, RefCell<CallbackSlots<MAX_CALLBACKS>>>,
    pub(crate) monitor: MonitorControl,
}

impl<S, M, P> EthManager<S, M, P>
where
    S: NetworkStack,
    M: MacDriver,
    P: PhyDriver,
{
    pub fn new(stack: S, config: EcmConfig) -> Self {
        Self {
            stack,
            config,
            state: Mutex::new(GlobalState::default()),
            ports: core::array::from_fn(|_| Mutex::new(None)),
            link_up: core::array::from_fn(|_| AtomicBool::new(false)),
            callbacks: BlockingMutex::new(RefCell::new(CallbackSlots::new())),
            monitor: MonitorControl::new(),
        }
    }

    pub fn config(&self) -> &EcmConfig {
        &self.config
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub(crate) async fn lock_state(
        &self,
    ) -> Result<MutexGuard<'_, CriticalSectionRawMutex, GlobalState>, EcmError> {
        match self.config.lock_timeout {
            Some(timeout) => with_timeout(timeout, self.state.lock()).await.map_err(|_| {
                error!("Acquire global lock timed out");
                EcmError::LockError
            }),
            None => Ok(self.state.lock().await),
        }
    }

    /// Run `f` on the port of `iface` under its lock
    pub(crate) async fn with_port<R>(
        &self,
        iface: EthInterface,
        f: impl FnOnce(&mut Port<S::Context, M, P>) -> Result<R, EcmError>,
    ) -> Result<R, EcmError> {
        let mut guard = self.ports[iface.index()].lock().await;
        let port = guard.as_mut().ok_or(EcmError::NotInitialized)?;
        f(port)
    }

    /// Deliver `event` to a snapshot of the registered listeners
    pub(crate) fn notify(&self, iface: EthInterface, event: EcmEvent) {
        let slots = self.callbacks.lock(|slots| slots.borrow().snapshot());
        deliver(&slots, iface, event);
    }

    /// Drop a stack attachment: unsubscribe, optionally bring IP down, detach
    ///
    /// Collaborator failures are logged; teardown always runs to the end.
    pub(crate) fn abandon(&self, iface: EthInterface, ctx: S::Context, ip_was_up: bool) {
        self.stack.register_ip_change(&ctx, false);
        if ip_was_up {
            if let Err(e) = self.stack.ip_down(&ctx) {
                warn!("{}: IP down failed: {}", iface, e);
            }
        }
        if let Err(e) = self.stack.detach(ctx) {
            warn!("{}: detach failed: {}", iface, e);
        }
    }

    /// Bring the manager up; brings the network stack up once
    pub async fn init(&self) -> Result<(), EcmError> {
        let mut state = self.lock_state().await?;
        if state.initialized {
            warn!("Connection manager already initialized");
            return Err(EcmError::AlreadyInitialized);
        }

        if !state.stack_up {
            self.stack.init().map_err(|e| {
                error!("Network stack init failed: {}", e);
                EcmError::InterfaceError
            })?;
            state.stack_up = true;
        }

        state.generation = state.generation.wrapping_add(1);
        state.initialized = true;
        info!("Connection manager initialized");
        Ok(())
    }

    /// Tear the manager down
    ///
    /// Rejected with `AlreadyInUse` while any interface handle is live.
    pub async fn deinit(&self) -> Result<(), EcmError> {
        let mut state = self.lock_state().await?;
        if !state.initialized {
            return Err(EcmError::NotInitialized);
        }
        if state.initiated.iter().any(|live| *live) {
            warn!("Deinit rejected: interfaces still created");
            return Err(EcmError::AlreadyInUse);
        }

        self.callbacks.lock(|slots| slots.borrow_mut().clear());
        if state.stack_up {
            self.stack.deinit();
            state.stack_up = false;
        }
        state.initialized = false;
        info!("Connection manager deinitialized");
        Ok(())
    }

    pub async fn is_initialized(&self) -> Result<bool, EcmError> {
        Ok(self.lock_state().await?.initialized)
    }

    /// Number of interfaces currently created
    pub async fn initiated_count(&self) -> Result<usize, EcmError> {
        let state = self.lock_state().await?;
        Ok(state.initiated.iter().filter(|live| **live).count())
    }

    /// True while an attached link monitor task is ticking
    pub fn monitor_running(&self) -> bool {
        self.monitor.is_running()
    }

    /// Create interface `iface`, taking ownership of its MAC and PHY
    ///
    /// Runs the hardware bring-up and starts the link monitor for the first
    /// interface. On failure the MAC is released and dropped.
    pub async fn create(
        &self,
        iface: EthInterface,
        mut mac: M,
        mut phy: P,
    ) -> Result<InterfaceHandle, EcmError> {
        let mut state = self.lock_state().await?;
        let Some(iface_config) = self.config.interface(iface).copied() else {
            error!("{}: not enabled in configuration", iface);
            return Err(EcmError::InvalidArgument);
        };
        if !state.initialized {
            return Err(EcmError::NotInitialized);
        }
        let index = iface.index();
        if state.initiated[index] {
            warn!("{}: already created", iface);
            return Err(EcmError::AlreadyInUse);
        }

        let first_time = !state.mac_configured[index];
        let resolved = match bring_up(
            iface,
            &mut mac,
            &mut phy,
            iface_config.phy,
            first_time,
            &self.config.timing,
        )
        .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                mac.release();
                return Err(e);
            }
        };
        state.mac_configured[index] = true;

        if let Err(e) = mac.set_promiscuous(iface_config.promiscuous) {
            debug!("{}: promiscuous default not applied: {}", iface, e);
        }
        if let Err(e) = mac.set_broadcast_reject(!iface_config.accept_broadcast) {
            debug!("{}: broadcast default not applied: {}", iface, e);
        }

        *self.ports[index].lock().await = Some(Port {
            mac,
            phy,
            mac_address: iface_config.mac_address,
            context: None,
            ip_subscribed: false,
            connected: false,
            resolved,
        });
        self.link_up[index].store(false, Ordering::Release);
        state.initiated[index] = true;
        state.monitor_refcount = state.monitor_refcount.saturating_add(1);
        if state.monitor_refcount == 1 {
            self.monitor.start();
        }

        info!("{}: created", iface);
        Ok(InterfaceHandle {
            interface: iface,
            generation: state.generation,
        })
    }

    /// Destroy an interface, tearing down any connection first
    ///
    /// Stops and joins the link monitor when the last interface goes away.
    /// Must not be called from an event listener.
    pub async fn destroy(&self, handle: InterfaceHandle) -> Result<(), EcmError> {
        let mut state = self.lock_state().await?;
        let iface = check_handle(&state, &handle)?;
        let index = iface.index();

        let port = self.ports[index].lock().await.take();
        if let Some(mut port) = port {
            if let Some(ctx) = port.context.take() {
                info!("{}: tearing down connection", iface);
                self.abandon(iface, ctx, port.connected);
            }
            port.mac.release();
        }

        state.initiated[index] = false;
        self.link_up[index].store(false, Ordering::Release);
        state.monitor_refcount = state.monitor_refcount.saturating_sub(1);
        if state.monitor_refcount == 0 {
            self.monitor.stop().await;
        }

        info!("{}: destroyed", iface);
        Ok(())
    }

    /// Register an event listener in the first free slot
    pub async fn register_listener(
        &self,
        handle: &InterfaceHandle,
        listener: Listener,
    ) -> Result<(), EcmError> {
        let state = self.lock_state().await?;
        check_handle(&state, handle)?;
        let slot = self
            .callbacks
            .lock(|slots| slots.borrow_mut().register(listener))
            .inspect_err(|_| warn!("Listener table full"))?;
        debug!("Listener registered in slot {}", slot);
        Ok(())
    }

    /// Remove the first registration of `listener`; unknown listeners are
    /// ignored
    pub async fn deregister_listener(
        &self,
        handle: &InterfaceHandle,
        listener: Listener,
    ) -> Result<(), EcmError> {
        let state = self.lock_state().await?;
        check_handle(&state, handle)?;
        if !self
            .callbacks
            .lock(|slots| slots.borrow_mut().deregister(listener))
        {
            debug!("Listener not registered");
        }
        Ok(())
    }

    /// Probe the PHY for carrier once, through the port lock
    pub(crate) async fn probe_link(&self, iface: EthInterface) -> Option<()> {
        let mut guard = self.ports[iface.index()].lock().await;
        let up = guard
            .as_mut()
            .is_some_and(|port| matches!(port.phy.link_status(iface), Ok(true)));
        up.then_some(())
    }

    async fn probe_speed(&self, iface: EthInterface) -> Option<(Duplex, PhySpeed)> {
        let mut guard = self.ports[iface.index()].lock().await;
        let port = guard.as_mut()?;
        match port.phy.link_status(iface) {
            Ok(true) => port.phy.link_speed(iface).ok(),
            _ => None,
        }
    }

    fn link_policy(&self) -> PollPolicy {
        let timing = &self.config.timing;
        PollPolicy::new(timing.link_poll_step, timing.link_wait_timeout)
    }

    /// Carrier state, waiting up to the link ceiling for it to come up
    ///
    /// Returns `Ok(false)` when the link stayed down for the whole wait.
    pub async fn link_status(&self, handle: &InterfaceHandle) -> Result<bool, EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        let this = self;
        let up = poll_until(self.link_policy(), move || this.probe_link(iface)).await;
        Ok(up.is_some())
    }

    /// Active duplex and speed, waiting up to the link ceiling for a link
    pub async fn link_speed(
        &self,
        handle: &InterfaceHandle,
    ) -> Result<(Duplex, PhySpeed), EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        let this = self;
        poll_until(self.link_policy(), move || this.probe_speed(iface))
            .await
            .ok_or_else(|| {
                warn!("{}: link speed unavailable, link down", iface);
                EcmError::LinkTimeout
            })
    }

    /// PHY mode resolved at bring-up
    pub async fn negotiated_mode(&self, handle: &InterfaceHandle) -> Result<PhyConfig, EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        self.with_port(iface, |port| Ok(port.resolved)).await
    }

    pub async fn ip_address(&self, handle: &InterfaceHandle) -> Result<IpAddr, EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        self.with_port(iface, |port| {
            let ctx = port.connected_context()?;
            self.stack.ipv4_address(ctx).map(IpAddr::V4).map_err(|e| {
                warn!("{}: IPv4 address query failed: {}", iface, e);
                EcmError::IpAddressError
            })
        })
        .await
    }

    /// IPv6 address of the given scope; only link-local is supported
    pub async fn ipv6_address(
        &self,
        handle: &InterfaceHandle,
        scope: Ipv6Scope,
    ) -> Result<Ipv6Addr, EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        if scope != Ipv6Scope::LinkLocal {
            return Err(EcmError::Ipv6GlobalNotSupported);
        }
        self.with_port(iface, |port| {
            let ctx = port.connected_context()?;
            self.stack
                .ipv6_address(ctx, Ipv6Scope::LinkLocal)
                .map_err(|_| EcmError::Ipv6NotReady)
        })
        .await
    }

    pub async fn gateway_address(&self, handle: &InterfaceHandle) -> Result<IpAddr, EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        self.with_port(iface, |port| {
            let ctx = port.connected_context()?;
            self.stack.gateway(ctx).map(IpAddr::V4).map_err(|e| {
                warn!("{}: gateway query failed: {}", iface, e);
                EcmError::GatewayAddressError
            })
        })
        .await
    }

    pub async fn netmask_address(&self, handle: &InterfaceHandle) -> Result<IpAddr, EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        self.with_port(iface, |port| {
            let ctx = port.connected_context()?;
            self.stack.netmask(ctx).map(IpAddr::V4).map_err(|e| {
                warn!("{}: netmask query failed: {}", iface, e);
                EcmError::GatewayAddressError
            })
        })
        .await
    }

    /// Hardware address assigned to the interface at create
    pub async fn mac_address(&self, handle: &InterfaceHandle) -> Result<MacAddress, EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        self.with_port(iface, |port| Ok(port.mac_address)).await
    }

    /// Hardware address of the default gateway
    pub async fn gateway_mac_address(
        &self,
        handle: &InterfaceHandle,
    ) -> Result<MacAddress, EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        self.with_port(iface, |port| {
            let ctx = port.connected_context()?;
            self.stack
                .gateway_mac(ctx)
                .map_err(|_| EcmError::GatewayAddressError)
        })
        .await
    }

    pub async fn set_promiscuous_mode(
        &self,
        handle: &InterfaceHandle,
        enable: bool,
    ) -> Result<(), EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        self.with_port(iface, |port| {
            port.mac.set_promiscuous(enable).map_err(|e| {
                warn!("{}: promiscuous mode failed: {}", iface, e);
                EcmError::InterfaceError
            })
        })
        .await
    }

    /// Reject (`true`) or accept broadcast frames
    pub async fn set_broadcast_disable(
        &self,
        handle: &InterfaceHandle,
        disable: bool,
    ) -> Result<(), EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        self.with_port(iface, |port| {
            port.mac.set_broadcast_reject(disable).map_err(|e| {
                warn!("{}: broadcast reject failed: {}", iface, e);
                EcmError::InterfaceError
            })
        })
        .await
    }

    /// Program hardware filters 1..=n from `filters`
    pub async fn set_filter_addresses(
        &self,
        handle: &InterfaceHandle,
        filters: &[FilterAddress],
    ) -> Result<(), EcmError> {
        if filters.is_empty() || filters.len() > MAX_FILTER_ADDRESSES {
            return Err(EcmError::InvalidArgument);
        }
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;
        self.with_port(iface, |port| {
            for (slot, filter) in (1u8..).zip(filters) {
                port.mac.set_filter_address(slot, filter).map_err(|e| {
                    warn!("{}: filter {} failed: {}", iface, slot, e);
                    EcmError::InterfaceError
                })?;
            }
            Ok(())
        })
        .await
    }

    /// Send one echo request to `addr`; returns the round-trip time
    pub async fn ping(
        &self,
        handle: &InterfaceHandle,
        addr: IpAddr,
        timeout: Duration,
    ) -> Result<Duration, EcmError> {
        let state = self.lock_state().await?;
        let iface = check_handle(&state, handle)?;

        // Port lock is held for the round trip, so the link monitor waits
        // at most `timeout` behind it.
        let guard = self.ports[iface.index()].lock().await;
        let port = guard.as_ref().ok_or(EcmError::NotInitialized)?;
        let ctx = port.connected_context()?;

        match with_timeout(timeout, self.stack.ping(ctx, addr, timeout)).await {
            Ok(Ok(rtt)) => Ok(rtt),
            Ok(Err(e)) => {
                warn!("{}: ping failed: {}", iface, e);
                Err(EcmError::PingFailure)
            }
            Err(_) => {
                warn!("{}: ping timed out", iface);
                Err(EcmError::PingFailure)
            }
        }
    }
}
