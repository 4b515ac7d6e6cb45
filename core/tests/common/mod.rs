//! Mock collaborators shared by the integration tests
//!
//! Every mock keeps its observable state behind an `Arc` (hardware) or
//! inside the stack value reachable through `EthManager::stack()`, so tests
//! can flip inputs and read call counts while the manager owns the mock.

#![allow(dead_code)]

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ecm_core::hal_abstractions::{
    Duplex, EthInterface, FilterAddress, InterfaceKind, Ipv4Settings, Ipv6Scope, MacAddress,
    MacDriver, MacError, MacLinkConfig, NetworkStack, PhyDriver, PhyError, PhySpeed, StackError,
};
use ecm_core::{EcmConfig, EcmEvent, EthManager, EventListener, InterfaceConfig, Listener, Timing};
use embassy_futures::block_on;
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};

pub type TestManager = EthManager<MockStack, MockMac, MockPhy>;

pub fn fast_timing() -> Timing {
    Timing {
        link_poll_interval: Duration::from_millis(10),
        link_poll_step: Duration::from_millis(5),
        link_wait_timeout: Duration::from_millis(100),
        dhcp_poll_interval: Duration::from_millis(2),
        dhcp_timeout: Duration::from_millis(100),
        autoneg_settle: Duration::from_millis(1),
        autoneg_poll: Duration::from_millis(1),
        autoneg_timeout: Duration::from_millis(20),
        startup_link_wait: Duration::from_millis(20),
    }
}

/// Both interfaces enabled, shrunk timings
pub fn test_config() -> EcmConfig {
    EcmConfig::default()
        .with_interface(EthInterface::Eth1, InterfaceConfig::for_interface(EthInterface::Eth1))
        .with_timing(fast_timing())
}

pub fn manager() -> TestManager {
    EthManager::new(MockStack::default(), test_config())
}

/// Drive `body` to completion with the link monitor running alongside
pub fn run<F: Future>(mgr: &TestManager, body: F) -> F::Output {
    match block_on(select(mgr.run_link_monitor(), body)) {
        Either::First(exit) => panic!("link monitor exited: {:?}", exit),
        Either::Second(output) => output,
    }
}

// ---------------------------------------------------------------------------
// PHY

#[derive(Default)]
pub struct PhyProbe {
    pub link: AtomicBool,
    /// Make `link_status` fail with a bus error
    pub status_error: AtomicBool,
    pub init_calls: AtomicUsize,
    pub link_speed_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

pub struct MockPhy(pub Arc<PhyProbe>);

impl PhyDriver for MockPhy {
    fn init(&mut self, _: EthInterface) -> Result<(), PhyError> {
        self.0.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn configure(&mut self, _: EthInterface, _: Duplex, _: PhySpeed) -> Result<(), PhyError> {
        Ok(())
    }

    fn reset(&mut self, _: EthInterface) -> Result<(), PhyError> {
        Ok(())
    }

    fn discover(&mut self, _: EthInterface) -> Result<(), PhyError> {
        Ok(())
    }

    fn enable_extended_registers(&mut self, _: EthInterface, _: PhySpeed) -> Result<(), PhyError> {
        Ok(())
    }

    fn auto_negotiation_complete(&mut self, _: EthInterface) -> Result<bool, PhyError> {
        Ok(true)
    }

    fn link_partner_capability(
        &mut self,
        _: EthInterface,
    ) -> Result<(Duplex, PhySpeed), PhyError> {
        Ok((Duplex::Full, PhySpeed::M100))
    }

    fn link_speed(&mut self, _: EthInterface) -> Result<(Duplex, PhySpeed), PhyError> {
        self.0.link_speed_calls.fetch_add(1, Ordering::SeqCst);
        Ok((Duplex::Full, PhySpeed::M100))
    }

    fn link_status(&mut self, _: EthInterface) -> Result<bool, PhyError> {
        self.0.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.0.status_error.load(Ordering::SeqCst) {
            return Err(PhyError::Bus);
        }
        Ok(self.0.link.load(Ordering::SeqCst))
    }
}

// ---------------------------------------------------------------------------
// MAC

#[derive(Default)]
pub struct MacProbe {
    pub reject_config: AtomicBool,
    pub configured: Mutex<Vec<MacLinkConfig>>,
    pub released: AtomicUsize,
    pub promiscuous: AtomicBool,
    pub broadcast_reject: AtomicBool,
    pub filters: Mutex<Vec<(u8, FilterAddress)>>,
}

pub struct MockMac(pub Arc<MacProbe>);

impl MacDriver for MockMac {
    fn configure(&mut self, link: &MacLinkConfig) -> Result<(), MacError> {
        if self.0.reject_config.load(Ordering::SeqCst) {
            return Err(MacError::Config);
        }
        self.0.configured.lock().unwrap().push(*link);
        Ok(())
    }

    fn set_promiscuous(&mut self, enable: bool) -> Result<(), MacError> {
        self.0.promiscuous.store(enable, Ordering::SeqCst);
        Ok(())
    }

    fn set_broadcast_reject(&mut self, reject: bool) -> Result<(), MacError> {
        self.0.broadcast_reject.store(reject, Ordering::SeqCst);
        Ok(())
    }

    fn set_filter_address(&mut self, slot: u8, filter: &FilterAddress) -> Result<(), MacError> {
        self.0.filters.lock().unwrap().push((slot, *filter));
        Ok(())
    }

    fn release(&mut self) {
        self.0.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Hardware {
    pub mac: Arc<MacProbe>,
    pub phy: Arc<PhyProbe>,
}

impl Hardware {
    pub fn new(link: bool) -> Self {
        let hw = Self {
            mac: Arc::default(),
            phy: Arc::default(),
        };
        hw.phy.link.store(link, Ordering::SeqCst);
        hw
    }

    pub fn drivers(&self) -> (MockMac, MockPhy) {
        (MockMac(self.mac.clone()), MockPhy(self.phy.clone()))
    }

    pub fn set_link(&self, up: bool) {
        self.phy.link.store(up, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Network stack

pub const LEASE: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 42);
pub const GATEWAY: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

#[derive(Debug)]
pub struct MockContext {
    pub iface: EthInterface,
    pub static_ip: Option<Ipv4Settings>,
}

pub struct MockStack {
    pub init_calls: AtomicUsize,
    pub deinit_calls: AtomicUsize,
    pub attach_calls: AtomicUsize,
    pub detach_calls: AtomicUsize,
    pub ip_up_calls: AtomicUsize,
    pub ip_down_calls: AtomicUsize,
    pub subscribed: AtomicBool,
    pub ip_changed: AtomicBool,
    /// Address the DHCP client has leased, `None` while still discovering
    pub lease: Mutex<Option<Ipv4Addr>>,
    pub ip_up_error: Mutex<Option<StackError>>,
    /// Round-trip time ping waits and reports, `None` makes it time out
    pub ping_rtt: Mutex<Option<Duration>>,
}

impl Default for MockStack {
    fn default() -> Self {
        Self {
            init_calls: AtomicUsize::new(0),
            deinit_calls: AtomicUsize::new(0),
            attach_calls: AtomicUsize::new(0),
            detach_calls: AtomicUsize::new(0),
            ip_up_calls: AtomicUsize::new(0),
            ip_down_calls: AtomicUsize::new(0),
            subscribed: AtomicBool::new(false),
            ip_changed: AtomicBool::new(false),
            lease: Mutex::new(Some(LEASE)),
            ip_up_error: Mutex::new(None),
            ping_rtt: Mutex::new(Some(Duration::from_millis(3))),
        }
    }
}

impl MockStack {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Interfaces currently attached
    pub fn attached(&self) -> usize {
        Self::count(&self.attach_calls) - Self::count(&self.detach_calls)
    }

    pub fn set_lease(&self, lease: Option<Ipv4Addr>) {
        *self.lease.lock().unwrap() = lease;
    }
}

impl NetworkStack for MockStack {
    type Context = MockContext;

    fn init(&self) -> Result<(), StackError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn deinit(&self) {
        self.deinit_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn attach(
        &self,
        kind: InterfaceKind,
        iface: EthInterface,
        _mac: MacAddress,
        static_ip: Option<&Ipv4Settings>,
    ) -> Result<MockContext, StackError> {
        assert_eq!(kind, InterfaceKind::Ethernet);
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        Ok(MockContext {
            iface,
            static_ip: static_ip.copied(),
        })
    }

    fn detach(&self, _ctx: MockContext) -> Result<(), StackError> {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ip_up(&self, _ctx: &MockContext) -> Result<(), StackError> {
        self.ip_up_calls.fetch_add(1, Ordering::SeqCst);
        match *self.ip_up_error.lock().unwrap() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn ip_down(&self, _ctx: &MockContext) -> Result<(), StackError> {
        self.ip_down_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn ipv4_address(&self, ctx: &MockContext) -> Result<Ipv4Addr, StackError> {
        if let Some(settings) = ctx.static_ip {
            return Ok(settings.address);
        }
        self.lease.lock().unwrap().ok_or(StackError::NotReady)
    }

    fn ipv6_address(&self, _ctx: &MockContext, scope: Ipv6Scope) -> Result<Ipv6Addr, StackError> {
        match scope {
            Ipv6Scope::LinkLocal => Ok(Ipv6Addr::new(0xfe80, 0, 0, 0, 0x0203, 0x19ff, 0xfe45, 0)),
            Ipv6Scope::Global => Err(StackError::Unsupported),
        }
    }

    fn gateway(&self, ctx: &MockContext) -> Result<Ipv4Addr, StackError> {
        Ok(ctx.static_ip.map_or(GATEWAY, |s| s.gateway))
    }

    fn netmask(&self, ctx: &MockContext) -> Result<Ipv4Addr, StackError> {
        Ok(ctx.static_ip.map_or(NETMASK, |s| s.netmask))
    }

    fn gateway_mac(&self, _ctx: &MockContext) -> Result<MacAddress, StackError> {
        Err(StackError::NotReady)
    }

    fn register_ip_change(&self, _ctx: &MockContext, enable: bool) {
        self.subscribed.store(enable, Ordering::SeqCst);
    }

    fn take_ip_change(&self, _ctx: &MockContext) -> bool {
        self.ip_changed.swap(false, Ordering::SeqCst)
    }

    async fn ping(
        &self,
        _ctx: &MockContext,
        _addr: IpAddr,
        _timeout: Duration,
    ) -> Result<Duration, StackError> {
        let rtt = *self.ping_rtt.lock().unwrap();
        match rtt {
            Some(rtt) => {
                Timer::after(rtt).await;
                Ok(rtt)
            }
            None => Err(StackError::Timeout),
        }
    }
}

// ---------------------------------------------------------------------------
// Listeners

pub type EventLog = Arc<Mutex<Vec<(u8, EthInterface, EcmEvent)>>>;

pub struct Recorder {
    id: u8,
    log: EventLog,
}

impl EventListener for Recorder {
    fn on_event(&self, iface: EthInterface, event: EcmEvent) {
        self.log.lock().unwrap().push((self.id, iface, event));
    }
}

/// Leak a recording listener; each call yields a distinct identity
pub fn recorder(id: u8, log: &EventLog) -> Listener {
    Box::leak(Box::new(Recorder {
        id,
        log: log.clone(),
    }))
}

pub fn events(log: &EventLog) -> Vec<(u8, EthInterface, EcmEvent)> {
    log.lock().unwrap().clone()
}
