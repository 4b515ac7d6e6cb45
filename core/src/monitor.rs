//! Link monitor
//!
//! One long-lived task polls every live port each tick and turns link
//! transitions and address changes into listener events. It stays parked
//! while no interface exists; `create` starts it and the last `destroy`
//! stops it and waits for the acknowledgement.

use core::convert::Infallible;
use core::net::IpAddr;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use hal_abstractions::{EthInterface, MacDriver, NetworkStack, PhyDriver};

use crate::dispatch::EcmEvent;
use crate::error::EcmError;
use crate::manager::EthManager;

const STOPPED: u8 = 0;
const RUNNING: u8 = 1;
const STOP_REQUESTED: u8 = 2;

/// Start/stop handshake between the manager and the monitor task
pub(crate) struct MonitorControl {
    state: AtomicU8,
    attached: AtomicBool,
    wake: Signal<CriticalSectionRawMutex, ()>,
    exited: Signal<CriticalSectionRawMutex, ()>,
}

impl MonitorControl {
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicU8::new(STOPPED),
            attached: AtomicBool::new(false),
            wake: Signal::new(),
            exited: Signal::new(),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING && self.attached.load(Ordering::Acquire)
    }

    pub(crate) fn start(&self) {
        self.exited.reset();
        self.state.store(RUNNING, Ordering::Release);
        self.wake.signal(());
    }

    /// Request a stop and wait until the task has finished its tick
    ///
    /// Returns at once when no monitor task is attached.
    pub(crate) async fn stop(&self) {
        self.state.store(STOP_REQUESTED, Ordering::Release);
        self.wake.signal(());
        if self.attached.load(Ordering::Acquire) {
            self.exited.wait().await;
        }
    }

    fn stop_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) == STOP_REQUESTED
    }

    fn acknowledge_stop(&self) {
        self.state.store(STOPPED, Ordering::Release);
        self.exited.signal(());
    }

    fn attach(&self) -> Option<AttachGuard<'_>> {
        if self.attached.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(AttachGuard(self))
        }
    }

    /// Park until started, acknowledging stops that arrive while parked
    async fn wait_started(&self) {
        loop {
            match self.state.load(Ordering::Acquire) {
                RUNNING => return,
                STOP_REQUESTED => self.acknowledge_stop(),
                _ => {}
            }
            self.wake.wait().await;
        }
    }
}

/// Detaches the monitor when its future is dropped, releasing any waiter
struct AttachGuard<'a>(&'a MonitorControl);

impl Drop for AttachGuard<'_> {
    fn drop(&mut self) {
        self.0.attached.store(false, Ordering::Release);
        if self.0.stop_requested() {
            self.0.acknowledge_stop();
        }
    }
}

impl<S, M, P> EthManager<S, M, P>
where
    S: NetworkStack,
    M: MacDriver,
    P: PhyDriver,
{
    /// Body of the link monitor task
    ///
    /// Spawn once per manager; it never returns `Ok`. A second concurrent
    /// instance fails immediately with `AlreadyInUse`.
    pub async fn run_link_monitor(&self) -> Result<Infallible, EcmError> {
        let Some(_attached) = self.monitor.attach() else {
            error!("Link monitor already running");
            return Err(EcmError::AlreadyInUse);
        };
        info!("Link monitor attached");

        loop {
            self.monitor.wait_started().await;
            debug!("Link monitor started");

            loop {
                self.poll_ports().await;
                if self.monitor.stop_requested() {
                    break;
                }
                select(
                    Timer::after(self.config.timing.link_poll_interval),
                    self.monitor.wake.wait(),
                )
                .await;
                if self.monitor.stop_requested() {
                    break;
                }
            }

            debug!("Link monitor stopped");
            self.monitor.acknowledge_stop();
        }
    }

    /// One monitor tick over every live port
    async fn poll_ports(&self) {
        for iface in EthInterface::ALL {
            let index = iface.index();
            let (link, ip_change) = {
                let mut guard = self.ports[index].lock().await;
                let Some(port) = guard.as_mut() else {
                    continue;
                };
                let link = port.phy.link_status(iface).ok();
                let ip_change = match port.context.as_ref() {
                    Some(ctx)
                        if port.connected
                            && port.ip_subscribed
                            && self.stack.take_ip_change(ctx) =>
                    {
                        Some(self.stack.ipv4_address(ctx))
                    }
                    _ => None,
                };
                (link, ip_change)
            };

            match link {
                Some(true) => {
                    if !self.link_up[index].swap(true, Ordering::AcqRel) {
                        info!("{}: link up", iface);
                        self.notify(iface, EcmEvent::Connected);
                    }
                }
                Some(false) => {
                    if self.link_up[index].swap(false, Ordering::AcqRel) {
                        info!("{}: link down", iface);
                        self.notify(iface, EcmEvent::Disconnected);
                    }
                }
                None => {}
            }

            match ip_change {
                Some(Ok(addr)) => {
                    let o = addr.octets();
                    info!("{}: IP changed to {}.{}.{}.{}", iface, o[0], o[1], o[2], o[3]);
                    self.notify(iface, EcmEvent::IpChanged(IpAddr::V4(addr)));
                }
                Some(Err(e)) => warn!("{}: IP change without address: {}", iface, e),
                None => {}
            }
        }
    }
}
