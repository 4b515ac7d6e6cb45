//! Link event hand-off from the monitor to the application loop
//!
//! Listeners run inside the link monitor and must not block, so events are
//! queued on a channel and the link indicator is a plain atomic.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{info, warn};
use ecm_core::hal_abstractions::EthInterface;
use ecm_core::{EcmEvent, EventListener};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};

const QUEUE_DEPTH: usize = 8;

/// Using CriticalSectionRawMutex makes it safe across all RTIC priorities
static LINK_EVENTS: Channel<CriticalSectionRawMutex, (EthInterface, EcmEvent), QUEUE_DEPTH> =
    Channel::new();

/// Carrier state for the status LED
pub static LINK_UP: AtomicBool = AtomicBool::new(false);

pub struct QueueListener;

/// The listener registered with the manager
pub static LISTENER: QueueListener = QueueListener;

impl EventListener for QueueListener {
    fn on_event(&self, iface: EthInterface, event: EcmEvent) {
        info!("{}: {}", iface, event);
        match event {
            EcmEvent::Connected => LINK_UP.store(true, Ordering::Relaxed),
            EcmEvent::Disconnected => LINK_UP.store(false, Ordering::Relaxed),
            EcmEvent::IpChanged(_) => {}
        }
        if LINK_EVENTS.try_send((iface, event)).is_err() {
            warn!("{}: event queue full, dropped {}", iface, event);
        }
    }
}

pub fn receiver() -> Receiver<'static, CriticalSectionRawMutex, (EthInterface, EcmEvent), QUEUE_DEPTH>
{
    LINK_EVENTS.receiver()
}
