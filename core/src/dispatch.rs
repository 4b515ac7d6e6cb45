//! Event fan-out to registered listeners
//!
//! Listeners live in a fixed number of slots. Delivery copies the slot array
//! out first so no lock is held while user code runs.

use core::net::IpAddr;

use hal_abstractions::EthInterface;

use crate::error::EcmError;

/// Maximum number of simultaneously registered listeners
pub const MAX_CALLBACKS: usize = 3;

/// Connection events delivered to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcmEvent {
    /// Physical link came up
    Connected,
    /// Physical link went down
    Disconnected,
    /// Interface address changed; carries the new IPv4 address
    IpChanged(IpAddr),
}

#[cfg(feature = "defmt")]
impl defmt::Format for EcmEvent {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Connected => defmt::write!(f, "Connected"),
            Self::Disconnected => defmt::write!(f, "Disconnected"),
            Self::IpChanged(addr) => {
                defmt::write!(f, "IpChanged({})", defmt::Debug2Format(addr))
            }
        }
    }
}

/// Receiver of connection events
///
/// Called from the link monitor task. Implementations must not call
/// blocking manager operations such as `destroy`.
pub trait EventListener: Sync {
    fn on_event(&self, iface: EthInterface, event: EcmEvent);
}

/// Registered listener reference; identity is the referent's address
pub type Listener = &'static dyn EventListener;

fn same_listener(a: Listener, b: Listener) -> bool {
    core::ptr::addr_eq(a as *const dyn EventListener, b as *const dyn EventListener)
}

/// Fixed-capacity listener table
pub struct CallbackSlots<const N: usize> {
    slots: [Option<Listener>; N],
}

impl<const N: usize> CallbackSlots<N> {
    pub const fn new() -> Self {
        Self { slots: [None; N] }
    }

    /// Store `listener` in the first free slot and return its index
    ///
    /// The same listener may be registered more than once.
    pub fn register(&mut self, listener: Listener) -> Result<usize, EcmError> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(EcmError::TooManyCallbacks)?;
        *slot = Some(listener);
        Ok(index)
    }

    /// Clear the first slot holding `listener`; false when none matched
    pub fn deregister(&mut self, listener: Listener) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|slot| slot.is_some_and(|l| same_listener(l, listener)))
        {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots = [None; N];
    }

    /// Copy of the slot array for lock-free delivery
    pub fn snapshot(&self) -> [Option<Listener>; N] {
        self.slots
    }
}

impl<const N: usize> Default for CallbackSlots<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Invoke every occupied slot, in slot order
pub fn deliver(slots: &[Option<Listener>], iface: EthInterface, event: EcmEvent) {
    for listener in slots.iter().flatten() {
        listener.on_event(iface, event);
    }
}
