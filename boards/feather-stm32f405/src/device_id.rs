//! Device identifier utilities for STM32F405
//!
//! The factory-programmed 96-bit unique device ID is stable across reboots
//! and unique to each chip, which makes it a good seed for a per-board MAC
//! address.

use ecm_core::hal_abstractions::MacAddress;

/// Locally administered, unicast bit pattern for the first octet
const LOCAL_ADMIN: u8 = 0x02;

/// Get the device UID bytes
pub fn uid() -> &'static [u8; 12] {
    embassy_stm32::uid::uid()
}

/// Fold a 96-bit UID into the lower five octets of a MAC address
///
/// Wafer coordinates and lot number are XOR-ed together so boards from the
/// same lot still differ.
pub fn mac_from_uid(uid: &[u8; 12]) -> MacAddress {
    let mut mac = [LOCAL_ADMIN, 0, 0, 0, 0, 0];
    for (i, byte) in uid.iter().enumerate() {
        mac[1 + i % 5] ^= byte;
    }
    mac
}
