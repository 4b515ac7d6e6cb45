//! Connection application loop
//!
//! Brings Eth0 up through the manager, connects, and follows link events:
//! a lost link drops the attachment, a returning link reconnects. Failed
//! connects are retried on a fixed interval while the link is up.

use core::convert::Infallible;
use core::net::IpAddr;
use core::sync::atomic::Ordering;

use defmt::{info, warn, Debug2Format};
use ecm_core::hal_abstractions::EthInterface;
use ecm_core::{EcmError, EcmEvent, EthManager, InterfaceHandle, StaticIpSettings};
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};

use super::events::{self, LINK_UP, LISTENER};
use super::{EmbassyNetStack, W5500Mac, W5500Phy};

pub type Manager = EthManager<EmbassyNetStack, W5500Mac, W5500Phy>;

const RECONNECT_INTERVAL: Duration = Duration::from_secs(30);

async fn connect(
    mgr: &Manager,
    handle: &InterfaceHandle,
    settings: Option<&StaticIpSettings>,
) -> bool {
    match mgr.connect(handle, settings).await {
        Ok(ip) => {
            info!("{}: connected, IP {}", handle.interface(), Debug2Format(&ip));
            if let Ok(IpAddr::V4(gateway)) = mgr.gateway_address(handle).await {
                let g = gateway.octets();
                info!("Gateway: {}.{}.{}.{}", g[0], g[1], g[2], g[3]);
            }
            true
        }
        Err(EcmError::LinkTimeout) => {
            info!("{}: no link, waiting for cable", handle.interface());
            false
        }
        Err(e) => {
            warn!("{}: connect failed: {}", handle.interface(), e);
            false
        }
    }
}

/// Run the connection lifecycle for the board's only interface
///
/// Returns only if the manager could not be initialized or the interface
/// could not be created.
pub async fn run(
    mgr: &Manager,
    mac: W5500Mac,
    phy: W5500Phy,
    static_ip: Option<StaticIpSettings>,
) -> Result<Infallible, EcmError> {
    mgr.init().await?;
    let eth0 = mgr.create(EthInterface::Eth0, mac, phy).await?;
    mgr.register_listener(&eth0, &LISTENER).await?;

    let receiver = events::receiver();
    let mut connected = connect(mgr, &eth0, static_ip.as_ref()).await;

    loop {
        match select(receiver.receive(), Timer::after(RECONNECT_INTERVAL)).await {
            Either::First((iface, event)) if iface == eth0.interface() => match event {
                EcmEvent::Connected if !connected => {
                    connected = connect(mgr, &eth0, static_ip.as_ref()).await;
                }
                EcmEvent::Disconnected if connected => {
                    if let Err(e) = mgr.disconnect(&eth0).await {
                        warn!("{}: disconnect failed: {}", iface, e);
                    }
                    connected = false;
                }
                EcmEvent::IpChanged(ip) => {
                    info!("{}: address now {}", iface, Debug2Format(&ip));
                }
                _ => {}
            },
            Either::First(_) => {}
            Either::Second(()) => {
                if !connected && LINK_UP.load(Ordering::Relaxed) {
                    connected = connect(mgr, &eth0, static_ip.as_ref()).await;
                }
            }
        }
    }
}
