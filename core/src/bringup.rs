//! Interface hardware bring-up
//!
//! Runs before a port is published, so the MAC and PHY are owned locally and
//! no per-port lock is involved. PHY failures are logged and skipped; only a
//! MAC configuration failure aborts.

use embassy_time::Timer;
use hal_abstractions::{Duplex, EthInterface, MacDriver, PhyConfig, PhyDriver, PhyError, PhySpeed};

use crate::config::Timing;
use crate::error::EcmError;
use crate::retry::{poll_until, PollPolicy};
use crate::speed::mac_link_config;

fn phy_step(iface: EthInterface, step: &'static str, result: Result<(), PhyError>) {
    if let Err(e) = result {
        warn!("{}: PHY {} failed: {}", iface, step, e);
    }
}

/// Start auto-negotiation and adopt the link partner's best mode
async fn negotiate<P: PhyDriver>(
    iface: EthInterface,
    phy: &mut P,
    requested: PhyConfig,
    timing: &Timing,
) -> PhyConfig {
    let mut resolved = requested;

    phy_step(iface, "init", phy.init(iface));
    phy_step(
        iface,
        "configure",
        phy.configure(iface, Duplex::Auto, PhySpeed::Auto),
    );
    Timer::after(timing.autoneg_settle).await;

    let policy = PollPolicy::new(timing.autoneg_poll, timing.autoneg_timeout);
    let complete = poll_until(policy, || {
        let status = phy.auto_negotiation_complete(iface);
        async move {
            match status {
                Ok(true) => Some(true),
                Ok(false) => None,
                Err(_) => Some(false),
            }
        }
    })
    .await;
    if complete != Some(true) {
        warn!("{}: auto-negotiation did not complete", iface);
    }

    match phy.link_partner_capability(iface) {
        Ok((duplex, speed)) => {
            resolved.duplex = duplex;
            resolved.speed = speed;
        }
        Err(e) => warn!("{}: link partner capability unavailable: {}", iface, e),
    }
    resolved
}

/// Configure MAC and PHY for `iface` and wait (non-fatally) for a link
///
/// `first_time` is false when this MAC was configured in an earlier
/// create/destroy cycle; the PHY is then only re-initialized and its current
/// mode read back. Returns the resolved PHY mode.
pub(crate) async fn bring_up<M, P>(
    iface: EthInterface,
    mac: &mut M,
    phy: &mut P,
    requested: PhyConfig,
    first_time: bool,
    timing: &Timing,
) -> Result<PhyConfig, EcmError>
where
    M: MacDriver,
    P: PhyDriver,
{
    let mut resolved = requested;

    if !first_time {
        phy_step(iface, "init", phy.init(iface));
        if requested.is_auto() {
            match phy.link_speed(iface) {
                Ok((duplex, speed)) => {
                    resolved.duplex = duplex;
                    resolved.speed = speed;
                }
                Err(e) => warn!("{}: link speed unavailable: {}", iface, e),
            }
        }
    } else if requested.is_auto() {
        resolved = negotiate(iface, phy, requested, timing).await;
    }

    let link = mac_link_config(resolved.interface, resolved.speed);
    debug!("{}: MAC link config {}", iface, link);
    mac.configure(&link).map_err(|e| {
        error!("{}: MAC configuration failed: {}", iface, e);
        EcmError::InterfaceError
    })?;

    if first_time && !requested.is_auto() {
        phy_step(iface, "init", phy.init(iface));
    }
    phy_step(iface, "reset", phy.reset(iface));
    phy_step(iface, "discover", phy.discover(iface));
    phy_step(
        iface,
        "configure",
        phy.configure(iface, resolved.duplex, resolved.speed),
    );
    phy_step(
        iface,
        "extended registers",
        phy.enable_extended_registers(iface, resolved.speed),
    );

    let policy = PollPolicy::new(timing.link_poll_step, timing.startup_link_wait);
    let linked = poll_until(policy, || {
        let up = matches!(phy.link_status(iface), Ok(true));
        async move { up.then_some(()) }
    })
    .await;
    match linked {
        Some(()) => info!("{}: link up", iface),
        None => info!("{}: no link yet, monitor will report it", iface),
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;
    use embassy_time::Duration;
    use hal_abstractions::{FilterAddress, MacError, MacInterfaceSelect, MacLinkConfig, SpeedType};

    use super::*;

    #[derive(Default)]
    struct ScriptedPhy {
        calls: Vec<&'static str>,
        configured: Vec<(Duplex, PhySpeed)>,
        partner: Option<(Duplex, PhySpeed)>,
        current: Option<(Duplex, PhySpeed)>,
        link: bool,
    }

    impl PhyDriver for ScriptedPhy {
        fn init(&mut self, _: EthInterface) -> Result<(), PhyError> {
            self.calls.push("init");
            Ok(())
        }
        fn configure(&mut self, _: EthInterface, d: Duplex, s: PhySpeed) -> Result<(), PhyError> {
            self.calls.push("configure");
            self.configured.push((d, s));
            Ok(())
        }
        fn reset(&mut self, _: EthInterface) -> Result<(), PhyError> {
            self.calls.push("reset");
            Err(PhyError::Bus)
        }
        fn discover(&mut self, _: EthInterface) -> Result<(), PhyError> {
            self.calls.push("discover");
            Ok(())
        }
        fn enable_extended_registers(&mut self, _: EthInterface, _: PhySpeed) -> Result<(), PhyError> {
            self.calls.push("extended");
            Ok(())
        }
        fn auto_negotiation_complete(&mut self, _: EthInterface) -> Result<bool, PhyError> {
            Ok(true)
        }
        fn link_partner_capability(&mut self, _: EthInterface) -> Result<(Duplex, PhySpeed), PhyError> {
            self.partner.ok_or(PhyError::Bus)
        }
        fn link_speed(&mut self, _: EthInterface) -> Result<(Duplex, PhySpeed), PhyError> {
            self.current.ok_or(PhyError::Bus)
        }
        fn link_status(&mut self, _: EthInterface) -> Result<bool, PhyError> {
            Ok(self.link)
        }
    }

    #[derive(Default)]
    struct RecordingMac {
        link: Option<MacLinkConfig>,
        reject: bool,
    }

    impl MacDriver for RecordingMac {
        fn configure(&mut self, link: &MacLinkConfig) -> Result<(), MacError> {
            if self.reject {
                return Err(MacError::Config);
            }
            self.link = Some(*link);
            Ok(())
        }
        fn set_promiscuous(&mut self, _: bool) -> Result<(), MacError> {
            Ok(())
        }
        fn set_broadcast_reject(&mut self, _: bool) -> Result<(), MacError> {
            Ok(())
        }
        fn set_filter_address(&mut self, _: u8, _: &FilterAddress) -> Result<(), MacError> {
            Ok(())
        }
        fn release(&mut self) {}
    }

    fn timing() -> Timing {
        Timing {
            autoneg_settle: Duration::from_millis(1),
            autoneg_poll: Duration::from_millis(1),
            autoneg_timeout: Duration::from_millis(20),
            link_poll_step: Duration::from_millis(1),
            startup_link_wait: Duration::from_millis(10),
            ..Timing::default()
        }
    }

    #[test]
    fn test_autoneg_adopts_partner_mode() {
        let mut phy = ScriptedPhy {
            partner: Some((Duplex::Full, PhySpeed::M100)),
            link: true,
            ..Default::default()
        };
        let mut mac = RecordingMac::default();
        let resolved = block_on(bring_up(
            EthInterface::Eth0,
            &mut mac,
            &mut phy,
            PhyConfig::default(),
            true,
            &timing(),
        ))
        .unwrap();

        assert_eq!(resolved.speed, PhySpeed::M100);
        assert_eq!(resolved.duplex, Duplex::Full);
        assert_eq!(mac.link.map(|l| l.select), Some(MacInterfaceSelect::Rgmii100));
        assert_eq!(
            phy.calls,
            ["init", "configure", "reset", "discover", "configure", "extended"]
        );
        assert_eq!(phy.configured[0], (Duplex::Auto, PhySpeed::Auto));
        assert_eq!(phy.configured[1], (Duplex::Full, PhySpeed::M100));
    }

    #[test]
    fn test_fixed_mode_inits_phy_after_mac() {
        let mut phy = ScriptedPhy::default();
        let mut mac = RecordingMac::default();
        let requested = PhyConfig {
            interface: SpeedType::Rmii,
            speed: PhySpeed::M10,
            duplex: Duplex::Half,
        };
        let resolved = block_on(bring_up(
            EthInterface::Eth1,
            &mut mac,
            &mut phy,
            requested,
            true,
            &timing(),
        ))
        .unwrap();

        assert_eq!(resolved, requested);
        assert_eq!(mac.link.map(|l| l.ref_clock_div), Some(10));
        assert_eq!(phy.calls, ["init", "reset", "discover", "configure", "extended"]);
    }

    #[test]
    fn test_reinit_reads_back_current_mode() {
        let mut phy = ScriptedPhy {
            current: Some((Duplex::Full, PhySpeed::M1000)),
            link: true,
            ..Default::default()
        };
        let mut mac = RecordingMac::default();
        let resolved = block_on(bring_up(
            EthInterface::Eth0,
            &mut mac,
            &mut phy,
            PhyConfig::default(),
            false,
            &timing(),
        ))
        .unwrap();

        assert_eq!(resolved.speed, PhySpeed::M1000);
        assert_eq!(phy.calls[0], "init");
        assert_eq!(phy.calls.iter().filter(|c| **c == "init").count(), 1);
    }

    #[test]
    fn test_mac_failure_aborts() {
        let mut phy = ScriptedPhy::default();
        let mut mac = RecordingMac {
            reject: true,
            ..Default::default()
        };
        let result = block_on(bring_up(
            EthInterface::Eth0,
            &mut mac,
            &mut phy,
            PhyConfig::default(),
            true,
            &timing(),
        ));
        assert_eq!(result, Err(EcmError::InterfaceError));
        assert!(!phy.calls.contains(&"reset"));
    }
}
