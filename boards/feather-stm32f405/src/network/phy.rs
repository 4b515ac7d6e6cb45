//! W5500 embedded PHY
//!
//! embassy-net-wiznet owns the chip's register file, so carrier comes from the
//! stack's link state and the line mode is whatever was last programmed.

use defmt::debug;
use ecm_core::hal_abstractions::{Duplex, EthInterface, PhyDriver, PhyError, PhySpeed};
use embassy_net::Stack;

pub struct W5500Phy {
    stack: Stack<'static>,
    mode: (Duplex, PhySpeed),
}

impl W5500Phy {
    pub fn new(stack: Stack<'static>) -> Self {
        Self {
            stack,
            mode: (Duplex::Full, PhySpeed::M100),
        }
    }

    fn check(iface: EthInterface) -> Result<(), PhyError> {
        match iface {
            EthInterface::Eth0 => Ok(()),
            EthInterface::Eth1 => Err(PhyError::NotFound),
        }
    }
}

impl PhyDriver for W5500Phy {
    fn init(&mut self, iface: EthInterface) -> Result<(), PhyError> {
        Self::check(iface)
    }

    fn configure(
        &mut self,
        iface: EthInterface,
        duplex: Duplex,
        speed: PhySpeed,
    ) -> Result<(), PhyError> {
        Self::check(iface)?;
        if speed == PhySpeed::M1000 {
            return Err(PhyError::Unsupported);
        }
        // Auto leaves the chip's negotiated mode in place
        if duplex != Duplex::Auto && speed != PhySpeed::Auto {
            debug!("{}: PHY mode {} {}", iface, duplex, speed);
            self.mode = (duplex, speed);
        }
        Ok(())
    }

    fn reset(&mut self, iface: EthInterface) -> Result<(), PhyError> {
        Self::check(iface)
    }

    fn discover(&mut self, iface: EthInterface) -> Result<(), PhyError> {
        Self::check(iface)
    }

    fn enable_extended_registers(
        &mut self,
        iface: EthInterface,
        _speed: PhySpeed,
    ) -> Result<(), PhyError> {
        Self::check(iface)
    }

    fn auto_negotiation_complete(&mut self, iface: EthInterface) -> Result<bool, PhyError> {
        Self::check(iface)?;
        Ok(self.stack.is_link_up())
    }

    fn link_partner_capability(
        &mut self,
        iface: EthInterface,
    ) -> Result<(Duplex, PhySpeed), PhyError> {
        Self::check(iface)?;
        Err(PhyError::Unsupported)
    }

    fn link_speed(&mut self, iface: EthInterface) -> Result<(Duplex, PhySpeed), PhyError> {
        Self::check(iface)?;
        Ok(self.mode)
    }

    fn link_status(&mut self, iface: EthInterface) -> Result<bool, PhyError> {
        Self::check(iface)?;
        Ok(self.stack.is_link_up())
    }
}
