//! W5500 MACRAW socket as the MAC block
//!
//! Socket 0 runs in MACRAW mode under embassy-net-wiznet, which exposes no
//! filter or broadcast controls. Only the permissive defaults are accepted.

use defmt::{debug, info};
use ecm_core::hal_abstractions::{
    FilterAddress, MacDriver, MacError, MacInterfaceSelect, MacLinkConfig,
};

#[derive(Default)]
pub struct W5500Mac {
    link: Option<MacLinkConfig>,
}

impl MacDriver for W5500Mac {
    fn configure(&mut self, link: &MacLinkConfig) -> Result<(), MacError> {
        match link.select {
            MacInterfaceSelect::Mii10 | MacInterfaceSelect::Mii100 => {
                info!("MAC configured for {}", link.select);
                self.link = Some(*link);
                Ok(())
            }
            _ => Err(MacError::Config),
        }
    }

    fn set_promiscuous(&mut self, enable: bool) -> Result<(), MacError> {
        // MACRAW already delivers every frame addressed to us or broadcast
        if enable {
            return Err(MacError::Unsupported);
        }
        Ok(())
    }

    fn set_broadcast_reject(&mut self, reject: bool) -> Result<(), MacError> {
        if reject {
            return Err(MacError::Unsupported);
        }
        Ok(())
    }

    fn set_filter_address(&mut self, slot: u8, _filter: &FilterAddress) -> Result<(), MacError> {
        debug!("MAC filter slot {} requested", slot);
        Err(MacError::Unsupported)
    }

    fn release(&mut self) {
        if self.link.take().is_some() {
            info!("MAC released");
        }
    }
}
