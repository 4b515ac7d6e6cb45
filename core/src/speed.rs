//! MAC interface selection from PHY wiring and line rate

use hal_abstractions::{MacInterfaceSelect, MacLinkConfig, PhySpeed, SpeedType};

/// Reference clock divider for a 10 Mb/s link (25 MHz to 2.5 MHz)
const REF_CLOCK_DIV_10M: u8 = 10;

/// Pick the MAC interface mode and TX clock divider for a resolved speed
///
/// `Auto` falls back to the fastest rate the wiring supports, except on MII
/// which tops out at 100 Mb/s.
pub fn mac_link_config(interface: SpeedType, speed: PhySpeed) -> MacLinkConfig {
    let select = match interface {
        SpeedType::Mii => match speed {
            PhySpeed::M10 => MacInterfaceSelect::Mii10,
            _ => MacInterfaceSelect::Mii100,
        },
        SpeedType::Gmii => MacInterfaceSelect::Gmii1000,
        SpeedType::Rgmii => match speed {
            PhySpeed::M10 => MacInterfaceSelect::Rgmii10,
            PhySpeed::M100 => MacInterfaceSelect::Rgmii100,
            PhySpeed::M1000 | PhySpeed::Auto => MacInterfaceSelect::Rgmii1000,
        },
        SpeedType::Rmii => match speed {
            PhySpeed::M10 => MacInterfaceSelect::Rmii10,
            _ => MacInterfaceSelect::Rmii100,
        },
    };

    let ref_clock_div = match speed {
        PhySpeed::M10 => REF_CLOCK_DIV_10M,
        _ => 1,
    };

    MacLinkConfig {
        select,
        ref_clock_div,
    }
}
