//! W5500 FeatherWing bring-up
//!
//! The W5500 runs in MACRAW mode under embassy-net, so its internal PHY and
//! MAC are driven through the chip's own registers. This module only resets
//! the chip and hands back the embassy-net device and runner.

use defmt::info;
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice as SpiDeviceBus;
use embassy_net_wiznet::chip::W5500;
use embassy_net_wiznet::{Device, InitError, Runner};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Async;
use embassy_stm32::spi::Spi;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;

type SpiBus = Mutex<CriticalSectionRawMutex, Spi<'static, Async>>;
type W5500Spi = SpiDeviceBus<'static, CriticalSectionRawMutex, Spi<'static, Async>, Output<'static>>;

/// Runner that must be polled continuously for the device to move frames
pub type W5500Runner = Runner<'static, W5500, W5500Spi, ExtiInput<'static>, Output<'static>>;

/// Error surfaced by the wiznet driver during bring-up
pub type W5500InitError = InitError<<W5500Spi as embedded_hal_async::spi::ErrorType>::Error>;

/// Ethernet peripherals bundle
pub struct EthPeripherals<'a> {
    pub spi: Spi<'a, Async>,
    pub cs: Output<'a>,
    pub reset: Output<'a>,
    pub int: ExtiInput<'a>,
}

/// Reset the W5500 and program `mac_addr`
///
/// May only be called once; the SPI bus and driver state live in statics.
pub async fn init_w5500(
    periph: EthPeripherals<'static>,
    mac_addr: [u8; 6],
) -> Result<(Device<'static>, W5500Runner), W5500InitError> {
    let EthPeripherals {
        spi,
        cs,
        mut reset,
        int,
    } = periph;

    info!("Performing W5500 hardware reset...");
    reset.set_low();
    embassy_time::Timer::after_millis(1).await;
    reset.set_high();
    embassy_time::Timer::after_millis(2).await;

    static SPI_BUS: StaticCell<SpiBus> = StaticCell::new();
    let spi_bus = SPI_BUS.init(Mutex::new(spi));
    let spi_device = SpiDeviceBus::new(spi_bus, cs);

    info!(
        "MAC address: {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac_addr[0], mac_addr[1], mac_addr[2], mac_addr[3], mac_addr[4], mac_addr[5]
    );

    static STATE: StaticCell<embassy_net_wiznet::State<8, 8>> = StaticCell::new();
    let state = STATE.init(embassy_net_wiznet::State::<8, 8>::new());

    let (device, runner) = embassy_net_wiznet::new(mac_addr, state, spi_device, int, reset).await?;
    info!("W5500 initialized");

    Ok((device, runner))
}
