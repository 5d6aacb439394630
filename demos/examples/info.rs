// Prints the flash configuration, should work for all STM32F76x boards.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f7_flash::{
    self as hal,
    flash::{Flash, FlashRegs, Optcr, Sector, flash_end},
    info, pac,
};

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let flash: Flash<pac::FLASH> = Flash::new(dp.FLASH);

    defmt::info!("Flash size: {} KiB", info::flash_size_kibibyte());
    defmt::info!("Flash end: {:#08X}", flash_end());
    defmt::info!("Last sector: {}", Sector::from_addr(flash_end()));
    defmt::info!("Latency: {} wait states", flash.regs().acr().latency());

    let optcr: Optcr = flash.option_bytes();
    defmt::info!("Read protection: {}", optcr.read_protection());
    defmt::info!("Brown-out level: {}", optcr.bor_level());
    (0..=Sector::MAX_INDEX)
        .filter(|&idx| optcr.write_protected(idx))
        .for_each(|idx| defmt::info!("Sector {} is write protected", idx));

    loop {
        hal::cortex_m::asm::bkpt();
    }
}
