// Erases the last sector, then writes a record to it.

#![no_std]
#![no_main]

use core::ptr::read_volatile;
use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f7_flash::{
    self as hal,
    flash::{self, Flash, ProgramWidth, Sector},
    pac,
};

const RECORD: &[u8] = b"stm32f7-flash demo record";

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let mut flash: Flash<pac::FLASH> = Flash::new(dp.FLASH);

    let sector: Sector = defmt::unwrap!(Sector::from_addr(flash::flash_end()));
    let width: ProgramWidth = defmt::unwrap!(ProgramWidth::max_for_voltage(3300));
    defmt::info!("Using sector {} at {:#08X}", sector, sector.addr());

    {
        let mut flash = flash.unlocked();
        flash.clear_status_flags();

        unsafe { flash.erase_sector(sector.to_index(), width) };
        if let Some(e) = flash.status().error() {
            defmt::panic!("erase failed: {}", e);
        }

        unsafe { flash.program_block_wide(sector.addr(), RECORD, width) };
        if let Some(e) = flash.status().error() {
            defmt::panic!("program failed: {}", e);
        }
    }

    let written: &[u8] =
        unsafe { core::slice::from_raw_parts(sector.addr() as *const u8, RECORD.len()) };
    defmt::assert_eq!(written, RECORD);
    defmt::info!("First word: {:#010X}", unsafe {
        read_volatile(sector.addr() as *const u32)
    });
    defmt::info!("Main domain locked: {}", flash.is_locked(flash::Domain::Main));

    loop {
        hal::cortex_m::asm::bkpt();
    }
}
