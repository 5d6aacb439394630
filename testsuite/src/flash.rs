#![no_std]
#![no_main]

use core::ptr::read_volatile;
use defmt::unwrap;
use defmt_rtt as _; // global logger
use panic_probe as _;
use rand::{Rng as RngTrait, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use stm32f7_flash::{
    cortex_m::{self, peripheral::DWT},
    flash::{self, Domain, Error, Flash, FlashRegs, ProgramWidth, ReadProtection, Sector},
    info, pac,
};

// HSI after reset
const FREQ: u32 = 16_000_000;
const CYC_PER_MICRO: u32 = FREQ / 1000 / 1000;

// the board runs from 3.3 V
const WIDTH: ProgramWidth = ProgramWidth::X32;

// WARNING will wrap-around eventually, use this for relative timing only
defmt::timestamp!("{=u32:us}", DWT::cycle_count() / CYC_PER_MICRO);

#[cortex_m_rt::exception]
#[allow(non_snake_case)]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    cortex_m::interrupt::disable();
    defmt::error!("HardFault {:#}", defmt::Debug2Format(ef));
    defmt::flush();
    loop {
        cortex_m::asm::udf()
    }
}

fn elapsed_micros(start: u32) -> u32 {
    DWT::cycle_count().wrapping_sub(start) / CYC_PER_MICRO
}

#[defmt_test::tests]
mod tests {
    use super::*;

    struct TestArgs {
        flash: Flash<pac::FLASH>,
        sector: Sector,
        rng: ChaCha8Rng,
    }

    #[init]
    fn init() -> TestArgs {
        let mut cp: pac::CorePeripherals = unwrap!(pac::CorePeripherals::take());
        let dp: pac::Peripherals = unwrap!(pac::Peripherals::take());

        cp.DCB.enable_trace();
        cp.DWT.enable_cycle_counter();
        cp.DWT.set_cycle_count(0);

        // the cycle counter is not reset by the debugger, good enough to
        // spread wear across runs
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(u64::from(DWT::cycle_count()));

        // sectors get 10k erase cycles, stay clear of the firmware image
        let sector: u8 = rng.gen_range(8..=Sector::MAX_INDEX);
        let sector: Sector = unwrap!(Sector::from_index(sector));

        defmt::info!(
            "Testing with sector {}, {:#08X}",
            sector.to_index(),
            sector.addr()
        );

        TestArgs {
            flash: Flash::new(dp.FLASH),
            sector,
            rng,
        }
    }

    #[test]
    fn start_end_addrs() {
        defmt::debug!("FLASH_START={:#08X}", flash::FLASH_START);
        defmt::debug!("flash_end()={:#08X}", flash::flash_end());
        defmt::assert_eq!(info::flash_size_kibibyte(), 2048);
        defmt::assert_eq!(flash::FLASH_START, 0x0800_0000);
        defmt::assert_eq!(flash::flash_end(), 0x081F_FFFF);
        defmt::assert_eq!(
            Sector::from_addr(flash::flash_end()),
            Sector::from_index(Sector::MAX_INDEX)
        );

        // ensure previous logs are seen before we start executing code that can
        // result in difficult-to-debug situations
        defmt::flush();
    }

    #[test]
    fn lock_unlock(ta: &mut TestArgs) {
        defmt::assert!(ta.flash.is_locked(Domain::Main));
        defmt::assert_eq!(ta.flash.ensure_unlocked(Domain::Main), Err(Error::Locked));

        ta.flash.unlock(Domain::Main);
        defmt::assert!(!ta.flash.is_locked(Domain::Main));
        defmt::assert_eq!(ta.flash.ensure_unlocked(Domain::Main), Ok(()));

        ta.flash.lock(Domain::Main);
        defmt::assert!(ta.flash.is_locked(Domain::Main));

        {
            let _guard = ta.flash.unlocked();
        }
        defmt::assert!(ta.flash.is_locked(Domain::Main));
    }

    #[test]
    fn option_bytes(ta: &mut TestArgs) {
        let optcr: flash::Optcr = ta.flash.option_bytes();
        defmt::debug!("FLASH_OPTCR={:#08X}", optcr.raw());
        defmt::assert!(optcr.locked());
        defmt::assert_eq!(optcr.read_protection(), ReadProtection::Level0);
        defmt::assert!(!optcr.write_protected(ta.sector.to_index()));
    }

    #[test]
    fn sector_erase(ta: &mut TestArgs) {
        defmt::debug!("data at sector start before erase: {:#08X}", unsafe {
            read_volatile(ta.sector.addr() as *const u64)
        });

        let idx: u8 = ta.sector.to_index();
        let mut flash = ta.flash.unlocked();
        flash.clear_status_flags();

        let start: u32 = DWT::cycle_count();
        unsafe { flash.erase_sector(idx, WIDTH) };
        defmt::info!(
            "{=usize} KiB sector erase duration: {=u32:us} seconds",
            ta.sector.size() / 1024,
            elapsed_micros(start)
        );

        defmt::assert_eq!(flash.status().error(), None);
        defmt::assert!(flash.status().eop());
        defmt::assert_eq!(
            unsafe { read_volatile(ta.sector.addr() as *const u64) },
            u64::MAX
        );
        defmt::assert_eq!(
            unsafe { read_volatile((ta.sector.addr() + ta.sector.size() - 8) as *const u64) },
            u64::MAX
        );
    }

    #[test]
    fn program_word(ta: &mut TestArgs) {
        let addr: usize = ta.sector.addr();
        let data: u32 = ta.rng.gen_range(1..u32::MAX - 1);
        defmt::info!("Writing {:#08X} to {:#08X}", data, addr);

        let mut flash = ta.flash.unlocked();
        flash.clear_status_flags();

        let start: u32 = DWT::cycle_count();
        unsafe { flash.program(addr, data) };
        defmt::info!("4B program duration: {=u32:us} seconds", elapsed_micros(start));

        defmt::assert_eq!(flash.status().error(), None);
        defmt::assert_eq!(unsafe { read_volatile(addr as *const u32) }, data);
    }

    #[test]
    fn program_misaligned(ta: &mut TestArgs) {
        let addr: usize = ta.sector.addr() + 0x101;

        let mut flash = ta.flash.unlocked();
        flash.clear_status_flags();
        unsafe { flash.program(addr, 0x1234_5678_u32) };

        // the core splits an unaligned store, depending on how the pieces
        // land the controller reports an alignment or a parallelism error
        let err: Option<Error> = flash.status().error();
        defmt::debug!("misaligned program: {}", err);
        defmt::assert!(matches!(err, Some(Error::Align | Error::Prog)));
        defmt::assert_eq!(unsafe { read_volatile((addr - 1) as *const u64) }, u64::MAX);
        flash.clear_status_flags();
        defmt::assert_eq!(flash.status().error(), None);
    }

    #[test]
    fn program_block(ta: &mut TestArgs) {
        let addr: usize = ta.sector.addr() + 0x201;
        let mut buf: [u8; 37] = [0; 37];
        ta.rng.fill_bytes(&mut buf);

        let mut flash = ta.flash.unlocked();
        flash.clear_status_flags();

        let start: u32 = DWT::cycle_count();
        unsafe { flash.program_block(addr, &buf) };
        defmt::info!(
            "{=usize}B bytewise program duration: {=u32:us} seconds",
            buf.len(),
            elapsed_micros(start)
        );

        defmt::assert_eq!(flash.status().error(), None);
        let written: &[u8] = unsafe { core::slice::from_raw_parts(addr as *const u8, buf.len()) };
        defmt::assert_eq!(written, &buf[..]);
    }

    #[test]
    fn program_block_wide(ta: &mut TestArgs) {
        let addr: usize = ta.sector.addr() + 0x403;
        let mut buf: [u8; 61] = [0; 61];
        ta.rng.fill_bytes(&mut buf);

        let mut flash = ta.flash.unlocked();
        flash.clear_status_flags();

        let start: u32 = DWT::cycle_count();
        unsafe { flash.program_block_wide(addr, &buf, WIDTH) };
        defmt::info!(
            "{=usize}B wide program duration: {=u32:us} seconds",
            buf.len(),
            elapsed_micros(start)
        );

        defmt::assert_eq!(flash.status().error(), None);
        let written: &[u8] = unsafe { core::slice::from_raw_parts(addr as *const u8, buf.len()) };
        defmt::assert_eq!(written, &buf[..]);
    }

    #[test]
    fn program_twice(ta: &mut TestArgs) {
        let addr: usize = ta.sector.addr() + 0x800;

        let mut flash = ta.flash.unlocked();
        flash.clear_status_flags();
        unsafe {
            flash.program(addr, 0x0F_u8);
            flash.program(addr, 0xF0_u8);
        }

        defmt::assert_eq!(flash.status().error(), Some(Error::Prog));
        flash.clear_status_flags();
    }

    #[test]
    fn wait_states(ta: &mut TestArgs) {
        let ws: u8 = unwrap!(flash::wait_states(FREQ, 3300));
        defmt::assert_eq!(ws, 0);

        ta.flash.set_wait_states(1);
        defmt::assert_eq!(ta.flash.regs().acr().latency(), 1);
        ta.flash.set_wait_states(ws);
        defmt::assert_eq!(ta.flash.regs().acr().latency(), ws);

        ta.flash.disable_art();
        ta.flash.reset_art();
        ta.flash.enable_art();
        ta.flash.enable_prefetch();
        defmt::assert!(ta.flash.regs().acr().art());
        defmt::assert!(ta.flash.regs().acr().prefetch());
    }
}
