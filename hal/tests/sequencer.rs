mod common;

use common::{Event, GARBAGE, SimFlash, sector_addr, sector_size};
use stm32f7_flash::{
    flash::{BorLevel, Domain, Flash, FlashRegs, Optcr, ProgramWidth, ReadProtection, Sr},
    nb,
};

fn unlocked(sim: &mut SimFlash) -> Flash<&mut SimFlash> {
    let mut flash = Flash::new(sim);
    flash.unlock(Domain::Main);
    flash
}

fn all_erased(sim: &SimFlash, addr: usize, len: usize) -> bool {
    sim.read(addr, len).iter().all(|&b| b == 0xFF)
}

#[test]
fn wait_until_idle_returns_immediately() {
    let mut sim = SimFlash::new();
    let flash = Flash::new(&mut sim);
    flash.wait_until_idle();
    assert_eq!(sim.events(), [Event::Barrier, Event::ReadSr { busy: false }]);
}

#[test]
fn wait_until_idle_polls_busy() {
    let mut sim = SimFlash::new();
    sim.set_busy(4);
    let flash = Flash::new(&mut sim);
    flash.wait_until_idle();

    let events: Vec<Event> = sim.events();
    assert_eq!(events.first(), Some(&Event::Barrier));
    assert_eq!(events.last(), Some(&Event::ReadSr { busy: false }));
    assert_eq!(events.len(), 6);
}

#[test]
fn poll_idle() {
    let mut sim = SimFlash::new();
    sim.set_busy(2);
    let flash = Flash::new(&mut sim);
    assert_eq!(flash.poll_idle(), Err(nb::Error::WouldBlock));
    assert_eq!(flash.poll_idle(), Err(nb::Error::WouldBlock));
    assert_eq!(flash.poll_idle(), Ok(()));
}

#[test]
fn erase_sector_erases_only_that_sector() {
    let mut sim = SimFlash::new();
    let mut flash = unlocked(&mut sim);
    unsafe { flash.erase_sector(2, ProgramWidth::X32) };

    let cr = flash.regs().cr();
    assert!(!cr.sector_erase());
    assert_eq!(cr.sector(), 0);
    assert!(!cr.start());
    assert_eq!(cr.program_width(), ProgramWidth::X32);

    assert!(all_erased(&sim, sector_addr(2), sector_size(2)));
    assert_eq!(sim.read_u8(sector_addr(2) - 1), GARBAGE);
    assert_eq!(sim.read_u8(sector_addr(3)), GARBAGE);
    assert!(sim.sr().eop());
}

#[test]
fn erase_sector_masks_sector_number() {
    let mut sim = SimFlash::new();
    let mut flash = unlocked(&mut sim);
    // 0x21 & 0x1F == 1
    unsafe { flash.erase_sector(0x21, ProgramWidth::X8) };

    assert!(all_erased(&sim, sector_addr(1), sector_size(1)));
    assert_eq!(sim.read_u8(sector_addr(0)), GARBAGE);
    assert_eq!(sim.read_u8(sector_addr(2)), GARBAGE);
}

#[test]
fn erase_all() {
    let mut sim = SimFlash::new();
    let mut flash = unlocked(&mut sim);
    unsafe { flash.erase_all(ProgramWidth::X16) };

    let cr = flash.regs().cr();
    assert!(!cr.mass_erase());
    assert!(!cr.any_op());
    assert!(all_erased(&sim, sector_addr(0), common::SIZE));
}

#[test]
fn erase_all_waits_for_operation_in_flight() {
    let mut sim = SimFlash::new();
    Flash::new(&mut sim).unlock(Domain::Main);
    sim.clear_events();
    sim.set_busy(5);

    unsafe { Flash::new(&mut sim).erase_all(ProgramWidth::X32) };
    assert_eq!(sim.violations(), 0);

    let events: Vec<Event> = sim.events();
    let idle: usize = events
        .iter()
        .position(|e| *e == Event::ReadSr { busy: false })
        .unwrap();
    let first_write: usize = events
        .iter()
        .position(|e| matches!(e, Event::WriteCr(_)))
        .unwrap();
    let trigger: usize = events
        .iter()
        .position(|e| matches!(e, Event::WriteCr(cr) if cr.start()))
        .unwrap();
    assert!(idle < first_write);
    assert!(first_write < trigger);
    assert_eq!(
        events[..idle]
            .iter()
            .filter(|e| **e == Event::ReadSr { busy: true })
            .count(),
        5
    );
    assert!(all_erased(&sim, sector_addr(0), common::SIZE));
}

#[test]
fn every_operation_is_bracketed() {
    let mut sim = SimFlash::new();
    let base: usize = sector_addr(4);
    let mut flash = unlocked(&mut sim);
    unsafe {
        flash.erase_sector(4, ProgramWidth::X32);
        flash.program(base, 0xAA55_u16);
        flash.program_block(base + 2, &[1, 2, 3, 4, 5]);
    }
    assert_eq!(sim.violations(), 0);

    // every busy poll is preceded by a barrier
    let events: Vec<Event> = sim.events();
    for (idx, event) in events.iter().enumerate() {
        if let Event::ReadSr { .. } = event {
            assert!(matches!(
                events[idx - 1],
                Event::Barrier | Event::ReadSr { busy: true }
            ));
        }
    }
}

#[test]
fn program_each_width() {
    let mut sim = SimFlash::new();
    let base: usize = sector_addr(1);
    let mut flash = unlocked(&mut sim);
    unsafe {
        flash.erase_sector(1, ProgramWidth::X32);
        flash.program(base, 0x5A_u8);
        flash.program(base + 2, 0xBEEF_u16);
        flash.program(base + 4, 0xDEAD_BEEF_u32);
        flash.program(base + 8, 0x0123_4567_89AB_CDEF_u64);
    }

    let cr = flash.regs().cr();
    assert!(!cr.program());
    assert_eq!(cr.program_width(), ProgramWidth::X64);

    assert_eq!(sim.read_u8(base), 0x5A);
    assert_eq!(sim.read_u8(base + 1), 0xFF);
    assert_eq!(sim.read_u16(base + 2), 0xBEEF);
    assert_eq!(sim.read_u32(base + 4), 0xDEAD_BEEF);
    assert_eq!(sim.read_u64(base + 8), 0x0123_4567_89AB_CDEF);
    assert_eq!(
        sim.flash_writes(),
        [
            ProgramWidth::X8,
            ProgramWidth::X16,
            ProgramWidth::X32,
            ProgramWidth::X64
        ]
    );
    assert!(!sim.sr().has_error());
}

#[test]
fn program_sets_width_before_enable() {
    let mut sim = SimFlash::new();
    let base: usize = sector_addr(0);
    let mut flash = unlocked(&mut sim);
    unsafe { flash.erase_sector(0, ProgramWidth::X8) };
    sim.clear_events();

    unsafe { Flash::new(&mut sim).program(base, 0x1234_u16) };
    let crs: Vec<_> = sim
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::WriteCr(cr) => Some(cr),
            _ => None,
        })
        .collect();
    assert_eq!(crs.len(), 3);
    assert_eq!(crs[0].program_width(), ProgramWidth::X16);
    assert!(!crs[0].program());
    assert!(crs[1].program());
    assert_eq!(crs[1].program_width(), ProgramWidth::X16);
    assert!(!crs[2].program());
}

#[test]
fn program_block_empty_is_noop() {
    let mut sim = SimFlash::new();
    let base: usize = sector_addr(1);
    let mut flash = unlocked(&mut sim);
    unsafe { flash.erase_sector(1, ProgramWidth::X32) };
    sim.clear_events();

    unsafe { Flash::new(&mut sim).program_block(base, &[]) };
    assert!(sim.events().is_empty());
    assert!(all_erased(&sim, sector_addr(1), sector_size(1)));
}

#[test]
fn program_block_single_byte() {
    let mut sim = SimFlash::new();
    let base: usize = sector_addr(1);
    let mut flash = unlocked(&mut sim);
    unsafe {
        flash.erase_sector(1, ProgramWidth::X32);
        flash.program_block(base + 7, &[0x42]);
    }
    assert_eq!(sim.read(base + 6, 3), [0xFF, 0x42, 0xFF]);
    assert_eq!(sim.flash_writes(), [ProgramWidth::X8]);
}

#[test]
fn program_block_unaligned_run() {
    const DATA: [u8; 13] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC,
    ];
    let mut sim = SimFlash::new();
    let base: usize = sector_addr(1) + 3;
    let mut flash = unlocked(&mut sim);
    unsafe {
        flash.erase_sector(1, ProgramWidth::X32);
        flash.program_block(base, &DATA);
    }
    assert_eq!(sim.read(base, DATA.len()), DATA);
    assert_eq!(sim.read_u8(base - 1), 0xFF);
    assert_eq!(sim.read_u8(base + DATA.len()), 0xFF);
    assert_eq!(sim.flash_writes(), [ProgramWidth::X8; 13]);
    assert!(!sim.sr().has_error());
}

#[test]
fn program_block_wide_promotes_aligned_runs() {
    const DATA: [u8; 13] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC,
    ];
    let mut sim = SimFlash::new();
    let base: usize = sector_addr(1) + 3;
    let mut flash = unlocked(&mut sim);
    unsafe {
        flash.erase_sector(1, ProgramWidth::X32);
        flash.program_block_wide(base, &DATA, ProgramWidth::X64);
    }
    assert_eq!(sim.read(base, DATA.len()), DATA);
    assert_eq!(
        sim.flash_writes(),
        [ProgramWidth::X8, ProgramWidth::X32, ProgramWidth::X64]
    );
    assert!(!sim.sr().has_error());
}

#[test]
fn program_block_wide_honors_max_width() {
    const DATA: [u8; 13] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC,
    ];
    let mut sim = SimFlash::new();
    let base: usize = sector_addr(1) + 3;
    let mut flash = unlocked(&mut sim);
    unsafe {
        flash.erase_sector(1, ProgramWidth::X32);
        flash.program_block_wide(base, &DATA, ProgramWidth::X32);
    }
    assert_eq!(sim.read(base, DATA.len()), DATA);
    assert_eq!(
        sim.flash_writes(),
        [
            ProgramWidth::X8,
            ProgramWidth::X32,
            ProgramWidth::X32,
            ProgramWidth::X32
        ]
    );

    let mut sim = SimFlash::new();
    let base: usize = sector_addr(1);
    let mut flash = unlocked(&mut sim);
    unsafe {
        flash.erase_sector(1, ProgramWidth::X8);
        flash.program_block_wide(base, &DATA[..4], ProgramWidth::X8);
    }
    assert_eq!(sim.read(base, 4), &DATA[..4]);
    assert_eq!(sim.flash_writes(), [ProgramWidth::X8; 4]);
}

#[test]
fn program_option_bytes_unlocks_and_masks_reserved_bits() {
    let mut sim = SimFlash::new();
    let value: Optcr = Optcr::new(Optcr::RESET.set_bor_level(BorLevel::Level2).raw() | 0b11);

    let mut flash = Flash::new(&mut sim);
    unsafe { flash.program_option_bytes(value) };
    assert!(!flash.is_locked(Domain::OptionBytes));
    assert!(flash.is_locked(Domain::Main));
    assert!(!flash.option_bytes().start());

    assert_eq!(sim.violations(), 0);
    let committed: Optcr = sim.committed_option_bytes();
    assert_eq!(committed.raw() & Optcr::RESERVED, 0);
    assert_eq!(committed.bor_level(), BorLevel::Level2);
    assert_eq!(committed.read_protection(), ReadProtection::Level0);

    let writes: Vec<Optcr> = sim
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Event::WriteOptcr(optcr) => Some(optcr),
            _ => None,
        })
        .collect();
    assert_eq!(writes.last().map(|o| o.start()), Some(true));

    // takes effect after reset
    sim.reset();
    let flash = Flash::new(&mut sim);
    assert!(flash.is_locked(Domain::OptionBytes));
    assert_eq!(flash.option_bytes().bor_level(), BorLevel::Level2);
}

#[test]
fn program_option_bytes_already_unlocked() {
    let mut sim = SimFlash::new();
    let mut flash = Flash::new(&mut sim);
    flash.unlock(Domain::OptionBytes);
    sim.clear_events();

    let value: Optcr = Optcr::RESET.set_write_protected(5, true);
    unsafe { Flash::new(&mut sim).program_option_bytes(value) };
    assert!(
        !sim.events()
            .iter()
            .any(|e| matches!(e, Event::WriteOptKey(_)))
    );
    assert!(sim.committed_option_bytes().write_protected(5));
}

#[test]
fn access_control_toggles() {
    let mut sim = SimFlash::new();
    let mut flash = Flash::new(&mut sim);

    flash.set_wait_states(7);
    flash.enable_prefetch();
    flash.enable_art();
    let acr = flash.regs().acr();
    assert_eq!(acr.latency(), 7);
    assert!(acr.prefetch());
    assert!(acr.art());

    flash.disable_art();
    flash.reset_art();
    flash.disable_prefetch();
    let acr = flash.regs().acr();
    assert_eq!(acr.latency(), 7);
    assert!(!acr.prefetch());
    assert!(!acr.art());
    assert!(!acr.art_reset());

    flash.set_wait_states(0x13);
    assert_eq!(flash.regs().acr().latency(), 3);
    assert_eq!(flash.status(), Sr::RESET);
}
