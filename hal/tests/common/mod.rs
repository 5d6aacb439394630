//! Simulated flash controller.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use stm32f7_flash::flash::{
    Acr, Cr, FLASH_START, FlashRegs, KEY1, KEY2, OPTKEY1, OPTKEY2, Optcr, ProgramWidth, Sector,
    Sr, Word,
};

/// Size of the simulated device, sectors 0 to 7.
pub const SIZE: usize = 1024 * 1024;
pub const NUM_SECTORS: u8 = 8;

/// Value the simulated flash array holds before any erase.
pub const GARBAGE: u8 = 0xA5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Barrier,
    ReadSr { busy: bool },
    WriteCr(Cr),
    WriteSr(Sr),
    WriteKey(u32),
    WriteOptcr(Optcr),
    WriteOptKey(u32),
    WriteFlash { addr: usize, width: ProgramWidth },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyStage {
    Idle,
    First,
}

/// Register model of the flash interface.
///
/// * writes to a locked domain are ignored, except setting the lock bit
/// * a wrong key, or a key written while unlocked, leaves the domain locked
/// * every operation keeps the busy flag set for `latency` status reads
/// * programming ANDs the new value into the array
#[derive(Debug)]
pub struct SimFlash {
    mem: Vec<u8>,
    cr: Cr,
    sr: Cell<Sr>,
    acr: Acr,
    optcr: Optcr,
    committed: Optcr,
    active: Optcr,
    key_stage: KeyStage,
    opt_key_stage: KeyStage,
    busy: Cell<u32>,
    latency: u32,
    violations: Cell<u32>,
    events: RefCell<Vec<Event>>,
}

const W1C: u32 = Sr::RESET
    .set_eop(true)
    .set_operr(true)
    .set_wrperr(true)
    .set_pgaerr(true)
    .set_pgperr(true)
    .set_erserr(true)
    .set_rderr(true)
    .raw();

const OP_FIELDS: u32 = Cr::new(0)
    .set_program(true)
    .set_sector_erase(true)
    .set_mass_erase(true)
    .set_sector(0x1F)
    .set_program_width(ProgramWidth::X64)
    .set_start(true)
    .raw();

impl SimFlash {
    pub fn new() -> SimFlash {
        SimFlash::with_option_bytes(Optcr::RESET)
    }

    /// Device that was reset with `optcr` in its option bytes.
    pub fn with_option_bytes(optcr: Optcr) -> SimFlash {
        let committed: Optcr = optcr.set_lock(false).set_start(false);
        SimFlash {
            mem: vec![GARBAGE; SIZE],
            cr: Cr::RESET,
            sr: Cell::new(Sr::RESET),
            acr: Acr::RESET,
            optcr: committed.set_lock(true),
            committed,
            active: committed,
            key_stage: KeyStage::Idle,
            opt_key_stage: KeyStage::Idle,
            busy: Cell::new(0),
            latency: 3,
            violations: Cell::new(0),
            events: RefCell::new(Vec::new()),
        }
    }

    /// Simulate a system reset, option bytes are reloaded.
    pub fn reset(&mut self) {
        self.cr = Cr::RESET;
        self.sr.set(Sr::RESET);
        self.acr = Acr::RESET;
        self.active = self.committed;
        self.optcr = self.committed.set_lock(true);
        self.key_stage = KeyStage::Idle;
        self.opt_key_stage = KeyStage::Idle;
        self.busy.set(0);
    }

    /// Start an operation owned by someone else, busy for `polls` reads.
    pub fn set_busy(&self, polls: u32) {
        self.busy.set(polls);
    }

    pub fn set_latency(&mut self, polls: u32) {
        self.latency = polls;
    }

    /// Force status flags, as if set by earlier operations.
    pub fn set_flags(&self, sr: Sr) {
        self.sr.set(Sr::new(self.sr.get().raw() | (sr.raw() & W1C)));
    }

    pub fn committed_option_bytes(&self) -> Optcr {
        self.committed
    }

    /// Register writes issued while the controller was busy.
    pub fn violations(&self) -> u32 {
        self.violations.get()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear()
    }

    /// Number of accesses into the flash window, by width.
    pub fn flash_writes(&self) -> Vec<ProgramWidth> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::WriteFlash { width, .. } => Some(*width),
                _ => None,
            })
            .collect()
    }

    pub fn read(&self, addr: usize, len: usize) -> &[u8] {
        let offset: usize = addr - FLASH_START;
        &self.mem[offset..offset + len]
    }

    pub fn read_u8(&self, addr: usize) -> u8 {
        self.read(addr, 1)[0]
    }

    pub fn read_u16(&self, addr: usize) -> u16 {
        u16::from_le_bytes(self.read(addr, 2).try_into().unwrap())
    }

    pub fn read_u32(&self, addr: usize) -> u32 {
        u32::from_le_bytes(self.read(addr, 4).try_into().unwrap())
    }

    pub fn read_u64(&self, addr: usize) -> u64 {
        u64::from_le_bytes(self.read(addr, 8).try_into().unwrap())
    }

    /// Fill a range without going through the controller.
    pub fn fill(&mut self, addr: usize, len: usize, val: u8) {
        let offset: usize = addr - FLASH_START;
        self.mem[offset..offset + len].fill(val);
    }

    fn log(&self, event: Event) {
        self.events.borrow_mut().push(event)
    }

    fn flag(&self, sr: Sr) {
        self.sr.set(Sr::new(self.sr.get().raw() | sr.raw()));
    }

    fn start_op(&self) {
        self.busy.set(self.latency);
    }

    fn protected(&self, sector: Sector) -> bool {
        self.active.write_protected(sector.to_index())
    }

    fn erase(&mut self, sector: Sector) {
        let range = sector.addr_range();
        self.fill(range.start, range.end - range.start, 0xFF);
    }

    fn trigger_erase(&mut self, cr: Cr) {
        match (cr.mass_erase(), cr.sector_erase()) {
            (true, false) => {
                let sectors: Vec<Sector> = (0..NUM_SECTORS)
                    .filter_map(Sector::from_index)
                    .collect();
                if sectors.iter().any(|&s| self.protected(s)) {
                    self.flag(Sr::RESET.set_wrperr(true));
                } else {
                    sectors.into_iter().for_each(|s| self.erase(s));
                    self.flag(Sr::RESET.set_eop(true));
                }
            }
            (false, true) => {
                if cr.sector() < NUM_SECTORS {
                    if let Some(sector) = Sector::from_index(cr.sector()) {
                        if self.protected(sector) {
                            self.flag(Sr::RESET.set_wrperr(true));
                        } else {
                            self.erase(sector);
                            self.flag(Sr::RESET.set_eop(true));
                        }
                    }
                }
            }
            _ => self.flag(Sr::RESET.set_erserr(true)),
        }
        self.start_op();
    }
}

impl FlashRegs for SimFlash {
    fn cr(&self) -> Cr {
        self.cr
    }

    fn set_cr(&mut self, cr: Cr) {
        self.log(Event::WriteCr(cr));
        if self.cr.locked() {
            if cr.locked() {
                self.key_stage = KeyStage::Idle;
            }
            return;
        }
        if self.busy.get() > 0 && (self.cr.raw() ^ cr.raw()) & OP_FIELDS != 0 {
            self.violations.set(self.violations.get() + 1);
        }
        if cr.locked() {
            self.key_stage = KeyStage::Idle;
        }
        let start: bool = cr.start() && !self.cr.start();
        // STRT is cleared by hardware once the operation is done
        self.cr = cr.set_start(false);
        if start {
            self.trigger_erase(cr);
        }
    }

    fn sr(&self) -> Sr {
        let busy: u32 = self.busy.get();
        self.log(Event::ReadSr { busy: busy > 0 });
        if busy > 0 {
            self.busy.set(busy - 1);
            Sr::new(self.sr.get().raw() | (1 << 16))
        } else {
            self.sr.get()
        }
    }

    fn write_sr(&mut self, sr: Sr) {
        self.log(Event::WriteSr(sr));
        self.sr.set(Sr::new(self.sr.get().raw() & !(sr.raw() & W1C)));
    }

    fn write_key(&mut self, key: u32) {
        self.log(Event::WriteKey(key));
        if !self.cr.locked() {
            self.cr = self.cr.set_lock(true);
            self.key_stage = KeyStage::Idle;
            return;
        }
        self.key_stage = match (self.key_stage, key) {
            (KeyStage::Idle, KEY1) => KeyStage::First,
            (KeyStage::First, KEY2) => {
                self.cr = self.cr.set_lock(false);
                KeyStage::Idle
            }
            _ => KeyStage::Idle,
        };
    }

    fn acr(&self) -> Acr {
        self.acr
    }

    fn set_acr(&mut self, acr: Acr) {
        self.acr = acr.set_art_reset(false);
    }

    fn optcr(&self) -> Optcr {
        self.optcr
    }

    fn set_optcr(&mut self, optcr: Optcr) {
        self.log(Event::WriteOptcr(optcr));
        if self.optcr.locked() {
            if optcr.locked() {
                self.opt_key_stage = KeyStage::Idle;
            }
            return;
        }
        if self.busy.get() > 0 {
            self.violations.set(self.violations.get() + 1);
        }
        if optcr.locked() {
            self.opt_key_stage = KeyStage::Idle;
        }
        self.optcr = optcr.set_start(false);
        if optcr.start() {
            self.committed = optcr.set_lock(false).set_start(false);
            self.start_op();
        }
    }

    fn write_opt_key(&mut self, key: u32) {
        self.log(Event::WriteOptKey(key));
        if !self.optcr.locked() {
            self.optcr = self.optcr.set_lock(true);
            self.opt_key_stage = KeyStage::Idle;
            return;
        }
        self.opt_key_stage = match (self.opt_key_stage, key) {
            (KeyStage::Idle, OPTKEY1) => KeyStage::First,
            (KeyStage::First, OPTKEY2) => {
                self.optcr = self.optcr.set_lock(false);
                KeyStage::Idle
            }
            _ => KeyStage::Idle,
        };
    }

    fn barrier(&self) {
        self.log(Event::Barrier);
    }

    unsafe fn write_flash<W: Word>(&mut self, addr: usize, data: W) {
        self.log(Event::WriteFlash {
            addr,
            width: W::WIDTH,
        });
        if self.busy.get() > 0 {
            self.violations.set(self.violations.get() + 1);
        }
        assert!(
            (FLASH_START..FLASH_START + SIZE).contains(&addr),
            "write outside of the flash memory: {addr:#X}"
        );

        if self.cr.locked() {
            return;
        }
        if !self.cr.program() {
            self.flag(Sr::RESET.set_erserr(true));
            return;
        }
        if self.cr.program_width() != W::WIDTH {
            self.flag(Sr::RESET.set_pgperr(true));
            return;
        }
        if addr % W::WIDTH.bytes() != 0 {
            self.flag(Sr::RESET.set_pgaerr(true));
            return;
        }
        if Sector::from_addr(addr).is_some_and(|s| self.protected(s)) {
            self.flag(Sr::RESET.set_wrperr(true));
            return;
        }

        let bytes: [u8; 8] = data.to_u64().to_le_bytes();
        let offset: usize = addr - FLASH_START;
        let mut not_erased: bool = false;
        for (dst, &src) in self.mem[offset..offset + W::WIDTH.bytes()]
            .iter_mut()
            .zip(bytes.iter())
        {
            not_erased |= *dst & src != src;
            *dst &= src;
        }
        if not_erased {
            self.flag(Sr::RESET.set_pgperr(true));
        }
        self.flag(Sr::RESET.set_eop(true));
        self.start_op();
    }
}

/// Start address of a sector.
pub fn sector_addr(idx: u8) -> usize {
    Sector::from_index(idx).unwrap().addr()
}

/// Size of a sector.
pub fn sector_size(idx: u8) -> usize {
    Sector::from_index(idx).unwrap().size()
}
