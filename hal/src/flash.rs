//! Flash memory program/erase controller.
//!
//! Every erase and program entry point follows the same sequence:
//!
//! 1. Wait for the controller to be idle.
//! 2. Configure the program width and operation fields of `FLASH_CR`.
//! 3. Set the operation enable bit, then trigger it (`STRT`, or the write into
//!    the flash window for programming).
//! 4. Wait for the controller to be idle.
//! 5. Clear the enable bit and selectors.
//!
//! Errors are never returned by these calls. The hardware reports them through
//! sticky flags in `FLASH_SR`, read them with [`Flash::status`] and clear them
//! with [`Flash::clear_status_flags`] before starting a new operation you want
//! to diagnose.

mod acr;
mod cr;
mod optcr;
mod regs;
mod sector;
mod sr;

pub use acr::{Acr, wait_states};
pub use cr::{Cr, ProgramWidth};
pub use optcr::{BorLevel, Optcr, ReadProtection};
pub use regs::{FlashRegs, Word};
pub use sector::{FLASH_START, Sector, flash_end};
pub use sr::Sr;

use core::{
    convert::Infallible,
    fmt::Display,
    ops::{Deref, DerefMut},
};

/// First key of the `FLASH_KEYR` unlock sequence.
pub const KEY1: u32 = 0x4567_0123;
/// Second key of the `FLASH_KEYR` unlock sequence.
pub const KEY2: u32 = 0xCDEF_89AB;
/// First key of the `FLASH_OPTKEYR` unlock sequence.
pub const OPTKEY1: u32 = 0x0819_2A3B;
/// Second key of the `FLASH_OPTKEYR` unlock sequence.
pub const OPTKEY2: u32 = 0x4C5D_6E7F;

/// Independently locked register domains.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Domain {
    /// `FLASH_CR`, guarding erase and program operations.
    Main,
    /// `FLASH_OPTCR`, guarding option byte modification.
    OptionBytes,
}

/// Flash errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Programming error (`PGPERR`).
    ///
    /// The access size did not match the program width, or the destination
    /// was not erased.
    Prog,
    /// Programming alignment error (`PGAERR`).
    ///
    /// The address was not aligned to the program width.
    Align,
    /// Write protection error (`WRPERR`).
    ///
    /// The address to be erased/programmed belongs to a write protected
    /// sector.
    Wp,
    /// Erase sequence error (`ERSERR`).
    ///
    /// An erase or a write into the flash window was issued while the control
    /// register was not configured for it.
    EraseSeq,
    /// The register domain is locked.
    ///
    /// Operations issued while locked are silently ignored by hardware, this
    /// is only returned by [`Flash::ensure_unlocked`].
    Locked,
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &str = match self {
            Error::Prog => "programming error",
            Error::Align => "programming alignment error",
            Error::Wp => "write protection error",
            Error::EraseSeq => "erase sequence error",
            Error::Locked => "flash register domain is locked",
        };
        f.write_str(msg)
    }
}

/// Flash driver.
///
/// The driver is a handle to the single flash controller, it does not lock
/// anything internally. If an interrupt handler also uses the controller the
/// caller must provide mutual exclusion.
#[derive(Debug)]
pub struct Flash<R> {
    regs: R,
}

impl<R: FlashRegs> Flash<R> {
    /// Create a new flash driver from a register access layer.
    ///
    /// This does not unlock the flash, use [`unlock`] or [`unlocked`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// # #[cfg(feature = "stm32f767")]
    /// # {
    /// use stm32f7_flash::{flash::Flash, pac};
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mut flash = Flash::new(&mut dp.FLASH);
    /// # }
    /// ```
    ///
    /// [`unlock`]: Flash::unlock
    /// [`unlocked`]: Flash::unlocked
    pub const fn new(regs: R) -> Self {
        Flash { regs }
    }

    /// Free the register access layer from the driver.
    pub fn free(self) -> R {
        self.regs
    }

    /// Borrow the register access layer.
    pub fn regs(&self) -> &R {
        &self.regs
    }

    /// Block until no erase or program operation is in flight.
    ///
    /// A data synchronization barrier is issued first so a posted write to the
    /// flash interface cannot be missed by the busy check.
    ///
    /// There is no timeout. An operation that never completes is a hardware
    /// fault, and this will spin forever.
    pub fn wait_until_idle(&self) {
        self.regs.barrier();
        while self.regs.sr().busy() {}
    }

    /// Check once whether the controller is idle.
    ///
    /// This is the non-blocking form of [`wait_until_idle`] for callers that
    /// need to bound the wait. Do not touch the flash registers until this
    /// returns `Ok`.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{Flash, FlashRegs};
    ///
    /// fn wait_bounded<R: FlashRegs>(flash: &Flash<R>, mut polls: u32) -> bool {
    ///     loop {
    ///         match flash.poll_idle() {
    ///             Ok(()) => return true,
    ///             Err(_) if polls == 0 => return false,
    ///             Err(_) => polls -= 1,
    ///         }
    ///     }
    /// }
    /// ```
    ///
    /// [`wait_until_idle`]: Flash::wait_until_idle
    pub fn poll_idle(&self) -> nb::Result<(), Infallible> {
        self.regs.barrier();
        if self.regs.sr().busy() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    /// Lock a register domain.
    ///
    /// Always safe to call, locking a locked domain has no effect.
    pub fn lock(&mut self, domain: Domain) {
        self.set_lock_bit(domain);
        debug!("locked {}", domain);
    }

    fn set_lock_bit(&mut self, domain: Domain) {
        match domain {
            Domain::Main => {
                let cr: Cr = self.regs.cr().set_lock(true);
                self.regs.set_cr(cr)
            }
            Domain::OptionBytes => {
                let optcr: Optcr = self.regs.optcr().set_lock(true);
                self.regs.set_optcr(optcr)
            }
        }
    }

    /// Unlock a register domain.
    ///
    /// The lock bit is set first to discard any partial key sequence, then the
    /// two keys are written in order.
    ///
    /// A wrong key sequence leaves the domain locked; the only remedy is to
    /// call `unlock` again. Use [`is_locked`] or [`ensure_unlocked`] to verify
    /// the result.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{Domain, Error, Flash, FlashRegs};
    ///
    /// fn unlock<R: FlashRegs>(flash: &mut Flash<R>) -> Result<(), Error> {
    ///     flash.unlock(Domain::Main);
    ///     flash.ensure_unlocked(Domain::Main)
    /// }
    /// ```
    ///
    /// [`is_locked`]: Flash::is_locked
    /// [`ensure_unlocked`]: Flash::ensure_unlocked
    pub fn unlock(&mut self, domain: Domain) {
        self.set_lock_bit(domain);
        match domain {
            Domain::Main => {
                self.regs.write_key(KEY1);
                self.regs.write_key(KEY2);
            }
            Domain::OptionBytes => {
                self.regs.write_opt_key(OPTKEY1);
                self.regs.write_opt_key(OPTKEY2);
            }
        }
        debug!("unlocked {}", domain);
    }

    /// Returns `true` if the hardware reports the domain as locked.
    pub fn is_locked(&self, domain: Domain) -> bool {
        match domain {
            Domain::Main => self.regs.cr().locked(),
            Domain::OptionBytes => self.regs.optcr().locked(),
        }
    }

    /// Returns [`Error::Locked`] if the domain is locked.
    pub fn ensure_unlocked(&self, domain: Domain) -> Result<(), Error> {
        if self.is_locked(domain) {
            Err(Error::Locked)
        } else {
            Ok(())
        }
    }

    /// Unlock the main domain for the lifetime of the returned guard.
    ///
    /// The main domain is locked again when the guard is dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{Flash, FlashRegs, ProgramWidth};
    ///
    /// fn wipe<R: FlashRegs>(flash: &mut Flash<R>, sector: u8) {
    ///     let mut unlocked = flash.unlocked();
    ///     unsafe { unlocked.erase_sector(sector, ProgramWidth::X32) };
    /// }
    /// ```
    pub fn unlocked(&mut self) -> Unlocked<'_, R> {
        self.unlock(Domain::Main);
        Unlocked { flash: self }
    }

    fn set_program_width(&mut self, width: ProgramWidth) {
        let cr: Cr = self.regs.cr().set_program_width(width);
        self.regs.set_cr(cr);
    }

    /// Erases the entire flash memory, setting all the bits to `1`.
    ///
    /// The main domain must be unlocked. If the operation is interrupted the
    /// whole array must be treated as untrusted.
    ///
    /// # Safety
    ///
    /// 1. This code must execute from RAM.
    pub unsafe fn erase_all(&mut self, width: ProgramWidth) {
        trace!("mass erase width={}", width);
        self.wait_until_idle();
        self.set_program_width(width);

        let cr: Cr = self.regs.cr().set_mass_erase(true);
        self.regs.set_cr(cr);
        let cr: Cr = self.regs.cr().set_start(true);
        self.regs.set_cr(cr);

        self.wait_until_idle();
        let cr: Cr = self.regs.cr().set_mass_erase(false);
        self.regs.set_cr(cr);
        trace!("mass erase done");
    }

    /// Erases a sector, setting all the bits to `1`.
    ///
    /// The sector number is masked to the 5-bit `SNB` field; it is **not**
    /// checked against the device size. Use [`Sector`] to get a valid index.
    ///
    /// A sector must be erased before any byte in it is programmed.
    ///
    /// The main domain must be unlocked.
    ///
    /// # Safety
    ///
    /// 1. Do not erase flash memory that is being used for your code.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{Domain, Flash, FlashRegs, ProgramWidth, Sector};
    ///
    /// fn erase_last<R: FlashRegs>(flash: &mut Flash<R>) {
    ///     let sector: Sector = Sector::from_index(7).unwrap();
    ///     flash.unlock(Domain::Main);
    ///     unsafe { flash.erase_sector(sector.to_index(), ProgramWidth::X32) };
    ///     flash.lock(Domain::Main);
    /// }
    /// ```
    pub unsafe fn erase_sector(&mut self, sector: u8, width: ProgramWidth) {
        trace!("sector erase {} width={}", sector, width);
        self.wait_until_idle();
        self.set_program_width(width);

        let cr: Cr = self.regs.cr().set_sector(sector).set_sector_erase(true);
        self.regs.set_cr(cr);
        let cr: Cr = self.regs.cr().set_start(true);
        self.regs.set_cr(cr);

        self.wait_until_idle();
        let cr: Cr = self.regs.cr().set_sector_erase(false).set_sector(0);
        self.regs.set_cr(cr);
        trace!("sector erase done");
    }

    /// Program one word, the width is selected by the type of `data`.
    ///
    /// The write into the flash window starts the operation. Programming
    /// problems (misalignment, width mismatch, a destination that was not
    /// erased, write protection) are only reported through the status flags.
    ///
    /// The main domain must be unlocked.
    ///
    /// # Safety
    ///
    /// 1. Do not write to flash memory that is being used for your code.
    /// 2. The destination address must be within the flash memory region.
    /// 3. The destination address should be aligned to the size of `W`.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{Flash, FlashRegs, Sector};
    ///
    /// fn store<R: FlashRegs>(flash: &mut Flash<R>, counter: u32) {
    ///     let addr: usize = Sector::from_index(7).unwrap().addr();
    ///     let mut unlocked = flash.unlocked();
    ///     unsafe { unlocked.program(addr, counter) };
    /// }
    /// ```
    pub unsafe fn program<W: Word>(&mut self, addr: usize, data: W) {
        self.wait_until_idle();
        self.set_program_width(W::WIDTH);

        let cr: Cr = self.regs.cr().set_program(true);
        self.regs.set_cr(cr);

        unsafe { self.regs.write_flash(addr, data) };

        self.wait_until_idle();
        let cr: Cr = self.regs.cr().set_program(false);
        self.regs.set_cr(cr);
    }

    /// Program a block of bytes, one byte at a time.
    ///
    /// Every byte gets its own full program sequence. An empty block does
    /// nothing.
    ///
    /// # Safety
    ///
    /// 1. Do not write to flash memory that is being used for your code.
    /// 2. The destination range must be within the flash memory region.
    pub unsafe fn program_block(&mut self, addr: usize, data: &[u8]) {
        trace!("program {} bytes at {:#x}", data.len(), addr);
        data.iter()
            .enumerate()
            .for_each(|(offset, &byte)| unsafe { self.program(addr + offset, byte) });
    }

    /// Program a block of bytes, using the widest accesses possible.
    ///
    /// Naturally aligned runs are programmed with the widest width up to
    /// `max_width` that fits the remaining length, unaligned heads and tails
    /// fall back to narrower accesses. The flash contents afterwards are the
    /// same as with [`program_block`].
    ///
    /// `max_width` must be allowed by the supply voltage, see
    /// [`ProgramWidth::max_for_voltage`].
    ///
    /// # Safety
    ///
    /// 1. Do not write to flash memory that is being used for your code.
    /// 2. The destination range must be within the flash memory region.
    ///
    /// [`program_block`]: Flash::program_block
    pub unsafe fn program_block_wide(&mut self, addr: usize, data: &[u8], max_width: ProgramWidth) {
        trace!(
            "program {} bytes at {:#x} max_width={}",
            data.len(),
            addr,
            max_width
        );
        let mut addr: usize = addr;
        let mut rest: &[u8] = data;
        while !rest.is_empty() {
            let width: ProgramWidth = widest_access(addr, rest.len(), max_width);
            let (word, tail) = rest.split_at(width.bytes());

            let mut buf: [u8; 8] = [0; 8];
            buf[..word.len()].copy_from_slice(word);
            let val: u64 = u64::from_le_bytes(buf);

            unsafe {
                match width {
                    ProgramWidth::X8 => self.program(addr, val as u8),
                    ProgramWidth::X16 => self.program(addr, val as u16),
                    ProgramWidth::X32 => self.program(addr, val as u32),
                    ProgramWidth::X64 => self.program(addr, val),
                }
            }

            addr += width.bytes();
            rest = tail;
        }
    }

    /// Program the user option bytes.
    ///
    /// This is the only operation that unlocks on its own: the option domain
    /// is unlocked if needed. The two low bits of `optcr` (`OPTLOCK`,
    /// `OPTSTRT`) are ignored. Option bytes do not need to be erased first,
    /// and the new values take effect after the next reset.
    ///
    /// # Safety
    ///
    /// 1. Setting [`ReadProtection::Level2`] is permanent.
    /// 2. Write protecting the sectors holding your code prevents updates.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{BorLevel, Flash, FlashRegs};
    ///
    /// fn raise_bor<R: FlashRegs>(flash: &mut Flash<R>) {
    ///     let optcr = flash.option_bytes().set_bor_level(BorLevel::Level3);
    ///     unsafe { flash.program_option_bytes(optcr) };
    /// }
    /// ```
    pub unsafe fn program_option_bytes(&mut self, optcr: Optcr) {
        trace!("program option bytes {:#x}", optcr.raw());
        self.wait_until_idle();

        if self.regs.optcr().locked() {
            self.unlock(Domain::OptionBytes);
        }

        self.regs.set_optcr(Optcr::new(optcr.raw() & !Optcr::RESERVED));
        let optcr: Optcr = self.regs.optcr().set_start(true);
        self.regs.set_optcr(optcr);

        self.wait_until_idle();
    }

    /// Read the current option control register.
    pub fn option_bytes(&self) -> Optcr {
        self.regs.optcr()
    }

    /// Read the status register.
    ///
    /// Flags are sticky, they may have been set by an earlier operation.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{Error, Flash, FlashRegs};
    ///
    /// unsafe fn store<R: FlashRegs>(
    ///     flash: &mut Flash<R>,
    ///     addr: usize,
    ///     val: u32,
    /// ) -> Result<(), Error> {
    ///     flash.clear_status_flags();
    ///     unsafe { flash.program(addr, val) };
    ///     match flash.status().error() {
    ///         Some(e) => Err(e),
    ///         None => Ok(()),
    ///     }
    /// }
    /// ```
    pub fn status(&self) -> Sr {
        self.regs.sr()
    }

    /// Clear the programming error flag (`PGPERR`).
    pub fn clear_pgperr(&mut self) {
        self.regs.write_sr(Sr::RESET.set_pgperr(true))
    }

    /// Clear the programming alignment error flag (`PGAERR`).
    pub fn clear_pgaerr(&mut self) {
        self.regs.write_sr(Sr::RESET.set_pgaerr(true))
    }

    /// Clear the write protection error flag (`WRPERR`).
    pub fn clear_wrperr(&mut self) {
        self.regs.write_sr(Sr::RESET.set_wrperr(true))
    }

    /// Clear the erase sequence error flag (`ERSERR`).
    pub fn clear_erserr(&mut self) {
        self.regs.write_sr(Sr::RESET.set_erserr(true))
    }

    /// Clear the end of operation flag (`EOP`).
    pub fn clear_eop(&mut self) {
        self.regs.write_sr(Sr::RESET.set_eop(true))
    }

    /// Clear the four error flags and the end of operation flag.
    pub fn clear_status_flags(&mut self) {
        self.clear_erserr();
        self.clear_pgaerr();
        self.clear_wrperr();
        self.clear_pgperr();
        self.clear_eop();
    }

    /// Set the number of flash wait states.
    ///
    /// Blocks until the new latency is read back from `FLASH_ACR`. Raise the
    /// latency before increasing the clock, lower it after decreasing it.
    /// See [`wait_states`] for the value to use.
    pub fn set_wait_states(&mut self, ws: u8) {
        let acr: Acr = self.regs.acr().set_latency(ws);
        self.regs.set_acr(acr);
        while self.regs.acr().latency() != acr.latency() {}
    }

    /// Enable the prefetch buffer.
    pub fn enable_prefetch(&mut self) {
        let acr: Acr = self.regs.acr().set_prefetch(true);
        self.regs.set_acr(acr)
    }

    /// Disable the prefetch buffer.
    pub fn disable_prefetch(&mut self) {
        let acr: Acr = self.regs.acr().set_prefetch(false);
        self.regs.set_acr(acr)
    }

    /// Enable the ART accelerator.
    pub fn enable_art(&mut self) {
        let acr: Acr = self.regs.acr().set_art(true);
        self.regs.set_acr(acr)
    }

    /// Disable the ART accelerator.
    pub fn disable_art(&mut self) {
        let acr: Acr = self.regs.acr().set_art(false);
        self.regs.set_acr(acr)
    }

    /// Reset the ART accelerator.
    ///
    /// The accelerator must be disabled for the reset to have an effect.
    pub fn reset_art(&mut self) {
        let acr: Acr = self.regs.acr().set_art_reset(true);
        self.regs.set_acr(acr);
        self.regs.set_acr(acr.set_art_reset(false));
    }
}

/// Widest access at `addr` that is aligned, fits in `len`, and is not wider
/// than `max`.
fn widest_access(addr: usize, len: usize, max: ProgramWidth) -> ProgramWidth {
    [ProgramWidth::X64, ProgramWidth::X32, ProgramWidth::X16]
        .into_iter()
        .find(|&w| w <= max && addr % w.bytes() == 0 && len >= w.bytes())
        .unwrap_or(ProgramWidth::X8)
}

/// Main domain unlock guard, returned by [`Flash::unlocked`].
///
/// Dereferences to the driver; the main domain is locked on drop.
#[derive(Debug)]
pub struct Unlocked<'a, R: FlashRegs> {
    flash: &'a mut Flash<R>,
}

impl<R: FlashRegs> Deref for Unlocked<'_, R> {
    type Target = Flash<R>;

    fn deref(&self) -> &Self::Target {
        self.flash
    }
}

impl<R: FlashRegs> DerefMut for Unlocked<'_, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.flash
    }
}

impl<R: FlashRegs> Drop for Unlocked<'_, R> {
    fn drop(&mut self) {
        self.flash.lock(Domain::Main)
    }
}
