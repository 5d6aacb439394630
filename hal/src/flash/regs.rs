use super::{Acr, Cr, Optcr, ProgramWidth, Sr};

mod sealed {
    pub trait Sealed: Sized {
        /// Store `self` at `addr` with accesses of this width.
        ///
        /// `addr` does not have to be aligned, a misaligned store is passed
        /// to the bus as is and the flash controller flags it.
        ///
        /// # Safety
        ///
        /// `addr` must be valid for a write of `size_of::<Self>()` bytes.
        unsafe fn store(self, addr: usize);
    }

    macro_rules! impl_store {
        ($ty:ty, $insn:literal) => {
            impl Sealed for $ty {
                #[cfg(target_arch = "arm")]
                unsafe fn store(self, addr: usize) {
                    unsafe {
                        core::arch::asm!(
                            concat!($insn, " {v}, [{a}]"),
                            v = in(reg) self,
                            a = in(reg) addr,
                            options(nostack, preserves_flags),
                        )
                    }
                }

                #[cfg(not(target_arch = "arm"))]
                unsafe fn store(self, addr: usize) {
                    const N: usize = core::mem::size_of::<$ty>();
                    unsafe { core::ptr::write_volatile(addr as *mut [u8; N], self.to_le_bytes()) }
                }
            }
        };
    }

    impl_store!(u8, "strb");
    impl_store!(u16, "strh");
    impl_store!(u32, "str");

    impl Sealed for u64 {
        // two word stores, low word first
        #[cfg(target_arch = "arm")]
        unsafe fn store(self, addr: usize) {
            unsafe {
                core::arch::asm!(
                    "str {lo}, [{a}]",
                    "isb",
                    "str {hi}, [{a}, #4]",
                    lo = in(reg) self as u32,
                    hi = in(reg) (self >> 32) as u32,
                    a = in(reg) addr,
                    options(nostack, preserves_flags),
                )
            }
        }

        #[cfg(not(target_arch = "arm"))]
        unsafe fn store(self, addr: usize) {
            unsafe { core::ptr::write_volatile(addr as *mut [u8; 8], self.to_le_bytes()) }
        }
    }
}

/// A value that can be programmed with a single flash access.
///
/// Implemented for `u8`, `u16`, `u32` and `u64`.
pub trait Word: sealed::Sealed + Copy {
    /// Program width matching the size of this type.
    const WIDTH: ProgramWidth;

    /// Zero-extend the value to a `u64`.
    fn to_u64(self) -> u64;
}

impl Word for u8 {
    const WIDTH: ProgramWidth = ProgramWidth::X8;
    fn to_u64(self) -> u64 {
        self.into()
    }
}

impl Word for u16 {
    const WIDTH: ProgramWidth = ProgramWidth::X16;
    fn to_u64(self) -> u64 {
        self.into()
    }
}

impl Word for u32 {
    const WIDTH: ProgramWidth = ProgramWidth::X32;
    fn to_u64(self) -> u64 {
        self.into()
    }
}

impl Word for u64 {
    const WIDTH: ProgramWidth = ProgramWidth::X64;
    fn to_u64(self) -> u64 {
        self
    }
}

/// Register access layer for the flash interface.
///
/// Writes must take effect in program order, and reads must observe the
/// latest hardware state. The [`Flash`] driver only talks to the hardware
/// through this trait, tests can provide a simulated register model.
///
/// [`Flash`]: crate::flash::Flash
pub trait FlashRegs {
    /// Read `FLASH_CR`.
    fn cr(&self) -> Cr;
    /// Write `FLASH_CR`.
    fn set_cr(&mut self, cr: Cr);

    /// Read `FLASH_SR`.
    fn sr(&self) -> Sr;
    /// Write `FLASH_SR`, every `1` clears the matching flag.
    fn write_sr(&mut self, sr: Sr);

    /// Write `FLASH_KEYR`.
    fn write_key(&mut self, key: u32);

    /// Read `FLASH_ACR`.
    fn acr(&self) -> Acr;
    /// Write `FLASH_ACR`.
    fn set_acr(&mut self, acr: Acr);

    /// Read `FLASH_OPTCR`.
    fn optcr(&self) -> Optcr;
    /// Write `FLASH_OPTCR`.
    fn set_optcr(&mut self, optcr: Optcr);

    /// Write `FLASH_OPTKEYR`.
    fn write_opt_key(&mut self, key: u32);

    /// Data synchronization barrier.
    ///
    /// Returns after every previously issued write to the flash interface
    /// has completed.
    fn barrier(&self);

    /// Write `data` to `addr` in the memory mapped flash window.
    ///
    /// `addr` does not have to be aligned to `W`. On hardware the store is
    /// issued as is, and a misaligned access is reported by the controller
    /// through the status flags.
    ///
    /// # Safety
    ///
    /// `addr` must be a flash memory address.
    unsafe fn write_flash<W: Word>(&mut self, addr: usize, data: W);
}

impl<T: FlashRegs> FlashRegs for &mut T {
    fn cr(&self) -> Cr {
        T::cr(self)
    }
    fn set_cr(&mut self, cr: Cr) {
        T::set_cr(self, cr)
    }
    fn sr(&self) -> Sr {
        T::sr(self)
    }
    fn write_sr(&mut self, sr: Sr) {
        T::write_sr(self, sr)
    }
    fn write_key(&mut self, key: u32) {
        T::write_key(self, key)
    }
    fn acr(&self) -> Acr {
        T::acr(self)
    }
    fn set_acr(&mut self, acr: Acr) {
        T::set_acr(self, acr)
    }
    fn optcr(&self) -> Optcr {
        T::optcr(self)
    }
    fn set_optcr(&mut self, optcr: Optcr) {
        T::set_optcr(self, optcr)
    }
    fn write_opt_key(&mut self, key: u32) {
        T::write_opt_key(self, key)
    }
    fn barrier(&self) {
        T::barrier(self)
    }
    unsafe fn write_flash<W: Word>(&mut self, addr: usize, data: W) {
        unsafe { T::write_flash(self, addr, data) }
    }
}

#[cfg(any(
    feature = "stm32f745",
    feature = "stm32f746",
    feature = "stm32f765",
    feature = "stm32f767",
    feature = "stm32f769",
))]
#[allow(unused_unsafe)]
impl FlashRegs for crate::pac::FLASH {
    fn cr(&self) -> Cr {
        Cr::new(self.cr.read().bits())
    }

    fn set_cr(&mut self, cr: Cr) {
        self.cr.write(|w| unsafe { w.bits(cr.raw()) })
    }

    fn sr(&self) -> Sr {
        Sr::new(self.sr.read().bits())
    }

    fn write_sr(&mut self, sr: Sr) {
        self.sr.write(|w| unsafe { w.bits(sr.raw() & Sr::W1C) })
    }

    fn write_key(&mut self, key: u32) {
        self.keyr.write(|w| unsafe { w.bits(key) })
    }

    fn acr(&self) -> Acr {
        Acr::new(self.acr.read().bits())
    }

    fn set_acr(&mut self, acr: Acr) {
        self.acr.write(|w| unsafe { w.bits(acr.raw()) })
    }

    fn optcr(&self) -> Optcr {
        Optcr::new(self.optcr.read().bits())
    }

    fn set_optcr(&mut self, optcr: Optcr) {
        self.optcr.write(|w| unsafe { w.bits(optcr.raw()) })
    }

    fn write_opt_key(&mut self, key: u32) {
        self.optkeyr.write(|w| unsafe { w.bits(key) })
    }

    fn barrier(&self) {
        cortex_m::asm::dsb()
    }

    unsafe fn write_flash<W: Word>(&mut self, addr: usize, data: W) {
        unsafe { sealed::Sealed::store(data, addr) }
    }
}
