/// Program parallelism (`PSIZE`).
///
/// Selects the width of each programming access. The width must match the
/// access about to be issued, and the widest widths need a higher supply
/// voltage; see [`max_for_voltage`].
///
/// [`max_for_voltage`]: crate::flash::ProgramWidth::max_for_voltage
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ProgramWidth {
    /// 8-bit access
    X8 = 0b00,
    /// 16-bit access
    X16 = 0b01,
    /// 32-bit access
    X32 = 0b10,
    /// 64-bit access, requires an external VPP supply
    X64 = 0b11,
}

impl ProgramWidth {
    /// Create a program width from the two `PSIZE` bits.
    ///
    /// Bits above the field are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::ProgramWidth;
    ///
    /// assert_eq!(ProgramWidth::from_bits(0b00), ProgramWidth::X8);
    /// assert_eq!(ProgramWidth::from_bits(0b11), ProgramWidth::X64);
    /// assert_eq!(ProgramWidth::from_bits(0b110), ProgramWidth::X32);
    /// ```
    #[allow(clippy::wildcard_in_or_patterns)]
    pub const fn from_bits(bits: u32) -> ProgramWidth {
        match bits & 0b11 {
            0b00 => ProgramWidth::X8,
            0b01 => ProgramWidth::X16,
            0b10 => ProgramWidth::X32,
            0b11 | _ => ProgramWidth::X64,
        }
    }

    /// Number of bytes written by one access at this width.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::ProgramWidth;
    ///
    /// assert_eq!(ProgramWidth::X8.bytes(), 1);
    /// assert_eq!(ProgramWidth::X64.bytes(), 8);
    /// ```
    pub const fn bytes(self) -> usize {
        1 << (self as u32)
    }

    /// Widest program width allowed at a supply voltage, without VPP.
    ///
    /// | Supply        | Width |
    /// |---------------|-------|
    /// | 1.7 V - 2.1 V | x8    |
    /// | 2.1 V - 2.7 V | x16   |
    /// | 2.7 V - 3.6 V | x32   |
    ///
    /// x64 is only possible with an external VPP and is never returned.
    /// Returns `None` outside of the operating range.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::ProgramWidth;
    ///
    /// assert_eq!(ProgramWidth::max_for_voltage(3300), Some(ProgramWidth::X32));
    /// assert_eq!(ProgramWidth::max_for_voltage(2400), Some(ProgramWidth::X16));
    /// assert_eq!(ProgramWidth::max_for_voltage(1800), Some(ProgramWidth::X8));
    /// assert_eq!(ProgramWidth::max_for_voltage(1600), None);
    /// assert_eq!(ProgramWidth::max_for_voltage(5000), None);
    /// ```
    pub const fn max_for_voltage(millivolts: u16) -> Option<ProgramWidth> {
        match millivolts {
            1700..=2099 => Some(ProgramWidth::X8),
            2100..=2699 => Some(ProgramWidth::X16),
            2700..=3600 => Some(ProgramWidth::X32),
            _ => None,
        }
    }
}

/// Flash control register (`FLASH_CR`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cr {
    val: u32,
}

impl Cr {
    pub(crate) const PG: u32 = 1 << 0;
    pub(crate) const SER: u32 = 1 << 1;
    pub(crate) const MER: u32 = 1 << 2;
    pub(crate) const SNB_SHIFT: u32 = 3;
    /// Mask of the sector number field (`SNB`), after shifting.
    ///
    /// Five bits on STM32F76x/F77x. On STM32F74x/F75x the field is four
    /// bits wide and bit 7 of `FLASH_CR` is reserved.
    #[cfg(not(any(feature = "stm32f745", feature = "stm32f746")))]
    pub const SNB_MASK: u32 = 0x1F;
    /// Mask of the sector number field (`SNB`), after shifting.
    ///
    /// Five bits on STM32F76x/F77x. On STM32F74x/F75x the field is four
    /// bits wide and bit 7 of `FLASH_CR` is reserved.
    #[cfg(any(feature = "stm32f745", feature = "stm32f746"))]
    pub const SNB_MASK: u32 = 0x0F;
    pub(crate) const PSIZE_SHIFT: u32 = 8;
    pub(crate) const PSIZE_MASK: u32 = 0b11;
    pub(crate) const STRT: u32 = 1 << 16;
    pub(crate) const EOPIE: u32 = 1 << 24;
    pub(crate) const ERRIE: u32 = 1 << 25;
    pub(crate) const LOCK: u32 = 1 << 31;

    /// Reset value of the register.
    ///
    /// The control register is locked out of reset.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Cr;
    /// assert_eq!(Cr::RESET.raw(), 0x8000_0000);
    /// assert!(Cr::RESET.locked());
    /// ```
    pub const RESET: Cr = Cr::new(0x8000_0000);

    /// Create a new Cr register from a raw value.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Cr;
    /// const CR: Cr = Cr::new(0x0000_0201);
    /// ```
    pub const fn new(val: u32) -> Cr {
        Cr { val }
    }

    /// Get the raw value of the register.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Cr;
    /// const CR: Cr = Cr::new(0x0000_0201);
    /// assert_eq!(CR.raw(), 0x0000_0201);
    /// ```
    pub const fn raw(self) -> u32 {
        self.val
    }

    const fn set_bit(mut self, mask: u32, en: bool) -> Cr {
        if en {
            self.val |= mask;
        } else {
            self.val &= !mask;
        }
        self
    }

    /// Set the lock bit.
    ///
    /// Once set, the bit can only be cleared by the key sequence written to
    /// `FLASH_KEYR`. Writing `false` has no effect on hardware.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Cr;
    ///
    /// let cr = Cr::new(0).set_lock(true);
    /// assert!(cr.locked());
    /// ```
    #[must_use = "set_lock returns a modified Cr"]
    pub const fn set_lock(self, lock: bool) -> Cr {
        self.set_bit(Self::LOCK, lock)
    }

    /// Returns `true` if the control register is locked.
    pub const fn locked(&self) -> bool {
        self.val & Self::LOCK != 0
    }

    /// Set the programming bit (`PG`).
    ///
    /// While set, writes into the flash memory window program it.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Cr;
    ///
    /// let cr = Cr::new(0);
    /// assert_eq!(cr.program(), false);
    ///
    /// let cr = cr.set_program(true);
    /// assert_eq!(cr.program(), true);
    ///
    /// let cr = cr.set_program(false);
    /// assert_eq!(cr.program(), false);
    /// ```
    #[must_use = "set_program returns a modified Cr"]
    pub const fn set_program(self, en: bool) -> Cr {
        self.set_bit(Self::PG, en)
    }

    /// Returns `true` if programming is enabled.
    pub const fn program(&self) -> bool {
        self.val & Self::PG != 0
    }

    /// Set the sector erase bit (`SER`).
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Cr;
    ///
    /// let cr = Cr::new(0).set_sector_erase(true);
    /// assert!(cr.sector_erase());
    /// assert!(!cr.mass_erase());
    /// ```
    #[must_use = "set_sector_erase returns a modified Cr"]
    pub const fn set_sector_erase(self, en: bool) -> Cr {
        self.set_bit(Self::SER, en)
    }

    /// Returns `true` if sector erase is enabled.
    pub const fn sector_erase(&self) -> bool {
        self.val & Self::SER != 0
    }

    /// Set the mass erase bit (`MER`).
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Cr;
    ///
    /// let cr = Cr::new(0).set_mass_erase(true);
    /// assert!(cr.mass_erase());
    /// assert!(!cr.sector_erase());
    /// ```
    #[must_use = "set_mass_erase returns a modified Cr"]
    pub const fn set_mass_erase(self, en: bool) -> Cr {
        self.set_bit(Self::MER, en)
    }

    /// Returns `true` if mass erase is enabled.
    pub const fn mass_erase(&self) -> bool {
        self.val & Self::MER != 0
    }

    /// Set the sector number (`SNB`) used by a sector erase.
    ///
    /// The value is masked to [`SNB_MASK`], an out of range sector is
    /// **not** rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Cr;
    ///
    /// let cr = Cr::new(0).set_sector(7);
    /// assert_eq!(cr.sector(), 7);
    /// assert_eq!(cr.raw(), 7 << 3);
    ///
    /// // masked, does not bleed into PSIZE
    /// let cr = Cr::new(0).set_sector(0xFF);
    /// assert_eq!(u32::from(cr.sector()), Cr::SNB_MASK);
    /// assert_eq!(cr.raw(), Cr::SNB_MASK << 3);
    /// ```
    ///
    /// [`SNB_MASK`]: Cr::SNB_MASK
    #[must_use = "set_sector returns a modified Cr"]
    pub const fn set_sector(mut self, sector: u8) -> Cr {
        self.val &= !(Self::SNB_MASK << Self::SNB_SHIFT);
        self.val |= ((sector as u32) & Self::SNB_MASK) << Self::SNB_SHIFT;
        self
    }

    /// Get the sector number.
    pub const fn sector(&self) -> u8 {
        ((self.val >> Self::SNB_SHIFT) & Self::SNB_MASK) as u8
    }

    /// Set the program parallelism (`PSIZE`).
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{Cr, ProgramWidth};
    ///
    /// let cr = Cr::new(0);
    /// assert_eq!(cr.program_width(), ProgramWidth::X8);
    ///
    /// let cr = cr.set_program_width(ProgramWidth::X64);
    /// assert_eq!(cr.program_width(), ProgramWidth::X64);
    ///
    /// let cr = cr.set_program_width(ProgramWidth::X16);
    /// assert_eq!(cr.program_width(), ProgramWidth::X16);
    /// assert_eq!(cr.raw(), 0b01 << 8);
    /// ```
    #[must_use = "set_program_width returns a modified Cr"]
    pub const fn set_program_width(mut self, width: ProgramWidth) -> Cr {
        self.val &= !(Self::PSIZE_MASK << Self::PSIZE_SHIFT);
        self.val |= ((width as u32) & Self::PSIZE_MASK) << Self::PSIZE_SHIFT;
        self
    }

    /// Get the program parallelism.
    pub const fn program_width(&self) -> ProgramWidth {
        ProgramWidth::from_bits(self.val >> Self::PSIZE_SHIFT)
    }

    /// Set the start bit (`STRT`).
    ///
    /// Setting this bit triggers an erase selected by [`set_sector_erase`] or
    /// [`set_mass_erase`]. It is cleared by hardware when the busy flag is
    /// cleared.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Cr;
    ///
    /// let cr = Cr::new(0).set_mass_erase(true).set_start(true);
    /// assert!(cr.start());
    /// ```
    ///
    /// [`set_sector_erase`]: crate::flash::Cr::set_sector_erase
    /// [`set_mass_erase`]: crate::flash::Cr::set_mass_erase
    #[must_use = "set_start returns a modified Cr"]
    pub const fn set_start(self, en: bool) -> Cr {
        self.set_bit(Self::STRT, en)
    }

    /// Returns `true` if the start bit is set.
    pub const fn start(&self) -> bool {
        self.val & Self::STRT != 0
    }

    /// Set the end of operation interrupt enable bit (`EOPIE`).
    #[must_use = "set_eop_irq returns a modified Cr"]
    pub const fn set_eop_irq(self, en: bool) -> Cr {
        self.set_bit(Self::EOPIE, en)
    }

    /// Returns `true` if the end of operation interrupt is enabled.
    pub const fn eop_irq(&self) -> bool {
        self.val & Self::EOPIE != 0
    }

    /// Set the error interrupt enable bit (`ERRIE`).
    #[must_use = "set_err_irq returns a modified Cr"]
    pub const fn set_err_irq(self, en: bool) -> Cr {
        self.set_bit(Self::ERRIE, en)
    }

    /// Returns `true` if the error interrupt is enabled.
    pub const fn err_irq(&self) -> bool {
        self.val & Self::ERRIE != 0
    }

    /// Returns `true` if any operation enable bit (`PG`, `SER`, `MER`) is set.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Cr;
    ///
    /// assert!(!Cr::RESET.any_op());
    /// assert!(Cr::new(0).set_program(true).any_op());
    /// ```
    pub const fn any_op(&self) -> bool {
        self.val & (Self::PG | Self::SER | Self::MER) != 0
    }
}
