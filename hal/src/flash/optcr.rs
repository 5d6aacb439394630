/// Brown-out reset threshold (`BOR_LEV`).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum BorLevel {
    /// Reset threshold 2.70 V - 3.60 V
    Level3 = 0b00,
    /// Reset threshold 2.40 V - 2.70 V
    Level2 = 0b01,
    /// Reset threshold 2.10 V - 2.40 V
    Level1 = 0b10,
    /// Only power on / power down reset, 1.8 V - 2.10 V
    Off = 0b11,
}

/// Read protection level (`RDP`).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadProtection {
    /// No protection, `RDP = 0xAA`.
    Level0,
    /// Debug access to flash disabled, any `RDP` that is not level 0 or 2.
    Level1,
    /// Chip protection, `RDP = 0xCC`.
    ///
    /// **This is irreversible.**
    Level2,
}

impl ReadProtection {
    const fn from_bits(bits: u8) -> ReadProtection {
        match bits {
            0xAA => ReadProtection::Level0,
            0xCC => ReadProtection::Level2,
            _ => ReadProtection::Level1,
        }
    }

    const fn bits(self) -> u8 {
        match self {
            ReadProtection::Level0 => 0xAA,
            ReadProtection::Level1 => 0x55,
            ReadProtection::Level2 => 0xCC,
        }
    }
}

/// Flash option control register (`FLASH_OPTCR`).
///
/// The user option bytes are loaded into this register at reset; a value
/// written here is only committed to the option bytes by setting
/// [`set_start`], and takes effect after the next reset.
///
/// [`set_start`]: crate::flash::Optcr::set_start
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Optcr {
    val: u32,
}

impl Optcr {
    pub(crate) const OPTLOCK: u32 = 1 << 0;
    pub(crate) const OPTSTRT: u32 = 1 << 1;
    pub(crate) const BOR_SHIFT: u32 = 2;
    pub(crate) const WWDG_SW: u32 = 1 << 4;
    pub(crate) const IWDG_SW: u32 = 1 << 5;
    pub(crate) const NRST_STOP: u32 = 1 << 6;
    pub(crate) const NRST_STDBY: u32 = 1 << 7;
    pub(crate) const RDP_SHIFT: u32 = 8;
    pub(crate) const NWRP_SHIFT: u32 = 16;
    pub(crate) const NWRP_MASK: u32 = 0xFFF;
    pub(crate) const IWDG_STDBY: u32 = 1 << 30;
    pub(crate) const IWDG_STOP: u32 = 1 << 31;

    /// Low bits that are never copied from a user value by
    /// [`Flash::program_option_bytes`].
    ///
    /// [`Flash::program_option_bytes`]: crate::flash::Flash::program_option_bytes
    pub const RESERVED: u32 = Self::OPTLOCK | Self::OPTSTRT;

    /// Factory value of the register for single bank devices.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{BorLevel, Optcr, ReadProtection};
    ///
    /// assert!(Optcr::RESET.locked());
    /// assert_eq!(Optcr::RESET.read_protection(), ReadProtection::Level0);
    /// assert_eq!(Optcr::RESET.bor_level(), BorLevel::Off);
    /// assert!(!Optcr::RESET.write_protected(0));
    /// ```
    pub const RESET: Optcr = Optcr::new(0xCFFF_AAFD);

    /// Create a new Optcr register from a raw value.
    pub const fn new(val: u32) -> Optcr {
        Optcr { val }
    }

    /// Get the raw value of the register.
    pub const fn raw(self) -> u32 {
        self.val
    }

    const fn set_bit(mut self, mask: u32, en: bool) -> Optcr {
        if en {
            self.val |= mask;
        } else {
            self.val &= !mask;
        }
        self
    }

    /// Set the option lock bit (`OPTLOCK`).
    #[must_use = "set_lock returns a modified Optcr"]
    pub const fn set_lock(self, lock: bool) -> Optcr {
        self.set_bit(Self::OPTLOCK, lock)
    }

    /// Returns `true` if the option control register is locked.
    pub const fn locked(&self) -> bool {
        self.val & Self::OPTLOCK != 0
    }

    /// Set the option start bit (`OPTSTRT`).
    #[must_use = "set_start returns a modified Optcr"]
    pub const fn set_start(self, en: bool) -> Optcr {
        self.set_bit(Self::OPTSTRT, en)
    }

    /// Returns `true` if an option byte modification was started.
    pub const fn start(&self) -> bool {
        self.val & Self::OPTSTRT != 0
    }

    /// Set the brown-out reset level.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{BorLevel, Optcr};
    ///
    /// let optcr = Optcr::RESET.set_bor_level(BorLevel::Level2);
    /// assert_eq!(optcr.bor_level(), BorLevel::Level2);
    /// assert!(optcr.locked());
    /// ```
    #[must_use = "set_bor_level returns a modified Optcr"]
    pub const fn set_bor_level(mut self, level: BorLevel) -> Optcr {
        self.val &= !(0b11 << Self::BOR_SHIFT);
        self.val |= ((level as u32) & 0b11) << Self::BOR_SHIFT;
        self
    }

    /// Get the brown-out reset level.
    #[allow(clippy::wildcard_in_or_patterns)]
    pub const fn bor_level(&self) -> BorLevel {
        match (self.val >> Self::BOR_SHIFT) & 0b11 {
            0b00 => BorLevel::Level3,
            0b01 => BorLevel::Level2,
            0b10 => BorLevel::Level1,
            0b11 | _ => BorLevel::Off,
        }
    }

    /// Select the software (`true`) or hardware (`false`) window watchdog.
    #[must_use = "set_wwdg_sw returns a modified Optcr"]
    pub const fn set_wwdg_sw(self, sw: bool) -> Optcr {
        self.set_bit(Self::WWDG_SW, sw)
    }

    /// Returns `true` if the window watchdog is software controlled.
    pub const fn wwdg_sw(&self) -> bool {
        self.val & Self::WWDG_SW != 0
    }

    /// Select the software (`true`) or hardware (`false`) independent watchdog.
    #[must_use = "set_iwdg_sw returns a modified Optcr"]
    pub const fn set_iwdg_sw(self, sw: bool) -> Optcr {
        self.set_bit(Self::IWDG_SW, sw)
    }

    /// Returns `true` if the independent watchdog is software controlled.
    pub const fn iwdg_sw(&self) -> bool {
        self.val & Self::IWDG_SW != 0
    }

    /// Set `nRST_STOP`, `false` generates a reset when entering stop mode.
    #[must_use = "set_nrst_stop returns a modified Optcr"]
    pub const fn set_nrst_stop(self, en: bool) -> Optcr {
        self.set_bit(Self::NRST_STOP, en)
    }

    /// Get `nRST_STOP`.
    pub const fn nrst_stop(&self) -> bool {
        self.val & Self::NRST_STOP != 0
    }

    /// Set `nRST_STDBY`, `false` generates a reset when entering standby mode.
    #[must_use = "set_nrst_stdby returns a modified Optcr"]
    pub const fn set_nrst_stdby(self, en: bool) -> Optcr {
        self.set_bit(Self::NRST_STDBY, en)
    }

    /// Get `nRST_STDBY`.
    pub const fn nrst_stdby(&self) -> bool {
        self.val & Self::NRST_STDBY != 0
    }

    /// Set `IWDG_STDBY`, `false` freezes the independent watchdog in standby
    /// mode.
    #[must_use = "set_iwdg_stdby returns a modified Optcr"]
    pub const fn set_iwdg_stdby(self, en: bool) -> Optcr {
        self.set_bit(Self::IWDG_STDBY, en)
    }

    /// Get `IWDG_STDBY`.
    pub const fn iwdg_stdby(&self) -> bool {
        self.val & Self::IWDG_STDBY != 0
    }

    /// Set `IWDG_STOP`, `false` freezes the independent watchdog in stop mode.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Optcr;
    ///
    /// assert!(Optcr::RESET.iwdg_stop());
    /// let optcr = Optcr::RESET.set_iwdg_stop(false);
    /// assert!(!optcr.iwdg_stop());
    /// assert!(optcr.iwdg_stdby());
    /// assert_eq!(optcr.raw(), 0x4FFF_AAFD);
    /// ```
    #[must_use = "set_iwdg_stop returns a modified Optcr"]
    pub const fn set_iwdg_stop(self, en: bool) -> Optcr {
        self.set_bit(Self::IWDG_STOP, en)
    }

    /// Get `IWDG_STOP`.
    pub const fn iwdg_stop(&self) -> bool {
        self.val & Self::IWDG_STOP != 0
    }

    /// Set the read protection level.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{Optcr, ReadProtection};
    ///
    /// let optcr = Optcr::RESET.set_read_protection(ReadProtection::Level1);
    /// assert_eq!(optcr.read_protection(), ReadProtection::Level1);
    /// assert_eq!(optcr.raw() & 0xFF00, 0x5500);
    /// ```
    #[must_use = "set_read_protection returns a modified Optcr"]
    pub const fn set_read_protection(mut self, rdp: ReadProtection) -> Optcr {
        self.val &= !(0xFF << Self::RDP_SHIFT);
        self.val |= (rdp.bits() as u32) << Self::RDP_SHIFT;
        self
    }

    /// Get the read protection level.
    pub const fn read_protection(&self) -> ReadProtection {
        ReadProtection::from_bits((self.val >> Self::RDP_SHIFT) as u8)
    }

    /// Enable or disable write protection of a sector.
    ///
    /// The `nWRP` bits are active low; sectors above 11 are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Optcr;
    ///
    /// let optcr = Optcr::RESET.set_write_protected(3, true);
    /// assert!(optcr.write_protected(3));
    /// assert!(!optcr.write_protected(2));
    /// assert_eq!(optcr.raw() & (1 << 19), 0);
    ///
    /// assert_eq!(Optcr::RESET.set_write_protected(12, true), Optcr::RESET);
    /// ```
    #[must_use = "set_write_protected returns a modified Optcr"]
    pub const fn set_write_protected(self, sector: u8, wp: bool) -> Optcr {
        if (sector as u32) >= Self::NWRP_MASK.count_ones() {
            self
        } else {
            self.set_bit(1 << (Self::NWRP_SHIFT + sector as u32), !wp)
        }
    }

    /// Returns `true` if `sector` is write protected.
    ///
    /// Always `false` for sectors above 11.
    pub const fn write_protected(&self, sector: u8) -> bool {
        if (sector as u32) >= Self::NWRP_MASK.count_ones() {
            false
        } else {
            self.val & (1 << (Self::NWRP_SHIFT + sector as u32)) == 0
        }
    }
}
