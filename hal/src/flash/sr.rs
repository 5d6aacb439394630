use super::Error;

/// Flash status register (`FLASH_SR`).
///
/// All flags except [`busy`] are sticky and are cleared by writing `1` to
/// them. A value built with the setters is therefore a *clear mask* when
/// written back.
///
/// [`busy`]: crate::flash::Sr::busy
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sr {
    val: u32,
}

impl Sr {
    pub(crate) const EOP: u32 = 1 << 0;
    pub(crate) const OPERR: u32 = 1 << 1;
    pub(crate) const WRPERR: u32 = 1 << 4;
    pub(crate) const PGAERR: u32 = 1 << 5;
    pub(crate) const PGPERR: u32 = 1 << 6;
    pub(crate) const ERSERR: u32 = 1 << 7;
    pub(crate) const RDERR: u32 = 1 << 8;
    pub(crate) const BSY: u32 = 1 << 16;

    /// Mask of every write-one-to-clear flag.
    pub(crate) const W1C: u32 = Self::EOP
        | Self::OPERR
        | Self::WRPERR
        | Self::PGAERR
        | Self::PGPERR
        | Self::ERSERR
        | Self::RDERR;

    /// Reset value of the register.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Sr;
    /// assert_eq!(Sr::RESET.raw(), 0);
    /// assert_eq!(Sr::RESET.busy(), false);
    /// ```
    pub const RESET: Sr = Sr::new(0);

    /// Create a new Sr register from a raw value.
    pub const fn new(val: u32) -> Sr {
        Sr { val }
    }

    /// Get the raw value of the register.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Sr;
    /// assert_eq!(Sr::new(0x0001_0001).raw(), 0x0001_0001);
    /// ```
    pub const fn raw(self) -> u32 {
        self.val
    }

    const fn set_bit(mut self, mask: u32, en: bool) -> Sr {
        if en {
            self.val |= mask;
        } else {
            self.val &= !mask;
        }
        self
    }

    /// Returns `true` while an erase or program operation is in flight.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Sr;
    /// assert!(Sr::new(1 << 16).busy());
    /// assert!(!Sr::new(!(1 << 16)).busy());
    /// ```
    pub const fn busy(&self) -> bool {
        self.val & Self::BSY != 0
    }

    /// Set the end of operation flag (`EOP`).
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Sr;
    ///
    /// let sr = Sr::RESET.set_eop(true);
    /// assert!(sr.eop());
    /// assert_eq!(sr.raw(), 1);
    /// ```
    #[must_use = "set_eop returns a modified Sr"]
    pub const fn set_eop(self, en: bool) -> Sr {
        self.set_bit(Self::EOP, en)
    }

    /// Returns `true` if an erase or program operation completed.
    pub const fn eop(&self) -> bool {
        self.val & Self::EOP != 0
    }

    /// Set the operation error flag (`OPERR`).
    #[must_use = "set_operr returns a modified Sr"]
    pub const fn set_operr(self, en: bool) -> Sr {
        self.set_bit(Self::OPERR, en)
    }

    /// Returns `true` if an operation error occurred.
    ///
    /// Only set when error interrupts are enabled.
    pub const fn operr(&self) -> bool {
        self.val & Self::OPERR != 0
    }

    /// Set the write protection error flag (`WRPERR`).
    #[must_use = "set_wrperr returns a modified Sr"]
    pub const fn set_wrperr(self, en: bool) -> Sr {
        self.set_bit(Self::WRPERR, en)
    }

    /// Returns `true` if the address to erase or program is write protected.
    pub const fn wrperr(&self) -> bool {
        self.val & Self::WRPERR != 0
    }

    /// Set the programming alignment error flag (`PGAERR`).
    #[must_use = "set_pgaerr returns a modified Sr"]
    pub const fn set_pgaerr(self, en: bool) -> Sr {
        self.set_bit(Self::PGAERR, en)
    }

    /// Returns `true` if a program access was not aligned to its width.
    pub const fn pgaerr(&self) -> bool {
        self.val & Self::PGAERR != 0
    }

    /// Set the programming error flag (`PGPERR`).
    #[must_use = "set_pgperr returns a modified Sr"]
    pub const fn set_pgperr(self, en: bool) -> Sr {
        self.set_bit(Self::PGPERR, en)
    }

    /// Returns `true` if a program access did not match the program width, or
    /// the destination was not erased.
    pub const fn pgperr(&self) -> bool {
        self.val & Self::PGPERR != 0
    }

    /// Set the erase sequence error flag (`ERSERR`).
    #[must_use = "set_erserr returns a modified Sr"]
    pub const fn set_erserr(self, en: bool) -> Sr {
        self.set_bit(Self::ERSERR, en)
    }

    /// Returns `true` if an erase or program was started while the control
    /// register was not correctly configured.
    pub const fn erserr(&self) -> bool {
        self.val & Self::ERSERR != 0
    }

    /// Set the read protection error flag (`RDERR`).
    #[must_use = "set_rderr returns a modified Sr"]
    pub const fn set_rderr(self, en: bool) -> Sr {
        self.set_bit(Self::RDERR, en)
    }

    /// Returns `true` if a read targeted a PCROP protected sector.
    pub const fn rderr(&self) -> bool {
        self.val & Self::RDERR != 0
    }

    /// Returns `true` if any of the four sequencing error flags is set.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Sr;
    ///
    /// assert!(!Sr::RESET.set_eop(true).has_error());
    /// assert!(Sr::RESET.set_pgaerr(true).has_error());
    /// ```
    pub const fn has_error(&self) -> bool {
        self.val & (Self::WRPERR | Self::PGAERR | Self::PGPERR | Self::ERSERR) != 0
    }

    /// Map the sticky error flags to an [`Error`].
    ///
    /// When several flags are set the most specific one is reported, in the
    /// order write protection, alignment, programming, erase sequence.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::{Error, Sr};
    ///
    /// assert_eq!(Sr::RESET.set_eop(true).error(), None);
    /// assert_eq!(Sr::RESET.set_pgperr(true).error(), Some(Error::Prog));
    /// assert_eq!(
    ///     Sr::RESET.set_erserr(true).set_pgaerr(true).error(),
    ///     Some(Error::Align)
    /// );
    /// ```
    pub const fn error(&self) -> Option<Error> {
        if self.wrperr() {
            Some(Error::Wp)
        } else if self.pgaerr() {
            Some(Error::Align)
        } else if self.pgperr() {
            Some(Error::Prog)
        } else if self.erserr() {
            Some(Error::EraseSeq)
        } else {
            None
        }
    }
}
