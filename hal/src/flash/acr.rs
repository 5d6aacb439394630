/// Flash access control register (`FLASH_ACR`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Acr {
    val: u32,
}

impl Acr {
    pub(crate) const LATENCY_MASK: u32 = 0xF;
    pub(crate) const PRFTEN: u32 = 1 << 8;
    pub(crate) const ARTEN: u32 = 1 << 9;
    pub(crate) const ARTRST: u32 = 1 << 11;

    /// Reset value of the register.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Acr;
    /// assert_eq!(Acr::RESET.raw(), 0);
    /// assert_eq!(Acr::RESET.latency(), 0);
    /// ```
    pub const RESET: Acr = Acr::new(0);

    /// Create a new Acr register from a raw value.
    pub const fn new(val: u32) -> Acr {
        Acr { val }
    }

    /// Get the raw value of the register.
    pub const fn raw(self) -> u32 {
        self.val
    }

    const fn set_bit(mut self, mask: u32, en: bool) -> Acr {
        if en {
            self.val |= mask;
        } else {
            self.val &= !mask;
        }
        self
    }

    /// Set the number of wait states.
    ///
    /// Masked to the 4-bit `LATENCY` field.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Acr;
    ///
    /// let acr = Acr::RESET.set_prefetch(true).set_latency(7);
    /// assert_eq!(acr.latency(), 7);
    /// assert!(acr.prefetch());
    ///
    /// assert_eq!(Acr::RESET.set_latency(0x1F).latency(), 0xF);
    /// ```
    #[must_use = "set_latency returns a modified Acr"]
    pub const fn set_latency(mut self, ws: u8) -> Acr {
        self.val &= !Self::LATENCY_MASK;
        self.val |= (ws as u32) & Self::LATENCY_MASK;
        self
    }

    /// Get the number of wait states.
    pub const fn latency(&self) -> u8 {
        (self.val & Self::LATENCY_MASK) as u8
    }

    /// Set the prefetch enable bit (`PRFTEN`).
    #[must_use = "set_prefetch returns a modified Acr"]
    pub const fn set_prefetch(self, en: bool) -> Acr {
        self.set_bit(Self::PRFTEN, en)
    }

    /// Returns `true` if the prefetch buffer is enabled.
    pub const fn prefetch(&self) -> bool {
        self.val & Self::PRFTEN != 0
    }

    /// Set the ART accelerator enable bit (`ARTEN`).
    #[must_use = "set_art returns a modified Acr"]
    pub const fn set_art(self, en: bool) -> Acr {
        self.set_bit(Self::ARTEN, en)
    }

    /// Returns `true` if the ART accelerator is enabled.
    pub const fn art(&self) -> bool {
        self.val & Self::ARTEN != 0
    }

    /// Set the ART accelerator reset bit (`ARTRST`).
    ///
    /// The reset only has an effect while the accelerator is disabled.
    #[must_use = "set_art_reset returns a modified Acr"]
    pub const fn set_art_reset(self, en: bool) -> Acr {
        self.set_bit(Self::ARTRST, en)
    }

    /// Returns `true` if the ART accelerator reset bit is set.
    pub const fn art_reset(&self) -> bool {
        self.val & Self::ARTRST != 0
    }
}

/// Number of wait states needed to read flash at `hclk_hz`.
///
/// | Supply        | HCLK per wait state | Max HCLK |
/// |---------------|---------------------|----------|
/// | 2.7 V - 3.6 V | 30 MHz              | 216 MHz  |
/// | 2.4 V - 2.7 V | 24 MHz              | 216 MHz  |
/// | 2.1 V - 2.4 V | 22 MHz              | 216 MHz  |
/// | 1.8 V - 2.1 V | 20 MHz              | 180 MHz  |
///
/// Returns `None` if the voltage is out of range, or the frequency is above the
/// maximum for that voltage.
///
/// The latency must be raised **before** increasing the clock, and lowered
/// **after** decreasing it.
///
/// # Example
///
/// ```
/// use stm32f7_flash::flash::wait_states;
///
/// assert_eq!(wait_states(16_000_000, 3300), Some(0));
/// assert_eq!(wait_states(30_000_000, 3300), Some(0));
/// assert_eq!(wait_states(30_000_001, 3300), Some(1));
/// assert_eq!(wait_states(216_000_000, 3300), Some(7));
/// assert_eq!(wait_states(168_000_000, 1900), Some(8));
/// assert_eq!(wait_states(216_000_000, 1900), None);
/// assert_eq!(wait_states(8_000_000, 1000), None);
/// ```
pub const fn wait_states(hclk_hz: u32, millivolts: u16) -> Option<u8> {
    const MHZ: u32 = 1_000_000;
    let (per_ws, max): (u32, u32) = match millivolts {
        2700..=3600 => (30 * MHZ, 216 * MHZ),
        2400..=2699 => (24 * MHZ, 216 * MHZ),
        2100..=2399 => (22 * MHZ, 216 * MHZ),
        1800..=2099 => (20 * MHZ, 180 * MHZ),
        _ => return None,
    };
    if hclk_hz > max {
        None
    } else {
        Some((hclk_hz.saturating_sub(1) / per_ws) as u8)
    }
}
