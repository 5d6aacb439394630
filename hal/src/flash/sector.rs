use core::ops::Range;

/// Starting address of the flash memory (AXIM interface).
pub const FLASH_START: usize = 0x0800_0000;

/// Ending address of the flash memory, inclusive.
///
/// This is calculated at runtime using the device electronic signature.
///
/// # Example
///
/// ```no_run
/// use stm32f7_flash::flash::flash_end;
///
/// // valid for a 2 MiB STM32F767ZI
/// assert_eq!(flash_end(), 0x081F_FFFF);
/// ```
#[inline]
pub fn flash_end() -> usize {
    const OFFSET: usize = FLASH_START - 1;
    OFFSET + crate::info::flash_size() as usize
}

/// Single bank flash sector.
///
/// | Sector | Size    | Offset      |
/// |--------|---------|-------------|
/// | 0 - 3  | 32 KiB  | `0x0_0000`  |
/// | 4      | 128 KiB | `0x2_0000`  |
/// | 5 - 11 | 256 KiB | `0x4_0000`  |
///
/// 1 MiB devices end at sector 7.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sector(u8);

impl Sector {
    /// Highest sector index of the largest (2 MiB) device.
    pub const MAX_INDEX: u8 = 11;

    const SMALL: usize = 32 * 1024;
    const MEDIUM: usize = 128 * 1024;
    const LARGE: usize = 256 * 1024;

    /// Create a sector from an index.
    ///
    /// Returns `None` if the index is greater than [`MAX_INDEX`].
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Sector;
    ///
    /// assert!(Sector::from_index(11).is_some());
    /// assert!(Sector::from_index(12).is_none());
    /// ```
    ///
    /// [`MAX_INDEX`]: crate::flash::Sector::MAX_INDEX
    pub const fn from_index(idx: u8) -> Option<Self> {
        if idx > Self::MAX_INDEX {
            None
        } else {
            Some(Sector(idx))
        }
    }

    /// Get the sector containing an absolute address.
    ///
    /// Returns `None` if the address is outside of the flash memory.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Sector;
    ///
    /// assert_eq!(Sector::from_addr(0x0800_0000), Sector::from_index(0));
    /// assert_eq!(Sector::from_addr(0x0800_8001), Sector::from_index(1));
    /// assert_eq!(Sector::from_addr(0x0803_FFFF), Sector::from_index(4));
    /// assert_eq!(Sector::from_addr(0x0804_0000), Sector::from_index(5));
    /// assert_eq!(Sector::from_addr(0x081F_FFFF), Sector::from_index(11));
    /// assert!(Sector::from_addr(0x0820_0000).is_none());
    /// assert!(Sector::from_addr(0).is_none());
    /// ```
    pub const fn from_addr(addr: usize) -> Option<Self> {
        let offset: usize = match addr.checked_sub(FLASH_START) {
            Some(offset) => offset,
            None => return None,
        };
        let idx: usize = if offset < 4 * Self::SMALL {
            offset / Self::SMALL
        } else if offset < 4 * Self::SMALL + Self::MEDIUM {
            4
        } else {
            offset / Self::LARGE + 4
        };
        if idx > Self::MAX_INDEX as usize {
            None
        } else {
            Some(Sector(idx as u8))
        }
    }

    /// Get the sector index.
    ///
    /// This is the value expected by [`Flash::erase_sector`].
    ///
    /// [`Flash::erase_sector`]: crate::flash::Flash::erase_sector
    pub const fn to_index(self) -> u8 {
        self.0
    }

    /// Size of the sector in bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Sector;
    ///
    /// assert_eq!(Sector::from_index(3).unwrap().size(), 32 * 1024);
    /// assert_eq!(Sector::from_index(4).unwrap().size(), 128 * 1024);
    /// assert_eq!(Sector::from_index(5).unwrap().size(), 256 * 1024);
    /// ```
    pub const fn size(&self) -> usize {
        match self.0 {
            0..=3 => Self::SMALL,
            4 => Self::MEDIUM,
            _ => Self::LARGE,
        }
    }

    /// Get the sector start address.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f7_flash::flash::Sector;
    ///
    /// assert_eq!(Sector::from_index(0).unwrap().addr(), 0x0800_0000);
    /// assert_eq!(Sector::from_index(3).unwrap().addr(), 0x0801_8000);
    /// assert_eq!(Sector::from_index(4).unwrap().addr(), 0x0802_0000);
    /// assert_eq!(Sector::from_index(7).unwrap().addr(), 0x080C_0000);
    /// ```
    pub const fn addr(&self) -> usize {
        let offset: usize = match self.0 {
            0..=4 => (self.0 as usize) * Self::SMALL,
            _ => (self.0 as usize - 4) * Self::LARGE,
        };
        FLASH_START + offset
    }

    /// Get the address range of the sector.
    ///
    /// # Example
    ///
    /// ```
    /// use core::ops::Range;
    /// use stm32f7_flash::flash::Sector;
    ///
    /// assert_eq!(
    ///     Sector::from_index(4).unwrap().addr_range(),
    ///     Range {
    ///         start: 0x0802_0000,
    ///         end: 0x0804_0000
    ///     }
    /// );
    /// ```
    pub const fn addr_range(&self) -> Range<usize> {
        Range {
            start: self.addr(),
            end: self.addr() + self.size(),
        }
    }
}
