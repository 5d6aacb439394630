//! Device electronic signature

use core::ptr::read_volatile;

/// Address of the flash size data register.
const FLASHSIZE: usize = 0x1FF0_F442;

/// Flash size in kibibytes
///
/// # Example
///
/// ```no_run
/// use stm32f7_flash::info::flash_size_kibibyte;
///
/// // valid for a 2 MiB STM32F767ZI
/// assert_eq!(flash_size_kibibyte(), 2048);
/// ```
#[inline]
pub fn flash_size_kibibyte() -> u16 {
    unsafe { read_volatile(FLASHSIZE as *const u16) }
}

/// Flash size in bytes
///
/// # Example
///
/// ```no_run
/// use stm32f7_flash::info::flash_size;
///
/// // valid for a 2 MiB STM32F767ZI
/// assert_eq!(flash_size(), 2 * 1024 * 1024);
/// ```
#[inline]
pub fn flash_size() -> u32 {
    u32::from(flash_size_kibibyte()) << 10
}
