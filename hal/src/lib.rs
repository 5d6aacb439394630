//! STM32F7 flash program/erase controller driver.
//!
//! The driver is generic over [`flash::FlashRegs`], the register access
//! layer. With a device feature enabled (`stm32f745`, `stm32f746`,
//! `stm32f765`, `stm32f767`, `stm32f769`) it is implemented for the PAC
//! `FLASH` peripheral.
#![cfg_attr(not(test), no_std)]

mod macros;

cfg_if::cfg_if! {
    if #[cfg(feature = "stm32f745")] {
        /// Peripheral access crate.
        pub use stm32f7::stm32f745 as pac;
    } else if #[cfg(feature = "stm32f746")] {
        /// Peripheral access crate.
        pub use stm32f7::stm32f7x6 as pac;
    } else if #[cfg(feature = "stm32f765")] {
        /// Peripheral access crate.
        pub use stm32f7::stm32f765 as pac;
    } else if #[cfg(feature = "stm32f767")] {
        /// Peripheral access crate.
        pub use stm32f7::stm32f7x7 as pac;
    } else if #[cfg(feature = "stm32f769")] {
        /// Peripheral access crate.
        pub use stm32f7::stm32f7x9 as pac;
    }
}

pub mod flash;
pub mod info;

pub use cortex_m;
#[cfg(feature = "rt")]
pub use cortex_m_rt;
pub use nb;
