// Licensed under the Apache-2.0 license

//! iCE40 UltraPlus I2C hard IP driver.
//!
//! The hard IP is reached through a narrow indirect register bus: every
//! register access is itself a handshake over five CSR-backed signals
//! ([`sys_bus`]). On top of that sit the register map ([`regs`]), clock
//! derivation ([`common`]), the transaction engine ([`ice40_i2c`]) and an
//! embedded-hal controller front end ([`i2c_controller`]).

pub mod common;
pub mod i2c_controller;
pub mod ice40_i2c;
pub mod regs;
pub mod sys_bus;
pub mod traits;

pub use common::{I2cConfig, I2cConfigBuilder, I2cSpeed, DEFAULT_POLL_LIMIT};
pub use i2c_controller::I2cController;
pub use ice40_i2c::{Error, Ice40I2c};
pub use regs::SdaDelay;
pub use sys_bus::{SysBusBridge, SystemBus};
pub use traits::{I2cHardwareCore, I2cMaster};
