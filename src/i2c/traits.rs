// Licensed under the Apache-2.0 license

//! # I2C Hardware Abstraction Traits
//!
//! Composable traits separating the hardware driver from the controller
//! front end:
//!
//! ```text
//! I2cHardwareCore (foundation: init, timing, recovery)
//!     └── I2cMaster (master transfers)
//! ```
//!
//! Slave/target and interrupt-driven operation are out of scope for the
//! iCE40 hard IP driver; status is always polled.

use crate::i2c::common::{I2cConfig, I2cSpeed};
use embedded_hal::i2c::{AddressMode, Operation, SevenBitAddress};

/// Core I2C hardware interface.
///
/// Foundation trait all hardware implementations provide: bring-up, clock
/// configuration and bus recovery.
pub trait I2cHardwareCore {
    /// Hardware-specific error type implementing the embedded-hal error
    /// traits.
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Initialize the hardware with the given configuration.
    ///
    /// Re-entrant: implementations release the bus before reprogramming,
    /// so calling this again is always safe.
    fn init(&mut self, config: &mut I2cConfig);

    /// Select a new target bus speed.
    ///
    /// Returns the bus frequency the hardware will actually achieve. The
    /// new prescaler takes effect on the next `init`, since reprogramming
    /// the prescale registers resets the core.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested speed cannot be derived from the
    /// system clock.
    fn configure_timing(&mut self, speed: I2cSpeed) -> Result<u32, Self::Error>;

    /// Attempt to recover the bus from a stuck condition.
    ///
    /// # Errors
    ///
    /// Returns an error if recovery fails or is unsupported. Some
    /// implementations always succeed and return `Ok(())`.
    fn recover_bus(&mut self) -> Result<(), Self::Error>;
}

/// I2C master transfers on top of [`I2cHardwareCore`].
///
/// The address type `A` defaults to `SevenBitAddress`; the iCE40 hard IP
/// defines 10-bit addressing in its register map but this driver does not
/// use it.
pub trait I2cMaster<A: AddressMode = SevenBitAddress>: I2cHardwareCore {
    /// Write `bytes` to the slave at `addr`, framed by START and STOP.
    ///
    /// # Errors
    ///
    /// Returns an error if the slave does not acknowledge its address.
    /// Data-phase NACKs are not individually checked, matching the
    /// hardware's ordinary-transfer behavior.
    fn write(&mut self, addr: A, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read into `buffer` from the slave at `addr`. The final byte is
    /// NACK'd and followed by STOP, as the protocol requires.
    ///
    /// # Errors
    ///
    /// Returns an error if the slave does not acknowledge its address.
    fn read(&mut self, addr: A, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Write then read with a repeated START between the phases, keeping
    /// the bus claimed throughout.
    ///
    /// # Errors
    ///
    /// Returns an error if the slave does not acknowledge in either phase.
    fn write_read(&mut self, addr: A, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Execute a sequence of operations as one bus transaction.
    ///
    /// # Errors
    ///
    /// Returns an error on address NACK, or if a `Read` operation appears
    /// anywhere but the final position: the hard IP cannot end a read
    /// without a STOP, so a post-read repeated START is not expressible.
    fn transaction_slice(
        &mut self,
        addr: A,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Self::Error>;
}
