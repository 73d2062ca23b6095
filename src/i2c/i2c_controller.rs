// Licensed under the Apache-2.0 license

//! High-level I2C controller abstraction.
//!
//! Wraps a hardware driver implementing [`I2cMaster`] and exposes the
//! standard `embedded_hal::i2c::I2c` interface, so device drivers written
//! against embedded-hal run unchanged on top of the iCE40 hard IP.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::I2cConfig;
use crate::i2c::traits::{I2cHardwareCore, I2cMaster};
use embedded_hal::i2c::{Operation, SevenBitAddress};

pub struct I2cController<H: I2cMaster, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub config: I2cConfig,
    pub logger: L,
}

impl<H: I2cMaster, L: Logger> I2cController<H, L> {
    pub fn new(hardware: H, config: I2cConfig, logger: L) -> Self {
        Self {
            hardware,
            config,
            logger,
        }
    }

    /// Bring up the hardware with the controller's configuration.
    pub fn init(&mut self) {
        self.logger.log_info("i2c controller init");
        I2cHardwareCore::init(&mut self.hardware, &mut self.config);
    }
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::ErrorType for I2cController<H, L> {
    type Error = H::Error;
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::I2c for I2cController<H, L> {
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.hardware.read(addr, buffer)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        self.hardware.write(addr, bytes)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.hardware.write_read(addr, bytes, buffer)
    }

    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.hardware.transaction_slice(addr, operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::common::I2cConfigBuilder;
    use crate::i2c::ice40_i2c::sim::driver;
    use embedded_hal::i2c::I2c;

    #[test]
    fn embedded_hal_write_read_goes_through_hardware() {
        let (hardware, core) = driver(&[0x68]);
        core.borrow_mut().rx.extend([0x42]);

        let mut controller = I2cController::new(
            hardware,
            I2cConfigBuilder::new(100_000_000).build(),
            NoOpLogger,
        );
        controller.init();

        let mut buffer = [0u8; 1];
        controller.write_read(0x68, &[0x75], &mut buffer).unwrap();
        assert_eq!(buffer, [0x42]);
        assert!(core.borrow().released);
    }

    #[test]
    fn controller_init_programs_hardware_from_its_config() {
        use crate::i2c::regs::Reg;

        let (hardware, core) = driver(&[]);
        // 48 MHz at 400 kHz gives prescaler 29, distinct from the sim
        // helper's 100 MHz default of 61.
        let mut controller =
            I2cController::new(hardware, I2cConfigBuilder::new(48_000_000).build(), NoOpLogger);
        controller.init();

        let core = core.borrow();
        assert_eq!(core.writes_to(Reg::BrLsb), vec![29]);
        assert_eq!(core.writes_to(Reg::BrMsb), vec![0]);
    }
}
