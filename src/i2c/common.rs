// Licensed under the Apache-2.0 license

//! Common types and clock derivation for the iCE40 I2C driver.
//!
//! The hard IP divides the system-bus clock by `(prescaler + 1) * 4` to
//! produce the I2C bus clock; the prescaler is computed here once from the
//! configured system clock and target speed.

use crate::i2c::regs::SdaDelay;

/// Poll ceiling for the bounded status waits. Iteration-count based, not
/// wall-clock based: each iteration is one full bridge round trip.
pub const DEFAULT_POLL_LIMIT: u8 = i8::MAX as u8;

/// Target I2C bus speeds supported by the hard IP.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Low = 50_000,
    Standard = 100_000,
    Fast = 400_000,
}

impl I2cSpeed {
    #[must_use]
    pub const fn hz(self) -> u32 {
        self as u32
    }
}

/// Driver configuration. Built once at startup via [`I2cConfigBuilder`].
#[derive(Copy, Clone, Debug)]
pub struct I2cConfig {
    /// System-bus clock frequency in Hz, fixed by the SoC build.
    pub clock_hz: u32,
    /// Target I2C bus speed.
    pub speed: I2cSpeed,
    /// SDA output delay selection programmed into the control register.
    pub sda_delay: SdaDelay,
    /// Iteration ceiling for the bounded status polls.
    pub poll_limit: u8,
}

impl I2cConfig {
    /// Clock prescale value: `floor(clock / (speed * 4)) - 1`.
    ///
    /// The hardware field is 10 bits wide; values are masked accordingly.
    /// Clamps to zero when the system clock is slower than four times the
    /// target speed, which no real SoC build satisfies anyway.
    #[must_use]
    pub fn prescaler(&self) -> u16 {
        let divided = self.clock_hz / (self.speed.hz() * 4);
        (divided.saturating_sub(1) & 0x3FF) as u16
    }

    /// System clock cycles per I2C bus clock cycle, the unit used by the
    /// software busy-delay.
    #[must_use]
    pub fn cycles_per_i2c_cycle(&self) -> u32 {
        u32::from(self.prescaler()) * 4
    }

    /// Bus frequency actually achieved by the computed prescaler.
    #[must_use]
    pub fn bus_frequency(&self) -> u32 {
        self.clock_hz / ((u32::from(self.prescaler()) + 1) * 4)
    }
}

/// Builder for [`I2cConfig`]. Defaults to 400 kHz, 300 ns SDA delay and
/// the 127-iteration poll ceiling.
pub struct I2cConfigBuilder {
    clock_hz: u32,
    speed: I2cSpeed,
    sda_delay: SdaDelay,
    poll_limit: u8,
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new(clock_hz: u32) -> Self {
        Self {
            clock_hz,
            speed: I2cSpeed::Fast,
            sda_delay: SdaDelay::Ns300,
            poll_limit: DEFAULT_POLL_LIMIT,
        }
    }

    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn sda_delay(mut self, delay: SdaDelay) -> Self {
        self.sda_delay = delay;
        self
    }

    #[must_use]
    pub fn poll_limit(mut self, limit: u8) -> Self {
        self.poll_limit = limit;
        self
    }

    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            clock_hz: self.clock_hz,
            speed: self.speed,
            sda_delay: self.sda_delay,
            poll_limit: self.poll_limit,
        }
    }
}
