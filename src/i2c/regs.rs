// Licensed under the Apache-2.0 license

//! Register map for the iCE40 UltraPlus I2C hard IP (`SB_I2C`).
//!
//! Addresses and bit assignments follow the Lattice "Advanced iCE40 I2C and
//! SPI Hardened IP User Guide" (FPGA-TN-02011). The hard IP has no
//! memory-mapped register file visible to software; every access goes
//! through the system-bus handshake in [`crate::i2c::sys_bus`].

use bitflags::bitflags;

/// 4-bit system-bus addresses of the hard IP registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Reg {
    /// Control register 1 \[Read/Write\]. A write resets the I2C core.
    Cr1 = 0x8,
    /// Command register \[Read/Write\]. Commands are pulses, not modes.
    Cmdr = 0x9,
    /// Clock prescale, LSB \[Read/Write\].
    BrLsb = 0xA,
    /// Clock prescale, MSB \[Read/Write\]. A write resets the I2C core.
    BrMsb = 0xB,
    /// Status register \[Read\].
    Sr = 0xC,
    /// Transmit data \[Write\].
    Txdr = 0xD,
    /// Receive data \[Read\].
    Rxdr = 0xE,
    /// General call data \[Read\].
    Gcdr = 0xF,
    /// Slave address MSB \[Read/Write\]. Unused: slave mode is out of scope.
    Saddr = 0x3,
    /// Interrupt enable \[Read/Write\]. Unused: the driver always polls.
    IrqEn = 0x7,
    /// Interrupt status \[Read/Write\]. Unused: the driver always polls.
    Irq = 0x6,
}

impl Reg {
    #[must_use]
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

bitflags! {
    /// System-bus control word driven through the bridge (`sbctrl` CSR).
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct SbCtrl: u8 {
        /// Read/write direction input (`SBRWI`). Read = 0, write = 1.
        const RWI = 1 << 0;
        /// Strobe input (`SBSTBI`). High while a register request is pending.
        const STBI = 1 << 1;
    }
}

bitflags! {
    /// `I2CCR1` control register bits.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Control: u8 {
        /// Core enable. Cleared forces the core into idle.
        const I2CEN = 1 << 7;
        /// General call response enable (slave mode, unused here).
        const GCEN = 1 << 6;
        /// Wake-up from standby on slave address match (unused here).
        const WKUPEN = 1 << 5;
    }
}

/// SDA output delay selection, `I2CCR1[3:2]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SdaDelay {
    /// 300 ns minimum output delay (power-on default).
    #[default]
    Ns300 = 0b00,
    /// 150 ns minimum output delay.
    Ns150 = 0b01,
    /// 75 ns minimum output delay.
    Ns75 = 0b10,
    /// No added output delay.
    Ns0 = 0b11,
}

impl SdaDelay {
    /// Field value shifted into its `I2CCR1` position.
    #[must_use]
    pub const fn cr1_bits(self) -> u8 {
        (self as u8) << 2
    }
}

bitflags! {
    /// `I2CCMDR` command register bits.
    ///
    /// A command is written and then immediately cleared to zero, so each
    /// flag combination acts as a one-shot pulse.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Command: u8 {
        /// Generate START (or repeated START).
        const STA = 1 << 7;
        /// Generate STOP.
        const STO = 1 << 6;
        /// Read from slave.
        const RD = 1 << 5;
        /// Write to slave.
        const WR = 1 << 4;
        /// ACK/NACK control. Set sends NACK on the byte being read.
        const ACK = 1 << 3;
        /// Disable clock stretching. The overflow flag must then be watched.
        const CKSDIS = 1 << 2;
        /// Read with double buffering disabled.
        const RBUFDIS = 1 << 1;
    }
}

bitflags! {
    /// `I2CSR` status register bits. Read-only, always polled.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Byte transfer in progress.
        const TIP = 1 << 7;
        /// Bus busy: set at START, cleared at STOP.
        const BUSY = 1 << 6;
        /// Received-acknowledge flag. The polarity observed on hardware is
        /// inverted with respect to the datasheet text: clear means the
        /// addressed slave acknowledged, set means NACK/overrun.
        const RARC = 1 << 5;
        /// Direction: set = master receiving / slave transmitting.
        const SRW = 1 << 4;
        /// Arbitration lost (multi-master, unused here).
        const ARBL = 1 << 3;
        /// Transmitter or receiver ready for the next byte.
        const TRRDY = 1 << 2;
        /// Transmit/receive overrun, or NACK received when RARC is set.
        const TROE = 1 << 1;
        /// Hardware general call received (slave mode, unused here).
        const HGC = 1 << 0;
    }
}
