// Licensed under the Apache-2.0 license

//! Indirect register access over the LiteX system-bus handshake.
//!
//! The hard IP exposes no addressable register file. Each register read or
//! write is a small protocol over five CSR-backed signals: a 4-bit register
//! address (`sbadri`), an 8-bit data input (`sbdati`), a two-bit control
//! word carrying direction and strobe (`sbctrl`), an acknowledge output
//! (`sbstatus.SBACKO`) and an 8-bit data output (`sbdato`).
//! [`SysBusBridge`] turns that signal set into reliable `set_register` /
//! `get_register` operations.

use crate::i2c::regs::{Reg, SbCtrl};

/// Raw accessors for the five system-bus signals.
///
/// Implementations wrap the CSR accessors generated for the SoC build; the
/// bit layout of the control word is fixed by the LiteX module (`SBRWI` at
/// bit 0, `SBSTBI` at bit 1, see [`SbCtrl`]). Tests substitute a scripted
/// mock.
pub trait SystemBus {
    /// Drive the 4-bit register address input.
    fn set_address(&mut self, addr: u8);

    /// Drive the 8-bit data input.
    fn set_data_in(&mut self, data: u8);

    /// Drive the control word (direction + strobe, see [`SbCtrl`]).
    fn set_control(&mut self, ctrl: u8);

    /// Sample the acknowledge output. True once the pending request has
    /// been consumed by the hard IP.
    fn ack(&mut self) -> bool;

    /// Sample the 8-bit data output.
    fn data_out(&mut self) -> u8;
}

/// Handshake state machine over a [`SystemBus`].
///
/// Owns the two handshake booleans exclusively. Every access leaves the
/// bridge in its canonical idle state: strobe deasserted, direction read.
pub struct SysBusBridge<B: SystemBus> {
    bus: B,
    rwi: bool,
    stbi: bool,
}

impl<B: SystemBus> SysBusBridge<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            rwi: false,
            stbi: false,
        }
    }

    /// Consume the bridge, returning the underlying bus.
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Resend the whole control word from the current signal values.
    ///
    /// The control word is a single CSR, so changing either signal must
    /// rewrite both. Invariant: hardware always sees the current value of
    /// both booleans.
    fn sync_control(&mut self) {
        let mut ctrl = SbCtrl::empty();
        if self.rwi {
            ctrl |= SbCtrl::RWI;
        }
        if self.stbi {
            ctrl |= SbCtrl::STBI;
        }
        self.bus.set_control(ctrl.bits());
    }

    fn set_direction_write(&mut self) {
        self.rwi = true;
        self.sync_control();
    }

    fn set_direction_read(&mut self) {
        self.rwi = false;
        self.sync_control();
    }

    fn assert_strobe(&mut self) {
        self.stbi = true;
        self.sync_control();
    }

    fn deassert_strobe(&mut self) {
        self.stbi = false;
        self.sync_control();
    }

    /// Spin until the hard IP acknowledges the pending request.
    ///
    /// The wait is unbounded: if the hardware never asserts acknowledge
    /// this blocks forever. Inherited liveness risk; the handshake has no
    /// abort mechanism short of an external reset.
    fn wait_for_ack(&mut self) {
        while !self.bus.ack() {}
    }

    /// Write `data` to a hard IP register.
    ///
    /// Address, data and direction are all driven before the strobe is
    /// asserted. Blocks until the hard IP acknowledges.
    pub fn set_register(&mut self, reg: Reg, data: u8) {
        self.bus.set_address(reg.addr());
        self.bus.set_data_in(data);
        self.set_direction_write();

        self.assert_strobe();
        self.wait_for_ack();

        self.deassert_strobe();
        self.set_direction_read();
    }

    /// Read a hard IP register.
    ///
    /// Blocks until the hard IP acknowledges, then captures the data
    /// output before releasing the strobe.
    pub fn get_register(&mut self, reg: Reg) -> u8 {
        self.bus.set_address(reg.addr());
        self.set_direction_read();

        self.assert_strobe();
        self.wait_for_ack();

        let data = self.bus.data_out();
        self.deassert_strobe();
        data
    }
}
