//! Board I/O ports: the LED/switch word and the push-button byte.

use log::trace;

use crate::bus::{read_register_lanes, write_register_lanes, Bus};

/// 32-bit port whose writes drive the LEDs and whose reads sample the switches.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct LedPort {
    leds: u32,
    switches: u32,
}

impl LedPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn all LEDs off. The switches are host state and keep their position.
    pub fn reset(&mut self) {
        self.leds = 0;
    }

    pub fn leds(&self) -> u32 {
        self.leds
    }

    pub fn switches(&self) -> u32 {
        self.switches
    }

    pub fn set_switches(&mut self, switches: u32) {
        self.switches = switches;
    }
}

impl Bus for LedPort {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        self.read_debug(buf, address)
    }

    fn read_debug(&self, buf: &mut [u8], address: u32) {
        read_register_lanes(self.switches, address, buf);
    }

    fn write(&mut self, address: u32, buf: &[u8]) {
        self.leds = write_register_lanes(self.leds, address, buf);
        trace!(leds = self.leds; "LEDs updated");
    }
}

/// Read-only byte reflecting which push buttons are held down.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ButtonPort {
    buttons: u8,
}

impl ButtonPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    pub fn set_buttons(&mut self, buttons: u8) {
        self.buttons = buttons;
    }
}

impl Bus for ButtonPort {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        self.read_debug(buf, address)
    }

    fn read_debug(&self, buf: &mut [u8], address: u32) {
        read_register_lanes(self.buttons as u32, address, buf);
    }

    fn write(&mut self, _address: u32, _buf: &[u8]) {}
}
