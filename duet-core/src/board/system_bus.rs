use log::trace;

use crate::address_map::AddressMap;
use crate::bus::{AccessFault, AccessSize, Bus};
use crate::interrupt::InterruptLines;
use crate::resources::clint::Clint;
use crate::resources::gpio::{ButtonPort, LedPort};
use crate::resources::plic::Plic;
use crate::resources::ram::Ram;

/// Enum that uniquely identifies every device attached to an [`Interconnect`] (as a slave).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(super) enum Resource {
    Ram,
    Clint,
    Plic,
    Leds,
    Buttons,
    ExternalRam,
}

/// The board's main bus connecting all devices to the core.
///
/// This can be thought of as a crossbar providing a single *master* interface for the entire
/// 32-bit physical address space, and delegating requests to the appropriate device's *slave*
/// interface depending on the address map.
///
/// Accesses must be naturally aligned, and must lie entirely within the region `address` is in;
/// otherwise they fault without reaching any device. Accesses to unmapped addresses do not fault:
/// reads return `0` and writes are dropped.
#[derive(Debug)]
pub struct Interconnect {
    pub(super) memory_map: AddressMap<Resource>,
    pub(super) ram: Ram,
    pub(super) clint: Clint,
    pub(super) plic: Plic,
    pub(super) leds: LedPort,
    pub(super) buttons: ButtonPort,
    /// `None` when no backing store is configured, in which case the region reads as zero.
    pub(super) external_ram: Option<Ram>,
}

impl Interconnect {
    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    pub fn clint(&self) -> &Clint {
        &self.clint
    }

    pub fn plic(&self) -> &Plic {
        &self.plic
    }

    pub fn plic_mut(&mut self) -> &mut Plic {
        &mut self.plic
    }

    pub fn leds(&self) -> &LedPort {
        &self.leds
    }

    pub fn leds_mut(&mut self) -> &mut LedPort {
        &mut self.leds
    }

    pub fn buttons(&self) -> &ButtonPort {
        &self.buttons
    }

    pub fn buttons_mut(&mut self) -> &mut ButtonPort {
        &mut self.buttons
    }

    pub fn external_ram(&self) -> Option<&Ram> {
        self.external_ram.as_ref()
    }

    /// Validates the `(address, size)` pair, returning `Some((resource, mapped_address))` if the
    /// access reaches a device, and `None` if `address` is unmapped.
    fn check_access(
        &self,
        address: u32,
        size: AccessSize,
    ) -> Result<Option<(Resource, u32)>, AccessFault> {
        if !size.alignment().is_aligned(address) {
            return Err(AccessFault::Misaligned { address, size });
        }
        let Some((range, &resource)) = self.memory_map.lookup(address) else {
            trace!(address = address; "unmapped access");
            return Ok(None);
        };
        if !range.contains_access(address, size.bytes()) {
            return Err(AccessFault::CrossesBoundary { address, size });
        }
        Ok(Some((resource, address - range.start())))
    }

    fn bus_of(&self, resource: Resource) -> Option<&dyn Bus> {
        match resource {
            Resource::Ram => Some(&self.ram),
            Resource::Clint => Some(&self.clint),
            Resource::Plic => Some(&self.plic),
            Resource::Leds => Some(&self.leds),
            Resource::Buttons => Some(&self.buttons),
            Resource::ExternalRam => self.external_ram.as_ref().map(|ram| ram as &dyn Bus),
        }
    }

    fn bus_of_mut(&mut self, resource: Resource) -> Option<&mut dyn Bus> {
        match resource {
            Resource::Ram => Some(&mut self.ram),
            Resource::Clint => Some(&mut self.clint),
            Resource::Plic => Some(&mut self.plic),
            Resource::Leds => Some(&mut self.leds),
            Resource::Buttons => Some(&mut self.buttons),
            Resource::ExternalRam => self
                .external_ram
                .as_mut()
                .map(|ram| ram as &mut dyn Bus),
        }
    }
}

impl crate::system_bus::SystemBus for Interconnect {
    fn read(&mut self, address: u32, size: AccessSize) -> Result<u32, AccessFault> {
        let mut buf = [0u8; 4];
        if let Some((resource, mapped_address)) = self.check_access(address, size)? {
            if let Some(bus) = self.bus_of_mut(resource) {
                bus.read(&mut buf[..size.bytes()], mapped_address);
            }
        }
        Ok(u32::from_le_bytes(buf))
    }

    fn read_debug(&self, address: u32, size: AccessSize) -> Result<u32, AccessFault> {
        let mut buf = [0u8; 4];
        if let Some((resource, mapped_address)) = self.check_access(address, size)? {
            if let Some(bus) = self.bus_of(resource) {
                bus.read_debug(&mut buf[..size.bytes()], mapped_address);
            }
        }
        Ok(u32::from_le_bytes(buf))
    }

    fn write(&mut self, address: u32, size: AccessSize, value: u32) -> Result<(), AccessFault> {
        if let Some((resource, mapped_address)) = self.check_access(address, size)? {
            if let Some(bus) = self.bus_of_mut(resource) {
                bus.write(mapped_address, &value.to_le_bytes()[..size.bytes()]);
            }
        }
        Ok(())
    }

    fn interrupt_lines(&self) -> InterruptLines {
        InterruptLines {
            external: self.plic.needs_interrupt(),
            timer: self.clint.needs_interrupt(),
        }
    }
}
