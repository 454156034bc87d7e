//! The evaluation board: one core, RAM, CLINT, PLIC, and the LED/switch and push-button ports.

mod system_bus;

use crate::addr_map;
use crate::core::Core;
use crate::image::Image;
use crate::resources::clint::Clint;
use crate::resources::gpio::{ButtonPort, LedPort};
use crate::resources::plic::Plic;
use crate::resources::ram::Ram;
use crate::simulator::Simulatable;
use crate::units::{ExecutionUnits, Golden};
use log::debug;
use system_bus::Resource;
use thiserror::Error;

pub use system_bus::Interconnect;

pub const RAM_BASE: u32 = 0x0000_1000;
pub const RAM_SIZE: u32 = 32 * 1024;
pub const CLINT_BASE: u32 = 0x0200_0000;
pub const CLINT_SIZE: u32 = 48 * 1024;
pub const PLIC_BASE: u32 = 0x0C00_0000;
pub const PLIC_SIZE: u32 = 64 * 1024 * 1024;
pub const LEDS_BASE: u32 = 0x3000_0000;
pub const LEDS_SIZE: u32 = 4;
pub const BUTTONS_BASE: u32 = 0x3000_0008;
pub const BUTTONS_SIZE: u32 = 1;
pub const EXTERNAL_RAM_BASE: u32 = 0x8000_0000;
pub const EXTERNAL_RAM_SIZE: u32 = 256 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub core: crate::core::Config,
    /// Loaded at [`RAM_BASE`] on construction and on every reset.
    pub image: Image,
    /// Size of the backing store for the external RAM region. With `None`, the region reads as
    /// zero and ignores writes.
    pub external_ram_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: crate::core::Config::default(),
            image: Image::default(),
            external_ram_size: None,
        }
    }
}

/// RISC-V hardware platform built around a single-hart RV32I core.
#[derive(Debug)]
pub struct Board {
    core: Core<Interconnect>,
    /// Every `(address, bytes)` segment loaded so far, replayed on reset.
    boot_segments: Vec<(u32, Vec<u8>)>,
}

impl Board {
    pub fn new(config: Config) -> Result<Self, BoardError> {
        Self::with_units(config, Box::new(Golden))
    }

    /// Create a board whose core evaluates its execution units through `units`.
    pub fn with_units(
        config: Config,
        units: Box<dyn ExecutionUnits>,
    ) -> Result<Self, BoardError> {
        let memory_map = addr_map! {
            RAM_BASE, RAM_SIZE => Resource::Ram,
            CLINT_BASE, CLINT_SIZE => Resource::Clint,
            PLIC_BASE, PLIC_SIZE => Resource::Plic,
            LEDS_BASE, LEDS_SIZE => Resource::Leds,
            BUTTONS_BASE, BUTTONS_SIZE => Resource::Buttons,
            EXTERNAL_RAM_BASE, EXTERNAL_RAM_SIZE => Resource::ExternalRam,
        };

        let external_ram = match config.external_ram_size {
            None => None,
            Some(size) if size <= EXTERNAL_RAM_SIZE as usize => {
                Some(Ram::new(size).ok_or(BoardError::InvalidExternalRamSize(size))?)
            }
            Some(size) => return Err(BoardError::InvalidExternalRamSize(size)),
        };

        let interconnect = Interconnect {
            memory_map,
            ram: Ram::new(RAM_SIZE as usize).expect("RAM size is a non-zero constant"),
            clint: Clint::new(),
            plic: Plic::new(),
            leds: LedPort::new(),
            buttons: ButtonPort::new(),
            external_ram,
        };

        let mut board = Self {
            core: Core::with_units(interconnect, config.core, units),
            boot_segments: Vec::new(),
        };
        if !config.image.is_empty() {
            board.load_image(&config.image)?;
        }
        Ok(board)
    }

    pub fn core(&self) -> &Core<Interconnect> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut Core<Interconnect> {
        &mut self.core
    }

    pub fn interconnect(&self) -> &Interconnect {
        self.core.system_bus()
    }

    pub fn interconnect_mut(&mut self) -> &mut Interconnect {
        self.core.system_bus_mut()
    }

    /// Force board back to its reset state: core and devices are reset, memory is cleared, and
    /// every loaded image is written again.
    pub fn reset(&mut self) {
        self.core.reset();
        let bus = self.core.system_bus_mut();
        bus.ram.reset();
        if let Some(external_ram) = &mut bus.external_ram {
            external_ram.reset();
        }
        bus.clint.reset();
        bus.plic.reset();
        bus.leds.reset();
        // Only segments that were written successfully are recorded, and the memory map is fixed
        // at construction, so replaying them cannot fail.
        for (address, bytes) in &self.boot_segments {
            let replayed = write_memory(bus, *address, bytes);
            debug_assert!(
                replayed.is_ok(),
                "boot segment at {address:#010x} failed to replay: {replayed:?}"
            );
        }
    }

    /// Load `image` at the start of RAM.
    pub fn load_image(&mut self, image: &Image) -> Result<(), BoardError> {
        if image.len() > RAM_SIZE as usize {
            return Err(BoardError::ImageTooLarge {
                size: image.len(),
                capacity: RAM_SIZE as usize,
            });
        }
        self.load_physical(RAM_BASE, image.bytes())
    }

    /// Write a byte buffer into the physical address space.
    ///
    /// The buffer must lie entirely within RAM or the backed part of the external RAM region. It is
    /// written again on every [`reset`](Self::reset).
    pub fn load_physical(&mut self, address: u32, bytes: &[u8]) -> Result<(), BoardError> {
        if bytes.is_empty() {
            return Ok(());
        }
        write_memory(self.core.system_bus_mut(), address, bytes)?;
        debug!(address = address, size = bytes.len() as u32; "loaded segment");
        self.boot_segments.push((address, bytes.to_vec()));
        Ok(())
    }

    /// Advance the board by one clock cycle.
    pub fn tick(&mut self) {
        self.core.system_bus_mut().clint.step();
        self.core.tick();
    }
}

fn write_memory(bus: &mut Interconnect, address: u32, bytes: &[u8]) -> Result<(), BoardError> {
    let out_of_bounds = BoardError::LoadOutOfBounds {
        address,
        size: bytes.len(),
    };
    let Some((range, &resource)) = bus.memory_map.lookup(address) else {
        return Err(out_of_bounds);
    };
    if !range.contains_access(address, bytes.len()) {
        return Err(out_of_bounds);
    }
    let offset = address - range.start();
    let ram = match resource {
        Resource::Ram => &mut bus.ram,
        Resource::ExternalRam => match &mut bus.external_ram {
            Some(ram) => ram,
            None => return Err(out_of_bounds),
        },
        _ => return Err(out_of_bounds),
    };
    if offset as usize + bytes.len() > ram.len() {
        return Err(out_of_bounds);
    }
    ram.write(offset, bytes);
    Ok(())
}

impl Simulatable for Board {
    fn tick(&mut self) {
        Board::tick(self)
    }

    fn reset(&mut self) {
        Board::reset(self)
    }

    fn is_halted(&self) -> bool {
        self.core.is_halted()
    }
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum BoardError {
    #[error("image of {size} bytes does not fit in {capacity} bytes of RAM")]
    ImageTooLarge { size: usize, capacity: usize },
    #[error("{size} bytes at {address:#010x} do not fit in a memory region")]
    LoadOutOfBounds { address: u32, size: usize },
    #[error("invalid external RAM size: {0} bytes")]
    InvalidExternalRamSize(usize),
}
