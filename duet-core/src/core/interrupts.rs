use bitvec::{array::BitArray, field::BitField, order::Lsb0};

use crate::interrupt::{Interrupt, InterruptLines};

const MACHINE_TIMER_INTERRUPT: usize = 7;
const MACHINE_EXTERNAL_INTERRUPT: usize = 11;

#[allow(clippy::identity_op)]
const VALID_INTERRUPTS_MASK: u16 =
    0 | (1 << MACHINE_TIMER_INTERRUPT) | (1 << MACHINE_EXTERNAL_INTERRUPT);

/// The mie register, and the mip view of the platform interrupt lines.
///
/// mip has no storage of its own: it mirrors the CLINT and PLIC lines each time it is read, and
/// guest writes to it are ignored.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Interrupts {
    mie: BitArray<[u16; 1], Lsb0>,
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupts {
    pub fn new() -> Self {
        Self {
            mie: BitArray::new([0x0000]),
        }
    }

    /// Returns `true` if `interrupt` is enabled in mie.
    pub fn is_enabled(&self, interrupt: Interrupt) -> bool {
        self.mie[interrupt.code() as usize]
    }

    pub fn read_mie(&self) -> u32 {
        self.mie.load_le::<u16>() as u32
    }

    /// The mie register is **WARL**: only MTIE and MEIE are writable.
    pub fn write_mie(&mut self, value: u32, mask: u32) {
        let mask = mask as u16 & VALID_INTERRUPTS_MASK;
        self.mie
            .store_le(self.mie.load_le::<u16>() & !mask | value as u16 & mask);
    }

    pub fn read_mip(&self, lines: InterruptLines) -> u32 {
        let mut mip: BitArray<[u16; 1], Lsb0> = BitArray::new([0x0000]);
        mip.set(MACHINE_TIMER_INTERRUPT, lines.timer);
        mip.set(MACHINE_EXTERNAL_INTERRUPT, lines.external);
        mip.load_le::<u16>() as u32
    }

    /// Returns the highest priority interrupt that is both raised and enabled in mie, ignoring the
    /// global enable in mstatus.
    pub fn highest_pending(&self, lines: InterruptLines) -> Option<Interrupt> {
        Interrupt::BY_PRIORITY
            .into_iter()
            .find(|&interrupt| lines.is_raised(interrupt) && self.is_enabled(interrupt))
    }
}
