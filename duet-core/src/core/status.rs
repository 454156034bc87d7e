use bitvec::{order::Lsb0, view::BitView};

/// Provides the mstatus register.
///
/// Only the machine-mode interrupt enable stack is implemented: MIE (bit 3) and MPIE (bit 7).
/// Every other field is read-only zero, so writes to it are dropped.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Status {
    mstatus: u32,
}

impl Status {
    pub fn new() -> Self {
        Self { mstatus: 0x0000_0000 }
    }

    /// Returns `true` if the MIE (M-mode Interrupt Enable) bit is set.
    pub fn mie(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[idx::MIE]
    }

    /// Sets the MIE (M-mode Interrupt Enable) bit to `value`.
    pub fn set_mie(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(idx::MIE, value);
    }

    /// Returns `true` if the MPIE (M-mode Previous Interrupt Enable) bit is set.
    pub fn mpie(&self) -> bool {
        self.mstatus.view_bits::<Lsb0>()[idx::MPIE]
    }

    /// Sets the MPIE (M-mode Previous Interrupt Enable) bit to `value`.
    pub fn set_mpie(&mut self, value: bool) {
        self.mstatus.view_bits_mut::<Lsb0>().set(idx::MPIE, value);
    }

    pub fn read(&self) -> u32 {
        self.mstatus
    }

    pub fn write(&mut self, value: u32, mask: u32) {
        let mask_bits = mask.view_bits::<Lsb0>();
        let updated = self.mstatus & !mask | value & mask;
        let updated_bits = updated.view_bits::<Lsb0>();

        if mask_bits[idx::MIE] {
            self.set_mie(updated_bits[idx::MIE]);
        }
        if mask_bits[idx::MPIE] {
            self.set_mpie(updated_bits[idx::MPIE]);
        }
    }

    /// Stack the interrupt enable on trap entry: `MPIE <- MIE`, `MIE <- 0`.
    pub fn push_interrupt_enable(&mut self) {
        self.set_mpie(self.mie());
        self.set_mie(false);
    }

    /// Unstack the interrupt enable on MRET: `MIE <- MPIE`, `MPIE <- 1`.
    pub fn pop_interrupt_enable(&mut self) {
        self.set_mie(self.mpie());
        self.set_mpie(true);
    }
}

/// Bit indices into mstatus register.
mod idx {
    pub const MIE: usize = 3;
    pub const MPIE: usize = 7;
}
