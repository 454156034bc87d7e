//! Platform-level interrupt controller

use bitvec::array::BitArray;
use bitvec::order::Lsb0;
use bitvec::BitArr;
use log::{debug, trace};

use crate::bus::Bus;

pub const PENDING_ADDR: u32 = 0x00;
pub const ENABLES_ADDR: u32 = 0x04;
pub const CLAIMCOMPLETE_ADDR: u32 = 0x08;
/// Second window onto the claim/complete register.
pub const CLAIMCOMPLETE_ALIAS_ADDR: u32 = 0x200_0004;

/// Number of interrupt sources, including the reserved source `0`.
pub const SOURCES: usize = 32;

/// Simplified PLIC with a single target (the core's external interrupt line).
///
/// Sources `1..32` are gated by an enable bitmap. Among pending and enabled sources, the lowest id
/// has the highest priority. Source `0` means "no interrupt".
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Plic {
    pending: BitArr!(for SOURCES, in u32, Lsb0),
    enabled: BitArr!(for SOURCES, in u32, Lsb0),
    /// Sources that have been claimed but not completed yet.
    in_service: BitArr!(for SOURCES, in u32, Lsb0),
}

impl Default for Plic {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddrAccessor {
    Pending,
    Enabled,
    ClaimComplete,
}

impl AddrAccessor {
    fn from_address(address: u32) -> Option<Self> {
        match address {
            PENDING_ADDR => Some(Self::Pending),
            ENABLES_ADDR => Some(Self::Enabled),
            CLAIMCOMPLETE_ADDR | CLAIMCOMPLETE_ALIAS_ADDR => Some(Self::ClaimComplete),
            _ => None,
        }
    }
}

impl Plic {
    /// Create new Plic in reset state.
    pub fn new() -> Self {
        Self {
            pending: BitArray::ZERO,
            enabled: BitArray::ZERO,
            in_service: BitArray::ZERO,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Mark `source` as pending. Idempotent.
    ///
    /// Source `0` and out of range ids are ignored.
    pub fn trigger(&mut self, source: u32) {
        match source_index(source) {
            Some(index) => {
                trace!(source = source; "PLIC source triggered");
                self.pending.set(index, true);
            }
            None => debug!(source = source; "ignoring trigger of invalid PLIC source"),
        }
    }

    pub fn pending(&self) -> u32 {
        self.pending.as_raw_slice()[0]
    }

    pub fn enabled(&self) -> u32 {
        self.enabled.as_raw_slice()[0]
    }

    pub fn set_enabled(&mut self, mask: u32) {
        // Source 0 does not exist.
        self.enabled.as_raw_mut_slice()[0] = mask & !1;
    }

    /// Returns 0 if no interrupts are pending
    pub fn highest_priority_pending(&self) -> u32 {
        (self.pending & self.enabled)
            .first_one()
            .map(|index| index as u32)
            .unwrap_or(0)
    }

    /// Claim the highest-priority pending and enabled source, clearing its pending bit.
    ///
    /// Returns 0 if there is none.
    pub fn claim(&mut self) -> u32 {
        let id = self.highest_priority_pending();
        if id != 0 {
            self.pending.set(id as usize, false);
            self.in_service.set(id as usize, true);
        }
        trace!(id = id; "PLIC claim");
        id
    }

    /// Signal the end of servicing `id`. Ids that are not currently claimed are ignored.
    pub fn complete(&mut self, id: u32) {
        match source_index(id) {
            Some(index) if self.in_service[index] => {
                trace!(id = id; "PLIC completion");
                self.in_service.set(index, false);
            }
            _ => debug!(id = id; "ignoring stale PLIC completion"),
        }
    }

    /// Level of the external interrupt line towards the core.
    pub fn needs_interrupt(&self) -> bool {
        self.highest_priority_pending() != 0
    }

    fn read_u32(&mut self, address: u32) -> u32 {
        match AddrAccessor::from_address(address) {
            Some(AddrAccessor::ClaimComplete) => self.claim(),
            _ => self.read_u32_debug(address),
        }
    }

    fn read_u32_debug(&self, address: u32) -> u32 {
        let Some(address) = AddrAccessor::from_address(address) else {
            return 0;
        };
        match address {
            AddrAccessor::Pending => self.pending(),
            AddrAccessor::Enabled => self.enabled(),
            AddrAccessor::ClaimComplete => self.highest_priority_pending(),
        }
    }

    fn write_u32(&mut self, address: u32, value: u32) {
        let Some(address) = AddrAccessor::from_address(address) else {
            return;
        };
        match address {
            // The pending bitmap is only changed by sources and claims.
            AddrAccessor::Pending => {}
            AddrAccessor::Enabled => self.set_enabled(value),
            AddrAccessor::ClaimComplete => self.complete(value),
        }
    }
}

/// Index into the source bitmaps, if `id` names an existing source.
fn source_index(id: u32) -> Option<usize> {
    usize::try_from(id)
        .ok()
        .filter(|index| (1..SOURCES).contains(index))
}

/// Only naturally aligned word accesses reach the registers; anything else reads as zero and
/// writes nothing.
impl Bus for Plic {
    fn read(&mut self, buf: &mut [u8], address: u32) {
        buf.fill(0);
        if address & 0b11 == 0 && buf.len() == 4 {
            let v = self.read_u32(address);
            buf.copy_from_slice(&v.to_le_bytes())
        }
    }

    fn read_debug(&self, buf: &mut [u8], address: u32) {
        buf.fill(0);
        if address & 0b11 == 0 && buf.len() == 4 {
            let v = self.read_u32_debug(address);
            buf.copy_from_slice(&v.to_le_bytes())
        }
    }

    fn write(&mut self, address: u32, buf: &[u8]) {
        if address & 0b11 != 0 {
            return;
        }
        if let [a, b, c, d] = buf {
            self.write_u32(address, u32::from_le_bytes([*a, *b, *c, *d]));
        }
    }
}
