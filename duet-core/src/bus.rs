//! Byte-oriented bus interface shared by the interconnect and every memory-mapped device.

use crate::{unit, Alignment};
use std::fmt;
use std::fmt::Debug;
use thiserror::Error;

/// Width of a single bus transfer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AccessSize {
    Byte,
    Half,
    Word,
}

impl AccessSize {
    /// Number of bytes transferred.
    pub fn bytes(self) -> usize {
        match self {
            Self::Byte => unit::BYTE as usize,
            Self::Half => unit::HALFWORD as usize,
            Self::Word => unit::WORD as usize,
        }
    }

    pub fn alignment(self) -> Alignment {
        match self {
            Self::Byte => Alignment::BYTE,
            Self::Half => Alignment::HALFWORD,
            Self::Word => Alignment::WORD,
        }
    }

    /// Mask selecting the low bits of a word that this size transfers.
    pub fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Half => 0xFFFF,
            Self::Word => 0xFFFF_FFFF,
        }
    }
}

impl fmt::Display for AccessSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Byte => "byte",
            Self::Half => "halfword",
            Self::Word => "word",
        })
    }
}

/// A bus slave.
///
/// Addresses passed to a device are relative to the start of the region it is mapped at, and the
/// interconnect guarantees that the whole access lies within that region. Values are serialized in
/// little-endian byte order.
///
/// Reads must not depend on the initial contents of `buf`.
pub trait Bus: Debug {
    /// Perform a read of `buf.len()` bytes at `address`, including any read side effects.
    fn read(&mut self, buf: &mut [u8], address: u32);

    /// Side-effect free read, used for inspection by the host.
    ///
    /// Registers whose reads have side effects report the value a real read would return without
    /// performing the side effect.
    fn read_debug(&self, buf: &mut [u8], address: u32);

    /// Perform a write of `buf.len()` bytes at `address`.
    fn write(&mut self, address: u32, buf: &[u8]);
}

/// Reasons a bus access is rejected before reaching any device.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessFault {
    #[error("{size} access at {address:#010x} is not naturally aligned")]
    Misaligned { address: u32, size: AccessSize },
    #[error("{size} access at {address:#010x} crosses a device boundary")]
    CrossesBoundary { address: u32, size: AccessSize },
}

impl AccessFault {
    pub fn address(&self) -> u32 {
        match *self {
            Self::Misaligned { address, .. } | Self::CrossesBoundary { address, .. } => address,
        }
    }
}

/// Copy the little-endian bytes of the 32-bit register value `word`, starting at byte `offset`,
/// into `buf`.
///
/// Helper for devices exposing 32-bit registers that accept sub-word accesses.
pub fn read_register_lanes(word: u32, offset: u32, buf: &mut [u8]) {
    let bytes = word.to_le_bytes();
    for (i, b) in buf.iter_mut().enumerate() {
        *b = bytes.get(offset as usize + i).copied().unwrap_or(0);
    }
}

/// Merge the bytes of `buf` into the 32-bit register value `word` at byte `offset`.
pub fn write_register_lanes(word: u32, offset: u32, buf: &[u8]) -> u32 {
    let mut bytes = word.to_le_bytes();
    for (i, b) in buf.iter().enumerate() {
        if let Some(slot) = bytes.get_mut(offset as usize + i) {
            *slot = *b;
        }
    }
    u32::from_le_bytes(bytes)
}
