//! ARM ELF32 relocation parsing and computation.
//!
//! Provides zero-copy, zero-allocation parsing of `Elf32_Rel` entries and
//! pure-arithmetic relocation value computation for the ARM relocation
//! kinds the Muon loader supports.

use crate::header::le_u32;
use core::fmt;

// ---------------------------------------------------------------------------
// ARM relocation type constants
// ---------------------------------------------------------------------------

/// No relocation.
pub const R_ARM_NONE: u32 = 0;

/// Absolute 32-bit: `S + A`. With no symbol resolution in this pipeline the
/// symbol value is already folded into the in-place word, so the fixup is
/// the same load-bias add as [`R_ARM_RELATIVE`].
pub const R_ARM_ABS32: u32 = 2;

/// Load-bias relative 32-bit: `B(S) + A`, where the bias is
/// `base - virt_base` and `A` is the word in place.
pub const R_ARM_RELATIVE: u32 = 23;

/// Thumb call veneer, legacy ARM SDT numbering. Thumb relative branches are
/// position-independent once the image sits contiguously at its base, so no
/// fixup is applied.
pub const R_ARM_THM_RPC22: u32 = 251;

/// Absolute 32-bit under the legacy ARM SDT numbering; old ARM toolchains
/// emit this where modern ones emit [`R_ARM_ABS32`].
pub const R_ARM_RABS32: u32 = 253;

// ---------------------------------------------------------------------------
// Size of a REL entry
// ---------------------------------------------------------------------------

/// Size of an ELF32 `Rel` entry (8 bytes).
pub const ELF32_REL_SIZE: usize = 8;

// ---------------------------------------------------------------------------
// Elf32Rel
// ---------------------------------------------------------------------------

/// A parsed ELF32 relocation entry without addend (`SHT_REL`); the addend is
/// the word already stored at the target location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf32Rel {
    /// Virtual address where the relocation applies.
    pub r_offset: u32,
    /// Relocation type (low byte of `r_info`).
    pub r_type: u32,
    /// Symbol table index (upper 24 bits of `r_info`).
    pub r_sym: u32,
}

impl Elf32Rel {
    /// Parse a single Rel entry from raw bytes at the given offset.
    ///
    /// # Panics
    ///
    /// Panics if `offset + ELF32_REL_SIZE > data.len()`. Callers must
    /// bounds-check first.
    #[must_use]
    pub fn parse(data: &[u8], offset: usize) -> Self {
        let b = &data[offset..];
        let r_offset = le_u32(b, 0);
        let r_info = le_u32(b, 4);
        Self {
            r_offset,
            r_type: r_info & 0xff, // low byte
            r_sym: r_info >> 8,    // upper 24 bits
        }
    }
}

// ---------------------------------------------------------------------------
// RelIter
// ---------------------------------------------------------------------------

/// An iterator over ELF32 `Rel` entries in a relocation table.
pub struct RelIter<'a> {
    data: &'a [u8],
    offset: usize,
    end: usize,
}

impl<'a> RelIter<'a> {
    /// Creates a new iterator over Rel entries.
    ///
    /// `data` is the buffer holding the table; `offset` and `end` delimit
    /// the table within it. The caller must ensure `end <= data.len()`.
    /// A trailing partial entry is not yielded.
    #[must_use]
    pub fn new(data: &'a [u8], offset: usize, end: usize) -> Self {
        Self { data, offset, end }
    }
}

impl Iterator for RelIter<'_> {
    type Item = Elf32Rel;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset + ELF32_REL_SIZE > self.end {
            return None;
        }
        let rel = Elf32Rel::parse(self.data, self.offset);
        self.offset += ELF32_REL_SIZE;
        Some(rel)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.offset) / ELF32_REL_SIZE;
        (remaining, Some(remaining))
    }
}

// ---------------------------------------------------------------------------
// RelocError
// ---------------------------------------------------------------------------

/// Errors from relocation processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocError {
    /// The relocation type is not supported.
    UnsupportedType(u32),
    /// The image requests PLT-based relocation (`DT_PLTRELSZ` is nonzero).
    PltNotSupported,
}

impl fmt::Display for RelocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedType(ty) => write!(f, "unsupported relocation type {ty}"),
            Self::PltNotSupported => write!(f, "PLT relocations are not supported"),
        }
    }
}

// ---------------------------------------------------------------------------
// compute_arm_reloc
// ---------------------------------------------------------------------------

/// Computes the fixed-up word for an ARM relocation entry.
///
/// Pure arithmetic; no memory access or side effects. `addend` is the word
/// currently stored at the relocation target (ARM `Rel` entries keep the
/// addend in place), and the returned word replaces it. All arithmetic
/// wraps at 32 bits, matching the target's register width.
///
/// No symbol resolution is attempted: `r_sym` is ignored, and
/// [`R_ARM_ABS32`] gets the same load-bias treatment as
/// [`R_ARM_RELATIVE`]. That is only correct for the fully linked firmware
/// images this pipeline accepts.
///
/// # Parameters
///
/// - `rel`: The relocation entry.
/// - `addend`: The word currently stored at the target.
/// - `base`: Load base address chosen by the caller.
/// - `virt_base`: Lowest virtual address among the image's loadable segments.
///
/// # Errors
///
/// Returns [`RelocError::UnsupportedType`] for relocation types outside the
/// supported set.
pub fn compute_arm_reloc(
    rel: &Elf32Rel,
    addend: u32,
    base: u32,
    virt_base: u32,
) -> Result<u32, RelocError> {
    let delta = base.wrapping_sub(virt_base);

    match rel.r_type {
        R_ARM_NONE | R_ARM_THM_RPC22 => Ok(addend),
        R_ARM_ABS32 | R_ARM_RABS32 | R_ARM_RELATIVE => Ok(addend.wrapping_add(delta)),
        other => Err(RelocError::UnsupportedType(other)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
