//! ELF32 dynamic segment entries.
//!
//! Parses `Elf32_Dyn` records from a `PT_DYNAMIC` segment and collects the
//! tags the relocation pass acts on into a small fixed-range table.

use crate::header::le_u32;

/// Marks the end of the dynamic table.
pub const DT_NULL: u32 = 0;

/// Name offset of a needed library. Firmware images are self-contained, so
/// these entries are never resolved.
pub const DT_NEEDED: u32 = 1;

/// Total byte size of the PLT relocation entries.
pub const DT_PLTRELSZ: u32 = 2;

/// Symbolic-binding flag entry; carries no value.
pub const DT_SYMBOLIC: u32 = 16;

/// Virtual address of the `Elf32_Rel` relocation table.
pub const DT_REL: u32 = 17;

/// Total byte size of the `Elf32_Rel` relocation table.
pub const DT_RELSZ: u32 = 18;

/// Debugger rendezvous entry.
pub const DT_DEBUG: u32 = 21;

/// Flag values for this object; the highest tag [`DynTable`] records.
pub const DT_FLAGS: u32 = 30;

/// Size of an `Elf32_Dyn` entry (8 bytes).
pub const ELF32_DYN_SIZE: usize = 8;

/// A parsed ELF32 dynamic table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf32Dyn {
    /// Entry tag, kept unsigned. OS- and processor-specific tags (and
    /// anything negative in the signed C representation) land above
    /// [`DT_FLAGS`] and are ignored by [`DynTable::set`].
    pub d_tag: u32,
    /// Entry value or address (the `d_un` union in the C layout).
    pub d_val: u32,
}

impl Elf32Dyn {
    /// Parse a dynamic entry from raw bytes at the given offset.
    ///
    /// # Panics
    ///
    /// Panics if `offset + ELF32_DYN_SIZE > data.len()`. Callers must
    /// bounds-check first.
    #[must_use]
    pub fn parse(data: &[u8], offset: usize) -> Self {
        let b = &data[offset..];
        Self {
            d_tag: le_u32(b, 0),
            d_val: le_u32(b, 4),
        }
    }
}

/// Dynamic-table tags collected for the relocation pass.
///
/// A fixed mapping from tag to last-seen value, capped at [`DT_FLAGS`].
/// Absent tags read as 0, so `get(DT_PLTRELSZ) != 0` doubles as a presence
/// check for the tags whose zero value means "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynTable {
    values: [u32; DT_FLAGS as usize + 1],
}

impl DynTable {
    /// Creates an empty table; every tag reads 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: [0; DT_FLAGS as usize + 1],
        }
    }

    /// Records `value` for `tag`, overwriting any earlier value.
    /// Tags above [`DT_FLAGS`] are ignored.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "tag is at most DT_FLAGS here"
    )]
    pub fn set(&mut self, tag: u32, value: u32) {
        if tag <= DT_FLAGS {
            self.values[tag as usize] = value;
        }
    }

    /// Returns the recorded value for `tag`, or 0 when absent or out of range.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "tag is at most DT_FLAGS here"
    )]
    #[must_use]
    pub fn get(&self, tag: u32) -> u32 {
        if tag <= DT_FLAGS {
            self.values[tag as usize]
        } else {
            0
        }
    }

    /// Returns `true` if a `DT_SYMBOLIC` entry was recorded.
    #[must_use]
    pub fn symbolic(&self) -> bool {
        self.get(DT_SYMBOLIC) != 0
    }
}

impl Default for DynTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dyn_entry() {
        let mut b = [0u8; 16];
        b[8..12].copy_from_slice(&DT_REL.to_le_bytes());
        b[12..16].copy_from_slice(&0xA000_0040u32.to_le_bytes());

        let entry = Elf32Dyn::parse(&b, 8);
        assert_eq!(entry.d_tag, DT_REL);
        assert_eq!(entry.d_val, 0xA000_0040);
    }

    #[test]
    fn table_defaults_to_zero() {
        let table = DynTable::new();
        assert_eq!(table.get(DT_REL), 0);
        assert_eq!(table.get(DT_FLAGS), 0);
        assert!(!table.symbolic());
    }

    #[test]
    fn table_records_last_value() {
        let mut table = DynTable::new();
        table.set(DT_RELSZ, 0x10);
        table.set(DT_RELSZ, 0x20);
        assert_eq!(table.get(DT_RELSZ), 0x20);
    }

    #[test]
    fn table_ignores_out_of_range_tags() {
        let mut table = DynTable::new();
        table.set(DT_FLAGS + 1, 0x1234);
        table.set(0x6FFF_FDF5, 0x1234); // DT_GNU_HASH
        table.set(u32::MAX, 0x1234); // d_tag = -1 in the signed view
        for tag in 0..=DT_FLAGS {
            assert_eq!(table.get(tag), 0);
        }
        assert_eq!(table.get(0x6FFF_FDF5), 0);
    }

    #[test]
    fn symbolic_flag() {
        let mut table = DynTable::new();
        table.set(DT_SYMBOLIC, 1);
        assert!(table.symbolic());
    }
}
