//! Minimal ARM ELF32 parser for the Muon emulator.
//!
//! Parses ELF32 headers, `PT_LOAD` and `PT_DYNAMIC` segments, dynamic
//! entries and `Rel` relocations from raw byte slices using safe field
//! extraction (`from_le_bytes`). No unsafe code, no allocations.
//!
//! # Usage
//!
//! ```
//! use muon_elf::ElfFile;
//!
//! fn inspect(data: &[u8]) {
//!     let elf = ElfFile::parse(data).expect("valid ELF");
//!     let entry = elf.entry_point();
//!     for seg in elf.load_segments() {
//!         // Copy seg.data at seg.vaddr, zero-fill to seg.memsz
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod dynamic;
pub mod header;
pub mod reloc;
pub mod segment;

pub use dynamic::{
    DynTable, Elf32Dyn, DT_DEBUG, DT_FLAGS, DT_NEEDED, DT_NULL, DT_PLTRELSZ, DT_REL, DT_RELSZ,
    DT_SYMBOLIC, ELF32_DYN_SIZE,
};
pub use header::{Elf32Header, Elf32ProgramHeader, ElfError, PT_DYNAMIC, PT_LOAD};
pub use reloc::{
    Elf32Rel, RelIter, RelocError, compute_arm_reloc, ELF32_REL_SIZE, R_ARM_ABS32, R_ARM_NONE,
    R_ARM_RABS32, R_ARM_RELATIVE, R_ARM_THM_RPC22,
};
pub use segment::{ElfFile, LoadSegment};
