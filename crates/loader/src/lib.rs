//! Relocating ARM ELF32 image loader for the Muon emulator.
//!
//! Takes a raw ELF byte buffer and a caller-chosen base address and
//! produces a flat, relocated memory image the CPU core can execute
//! directly: segments copied to their layout offsets, `.bss` zeroed, and
//! every dynamic relocation rewritten for the chosen base.
//!
//! # Usage
//!
//! ```
//! use muon_loader::LoadedImage;
//!
//! fn boot(elf_bytes: &[u8]) -> LoadedImage {
//!     let image = muon_loader::load(0x0800_0000, elf_bytes).expect("valid image");
//!     // Hand image.memory to the bus at image.base, start at image.entry_point
//!     image
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod image;
pub mod layout;
pub mod relocate;

use alloc::vec;
use core::fmt;
use muon_elf::{ElfError, ElfFile};

pub use image::LoadedImage;
pub use layout::ImageLayout;
pub use muon_elf::RelocError;

/// Errors that can occur while loading an ELF image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// The input or image ended before byte `need` of a required structure.
    TruncatedInput {
        /// First byte count that would have satisfied the read.
        need: u64,
    },
    /// The input is not an ELF of the shape this loader accepts.
    InvalidFormat(&'static str),
    /// The ELF targets a machine other than ARM.
    UnsupportedArchitecture {
        /// The `e_machine` value found in the header.
        machine: u16,
    },
    /// The ELF has no `PT_LOAD` segments.
    NoLoadableSegments,
    /// A segment's file bytes do not fit the memory reserved for the image.
    CorruptSegment {
        /// Virtual address of the offending segment.
        vaddr: u32,
    },
    /// Relocation processing failed.
    UnsupportedRelocation(RelocError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedInput { need } => {
                write!(f, "input ended before byte {need}")
            }
            Self::InvalidFormat(msg) => write!(f, "invalid ELF image: {msg}"),
            Self::UnsupportedArchitecture { machine } => {
                write!(f, "unsupported architecture (machine type {machine})")
            }
            Self::NoLoadableSegments => write!(f, "image has no loadable segments"),
            Self::CorruptSegment { vaddr } => {
                write!(f, "segment at {vaddr:#010x} overruns the image")
            }
            Self::UnsupportedRelocation(err) => write!(f, "relocation error: {err}"),
        }
    }
}

/// Maps parser errors onto the loader's error type.
fn map_elf_error(err: ElfError) -> LoadError {
    match err {
        ElfError::BadMagic => LoadError::InvalidFormat("bad ELF magic"),
        ElfError::UnsupportedClass => LoadError::InvalidFormat("not a 32-bit ELF"),
        ElfError::UnsupportedEncoding => LoadError::InvalidFormat("not little-endian"),
        ElfError::UnsupportedVersion => LoadError::InvalidFormat("unsupported ELF version"),
        ElfError::BadStructSize => {
            LoadError::InvalidFormat("header structure sizes do not match ELF32")
        }
        ElfError::UnsupportedMachine(machine) => LoadError::UnsupportedArchitecture { machine },
        ElfError::Truncated { need } => LoadError::TruncatedInput { need },
    }
}

/// Loads an ELF image for execution at `base`.
///
/// Parses and validates `data`, plans the image layout, copies every
/// `PT_LOAD` segment into a zero-filled buffer and applies the image's
/// dynamic relocations so it runs at `base`. The returned image owns its
/// memory; `data` is not referenced afterwards.
///
/// # Errors
///
/// Returns a [`LoadError`] if `data` is not a little-endian ARM ELF32
/// image, if it has no loadable segments, if any segment or relocation
/// falls outside the bytes provided, or if the image needs a relocation
/// kind this loader does not support.
pub fn load(base: u32, data: &[u8]) -> Result<LoadedImage, LoadError> {
    let elf = ElfFile::parse(data).map_err(map_elf_error)?;
    let layout = layout::plan(&elf)?;

    log::debug!(
        "image spans {:#010x}..{:#010x} ({:#x} bytes, {:#x} from file), loading at {base:#010x}",
        layout.virt_base,
        layout.virt_base.wrapping_add(layout.image_size),
        layout.image_size,
        layout.file_size
    );

    #[expect(
        clippy::cast_possible_truncation,
        reason = "the image size is a u32 span, which always fits in usize on supported hosts"
    )]
    let mut memory = vec![0u8; layout.image_size as usize];
    image::copy_segments(&elf, &layout, &mut memory)?;
    relocate::apply_relocations(&elf, base, layout.virt_base, &mut memory)?;

    let entry_point = base.wrapping_add(elf.entry_point().wrapping_sub(layout.virt_base));
    log::debug!("entry point relocated to {entry_point:#010x}");

    Ok(LoadedImage {
        base,
        virt_base: layout.virt_base,
        image_size: layout.image_size,
        entry_point,
        memory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let msg = format!("{}", LoadError::TruncatedInput { need: 52 });
        assert!(msg.contains("52"));
        let msg = format!("{}", LoadError::InvalidFormat("bad ELF magic"));
        assert!(msg.contains("bad ELF magic"));
        let msg = format!("{}", LoadError::UnsupportedArchitecture { machine: 62 });
        assert!(msg.contains("62"));
        let msg = format!("{}", LoadError::NoLoadableSegments);
        assert!(msg.contains("no loadable segments"));
        let msg = format!("{}", LoadError::CorruptSegment { vaddr: 0x8000 });
        assert!(msg.contains("0x00008000"));
        let msg = format!("{}", LoadError::UnsupportedRelocation(RelocError::UnsupportedType(9)));
        assert!(msg.contains("relocation"));
    }

    #[test]
    fn maps_parser_errors() {
        assert_eq!(
            map_elf_error(ElfError::UnsupportedMachine(3)),
            LoadError::UnsupportedArchitecture { machine: 3 }
        );
        assert_eq!(
            map_elf_error(ElfError::Truncated { need: 52 }),
            LoadError::TruncatedInput { need: 52 }
        );
        assert_eq!(
            map_elf_error(ElfError::BadMagic),
            LoadError::InvalidFormat("bad ELF magic")
        );
    }
}
