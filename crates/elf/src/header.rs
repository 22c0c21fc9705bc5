//! ARM ELF32 header parsing.
//!
//! Parses the ELF32 file header and program headers from raw byte slices
//! using safe field extraction via `from_le_bytes()`.

use core::fmt;

/// ELF magic bytes: `\x7fELF`.
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// ELF class: 32-bit.
const ELFCLASS32: u8 = 1;

/// ELF data encoding: little-endian.
const ELFDATA2LSB: u8 = 1;

/// ELF identification version: current.
const EV_CURRENT: u8 = 1;

/// ELF machine: ARM.
const EM_ARM: u16 = 40;

/// Program header type: loadable segment.
pub const PT_LOAD: u32 = 1;

/// Program header type: dynamic linking metadata.
pub const PT_DYNAMIC: u32 = 2;

/// Size of an ELF32 file header (52 bytes).
pub(crate) const ELF32_EHDR_SIZE: usize = 52;

/// Size of an ELF32 program header entry (32 bytes).
pub(crate) const ELF32_PHDR_SIZE: usize = 32;

/// Size of an ELF32 section header entry (40 bytes).
pub(crate) const ELF32_SHDR_SIZE: usize = 40;

/// Read a little-endian `u16` from `data` at byte offset `off`.
///
/// # Panics
///
/// Panics if `off + 2 > data.len()`. Callers must bounds-check first.
pub(crate) fn le_u16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(*data[off..].first_chunk().unwrap())
}

/// Read a little-endian `u32` from `data` at byte offset `off`.
pub(crate) fn le_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(*data[off..].first_chunk().unwrap())
}

/// Errors that can occur when parsing an ELF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfError {
    /// The file does not start with the ELF magic bytes.
    BadMagic,
    /// The ELF file is not 32-bit (`ELFCLASS32`).
    UnsupportedClass,
    /// The ELF file is not little-endian.
    UnsupportedEncoding,
    /// The ELF identification version is not the current one.
    UnsupportedVersion,
    /// The header structure size fields do not match ELF32.
    BadStructSize,
    /// The ELF machine type is not `EM_ARM`; the payload is the value found.
    UnsupportedMachine(u16),
    /// The input ends before a declared structure.
    Truncated {
        /// Byte offset the structure would have reached.
        need: u64,
    },
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic => write!(f, "invalid ELF magic bytes"),
            Self::UnsupportedClass => write!(f, "unsupported ELF class (expected ELFCLASS32)"),
            Self::UnsupportedEncoding => {
                write!(f, "unsupported data encoding (expected little-endian)")
            }
            Self::UnsupportedVersion => write!(f, "unsupported ELF version"),
            Self::BadStructSize => write!(f, "header structure sizes do not match ELF32"),
            Self::UnsupportedMachine(machine) => {
                write!(f, "unsupported machine type {machine} (expected EM_ARM)")
            }
            Self::Truncated { need } => write!(f, "unexpected end of ELF data at byte {need}"),
        }
    }
}

/// Parsed ELF32 file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf32Header {
    /// ELF object type. Accepted as-is; firmware images appear as both
    /// `ET_EXEC` and `ET_DYN`.
    pub e_type: u16,
    /// Target machine architecture.
    pub e_machine: u16,
    /// Virtual address of the entry point.
    pub e_entry: u32,
    /// Offset of the program header table in the file.
    pub e_phoff: u32,
    /// Number of program header entries.
    pub e_phnum: u16,
    /// Size of each program header entry.
    pub e_phentsize: u16,
    /// Offset of the section header table in the file.
    pub e_shoff: u32,
    /// Size of each section header entry.
    pub e_shentsize: u16,
    /// Number of section header entries.
    pub e_shnum: u16,
    /// Section header string table index.
    pub e_shstrndx: u16,
}

impl Elf32Header {
    /// Parse an ELF32 file header from raw bytes.
    ///
    /// Validates the identification bytes, the fixed structure sizes, the
    /// machine type, and that the program header table fits within `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError`] if validation fails or the data is too short.
    pub fn parse(data: &[u8]) -> Result<Self, ElfError> {
        if data.len() < ELF32_EHDR_SIZE {
            return Err(ElfError::Truncated {
                need: ELF32_EHDR_SIZE as u64,
            });
        }

        // Validate magic
        if data[..4] != ELF_MAGIC {
            return Err(ElfError::BadMagic);
        }

        // Validate class (byte 4) and data encoding (byte 5)
        if data[4] != ELFCLASS32 {
            return Err(ElfError::UnsupportedClass);
        }
        if data[5] != ELFDATA2LSB {
            return Err(ElfError::UnsupportedEncoding);
        }

        // Validate identification version (byte 6)
        if data[6] != EV_CURRENT {
            return Err(ElfError::UnsupportedVersion);
        }

        // Parse fields; offsets are safe because length was checked above
        let e_type = le_u16(data, 16);
        let e_machine = le_u16(data, 18);
        let e_entry = le_u32(data, 24);
        let e_phoff = le_u32(data, 28);
        let e_shoff = le_u32(data, 32);
        let e_ehsize = le_u16(data, 40);
        let e_phentsize = le_u16(data, 42);
        let e_phnum = le_u16(data, 44);
        let e_shentsize = le_u16(data, 46);
        let e_shnum = le_u16(data, 48);
        let e_shstrndx = le_u16(data, 50);

        // The fixed structure sizes distinguish a real ELF32 file from a
        // wrong-class or corrupted file carrying the right magic.
        if usize::from(e_ehsize) != ELF32_EHDR_SIZE
            || usize::from(e_phentsize) != ELF32_PHDR_SIZE
            || usize::from(e_shentsize) != ELF32_SHDR_SIZE
        {
            return Err(ElfError::BadStructSize);
        }

        if e_machine != EM_ARM {
            return Err(ElfError::UnsupportedMachine(e_machine));
        }

        // Validate program header table bounds.
        // A u32 offset plus a u16*u16 product cannot overflow u64.
        let ph_end = u64::from(e_phoff) + u64::from(e_phnum) * u64::from(e_phentsize);
        if ph_end > data.len() as u64 {
            return Err(ElfError::Truncated { need: ph_end });
        }

        Ok(Self {
            e_type,
            e_machine,
            e_entry,
            e_phoff,
            e_phnum,
            e_phentsize,
            e_shoff,
            e_shentsize,
            e_shnum,
            e_shstrndx,
        })
    }
}

/// Parsed ELF32 program header entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf32ProgramHeader {
    /// Segment type.
    pub seg_type: u32,
    /// Offset of the segment data in the file.
    pub offset: u32,
    /// Virtual address of the segment.
    pub vaddr: u32,
    /// Size of the segment data in the file.
    pub filesz: u32,
    /// Size of the segment in memory.
    pub memsz: u32,
    /// Segment flags (read/write/execute).
    pub flags: u32,
}

impl Elf32ProgramHeader {
    /// Parse a program header entry from raw bytes at the given file offset.
    ///
    /// The caller must ensure `file_offset + ELF32_PHDR_SIZE <= data.len()`.
    pub(crate) fn parse(data: &[u8], file_offset: usize) -> Self {
        let b = &data[file_offset..];
        Self {
            seg_type: le_u32(b, 0),
            offset: le_u32(b, 4),
            vaddr: le_u32(b, 8),
            // p_paddr at 12..16 (skipped)
            filesz: le_u32(b, 16),
            memsz: le_u32(b, 20),
            flags: le_u32(b, 24),
            // p_align at 28..32 (skipped)
        }
    }
}
