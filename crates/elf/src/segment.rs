//! ARM ELF32 segment (program header) iteration.
//!
//! Provides [`ElfFile`] as the main entry point for parsing an ELF32 binary,
//! [`LoadSegment`] for iterating over `PT_LOAD` segments, and access to the
//! `PT_DYNAMIC` entries that drive relocation.

use crate::header::{
    ELF32_PHDR_SIZE, Elf32Header, Elf32ProgramHeader, ElfError, PT_DYNAMIC, PT_LOAD,
};

/// A parsed ELF32 file, holding a reference to the raw data and the parsed header.
#[derive(Debug, Clone, Copy)]
pub struct ElfFile<'a> {
    data: &'a [u8],
    header: Elf32Header,
}

/// A loadable segment extracted from an ELF32 file.
#[derive(Debug)]
pub struct LoadSegment<'a> {
    /// Virtual address where this segment should be placed.
    pub vaddr: u32,
    /// File content of this segment (may be shorter than `memsz`; remainder is zero-filled).
    pub data: &'a [u8],
    /// Total size of the segment in memory.
    pub memsz: u32,
    /// Segment permission flags (`PF_R = 4`, `PF_W = 2`, `PF_X = 1`).
    pub flags: u32,
}

impl<'a> ElfFile<'a> {
    /// Parse an ELF32 file from raw bytes.
    ///
    /// This validates the file header, ensures the program header table is
    /// within bounds, and checks that every file-backed `PT_LOAD` segment
    /// lies inside `data`, so segment iteration never truncates.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError`] if the header is invalid or the data is too short.
    pub fn parse(data: &'a [u8]) -> Result<Self, ElfError> {
        let header = Elf32Header::parse(data)?;
        let file = Self { data, header };

        // Only PT_LOAD contributes file bytes to the image; PT_DYNAMIC is
        // read back out of the copied segments, not the file.
        for phdr in file.program_headers() {
            if phdr.seg_type == PT_LOAD && phdr.filesz != 0 {
                let end = u64::from(phdr.offset) + u64::from(phdr.filesz);
                if end > data.len() as u64 {
                    return Err(ElfError::Truncated { need: end });
                }
            }
        }

        Ok(file)
    }

    /// Returns the virtual address of the entry point.
    #[must_use]
    pub fn entry_point(&self) -> u32 {
        self.header.e_entry
    }

    /// Returns the parsed ELF32 file header.
    #[must_use]
    pub fn header(&self) -> &Elf32Header {
        &self.header
    }

    /// Iterates over all program header entries.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "ELF32 fields fit in target width"
    )]
    fn program_headers(&self) -> impl Iterator<Item = Elf32ProgramHeader> {
        let data = self.data;
        let phoff = self.header.e_phoff as usize;
        let phentsize = usize::from(self.header.e_phentsize);
        let phnum = usize::from(self.header.e_phnum);

        (0..phnum).filter_map(move |i| {
            let offset = phoff + i * phentsize;
            if offset + ELF32_PHDR_SIZE > data.len() {
                return None;
            }
            Some(Elf32ProgramHeader::parse(data, offset))
        })
    }

    /// Returns an iterator over `PT_LOAD` segments.
    ///
    /// Each yielded [`LoadSegment`] contains a slice into the original data
    /// for the file-backed portion and the total memory size (which may be
    /// larger if the segment has a `.bss`-like zero-fill region). File
    /// ranges were verified during [`parse`](Self::parse), so the slices are
    /// always exact.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "ELF32 fields fit in target width"
    )]
    pub fn load_segments(&self) -> impl Iterator<Item = LoadSegment<'a>> {
        let data = self.data;
        self.program_headers().filter_map(move |phdr| {
            if phdr.seg_type != PT_LOAD {
                return None;
            }

            let file_offset = phdr.offset as usize;
            let file_size = phdr.filesz as usize;
            let seg_data = if file_size == 0 {
                &[] as &[u8]
            } else {
                &data[file_offset..file_offset + file_size]
            };

            Some(LoadSegment {
                vaddr: phdr.vaddr,
                data: seg_data,
                memsz: phdr.memsz,
                flags: phdr.flags,
            })
        })
    }

    /// Returns an iterator over `PT_DYNAMIC` program headers with a nonzero
    /// file size, in table order.
    ///
    /// Empty dynamic segments carry no table to walk and are skipped.
    pub fn dynamic_segments(&self) -> impl Iterator<Item = Elf32ProgramHeader> {
        self.program_headers()
            .filter(|phdr| phdr.seg_type == PT_DYNAMIC && phdr.filesz != 0)
    }
}
