//! Image layout planning.
//!
//! Scans the `PT_LOAD` segments of a parsed ELF and resolves where the
//! image sits in virtual address space and how large the flat buffer
//! holding it must be.

use crate::LoadError;
use muon_elf::ElfFile;

/// Sentinel for the lowest-address fold before any segment is seen.
const NO_BASE: u32 = u32::MAX;

/// Resolved placement of an ELF image within a flat buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLayout {
    /// Lowest virtual address among the loadable segments.
    pub virt_base: u32,
    /// Total image span in bytes, zero-filled regions included.
    pub image_size: u32,
    /// Span of the file-backed bytes, for diagnostics.
    pub file_size: u32,
}

/// Computes the layout of an image from its loadable segments.
///
/// The image spans from the lowest `p_vaddr` to the highest
/// `p_vaddr + p_memsz`; segments with no file bytes still reserve their
/// `p_memsz` so zero-fill regions such as `.bss` are covered. Address
/// arithmetic wraps at 32 bits.
///
/// # Errors
///
/// Returns [`LoadError::NoLoadableSegments`] if the ELF has no `PT_LOAD`
/// entries at all; an empty image has no meaningful base or size.
#[expect(
    clippy::cast_possible_truncation,
    reason = "segment slices are cut to a u32 p_filesz, so their length fits in u32"
)]
pub fn plan(elf: &ElfFile<'_>) -> Result<ImageLayout, LoadError> {
    let mut virt_base = NO_BASE;
    let mut mem_limit = 0u32;
    let mut file_limit = 0u32;
    let mut found = false;

    for seg in elf.load_segments() {
        found = true;
        virt_base = virt_base.min(seg.vaddr);
        mem_limit = mem_limit.max(seg.vaddr.wrapping_add(seg.memsz));
        if !seg.data.is_empty() {
            file_limit = file_limit.max(seg.vaddr.wrapping_add(seg.data.len() as u32));
        }
    }

    if !found {
        return Err(LoadError::NoLoadableSegments);
    }

    // file_limit still zero means the image has no file-backed bytes.
    let file_size = if file_limit == 0 {
        0
    } else {
        file_limit.wrapping_sub(virt_base)
    };

    Ok(ImageLayout {
        virt_base,
        image_size: mem_limit.wrapping_sub(virt_base),
        file_size,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Values below mirror the ELF32 field layout; offsets are from the
    /// start of the 52-byte header.
    pub(crate) fn make_elf_header(entry: u32) -> Vec<u8> {
        let mut h = vec![0u8; 52];
        h[0..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
        h[4] = 1; // ELFCLASS32
        h[5] = 1; // ELFDATA2LSB
        h[6] = 1; // EV_CURRENT
        h[16..18].copy_from_slice(&2u16.to_le_bytes()); // e_type = ET_EXEC
        h[18..20].copy_from_slice(&40u16.to_le_bytes()); // e_machine = EM_ARM
        h[20..24].copy_from_slice(&1u32.to_le_bytes()); // e_version
        h[24..28].copy_from_slice(&entry.to_le_bytes()); // e_entry
        h[28..32].copy_from_slice(&52u32.to_le_bytes()); // e_phoff
        h[40..42].copy_from_slice(&52u16.to_le_bytes()); // e_ehsize
        h[42..44].copy_from_slice(&32u16.to_le_bytes()); // e_phentsize
        h[46..48].copy_from_slice(&40u16.to_le_bytes()); // e_shentsize
        h
    }

    /// Appends a 32-byte program header and bumps `e_phnum`.
    pub(crate) fn append_phdr(
        buf: &mut Vec<u8>,
        p_type: u32,
        p_offset: u32,
        p_vaddr: u32,
        p_filesz: u32,
        p_memsz: u32,
    ) {
        let mut ph = [0u8; 32];
        ph[0..4].copy_from_slice(&p_type.to_le_bytes());
        ph[4..8].copy_from_slice(&p_offset.to_le_bytes());
        ph[8..12].copy_from_slice(&p_vaddr.to_le_bytes());
        ph[16..20].copy_from_slice(&p_filesz.to_le_bytes());
        ph[20..24].copy_from_slice(&p_memsz.to_le_bytes());
        ph[24..28].copy_from_slice(&5u32.to_le_bytes()); // PF_R | PF_X
        buf.extend_from_slice(&ph);

        let phnum = u16::from_le_bytes([buf[44], buf[45]]) + 1;
        buf[44..46].copy_from_slice(&phnum.to_le_bytes());
    }

    #[test]
    fn single_segment_layout() {
        let mut elf = make_elf_header(0x8000);
        append_phdr(&mut elf, 1, 84, 0x8000, 0x100, 0x100);
        elf.resize(84 + 0x100, 0xAA);

        let parsed = ElfFile::parse(&elf).unwrap();
        let layout = plan(&parsed).unwrap();
        assert_eq!(layout.virt_base, 0x8000);
        assert_eq!(layout.image_size, 0x100);
        assert_eq!(layout.file_size, 0x100);
    }

    #[test]
    fn bss_extends_image_size() {
        let mut elf = make_elf_header(0x8000);
        append_phdr(&mut elf, 1, 84, 0x8000, 0x100, 0x300);
        elf.resize(84 + 0x100, 0xAA);

        let parsed = ElfFile::parse(&elf).unwrap();
        let layout = plan(&parsed).unwrap();
        assert_eq!(layout.image_size, 0x300);
        assert_eq!(layout.file_size, 0x100);
    }

    #[test]
    fn multiple_segments_span() {
        let mut elf = make_elf_header(0x8000);
        append_phdr(&mut elf, 1, 116, 0x8000, 0x100, 0x100);
        append_phdr(&mut elf, 1, 116 + 0x100, 0x9000, 0x40, 0x80);
        elf.resize(116 + 0x140, 0xAA);

        let parsed = ElfFile::parse(&elf).unwrap();
        let layout = plan(&parsed).unwrap();
        assert_eq!(layout.virt_base, 0x8000);
        assert_eq!(layout.image_size, 0x1080);
        assert_eq!(layout.file_size, 0x1040);
    }

    #[test]
    fn segments_out_of_table_order() {
        let mut elf = make_elf_header(0x8000);
        append_phdr(&mut elf, 1, 116, 0x9000, 0x40, 0x80);
        append_phdr(&mut elf, 1, 116 + 0x40, 0x8000, 0x100, 0x100);
        elf.resize(116 + 0x140, 0xAA);

        let parsed = ElfFile::parse(&elf).unwrap();
        let layout = plan(&parsed).unwrap();
        assert_eq!(layout.virt_base, 0x8000);
        assert_eq!(layout.image_size, 0x1080);
    }

    #[test]
    fn all_bss_image_has_no_file_span() {
        let mut elf = make_elf_header(0x2000_0000);
        append_phdr(&mut elf, 1, 0, 0x2000_0000, 0, 0x400);

        let parsed = ElfFile::parse(&elf).unwrap();
        let layout = plan(&parsed).unwrap();
        assert_eq!(layout.virt_base, 0x2000_0000);
        assert_eq!(layout.image_size, 0x400);
        assert_eq!(layout.file_size, 0);
    }

    #[test]
    fn wrapped_segment_span() {
        // A segment straddling the top of the address space: the modular
        // arithmetic still yields its true extent.
        let mut elf = make_elf_header(0xFFFF_F000);
        append_phdr(&mut elf, 1, 0, 0xFFFF_F000, 0, 0x2000);

        let parsed = ElfFile::parse(&elf).unwrap();
        let layout = plan(&parsed).unwrap();
        assert_eq!(layout.virt_base, 0xFFFF_F000);
        assert_eq!(layout.image_size, 0x2000);
    }

    #[test]
    fn no_load_segments_error() {
        let elf = make_elf_header(0x8000);
        let parsed = ElfFile::parse(&elf).unwrap();
        assert_eq!(plan(&parsed).err(), Some(LoadError::NoLoadableSegments));

        // A PT_NOTE segment alone does not make the image loadable.
        let mut elf = make_elf_header(0x8000);
        append_phdr(&mut elf, 4, 0, 0x8000, 0, 0);
        let parsed = ElfFile::parse(&elf).unwrap();
        assert_eq!(plan(&parsed).err(), Some(LoadError::NoLoadableSegments));
    }
}
