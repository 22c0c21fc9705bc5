//! The loaded image and segment materialization.

use alloc::vec::Vec;

use crate::LoadError;
use crate::layout::ImageLayout;
use muon_elf::ElfFile;

/// A fully loaded, relocated ELF image ready to hand to the CPU core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// Load base address the caller requested.
    pub base: u32,
    /// Lowest virtual address the image was linked at.
    pub virt_base: u32,
    /// Total image size in bytes, zero-filled regions included.
    pub image_size: u32,
    /// Entry point after rebasing, in the loaded address space.
    pub entry_point: u32,
    /// Image bytes; index `k` holds the byte whose link-time address is
    /// `virt_base + k`.
    pub memory: Vec<u8>,
}

/// Copies the file-backed bytes of every `PT_LOAD` segment into the image
/// buffer at its layout-relative offset.
///
/// Segments are copied in program-header table order; where two segments
/// overlap, the later table entry wins. Bytes past `p_filesz` stay zero
/// from the buffer's initialization.
pub(crate) fn copy_segments(
    elf: &ElfFile<'_>,
    layout: &ImageLayout,
    memory: &mut [u8],
) -> Result<(), LoadError> {
    for seg in elf.load_segments() {
        if seg.data.is_empty() {
            continue;
        }

        #[expect(
            clippy::cast_possible_truncation,
            reason = "the image buffer is at most 4 GiB, so offsets into it fit in u32 and usize"
        )]
        let dest = seg.vaddr.wrapping_sub(layout.virt_base) as usize;
        let Some(end) = dest.checked_add(seg.data.len()).filter(|&e| e <= memory.len()) else {
            return Err(LoadError::CorruptSegment { vaddr: seg.vaddr });
        };

        log::trace!(
            "segment vaddr={:#010x} file bytes={:#x} memsz={:#x}",
            seg.vaddr,
            seg.data.len(),
            seg.memsz
        );
        memory[dest..end].copy_from_slice(seg.data);
    }

    Ok(())
}
