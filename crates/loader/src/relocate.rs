//! In-image dynamic section processing and relocation.
//!
//! Relocation metadata lives inside the loaded image itself: `PT_DYNAMIC`
//! points at dynamic entries within a loaded segment, and `DT_REL` in turn
//! points at the relocation table, also within loaded memory. Everything
//! here therefore reads from and writes to the image buffer, never the
//! original file.

use crate::LoadError;
use muon_elf::{
    DT_DEBUG, DT_NEEDED, DT_NULL, DT_PLTRELSZ, DT_REL, DT_RELSZ, DT_SYMBOLIC, DynTable, Elf32Dyn,
    Elf32Rel, ELF32_DYN_SIZE, ELF32_REL_SIZE, ElfFile, RelocError, compute_arm_reloc,
};

/// Translates a virtual address into an offset within the image buffer.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the image buffer is at most 4 GiB, so offsets into it fit in usize"
)]
fn image_offset(vaddr: u32, virt_base: u32) -> usize {
    vaddr.wrapping_sub(virt_base) as usize
}

/// Checks that `len` bytes starting at `offset` lie within the image.
fn check_window(memory: &[u8], offset: usize, len: usize) -> Result<(), LoadError> {
    let need = offset as u64 + len as u64;
    if need > memory.len() as u64 {
        return Err(LoadError::TruncatedInput { need });
    }
    Ok(())
}

/// Reads the little-endian word at `offset`. Callers must bounds-check
/// with [`check_window`] first.
fn word_at(memory: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(*memory[offset..].first_chunk().unwrap())
}

/// Writes `value` as a little-endian word at `offset`. Callers must
/// bounds-check with [`check_window`] first.
fn put_word(memory: &mut [u8], offset: usize, value: u32) {
    memory[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Applies every dynamic relocation the image carries.
///
/// Walks each `PT_DYNAMIC` segment in program-header order, collects its
/// dynamic entries, and rewrites the relocation targets named by its
/// `DT_REL` table so the image runs at `base` instead of `virt_base`.
/// `memory` must be the flat image buffer produced from the layout whose
/// lowest address is `virt_base`, with all segments already copied in.
///
/// # Errors
///
/// Returns [`LoadError::TruncatedInput`] if a dynamic entry, relocation
/// entry or relocation target falls outside the image, and
/// [`LoadError::UnsupportedRelocation`] for PLT-based images or relocation
/// types outside the supported set.
pub fn apply_relocations(
    elf: &ElfFile<'_>,
    base: u32,
    virt_base: u32,
    memory: &mut [u8],
) -> Result<(), LoadError> {
    for phdr in elf.dynamic_segments() {
        process_dynamic(phdr.vaddr, base, virt_base, memory)?;
    }
    Ok(())
}

/// Processes one `PT_DYNAMIC` segment: reads its dynamic table out of the
/// image, then applies its relocation table if it has one.
fn process_dynamic(
    dyn_vaddr: u32,
    base: u32,
    virt_base: u32,
    memory: &mut [u8],
) -> Result<(), LoadError> {
    let table = read_dyn_table(dyn_vaddr, virt_base, memory)?;

    // Reject PLT-based images before touching any relocation entry.
    if table.get(DT_PLTRELSZ) != 0 {
        return Err(LoadError::UnsupportedRelocation(RelocError::PltNotSupported));
    }

    let rel_vaddr = table.get(DT_REL);
    let rel_size = table.get(DT_RELSZ);
    if rel_size == 0 {
        return Ok(());
    }

    log::debug!("rel table at {rel_vaddr:#010x}, {rel_size:#x} bytes");

    for off in (0..rel_size).step_by(ELF32_REL_SIZE) {
        let entry_off = image_offset(rel_vaddr.wrapping_add(off), virt_base);
        check_window(memory, entry_off, ELF32_REL_SIZE)?;
        let rel = Elf32Rel::parse(memory, entry_off);
        apply_one(&rel, base, virt_base, memory)?;
    }

    Ok(())
}

/// Collects a capped dynamic table from the image, stopping at `DT_NULL`.
///
/// `DT_NEEDED` entries are skipped, `DT_SYMBOLIC` is recorded as a flag,
/// and the value word of any `DT_DEBUG` entry is zeroed in the image so
/// the loaded program never sees a stale debugger handle.
fn read_dyn_table(
    dyn_vaddr: u32,
    virt_base: u32,
    memory: &mut [u8],
) -> Result<DynTable, LoadError> {
    let mut table = DynTable::new();
    let mut offset = image_offset(dyn_vaddr, virt_base);

    loop {
        check_window(memory, offset, ELF32_DYN_SIZE)?;
        let entry = Elf32Dyn::parse(memory, offset);
        match entry.d_tag {
            DT_NULL => break,
            DT_NEEDED => {}
            DT_SYMBOLIC => table.set(DT_SYMBOLIC, 1),
            DT_DEBUG => put_word(memory, offset + 4, 0),
            tag => table.set(tag, entry.d_val),
        }
        offset += ELF32_DYN_SIZE;
    }

    Ok(table)
}

/// Applies a single relocation entry to the image.
fn apply_one(
    rel: &Elf32Rel,
    base: u32,
    virt_base: u32,
    memory: &mut [u8],
) -> Result<(), LoadError> {
    let target = image_offset(rel.r_offset, virt_base);
    check_window(memory, target, 4)?;

    let addend = word_at(memory, target);
    let value =
        compute_arm_reloc(rel, addend, base, virt_base).map_err(LoadError::UnsupportedRelocation)?;

    log::trace!(
        "reloc type={} at {:#010x}: {addend:#010x} -> {value:#010x}",
        rel.r_type,
        rel.r_offset
    );
    put_word(memory, target, value);
    Ok(())
}
