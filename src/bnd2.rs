use std::io::SeekFrom::Start;

use binrw::prelude::*;
use binrw::Endian;
use log::trace;

use crate::bundle::{BundleState, Entry, FileBlock};
use crate::cursor::{BundleCursor, SeekTask};
use crate::enums::{BundleFlags, Platform, ResourceType};
use crate::error::{BundleError, Result};
use crate::string_table;
use crate::types::{pack_size_align, unpack_align, unpack_size, Bnd2Descriptor};

pub(crate) fn load(state: &mut BundleState, cur: &mut BundleCursor) -> Result<()> {
    let mut revision = cur.read_u32()?;
    let mut platform_word = cur.read_u32()?;
    if platform_word != Platform::Pc.to_word() {
        // The console variants are big-endian; the revision was already
        // consumed with the wrong byte order.
        cur.set_endian(Endian::Big);
        revision = revision.swap_bytes();
        platform_word = platform_word.swap_bytes();
    }
    if revision != 2 {
        return Err(BundleError::UnsupportedRevision(revision));
    }
    let platform = Platform::from_word(platform_word)
        .ok_or(BundleError::UnsupportedPlatform(platform_word))?;
    state.revision = revision;
    state.platform = platform;

    let endian = cur.endian();
    let rst_offset = cur.read_u32()?;
    let num_entries = cur.read_u32()?;
    let id_block_offset = cur.read_u32()?;
    let mut block_offsets = [0u32; 3];
    for offset in &mut block_offsets {
        *offset = cur.read_u32()?;
    }
    state.flags = BundleFlags::from_bits_retain(cur.read_u32()?);
    // The remaining 8 header bytes are padding.
    let compressed = state.flags.contains(BundleFlags::COMPRESSED);

    cur.seek_to(id_block_offset as u64)?;
    for _ in 0..num_entries {
        let desc: Bnd2Descriptor = cur.read_type(endian)?;
        let resource_id = desc.resource_id as u32;
        if resource_id == 0 {
            return Err(BundleError::MalformedArchive(String::from(
                "descriptor with resource ID 0",
            )));
        }
        trace!("descriptor {resource_id:#010x}, type {:#x}", desc.resource_type);
        let mut entry = Entry {
            checksum: desc.checksum as u32,
            resource_type: ResourceType(desc.resource_type),
            dependencies_offset: desc.dependencies_offset,
            number_of_dependencies: desc.number_of_dependencies,
            ..Entry::default()
        };
        for (j, block) in entry.blocks.iter_mut().enumerate() {
            block.uncompressed_size = unpack_size(desc.packed_sizes[j]);
            block.uncompressed_alignment = unpack_align(desc.packed_sizes[j]);
            block.compressed_size = desc.compressed_sizes[j];
            let read_size = block.stored_size(compressed);
            if read_size == 0 {
                continue;
            }
            let pos = block_offsets[j] as u64 + desc.data_offsets[j] as u64;
            block.data =
                Some(cur.seek_task(Start(pos), |c| c.read_bytes(read_size as usize))?);
        }
        state.entries.insert(resource_id, entry);
    }

    if state.flags.contains(BundleFlags::HAS_RESOURCE_STRING_TABLE) {
        cur.seek_to(rst_offset as u64)?;
        let xml = cur.read_cstring()?;
        state.debug_info = string_table::parse(&xml);
    }
    Ok(())
}

pub(crate) fn save(state: &BundleState) -> Result<Vec<u8>> {
    if state.platform != Platform::Pc {
        return Err(BundleError::UnsupportedPlatform(state.platform.to_word()));
    }
    let compressed = state.flags.contains(BundleFlags::COMPRESSED);
    let mut cur = BundleCursor::new(Endian::Little);

    cur.write_bytes(b"bnd2")?;
    cur.write_u32(2)?;
    cur.write_u32(Platform::Pc.to_word())?;
    let rst_mark = cur.mark_u32()?;
    cur.write_u32(state.entries.len() as u32)?;
    let id_block_mark = cur.mark_u32()?;
    let block_marks = [cur.mark_u32()?, cur.mark_u32()?, cur.mark_u32()?];
    cur.write_u32(state.flags.bits())?;
    cur.align(16)?;

    cur.patch_u32(rst_mark, cur.position() as u32)?;
    if state.flags.contains(BundleFlags::HAS_RESOURCE_STRING_TABLE) {
        let xml = string_table::render(&state.debug_info);
        cur.write_bytes(xml.as_bytes())?;
        cur.write_u8(0)?;
        cur.align(16)?;
    }

    cur.patch_u32(id_block_mark, cur.position() as u32)?;
    let mut data_marks = Vec::with_capacity(state.entries.len());
    for (id, entry) in &state.entries {
        cur.write_u64(*id as u64)?;
        cur.write_u64(entry.checksum as u64)?;
        for block in &entry.blocks {
            if block.uncompressed_size & 0xF000_0000 != 0 {
                return Err(BundleError::MalformedArchive(format!(
                    "block of {} bytes does not fit in a packed size word",
                    block.uncompressed_size
                )));
            }
            cur.write_u32(pack_size_align(
                block.uncompressed_size,
                block.uncompressed_alignment,
            ))?;
        }
        for block in &entry.blocks {
            cur.write_u32(block.compressed_size)?;
        }
        let mut marks = [None, None, None];
        for (j, block) in entry.blocks.iter().enumerate() {
            if block.stored_size(compressed) > 0 {
                marks[j] = Some(cur.mark_u32()?);
            } else {
                cur.write_u32(0)?;
            }
        }
        data_marks.push(marks);
        cur.write_u32(entry.dependencies_offset)?;
        cur.write_u32(entry.resource_type.0)?;
        cur.write_u16(entry.number_of_dependencies)?;
        cur.write_u16(0)?;
    }

    for (j, block_mark) in block_marks.into_iter().enumerate() {
        let block_start = cur.position();
        cur.patch_u32(block_mark, block_start as u32)?;
        let last = state.entries.len().saturating_sub(1);
        for (i, entry) in state.entries.values().enumerate() {
            let block = &entry.blocks[j];
            let size = block.stored_size(compressed);
            if size == 0 {
                continue;
            }
            let bytes = block_data(block, size)?;
            if let Some(mark) = data_marks[i][j].take() {
                cur.patch_u32(mark, (cur.position() - block_start) as u32)?;
            }
            cur.write_bytes(bytes)?;
            cur.align(if j != 0 && i != last { 0x80 } else { 16 })?;
        }
        if j != 2 {
            cur.align(0x80)?;
        }
    }
    Ok(cur.into_bytes())
}

fn block_data(block: &FileBlock, size: u32) -> Result<&[u8]> {
    match block.data.as_deref() {
        Some(bytes) if bytes.len() as u32 == size => Ok(bytes),
        _ => Err(BundleError::MalformedArchive(format!(
            "block data does not match its declared {size}-byte size"
        ))),
    }
}
