use std::io::SeekFrom::Start;

use binrw::prelude::*;
use binrw::Endian;
use log::trace;

use crate::bundle::{
    block_bytes, BundleState, Entry, FileBlock, RST_RESOURCE_ID, RST_SYNTHETIC_KEY,
};
use crate::cursor::{BundleCursor, Mark, SeekTask};
use crate::enums::{BundleFlags, Platform, ResourceType};
use crate::error::{BundleError, Result};
use crate::string_table;
use crate::types::{BndlHeader, Dependency};

/// The on-disk tables carry five block rows per resource; the codec keeps
/// rows 0 and 2 and discards the rest.
fn map_slot(row: usize) -> Option<usize> {
    match row {
        0 => Some(0),
        2 => Some(1),
        _ => None,
    }
}

pub(crate) fn load(state: &mut BundleState, cur: &mut BundleCursor) -> Result<()> {
    // This revision range never shipped on a little-endian platform.
    cur.set_endian(Endian::Big);
    let header: BndlHeader = cur.read_type(Endian::Big)?;
    if !(3..=5).contains(&header.revision) {
        return Err(BundleError::UnsupportedRevision(header.revision));
    }
    if header.platform != 2 {
        return Err(BundleError::UnsupportedPlatform(header.platform));
    }
    state.revision = header.revision;
    state.platform = Platform::Xbox360;
    let compressed = header.compressed != 0;
    state.flags = if compressed {
        BundleFlags::COMPRESSED
    } else {
        BundleFlags::empty()
    };

    cur.seek_to(header.id_list_offset as u64)?;
    let mut resource_ids = Vec::with_capacity(header.num_entries as usize);
    for _ in 0..header.num_entries {
        resource_ids.push(cur.read_u64()? as u32);
    }

    cur.seek_to(header.id_table_offset as u64)?;
    for &resource_id in &resource_ids {
        let mut entry = Entry::default();
        cur.skip(4)?;
        entry.dependencies_offset = cur.read_u32()?;
        entry.resource_type = ResourceType(cur.read_u32()?);
        trace!("table row {resource_id:#010x}, type {:#x}", entry.resource_type.0);

        for row in 0..5 {
            let size = cur.read_u32()?;
            let alignment = cur.read_u32()?;
            let Some(slot) = map_slot(row) else { continue };
            let block = &mut entry.blocks[slot];
            if compressed {
                // Uncompressed sizes arrive later from the separate table;
                // the alignment word here is a constant 1.
                block.compressed_size = size;
            } else {
                block.uncompressed_size = size;
                block.uncompressed_alignment = alignment;
            }
        }

        let mut block_start = 0u64;
        for row in 0..5 {
            if row > 0 {
                block_start += header.block_descriptors[row - 1][0] as u64;
            }
            let local_offset = cur.read_u32()?;
            cur.skip(4)?;
            let Some(slot) = map_slot(row) else { continue };
            let block = &mut entry.blocks[slot];
            let read_size = block.stored_size(compressed);
            if read_size == 0 {
                continue;
            }
            let pos = block_start + local_offset as u64;
            block.data =
                Some(cur.seek_task(Start(pos), |c| c.read_bytes(read_size as usize))?);
        }
        cur.skip(0x14)?;
        state.entries.insert(resource_id, entry);
    }

    if compressed {
        cur.seek_to(header.uncomp_info_offset as u64)?;
        for &resource_id in &resource_ids {
            let mut sizes = [(0u32, 0u32); 2];
            for row in 0..5 {
                let size = cur.read_u32()?;
                let alignment = cur.read_u32()?;
                if let Some(slot) = map_slot(row) {
                    sizes[slot] = (size, alignment);
                }
            }
            if let Some(entry) = state.entries.get_mut(&resource_id) {
                for (slot, &(size, alignment)) in sizes.iter().enumerate() {
                    entry.blocks[slot].uncompressed_size = size;
                    entry.blocks[slot].uncompressed_alignment = alignment;
                }
            }
        }
    }

    // Imports live in their own region, referenced per resource.
    for &resource_id in &resource_ids {
        let Some(entry) = state.entries.get(&resource_id) else {
            continue;
        };
        let offset = entry.dependencies_offset;
        if offset == 0 {
            continue;
        }
        cur.seek_to(offset as u64)?;
        let count = cur.read_u32()?;
        if count > u16::MAX as u32 {
            return Err(BundleError::MalformedArchive(format!(
                "import count {count} does not fit in 16 bits"
            )));
        }
        let zero = cur.read_u32()?;
        if zero != 0 {
            return Err(BundleError::MalformedArchive(format!(
                "reserved word after the import count is {zero:#x}"
            )));
        }
        let mut dependencies = Vec::with_capacity(count as usize);
        for _ in 0..count {
            dependencies.push(cur.read_type::<Dependency>(Endian::Big)?);
        }
        if let Some(entry) = state.entries.get_mut(&resource_id) {
            entry.number_of_dependencies = count as u16;
        }
        state.legacy_dependencies.insert(resource_id, dependencies);
    }

    // The string table rides in as a pseudo-resource with a fixed ID.
    let rst_payload = match state.entries.get(&RST_RESOURCE_ID) {
        Some(entry) => block_bytes(state, entry, 0)?,
        None => None,
    };
    if let Some(payload) = rst_payload {
        let mut reader = BundleCursor::from_vec(payload, Endian::Big);
        let length = reader.read_u32()? as usize;
        let xml_bytes = reader.read_bytes(length)?;
        let xml = string_table::repair(&String::from_utf8_lossy(&xml_bytes));
        state.debug_info = string_table::parse(&xml);
        state.flags.insert(BundleFlags::HAS_RESOURCE_STRING_TABLE);
        state.entries.remove(&RST_RESOURCE_ID);
        state.legacy_dependencies.remove(&RST_RESOURCE_ID);
    }
    Ok(())
}

pub(crate) fn save(state: &mut BundleState) -> Result<Vec<u8>> {
    let compressed = state.flags.contains(BundleFlags::COMPRESSED);
    let write_debug = !state.debug_info.is_empty() && !compressed;
    let entry_count = state.entries.len() as u32 + write_debug as u32;

    let mut cur = BundleCursor::new(Endian::Big);
    cur.write_bytes(b"bndl")?;
    // Revision 3 and 4 archives are re-emitted as revision 5.
    cur.write_u32(5)?;
    cur.write_u32(entry_count)?;

    // Five (size, alignment) pairs; the two real blocks are patched after
    // the data pass.
    let mut block_desc_marks: [Option<(Mark, Mark)>; 2] = [None, None];
    for row in 0..5 {
        match map_slot(row) {
            Some(slot) => block_desc_marks[slot] = Some((cur.mark_u32()?, cur.mark_u32()?)),
            None => {
                cur.write_u32(0)?;
                cur.write_u32(1)?;
            }
        }
    }
    for _ in 0..5 {
        cur.write_u32(0)?; // memory addresses
    }
    let id_list_mark = cur.mark_u32()?;
    let id_table_mark = cur.mark_u32()?;
    let import_block_mark = cur.mark_u32()?;
    let data_block_mark = cur.mark_u32()?;
    cur.write_u32(2)?; // Xbox 360
    cur.write_u32(compressed as u32)?;
    cur.write_u32(if compressed { entry_count } else { 0 })?;
    let uncomp_info_mark = if compressed {
        Some(cur.mark_u32()?)
    } else {
        cur.write_u32(0)?;
        None
    };
    cur.write_u32(0)?; // main memory alignment
    cur.write_u32(0)?; // graphics memory alignment

    cur.patch_u32(id_list_mark, cur.position() as u32)?;
    for id in state.entries.keys() {
        cur.write_u64(*id as u64)?;
    }
    if write_debug {
        cur.write_u64(RST_RESOURCE_ID as u64)?;
    }

    if write_debug {
        // Loaders pick the table back up under the RST ID, so the key only
        // has to sort after every real entry.
        let xml = string_table::render(&state.debug_info);
        let mut payload = BundleCursor::new(Endian::Big);
        payload.write_u32(xml.len() as u32)?;
        payload.write_bytes(xml.as_bytes())?;
        let bytes = payload.into_bytes();
        let mut entry = Entry {
            resource_type: ResourceType::TEXT_FILE,
            ..Entry::default()
        };
        entry.blocks[0] = FileBlock {
            uncompressed_size: bytes.len() as u32,
            uncompressed_alignment: 4,
            compressed_size: 0,
            data: Some(bytes),
        };
        state.entries.insert(RST_SYNTHETIC_KEY, entry);
    }

    cur.patch_u32(id_table_mark, cur.position() as u32)?;
    let mut entry_marks = Vec::with_capacity(state.entries.len());
    for (id, entry) in &state.entries {
        cur.write_u32(0)?;
        let has_imports = state
            .legacy_dependencies
            .get(id)
            .is_some_and(|deps| !deps.is_empty());
        let import_mark = if has_imports {
            Some(cur.mark_u32()?)
        } else {
            cur.write_u32(0)?;
            None
        };
        cur.write_u32(entry.resource_type.0)?;
        for row in 0..5 {
            match map_slot(row) {
                Some(slot) => {
                    let block = &entry.blocks[slot];
                    let size = block.stored_size(compressed);
                    cur.write_u32(size)?;
                    cur.write_u32(if size == 0 {
                        1
                    } else {
                        block.uncompressed_alignment
                    })?;
                }
                None => {
                    cur.write_u32(0)?;
                    cur.write_u32(1)?;
                }
            }
        }
        let mut data_marks = [None, None];
        for row in 0..5 {
            match map_slot(row) {
                Some(slot) if entry.blocks[slot].stored_size(compressed) > 0 => {
                    data_marks[slot] = Some(cur.mark_u32()?);
                }
                _ => cur.write_u32(0)?,
            }
            cur.write_u32(1)?;
        }
        for _ in 0..5 {
            cur.write_u32(0)?; // memory records
        }
        entry_marks.push((import_mark, data_marks));
    }

    if let Some(mark) = uncomp_info_mark {
        cur.patch_u32(mark, cur.position() as u32)?;
        for entry in state.entries.values() {
            for row in 0..5 {
                match map_slot(row) {
                    Some(slot) => {
                        let block = &entry.blocks[slot];
                        cur.write_u32(block.uncompressed_size)?;
                        cur.write_u32(if block.uncompressed_size == 0 {
                            1
                        } else {
                            block.uncompressed_alignment
                        })?;
                    }
                    None => {
                        cur.write_u32(0)?;
                        cur.write_u32(1)?;
                    }
                }
            }
        }
    }

    cur.patch_u32(import_block_mark, cur.position() as u32)?;
    for (i, id) in state.entries.keys().enumerate() {
        let Some(deps) = state
            .legacy_dependencies
            .get(id)
            .filter(|deps| !deps.is_empty())
        else {
            continue;
        };
        if let Some(mark) = entry_marks[i].0.take() {
            cur.patch_u32(mark, cur.position() as u32)?;
        }
        cur.write_u32(deps.len() as u32)?;
        cur.write_u32(0)?;
        for dependency in deps {
            cur.write_type(dependency, Endian::Big)?;
        }
    }

    cur.patch_u32(data_block_mark, cur.position() as u32)?;
    // Block 0 offsets come out relative to the archive start; the patched
    // size of one block is what positions the next, so readers stay
    // consistent with this.
    let mut block_start = 0u64;
    for slot in 0..2 {
        for (i, entry) in state.entries.values().enumerate() {
            let block = &entry.blocks[slot];
            let size = block.stored_size(compressed);
            if size == 0 {
                continue;
            }
            let bytes = match block.data.as_deref() {
                Some(bytes) if bytes.len() as u32 == size => bytes,
                _ => {
                    return Err(BundleError::MalformedArchive(format!(
                        "block data does not match its declared {size}-byte size"
                    )))
                }
            };
            if let Some(mark) = entry_marks[i].1[slot].take() {
                cur.patch_u32(mark, (cur.position() - block_start) as u32)?;
            }
            cur.write_bytes(bytes)?;
        }
        let size = (cur.position() - block_start) as u32;
        if let Some((size_mark, align_mark)) = block_desc_marks[slot].take() {
            cur.patch_u32(size_mark, size)?;
            cur.patch_u32(
                align_mark,
                if size == 0 {
                    1
                } else if slot == 1 {
                    4096
                } else {
                    1024
                },
            )?;
        }
        block_start = cur.position();
    }

    if write_debug {
        state.entries.remove(&RST_SYNTHETIC_KEY);
    }
    Ok(cur.into_bytes())
}
