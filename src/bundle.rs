use std::collections::BTreeMap;
use std::sync::Mutex;

use binrw::prelude::*;
use binrw::Endian;
use log::debug;

use crate::bnd2;
use crate::bndl;
use crate::cursor::BundleCursor;
use crate::enums::{BundleFlags, MagicVersion, Platform, ResourceType};
use crate::error::{BundleError, Result};
use crate::hash::hash_resource_name;
use crate::types::Dependency;
use crate::util;

/// ID under which bndl archives store their resource string table.
pub(crate) const RST_RESOURCE_ID: u32 = 0xC039284A;

/// Map key for the synthetic string-table entry while a bndl archive is
/// being serialized. Chosen to sort after every real ID.
pub(crate) const RST_SYNTHETIC_KEY: u32 = 0xFFFF_FFFF;

/// One payload stream of a resource. bnd2 resources have three slots, bndl
/// resources use slots 0 and 1.
#[derive(Debug, Default, Clone)]
pub struct FileBlock {
    pub uncompressed_size: u32,
    pub uncompressed_alignment: u32,
    pub compressed_size: u32,
    /// Raw bytes as stored in the archive: deflated when the bundle is
    /// compressed, absent when the slot is empty.
    pub data: Option<Vec<u8>>,
}

impl FileBlock {
    pub(crate) fn stored_size(&self, compressed: bool) -> u32 {
        if compressed {
            self.compressed_size
        } else {
            self.uncompressed_size
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Entry {
    pub checksum: u32,
    pub resource_type: ResourceType,
    pub dependencies_offset: u32,
    pub number_of_dependencies: u16,
    pub blocks: [FileBlock; 3],
}

/// Debug name and type name from the resource string table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DebugInfo {
    pub name: String,
    pub type_name: String,
}

/// Snapshot returned by [`Bundle::get_data`] and input consumed by
/// [`Bundle::add_resource`] / [`Bundle::replace_resource`]. Block bytes are
/// always uncompressed here, and block 0 never carries the inline
/// dependency tail.
#[derive(Debug, Default, Clone)]
pub struct EntryData {
    pub file_block_data: [Option<Vec<u8>>; 3],
    pub alignments: [u32; 3],
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Default)]
pub(crate) struct BundleState {
    pub magic_version: MagicVersion,
    pub revision: u32,
    pub platform: Platform,
    pub flags: BundleFlags,
    pub entries: BTreeMap<u32, Entry>,
    pub debug_info: BTreeMap<u32, DebugInfo>,
    /// bndl keeps imports in their own archive region; bnd2 inlines them at
    /// the end of block 0 instead.
    pub legacy_dependencies: BTreeMap<u32, Vec<Dependency>>,
}

/// An in-memory resource archive, loaded from or saved to the `bndl` or
/// `bnd2` container layout.
///
/// Every operation locks the whole catalog, so readers always observe a
/// consistent snapshot and writers are serialized.
#[derive(Debug)]
pub struct Bundle {
    state: Mutex<BundleState>,
}

impl Bundle {
    /// Fresh empty archive of the given flavor.
    pub fn new(
        magic_version: MagicVersion,
        revision: u32,
        platform: Platform,
        flags: BundleFlags,
    ) -> Result<Self> {
        match magic_version {
            MagicVersion::Bnd2 if revision != 2 => {
                return Err(BundleError::UnsupportedRevision(revision))
            }
            MagicVersion::Bndl if !(3..=5).contains(&revision) => {
                return Err(BundleError::UnsupportedRevision(revision))
            }
            _ => {}
        }
        Ok(Bundle {
            state: Mutex::new(BundleState {
                magic_version,
                revision,
                platform,
                flags,
                ..BundleState::default()
            }),
        })
    }

    /// Parse an archive, dispatching on the magic.
    pub fn read<A: AsRef<[u8]>>(data: A) -> Result<Self> {
        let data = data.as_ref();
        if data.len() < 4 {
            return Err(BundleError::NotABundle);
        }
        let magic_version = if data[..4] == *MagicVersion::Bndl.magic() {
            MagicVersion::Bndl
        } else if data[..4] == *MagicVersion::Bnd2.magic() {
            MagicVersion::Bnd2
        } else {
            return Err(BundleError::NotABundle);
        };
        let mut cur = BundleCursor::from_vec(data.to_vec(), Endian::Little);
        cur.skip(4)?;
        let mut state = BundleState {
            magic_version,
            ..BundleState::default()
        };
        match magic_version {
            MagicVersion::Bnd2 => bnd2::load(&mut state, &mut cur)?,
            MagicVersion::Bndl => bndl::load(&mut state, &mut cur)?,
        }
        // After a load the flag and the table contents agree by definition.
        state.flags.set(
            BundleFlags::HAS_RESOURCE_STRING_TABLE,
            !state.debug_info.is_empty(),
        );
        debug!(
            "loaded {:?} archive: {} resources, {} debug names",
            magic_version,
            state.entries.len(),
            state.debug_info.len()
        );
        Ok(Bundle {
            state: Mutex::new(state),
        })
    }

    /// Serialize the archive in its own flavor.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        let bytes = match state.magic_version {
            MagicVersion::Bnd2 => bnd2::save(&state)?,
            MagicVersion::Bndl => bndl::save(&mut state)?,
        };
        debug!(
            "saved {:?} archive: {} resources, {} bytes",
            state.magic_version,
            state.entries.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    pub fn magic_version(&self) -> MagicVersion {
        self.state.lock().unwrap().magic_version
    }

    pub fn revision(&self) -> u32 {
        self.state.lock().unwrap().revision
    }

    pub fn platform(&self) -> Platform {
        self.state.lock().unwrap().platform
    }

    pub fn flags(&self) -> BundleFlags {
        self.state.lock().unwrap().flags
    }

    /// Decompressed snapshot of one resource: block bytes, alignments and
    /// the dependency list, with the inline dependency tail stripped from
    /// block 0.
    pub fn get_data(&self, resource_id: u32) -> Result<EntryData> {
        let state = self.state.lock().unwrap();
        snapshot(&state, resource_id)
    }

    pub fn get_data_by_name<A: AsRef<str>>(&self, resource_name: A) -> Result<EntryData> {
        self.get_data(hash_resource_name(resource_name))
    }

    /// Decompressed bytes of a single slot, `None` when the slot is empty.
    pub fn get_binary(&self, resource_id: u32, file_block: usize) -> Result<Option<Vec<u8>>> {
        let state = self.state.lock().unwrap();
        let entry = state
            .entries
            .get(&resource_id)
            .ok_or(BundleError::UnknownResource(resource_id))?;
        block_bytes(&state, entry, file_block)
    }

    pub fn get_binary_by_name<A: AsRef<str>>(
        &self,
        resource_name: A,
        file_block: usize,
    ) -> Result<Option<Vec<u8>>> {
        self.get_binary(hash_resource_name(resource_name), file_block)
    }

    pub fn get_resource_type(&self, resource_id: u32) -> Result<ResourceType> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .get(&resource_id)
            .map(|e| e.resource_type)
            .ok_or(BundleError::UnknownResource(resource_id))
    }

    pub fn get_debug_info(&self, resource_id: u32) -> Option<DebugInfo> {
        self.state.lock().unwrap().debug_info.get(&resource_id).cloned()
    }

    /// Insert a new resource. The payload goes through the same path as
    /// [`Bundle::replace_resource`].
    pub fn add_resource(
        &self,
        resource_id: u32,
        data: &EntryData,
        resource_type: ResourceType,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.magic_version == MagicVersion::Bnd2 && resource_id == 0 {
            return Err(BundleError::MalformedArchive(String::from(
                "resource ID 0 is reserved",
            )));
        }
        if state.entries.contains_key(&resource_id) {
            return Err(BundleError::DuplicateResource(resource_id));
        }
        if data.dependencies.len() > u16::MAX as usize {
            return Err(BundleError::TooManyDependencies(data.dependencies.len()));
        }
        state.entries.insert(
            resource_id,
            Entry {
                resource_type,
                ..Entry::default()
            },
        );
        replace(&mut state, resource_id, data)
    }

    pub fn add_resource_by_name<A: AsRef<str>>(
        &self,
        resource_name: A,
        data: &EntryData,
        resource_type: ResourceType,
    ) -> Result<()> {
        self.add_resource(hash_resource_name(resource_name), data, resource_type)
    }

    /// Swap out a resource's payload. Checksum and dependency bookkeeping
    /// are rebuilt from the input.
    pub fn replace_resource(&self, resource_id: u32, data: &EntryData) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        replace(&mut state, resource_id, data)
    }

    pub fn replace_resource_by_name<A: AsRef<str>>(
        &self,
        resource_name: A,
        data: &EntryData,
    ) -> Result<()> {
        self.replace_resource(hash_resource_name(resource_name), data)
    }

    /// Record a debug name for a resource ID and make sure the next save
    /// emits the string table.
    pub fn add_debug_info<A: AsRef<str>, B: AsRef<str>>(
        &self,
        resource_id: u32,
        name: A,
        type_name: B,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.debug_info.contains_key(&resource_id) {
            return Err(BundleError::DuplicateResource(resource_id));
        }
        state.debug_info.insert(
            resource_id,
            DebugInfo {
                name: String::from(name.as_ref()),
                type_name: String::from(type_name.as_ref()),
            },
        );
        state.flags.insert(BundleFlags::HAS_RESOURCE_STRING_TABLE);
        Ok(())
    }

    /// All resource IDs, ascending.
    pub fn list_resource_ids(&self) -> Vec<u32> {
        self.state.lock().unwrap().entries.keys().copied().collect()
    }

    /// Resource IDs grouped by type; ascending within each group.
    pub fn list_resource_ids_by_type(&self) -> BTreeMap<ResourceType, Vec<u32>> {
        let state = self.state.lock().unwrap();
        let mut by_type: BTreeMap<ResourceType, Vec<u32>> = BTreeMap::new();
        for (id, entry) in &state.entries {
            by_type.entry(entry.resource_type).or_default().push(*id);
        }
        by_type
    }
}

/// Decompressed bytes of one slot of an entry.
pub(crate) fn block_bytes(
    state: &BundleState,
    entry: &Entry,
    file_block: usize,
) -> Result<Option<Vec<u8>>> {
    let info = &entry.blocks[file_block];
    let Some(raw) = info.data.as_ref() else {
        return Ok(None);
    };
    if state.flags.contains(BundleFlags::COMPRESSED) {
        util::decompress(raw, info.uncompressed_size as usize).map(Some)
    } else {
        Ok(Some(raw.clone()))
    }
}

fn snapshot(state: &BundleState, resource_id: u32) -> Result<EntryData> {
    let entry = state
        .entries
        .get(&resource_id)
        .ok_or(BundleError::UnknownResource(resource_id))?;
    let mut data = EntryData::default();
    for i in 0..3 {
        data.file_block_data[i] = block_bytes(state, entry, i)?;
        data.alignments[i] = entry.blocks[i].uncompressed_alignment;
    }
    if entry.number_of_dependencies > 0 {
        if state.magic_version == MagicVersion::Bndl {
            data.dependencies = state
                .legacy_dependencies
                .get(&resource_id)
                .cloned()
                .unwrap_or_default();
        } else {
            let block0 = data.file_block_data[0].as_mut().ok_or_else(|| {
                BundleError::MalformedArchive(format!(
                    "resource {resource_id:#010x} declares imports but has no block 0"
                ))
            })?;
            let offset = entry.dependencies_offset as usize;
            if offset >= block0.len() {
                return Err(BundleError::MalformedArchive(format!(
                    "import table offset {offset} is outside block 0"
                )));
            }
            let endian = state.platform.endian();
            let mut tail = BundleCursor::from_vec(block0[offset..].to_vec(), endian);
            for _ in 0..entry.number_of_dependencies {
                data.dependencies.push(tail.read_type(endian)?);
            }
            block0.truncate(offset);
        }
    }
    Ok(data)
}

fn replace(state: &mut BundleState, resource_id: u32, data: &EntryData) -> Result<()> {
    if !state.entries.contains_key(&resource_id) {
        return Err(BundleError::UnknownResource(resource_id));
    }
    if data.dependencies.len() > u16::MAX as usize {
        return Err(BundleError::TooManyDependencies(data.dependencies.len()));
    }
    let magic_version = state.magic_version;
    let compressed = state.flags.contains(BundleFlags::COMPRESSED);
    let endian = state.platform.endian();

    for &alignment in &data.alignments {
        let alignment = alignment.max(1);
        if !alignment.is_power_of_two()
            || (magic_version == MagicVersion::Bnd2 && alignment.trailing_zeros() > 15)
        {
            return Err(BundleError::MalformedArchive(format!(
                "unencodable block alignment {alignment}"
            )));
        }
    }

    if magic_version == MagicVersion::Bndl {
        if data.dependencies.is_empty() {
            state.legacy_dependencies.remove(&resource_id);
        } else {
            state
                .legacy_dependencies
                .insert(resource_id, data.dependencies.clone());
        }
    }

    let entry = state
        .entries
        .get_mut(&resource_id)
        .ok_or(BundleError::UnknownResource(resource_id))?;
    entry.checksum = 0;
    entry.dependencies_offset = 0;
    entry.number_of_dependencies = 0;
    if magic_version == MagicVersion::Bndl {
        entry.number_of_dependencies = data.dependencies.len() as u16;
    }

    for i in 0..3 {
        let input = data.file_block_data[i].as_deref().unwrap_or_default();
        let block = &mut entry.blocks[i];
        if input.is_empty() {
            *block = FileBlock::default();
            continue;
        }

        let mut buffer;
        if magic_version == MagicVersion::Bnd2 && i == 0 && !data.dependencies.is_empty() {
            // The import table rides at the 16-aligned end of block 0.
            let aligned = input.len().next_multiple_of(16);
            buffer = input.to_vec();
            buffer.resize(aligned, 0);
            let mut imports = BundleCursor::new(endian);
            for dependency in &data.dependencies {
                imports.write_type(dependency, endian)?;
            }
            buffer.extend_from_slice(&imports.into_bytes());
            entry.dependencies_offset = aligned as u32;
            entry.number_of_dependencies = data.dependencies.len() as u16;
        } else {
            buffer = input.to_vec();
        }

        block.uncompressed_size = buffer.len() as u32;
        block.uncompressed_alignment = data.alignments[i].max(1);
        if compressed {
            let packed = util::compress(&buffer)?;
            block.compressed_size = packed.len() as u32;
            block.data = Some(packed);
        } else {
            block.compressed_size = 0;
            block.data = Some(buffer);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pack_size_align;

    fn payload(bytes: &[u8], alignment: u32) -> EntryData {
        EntryData {
            file_block_data: [Some(bytes.to_vec()), None, None],
            alignments: [alignment, 1, 1],
            dependencies: vec![],
        }
    }

    fn empty_bnd2(flags: BundleFlags) -> Bundle {
        Bundle::new(MagicVersion::Bnd2, 2, Platform::Pc, flags).unwrap()
    }

    fn empty_bndl(flags: BundleFlags) -> Bundle {
        Bundle::new(MagicVersion::Bndl, 5, Platform::Xbox360, flags).unwrap()
    }

    #[test]
    fn a_fresh_bnd2_resource_survives_a_round_trip() {
        let bundle = empty_bnd2(BundleFlags::empty());
        bundle
            .add_resource(
                0x12345678,
                &payload(&[0xAA, 0xBB, 0xCC, 0xDD], 4),
                ResourceType::TEXT_FILE,
            )
            .unwrap();
        let reloaded = Bundle::read(bundle.to_bytes().unwrap()).unwrap();
        assert_eq!(reloaded.list_resource_ids(), [0x12345678]);
        assert_eq!(
            reloaded.get_binary(0x12345678, 0).unwrap().unwrap(),
            [0xAA, 0xBB, 0xCC, 0xDD]
        );
        assert_eq!(
            reloaded.get_resource_type(0x12345678).unwrap(),
            ResourceType::TEXT_FILE
        );
    }

    #[test]
    fn compressed_blocks_are_deflated_on_disk() {
        let bundle = empty_bnd2(BundleFlags::COMPRESSED);
        bundle
            .add_resource(
                0x12345678,
                &payload(&[0xAA, 0xBB, 0xCC, 0xDD], 4),
                ResourceType::TEXT_FILE,
            )
            .unwrap();
        {
            let state = bundle.state.lock().unwrap();
            let block = &state.entries[&0x12345678].blocks[0];
            assert_ne!(block.data.as_deref().unwrap(), [0xAA, 0xBB, 0xCC, 0xDD]);
            assert!(block.compressed_size > 0);
            assert_eq!(block.uncompressed_size, 4);
        }
        let reloaded = Bundle::read(bundle.to_bytes().unwrap()).unwrap();
        assert!(reloaded.flags().contains(BundleFlags::COMPRESSED));
        assert_eq!(
            reloaded.get_binary(0x12345678, 0).unwrap().unwrap(),
            [0xAA, 0xBB, 0xCC, 0xDD]
        );
    }

    #[test]
    fn bnd2_imports_ride_block_zero_invisibly() {
        let bundle = empty_bnd2(BundleFlags::empty());
        let block0: Vec<u8> = (0u8..16).collect();
        let dep = Dependency {
            resource_id: 0xB,
            internal_offset: 0,
        };
        bundle
            .add_resource(0xB, &payload(&[1, 2, 3], 1), ResourceType::RASTER)
            .unwrap();
        bundle
            .add_resource(
                0xA,
                &EntryData {
                    file_block_data: [Some(block0.clone()), None, None],
                    alignments: [16, 1, 1],
                    dependencies: vec![dep],
                },
                ResourceType::MODEL,
            )
            .unwrap();
        let before = bundle.get_data(0xA).unwrap();
        assert_eq!(before.dependencies, [dep]);
        assert_eq!(before.file_block_data[0].as_deref().unwrap(), block0);
        let reloaded = Bundle::read(bundle.to_bytes().unwrap()).unwrap();
        let data = reloaded.get_data(0xA).unwrap();
        assert_eq!(data.file_block_data[0].as_deref().unwrap(), block0);
        assert_eq!(data.dependencies, [dep]);
    }

    #[test]
    fn unknown_magic_is_not_a_bundle() {
        assert!(matches!(Bundle::read(b"xxxx"), Err(BundleError::NotABundle)));
        assert!(matches!(Bundle::read(b"xx"), Err(BundleError::NotABundle)));
    }

    #[test]
    fn a_bad_bnd2_revision_is_rejected() {
        let mut cur = BundleCursor::new(Endian::Little);
        cur.write_bytes(b"bnd2").unwrap();
        cur.write_u32(1).unwrap();
        cur.write_u32(Platform::Pc.to_word()).unwrap();
        assert!(matches!(
            Bundle::read(cur.into_bytes()),
            Err(BundleError::UnsupportedRevision(1))
        ));
    }

    #[test]
    fn debug_info_round_trips_through_the_string_table() {
        let bundle = empty_bnd2(BundleFlags::empty());
        bundle
            .add_resource(0x12345678, &payload(&[1], 1), ResourceType::MODEL)
            .unwrap();
        bundle
            .add_debug_info(0x12345678, "hero.mesh", "Model")
            .unwrap();
        let bytes = bundle.to_bytes().unwrap();
        let needle = b"id=\"12345678\"";
        assert!(bytes.windows(needle.len()).any(|window| window == needle));
        let reloaded = Bundle::read(bytes).unwrap();
        assert!(reloaded
            .flags()
            .contains(BundleFlags::HAS_RESOURCE_STRING_TABLE));
        assert_eq!(
            reloaded.get_debug_info(0x12345678).unwrap(),
            DebugInfo {
                name: String::from("hero.mesh"),
                type_name: String::from("Model"),
            }
        );
    }

    #[test]
    fn bndl_archives_keep_debug_info_out_of_the_resource_map() {
        let bundle = empty_bndl(BundleFlags::empty());
        bundle
            .add_resource(0x100, &payload(&[1, 2, 3, 4], 4), ResourceType::RASTER)
            .unwrap();
        bundle
            .add_resource(0x200, &payload(&[5, 6], 1), ResourceType::LUA_CODE)
            .unwrap();
        bundle.add_debug_info(0x100, "wheel.dat", "Raster").unwrap();
        let reloaded = Bundle::read(bundle.to_bytes().unwrap()).unwrap();
        assert_eq!(reloaded.list_resource_ids(), [0x100, 0x200]);
        assert!(!reloaded.list_resource_ids().contains(&RST_RESOURCE_ID));
        assert_eq!(reloaded.get_debug_info(0x100).unwrap().name, "wheel.dat");
        assert!(reloaded
            .flags()
            .contains(BundleFlags::HAS_RESOURCE_STRING_TABLE));
        assert_eq!(bundle.list_resource_ids(), [0x100, 0x200]);
        assert_eq!(
            reloaded.get_binary(0x100, 0).unwrap().unwrap(),
            [1, 2, 3, 4]
        );
    }

    #[test]
    fn bndl_imports_round_trip_through_the_import_region() {
        let bundle = empty_bndl(BundleFlags::empty());
        bundle
            .add_resource(0x1, &payload(&[9; 8], 4), ResourceType::RASTER)
            .unwrap();
        let deps = vec![
            Dependency {
                resource_id: 0x1,
                internal_offset: 0x10,
            },
            Dependency {
                resource_id: 0x1,
                internal_offset: 0x20,
            },
        ];
        bundle
            .add_resource(
                0x2,
                &EntryData {
                    file_block_data: [Some(vec![7; 12]), Some(vec![8; 6]), None],
                    alignments: [4, 16, 1],
                    dependencies: deps.clone(),
                },
                ResourceType::MODEL,
            )
            .unwrap();
        let reloaded = Bundle::read(bundle.to_bytes().unwrap()).unwrap();
        let data = reloaded.get_data(0x2).unwrap();
        assert_eq!(data.dependencies, deps);
        assert_eq!(data.file_block_data[0].as_deref().unwrap(), [7; 12]);
        assert_eq!(data.file_block_data[1].as_deref().unwrap(), [8; 6]);
        assert_eq!(data.file_block_data[2], None);
    }

    #[test]
    fn compressed_bndl_archives_round_trip() {
        let bundle = empty_bndl(BundleFlags::COMPRESSED);
        let big: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        bundle
            .add_resource(
                0x42,
                &EntryData {
                    file_block_data: [Some(big.clone()), Some(vec![3; 64]), None],
                    alignments: [16, 128, 1],
                    dependencies: vec![],
                },
                ResourceType::RASTER,
            )
            .unwrap();
        let reloaded = Bundle::read(bundle.to_bytes().unwrap()).unwrap();
        assert_eq!(reloaded.get_binary(0x42, 0).unwrap().unwrap(), big);
        assert_eq!(reloaded.get_binary(0x42, 1).unwrap().unwrap(), vec![3; 64]);
        let data = reloaded.get_data(0x42).unwrap();
        assert_eq!(data.alignments[0], 16);
        assert_eq!(data.alignments[1], 128);
    }

    #[test]
    fn bnd2_archives_round_trip_semantically() {
        for flags in [
            BundleFlags::empty(),
            BundleFlags::COMPRESSED,
            BundleFlags::UNUSED_1 | BundleFlags::UNUSED_2,
        ] {
            let bundle = empty_bnd2(flags);
            bundle
                .add_resource(
                    0x10,
                    &EntryData {
                        file_block_data: [
                            Some(vec![1; 48]),
                            Some(vec![2; 200]),
                            Some(vec![3; 7]),
                        ],
                        alignments: [16, 128, 4],
                        dependencies: vec![],
                    },
                    ResourceType::RASTER,
                )
                .unwrap();
            bundle
                .add_resource(
                    0x20,
                    &EntryData {
                        file_block_data: [None, Some(vec![9; 31]), None],
                        alignments: [1, 64, 1],
                        dependencies: vec![],
                    },
                    ResourceType::SHADER,
                )
                .unwrap();
            bundle
                .add_resource(0x30, &payload(b"hello bundle", 4), ResourceType::TEXT_FILE)
                .unwrap();
            let first = Bundle::read(bundle.to_bytes().unwrap()).unwrap();
            let second = Bundle::read(first.to_bytes().unwrap()).unwrap();
            assert_eq!(second.list_resource_ids(), [0x10, 0x20, 0x30]);
            assert_eq!(second.flags(), first.flags());
            for id in [0x10, 0x20, 0x30] {
                for block in 0..3 {
                    assert_eq!(
                        first.get_binary(id, block).unwrap(),
                        second.get_binary(id, block).unwrap()
                    );
                }
                assert_eq!(
                    first.get_resource_type(id).unwrap(),
                    second.get_resource_type(id).unwrap()
                );
            }
        }
    }

    #[test]
    fn big_endian_console_bnd2_archives_load() {
        let mut cur = BundleCursor::new(Endian::Big);
        cur.write_bytes(b"bnd2").unwrap();
        cur.write_u32(2).unwrap();
        cur.write_u32(Platform::Xbox360.to_word()).unwrap();
        cur.write_u32(0).unwrap(); // string table offset
        cur.write_u32(1).unwrap();
        cur.write_u32(48).unwrap(); // descriptors follow the header
        cur.write_u32(112).unwrap(); // block 0 follows the descriptor
        cur.write_u32(0).unwrap();
        cur.write_u32(0).unwrap();
        cur.write_u32(0).unwrap(); // flags
        cur.align(16).unwrap();
        cur.write_u64(0xCAFE).unwrap();
        cur.write_u64(0).unwrap();
        cur.write_u32(pack_size_align(4, 4)).unwrap();
        cur.write_u32(0).unwrap();
        cur.write_u32(0).unwrap();
        for _ in 0..6 {
            cur.write_u32(0).unwrap(); // compressed sizes, data offsets
        }
        cur.write_u32(0).unwrap(); // import offset
        cur.write_u32(ResourceType::TEXT_FILE.0).unwrap();
        cur.write_u16(0).unwrap();
        cur.write_u16(0).unwrap();
        cur.write_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        let bundle = Bundle::read(cur.into_bytes()).unwrap();
        assert_eq!(bundle.platform(), Platform::Xbox360);
        assert_eq!(
            bundle.get_binary(0xCAFE, 0).unwrap().unwrap(),
            [0xDE, 0xAD, 0xBE, 0xEF]
        );
    }

    #[test]
    fn a_bndl_archive_for_an_unknown_platform_is_rejected() {
        let mut cur = BundleCursor::new(Endian::Big);
        cur.write_bytes(b"bndl").unwrap();
        cur.write_u32(5).unwrap();
        cur.write_u32(0).unwrap();
        for _ in 0..5 {
            cur.write_u32(0).unwrap();
            cur.write_u32(1).unwrap();
        }
        for _ in 0..5 {
            cur.write_u32(0).unwrap();
        }
        for _ in 0..4 {
            cur.write_u32(0).unwrap();
        }
        cur.write_u32(7).unwrap(); // platform
        for _ in 0..5 {
            cur.write_u32(0).unwrap();
        }
        assert!(matches!(
            Bundle::read(cur.into_bytes()),
            Err(BundleError::UnsupportedPlatform(7))
        ));
    }

    #[test]
    fn duplicate_unknown_and_oversized_operations_fail() {
        let bundle = empty_bnd2(BundleFlags::empty());
        bundle
            .add_resource(1, &payload(&[1], 1), ResourceType::RASTER)
            .unwrap();
        assert!(matches!(
            bundle.add_resource(1, &payload(&[1], 1), ResourceType::RASTER),
            Err(BundleError::DuplicateResource(1))
        ));
        assert!(matches!(
            bundle.replace_resource(2, &payload(&[1], 1)),
            Err(BundleError::UnknownResource(2))
        ));
        assert!(matches!(
            bundle.get_data(2),
            Err(BundleError::UnknownResource(2))
        ));
        assert!(matches!(
            bundle.get_binary(2, 0),
            Err(BundleError::UnknownResource(2))
        ));
        let too_many = EntryData {
            file_block_data: [Some(vec![0; 4]), None, None],
            alignments: [1, 1, 1],
            dependencies: vec![Dependency::default(); 0x10000],
        };
        assert!(matches!(
            bundle.replace_resource(1, &too_many),
            Err(BundleError::TooManyDependencies(0x10000))
        ));
        assert!(matches!(
            bundle.add_resource(0, &payload(&[1], 1), ResourceType::RASTER),
            Err(BundleError::MalformedArchive(_))
        ));
    }

    #[test]
    fn replacing_a_resource_swaps_its_payload() {
        let bundle = empty_bnd2(BundleFlags::empty());
        bundle
            .add_resource(5, &payload(&[1, 2], 2), ResourceType::RASTER)
            .unwrap();
        bundle.replace_resource(5, &payload(&[9, 9, 9], 4)).unwrap();
        let data = bundle.get_data(5).unwrap();
        assert_eq!(data.file_block_data[0].as_deref().unwrap(), [9, 9, 9]);
        assert_eq!(data.alignments[0], 4);
        assert_eq!(bundle.get_resource_type(5).unwrap(), ResourceType::RASTER);
    }

    #[test]
    fn ids_are_listed_in_ascending_order_per_type() {
        let bundle = empty_bnd2(BundleFlags::empty());
        for (id, resource_type) in [
            (3, ResourceType::RASTER),
            (1, ResourceType::MODEL),
            (2, ResourceType::RASTER),
        ] {
            bundle
                .add_resource(id, &payload(&[0], 1), resource_type)
                .unwrap();
        }
        assert_eq!(bundle.list_resource_ids(), [1, 2, 3]);
        let by_type = bundle.list_resource_ids_by_type();
        assert_eq!(by_type[&ResourceType::RASTER], [2, 3]);
        assert_eq!(by_type[&ResourceType::MODEL], [1]);
    }

    #[test]
    fn the_string_table_flag_tracks_table_contents() {
        let bundle = empty_bnd2(BundleFlags::HAS_RESOURCE_STRING_TABLE);
        bundle
            .add_resource(1, &payload(&[1], 1), ResourceType::RASTER)
            .unwrap();
        let reloaded = Bundle::read(bundle.to_bytes().unwrap()).unwrap();
        assert!(!reloaded
            .flags()
            .contains(BundleFlags::HAS_RESOURCE_STRING_TABLE));
        assert!(reloaded.get_debug_info(1).is_none());
    }

    #[test]
    fn constructing_with_a_bad_revision_fails() {
        assert!(matches!(
            Bundle::new(MagicVersion::Bnd2, 3, Platform::Pc, BundleFlags::empty()),
            Err(BundleError::UnsupportedRevision(3))
        ));
        assert!(matches!(
            Bundle::new(
                MagicVersion::Bndl,
                2,
                Platform::Xbox360,
                BundleFlags::empty()
            ),
            Err(BundleError::UnsupportedRevision(2))
        ));
    }

    #[test]
    fn bnd2_archives_only_save_for_pc() {
        let bundle =
            Bundle::new(MagicVersion::Bnd2, 2, Platform::Ps3, BundleFlags::empty()).unwrap();
        assert!(matches!(
            bundle.to_bytes(),
            Err(BundleError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn resources_resolve_by_hashed_name() {
        let bundle = empty_bnd2(BundleFlags::empty());
        bundle
            .add_resource_by_name("Menu/Hud.font", &payload(&[4, 5, 6], 1), ResourceType::FONT)
            .unwrap();
        assert_eq!(
            bundle
                .get_binary_by_name("menu/hud.FONT", 0)
                .unwrap()
                .unwrap(),
            [4, 5, 6]
        );
        assert_eq!(
            bundle.list_resource_ids(),
            [hash_resource_name("menu/hud.font")]
        );
    }
}

