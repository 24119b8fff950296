use std::io::{Read, Seek, Write};

use binrw::prelude::*;
use binrw::Endian;

/// The size word of a bnd2 descriptor carries the alignment exponent in its
/// high nibble.
pub fn pack_size_align(size: u32, alignment: u32) -> u32 {
    let alignment = alignment.max(1);
    debug_assert!(alignment.is_power_of_two());
    (size & 0x0FFF_FFFF) | (alignment.trailing_zeros() << 28)
}

pub const fn unpack_size(word: u32) -> u32 {
    word & 0x0FFF_FFFF
}

pub const fn unpack_align(word: u32) -> u32 {
    1 << (word >> 28)
}

/// A cross-resource import: which resource is referenced and where inside the
/// dependent's block 0 the engine patches its pointer.
///
/// On disk each record is 16 bytes: the ID widened to 64 bits, the offset,
/// and a trailing zero word.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub resource_id: u32,
    pub internal_offset: u32,
}

impl BinRead for Dependency {
    type Args<'a> = ();
    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        let wide = u64::read_options(reader, endian, ())?;
        if wide > u32::MAX as u64 {
            return Err(binrw::Error::AssertFail {
                pos: reader.stream_position()? - 8,
                message: format!("import ID {wide:#x} does not fit in 32 bits"),
            });
        }
        let internal_offset = u32::read_options(reader, endian, ())?;
        u32::read_options(reader, endian, ())?;
        Ok(Dependency {
            resource_id: wide as u32,
            internal_offset,
        })
    }
}

impl BinWrite for Dependency {
    type Args<'a> = ();
    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        (self.resource_id as u64).write_options(writer, endian, ())?;
        self.internal_offset.write_options(writer, endian, ())?;
        0u32.write_options(writer, endian, ())
    }
}

/// 64-byte bnd2 resource descriptor.
#[derive(Debug, Default, Clone, Copy, BinRead)]
pub struct Bnd2Descriptor {
    pub resource_id: u64,
    pub checksum: u64,
    pub packed_sizes: [u32; 3],
    pub compressed_sizes: [u32; 3],
    pub data_offsets: [u32; 3],
    pub dependencies_offset: u32,
    pub resource_type: u32,
    #[br(pad_after = 2)]
    pub number_of_dependencies: u16,
}

/// bndl header, everything after the magic. The 0x14 bytes before the offset
/// table hold runtime memory addresses and carry no archive information.
#[derive(Debug, Default, Clone, Copy, BinRead)]
pub struct BndlHeader {
    pub revision: u32,
    pub num_entries: u32,
    /// Five (size, alignment) pairs; only sizes 0 and 2 feed the block
    /// offset math.
    pub block_descriptors: [[u32; 2]; 5],
    #[br(pad_before = 0x14)]
    pub id_list_offset: u32,
    pub id_table_offset: u32,
    pub import_block_offset: u32,
    pub data_block_offset: u32,
    pub platform: u32,
    pub compressed: u32,
    pub num_entries_echo: u32,
    pub uncomp_info_offset: u32,
    pub main_memory_alignment: u32,
    pub graphics_memory_alignment: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::BundleCursor;

    #[test]
    fn size_and_alignment_pack_into_one_word() {
        for exponent in 0..=15u32 {
            let alignment = 1 << exponent;
            for size in [0u32, 1, 16, 0x0FFF_FFFF] {
                let word = pack_size_align(size, alignment);
                assert_eq!(unpack_size(word), size);
                assert_eq!(unpack_align(word), alignment);
            }
        }
    }

    #[test]
    fn zero_alignment_is_treated_as_one() {
        assert_eq!(unpack_align(pack_size_align(0, 0)), 1);
    }

    #[test]
    fn dependencies_are_sixteen_bytes_with_a_zero_tail() {
        let dep = Dependency {
            resource_id: 0xB0BCAFE,
            internal_offset: 0x40,
        };
        for endian in [Endian::Little, Endian::Big] {
            let mut cur = BundleCursor::new(endian);
            cur.write_type(&dep, endian).unwrap();
            let bytes = cur.into_bytes();
            assert_eq!(bytes.len(), 16);
            assert_eq!(&bytes[12..], [0, 0, 0, 0]);
            let mut cur = BundleCursor::from_vec(bytes, endian);
            let back: Dependency = cur.read_type(endian).unwrap();
            assert_eq!(back, dep);
        }
    }

    #[test]
    fn an_oversized_import_id_is_rejected() {
        let mut cur = BundleCursor::new(Endian::Little);
        cur.write_u64(0x1_0000_0000).unwrap();
        cur.write_u32(0).unwrap();
        cur.write_u32(0).unwrap();
        let mut cur = BundleCursor::from_vec(cur.into_bytes(), Endian::Little);
        assert!(cur.read_type::<Dependency>(Endian::Little).is_err());
    }
}
