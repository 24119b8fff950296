use binrw::Endian;
use bitflags::bitflags;

/// Which of the two on-disk container layouts an archive uses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MagicVersion {
    /// Legacy big-endian console layout, revisions 3-5.
    Bndl,
    /// Current layout, revision 2.
    #[default]
    Bnd2,
}

impl MagicVersion {
    pub const fn magic(self) -> &'static [u8; 4] {
        match self {
            MagicVersion::Bndl => b"bndl",
            MagicVersion::Bnd2 => b"bnd2",
        }
    }
}

/// Platform tag stored in the archive header. Anything other than PC is
/// big-endian on disk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    #[default]
    Pc,
    Xbox360,
    Ps3,
}

impl Platform {
    pub const fn to_word(self) -> u32 {
        match self {
            Platform::Pc => 1,
            Platform::Xbox360 => 2 << 24,
            Platform::Ps3 => 3 << 24,
        }
    }

    /// The console platforms keep the tag in the high byte of the word.
    pub const fn from_word(word: u32) -> Option<Platform> {
        match word {
            1 => Some(Platform::Pc),
            _ => match word >> 24 {
                2 => Some(Platform::Xbox360),
                3 => Some(Platform::Ps3),
                _ => None,
            },
        }
    }

    pub const fn endian(self) -> Endian {
        match self {
            Platform::Pc => Endian::Little,
            _ => Endian::Big,
        }
    }
}

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct BundleFlags: u32 {
        const COMPRESSED = 1;
        // The next two bits are always set by the original producer and are
        // mirrored on write without being interpreted.
        const UNUSED_1 = 2;
        const UNUSED_2 = 4;
        const HAS_RESOURCE_STRING_TABLE = 8;
    }
}

/// Resource type tag. The codec treats it as opaque; the known IDs of the
/// original producer are provided for convenience.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceType(pub u32);

impl ResourceType {
    pub const RASTER: Self = Self(0x00);
    pub const MATERIAL: Self = Self(0x01);
    pub const TEXT_FILE: Self = Self(0x03);
    pub const VERTEX_DESC: Self = Self(0x0A);
    pub const MATERIAL_CRC32: Self = Self(0x0B);
    pub const RENDERABLE: Self = Self(0x0C);
    pub const MATERIAL_TECHNIQUE: Self = Self(0x0D);
    pub const TEXTURE_STATE: Self = Self(0x0E);
    pub const MATERIAL_STATE: Self = Self(0x0F);
    pub const SHADER_PROGRAM_BUFFER: Self = Self(0x12);
    pub const SHADER_PARAMETER: Self = Self(0x14);
    pub const DEBUG: Self = Self(0x16);
    pub const KD_TREE: Self = Self(0x17);
    pub const VOICE_HIERARCHY: Self = Self(0x18);
    pub const SNR: Self = Self(0x19);
    pub const INTERPRETER_DATA: Self = Self(0x1A);
    pub const ATTRIB_SYS_SCHEMA: Self = Self(0x1B);
    pub const ATTRIB_SYS_VAULT: Self = Self(0x1C);
    pub const ENTRY_LIST: Self = Self(0x1D);
    pub const APT_DATA_HEADER: Self = Self(0x1E);
    pub const GUI_POPUP: Self = Self(0x1F);
    pub const FONT: Self = Self(0x21);
    pub const LUA_CODE: Self = Self(0x22);
    pub const INSTANCE_LIST: Self = Self(0x23);
    pub const COLLISION_MESH_DATA: Self = Self(0x24);
    pub const ID_LIST: Self = Self(0x25);
    pub const INSTANCE_COLLISION_LIST: Self = Self(0x26);
    pub const LANGUAGE: Self = Self(0x27);
    pub const SAT_NAV_TILE: Self = Self(0x28);
    pub const SAT_NAV_TILE_DIRECTORY: Self = Self(0x29);
    pub const MODEL: Self = Self(0x2A);
    pub const RW_COLOUR_CUBE: Self = Self(0x2B);
    pub const HUD_MESSAGE: Self = Self(0x2C);
    pub const HUD_MESSAGE_LIST: Self = Self(0x2D);
    pub const HUD_MESSAGE_SEQUENCE: Self = Self(0x2E);
    pub const HUD_MESSAGE_SEQUENCE_DICTIONARY: Self = Self(0x2F);
    pub const WORLD_PAINTER_2D: Self = Self(0x30);
    pub const PFX_HOOK_BUNDLE: Self = Self(0x31);
    pub const SHADER: Self = Self(0x32);
    pub const ICE_TAKE_DICTIONARY: Self = Self(0x41);
    pub const VIDEO_DATA: Self = Self(0x42);
    pub const POLYGON_SOUP_LIST: Self = Self(0x43);
    pub const COMMS_TOOL_LIST_DEFINITION: Self = Self(0x45);
    pub const COMMS_TOOL_LIST: Self = Self(0x46);
    pub const BINARY_FILE: Self = Self(0x50);
    pub const ANIMATION_COLLECTION: Self = Self(0x51);
    pub const REGISTRY: Self = Self(0xA000);
    pub const GENERIC_RWAC_WAVE_CONTENT: Self = Self(0xA020);
    pub const GINSU_WAVE_CONTENT: Self = Self(0xA021);
    pub const AEMS_BANK: Self = Self(0xA022);
    pub const CSIS: Self = Self(0xA023);
    pub const NICOTINE: Self = Self(0xA024);
    pub const SPLICER: Self = Self(0xA025);
    pub const FREQ_CONTENT: Self = Self(0xA026);
    pub const VOICE_HIERARCHY_COLLECTION: Self = Self(0xA027);
    pub const GENERIC_RWAC_REVERB_IR_CONTENT: Self = Self(0xA028);
    pub const SNAPSHOT_DATA: Self = Self(0xA029);
    pub const ZONE_LIST: Self = Self(0xB000);
    pub const LOOP_MODEL: Self = Self(0x10000);
    pub const AI_SECTIONS: Self = Self(0x10001);
    pub const TRAFFIC_DATA: Self = Self(0x10002);
    pub const TRIGGER: Self = Self(0x10003);
    pub const DEFORMATION_MODEL: Self = Self(0x10004);
    pub const VEHICLE_LIST: Self = Self(0x10005);
    pub const GRAPHICS_SPEC: Self = Self(0x10006);
    pub const PHYSICS_SPEC: Self = Self(0x10007);
    pub const PARTICLE_DESCRIPTION_COLLECTION: Self = Self(0x10008);
    pub const WHEEL_LIST: Self = Self(0x10009);
    pub const WHEEL_GRAPHICS_SPEC: Self = Self(0x1000A);
    pub const TEXTURE_NAME_MAP: Self = Self(0x1000B);
    pub const ICE_LIST: Self = Self(0x1000C);
    pub const ICE_DATA: Self = Self(0x1000D);
    pub const PROGRESSION: Self = Self(0x1000E);
    pub const PROP_PHYSICS: Self = Self(0x1000F);
    pub const PROP_GRAPHICS_LIST: Self = Self(0x10010);
    pub const PROP_INSTANCE_DATA: Self = Self(0x10011);
    pub const ENVIRONMENT_KEYFRAME: Self = Self(0x10012);
    pub const ENVIRONMENT_TIME_LINE: Self = Self(0x10013);
    pub const ENVIRONMENT_DICTIONARY: Self = Self(0x10014);
    pub const GRAPHICS_STUB: Self = Self(0x10015);
    pub const STATIC_SOUND_MAP: Self = Self(0x10016);
    pub const STREET_DATA: Self = Self(0x10018);
    pub const VFX_MESH_COLLECTION: Self = Self(0x10019);
    pub const MASSIVE_LOOKUP_TABLE: Self = Self(0x1001A);
    pub const VFX_PROP_COLLECTION: Self = Self(0x1001B);
    pub const STREAMED_DEFORMATION_SPEC: Self = Self(0x1001C);
    pub const PARTICLE_DESCRIPTION: Self = Self(0x1001D);
    pub const PLAYER_CAR_COLOURS: Self = Self(0x1001E);
    pub const CHALLENGE_LIST: Self = Self(0x1001F);
    pub const FLAPT_FILE: Self = Self(0x10020);
    pub const PROFILE_UPGRADE: Self = Self(0x10021);
    pub const VEHICLE_ANIMATION: Self = Self(0x10023);
    pub const BODYPART_REMAPPING: Self = Self(0x10024);
    pub const LUA_LIST: Self = Self(0x10025);
    pub const LUA_SCRIPT: Self = Self(0x10026);
}

impl From<u32> for ResourceType {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<ResourceType> for u32 {
    fn from(value: ResourceType) -> Self {
        value.0
    }
}
