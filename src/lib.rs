//! Reader and writer for the two revisions of the game engine's resource
//! bundle container: the big-endian console `bndl` layout (revisions 3-5)
//! and the current `bnd2` layout (revision 2).
//!
//! ```no_run
//! use bundle_tool::Bundle;
//! let data = std::fs::read("vehicles.bundle").unwrap();
//! let bundle = Bundle::read(&data).unwrap();
//! for id in bundle.list_resource_ids() {
//!     println!("{:08x}: {:?}", id, bundle.get_resource_type(id).unwrap());
//! }
//! ```

mod bnd2;
mod bndl;
pub mod bundle;
pub mod cursor;
pub mod enums;
pub mod error;
pub mod hash;
mod string_table;
pub mod types;
pub mod util;

pub use binrw;

pub use bundle::{Bundle, DebugInfo, Entry, EntryData, FileBlock};
pub use cursor::{BundleCursor, Mark, SeekTask};
pub use enums::{BundleFlags, MagicVersion, Platform, ResourceType};
pub use error::{BundleError, Result};
pub use hash::hash_resource_name;
pub use types::Dependency;
