use thiserror::Error;

/// All the ways loading, saving or editing a bundle can fail.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("not a bundle archive")]
    NotABundle,
    #[error("unsupported bundle revision {0}")]
    UnsupportedRevision(u32),
    #[error("unsupported platform {0:#x}")]
    UnsupportedPlatform(u32),
    #[error("malformed archive: {0}")]
    MalformedArchive(String),
    #[error("zlib error: {0}")]
    Compression(String),
    #[error("resource {0:#010x} already exists")]
    DuplicateResource(u32),
    #[error("no resource {0:#010x}")]
    UnknownResource(u32),
    #[error("{0} dependencies do not fit in a 16-bit count")]
    TooManyDependencies(usize),
}

impl From<binrw::Error> for BundleError {
    fn from(err: binrw::Error) -> Self {
        BundleError::MalformedArchive(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BundleError>;
