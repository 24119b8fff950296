use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{BundleError, Result};

/// Deflate a file block at maximum compression, as the original producer does.
pub fn compress<A: AsRef<[u8]>>(src: A) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(src.as_ref())
        .map_err(|e| BundleError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| BundleError::Compression(e.to_string()))
}

/// Inflate a file block. The declared uncompressed size must survive the
/// round-trip exactly.
pub fn decompress<A: AsRef<[u8]>>(src: A, uncompressed_size: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(src.as_ref());
    let mut out = Vec::with_capacity(uncompressed_size);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| BundleError::Compression(e.to_string()))?;
    if out.len() != uncompressed_size {
        return Err(BundleError::MalformedArchive(format!(
            "block inflated to {} bytes where {} were declared",
            out.len(),
            uncompressed_size
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_survive_a_compression_round_trip() {
        let data: Vec<u8> = (0..255u8).cycle().take(4096).collect();
        let packed = compress(&data).unwrap();
        assert_ne!(packed, data);
        assert_eq!(decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn a_wrong_declared_size_is_rejected() {
        let packed = compress([1u8, 2, 3, 4]).unwrap();
        assert!(matches!(
            decompress(&packed, 5),
            Err(BundleError::MalformedArchive(_))
        ));
    }

    #[test]
    fn garbage_does_not_inflate() {
        assert!(matches!(
            decompress([0xFFu8; 16], 4),
            Err(BundleError::Compression(_))
        ));
    }
}
