use flate2::Crc;

/// Resource ID derived from a resource name: CRC-32 (zlib polynomial) of the
/// ASCII-lowercased name, no terminator.
pub fn hash_resource_name<A: AsRef<str>>(name: A) -> u32 {
    let lowered = name.as_ref().to_ascii_lowercase();
    let mut crc = Crc::new();
    crc.update(lowered.as_bytes());
    crc.sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_case_insensitive() {
        let expected = hash_resource_name("foo.bin");
        assert_eq!(hash_resource_name("Foo.bin"), expected);
        assert_eq!(hash_resource_name("FOO.BIN"), expected);
    }

    #[test]
    fn different_names_hash_differently() {
        assert_ne!(
            hash_resource_name("hero.mesh"),
            hash_resource_name("hero.model")
        );
    }

    #[test]
    fn empty_name_hashes_to_zero() {
        assert_eq!(hash_resource_name(""), 0);
    }
}
