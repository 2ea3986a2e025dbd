// src/core/cache.rs

use log::debug;
use std::{fs, io, path::Path};

const HASH_TRUNCATE_LENGTH: usize = 16; // 16 bytes = 32 hex characters

/// Identity of a configuration file's contents.
///
/// Two files with equal fingerprints hold the same bytes, so the memoization
/// guard can accept them without parsing. Unequal fingerprints say nothing:
/// the files may still agree on every cache-relevant key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub file_size: u64,
    pub content_hash: String,
}

/// Calculates the fingerprint of the file at `path`.
///
/// # Errors
/// Returns an I/O error if the file cannot be read.
pub fn fingerprint(path: &Path) -> io::Result<Fingerprint> {
    let content = fs::read(path)?;
    let hash = blake3::hash(&content);
    let content_hash = hex::encode(hash.as_bytes().get(..HASH_TRUNCATE_LENGTH).unwrap_or_default());

    debug!(
        "Fingerprint for '{}': size={}, hash={}",
        path.display(),
        content.len(),
        content_hash
    );

    Ok(Fingerprint {
        file_size: u64::try_from(content.len()).unwrap_or(u64::MAX),
        content_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fingerprint_success() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"hello world").unwrap();
        temp_file.flush().unwrap();

        let data = fingerprint(temp_file.path()).unwrap();

        assert_eq!(data.file_size, 11);
        // blake3("hello world"), truncated to 16 bytes.
        assert_eq!(data.content_hash, "d74981efa70a0c880b8d8c1985d075db");
    }

    #[test]
    fn test_equal_content_gives_equal_fingerprints() {
        let mut a = NamedTempFile::new().unwrap();
        let mut b = NamedTempFile::new().unwrap();
        a.write_all(b"MemoDir = \"/m\"\n").unwrap();
        b.write_all(b"MemoDir = \"/m\"\n").unwrap();
        assert_eq!(fingerprint(a.path()).unwrap(), fingerprint(b.path()).unwrap());

        b.write_all(b"Threads = 2\n").unwrap();
        assert_ne!(fingerprint(a.path()).unwrap(), fingerprint(b.path()).unwrap());
    }

    #[test]
    fn test_fingerprint_file_not_found() {
        let result = fingerprint(Path::new("non_existent_file_for_test.tmp"));
        assert!(result.is_err());
    }
}
