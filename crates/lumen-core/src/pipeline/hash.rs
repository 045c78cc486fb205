//! Content hashing for change detection and cache-busting file names.

use blake3::Hasher as Blake3Hasher;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Hex characters of the BLAKE3 digest kept as an image's content hash.
pub const CONTENT_HASH_LEN: usize = 16;

/// Short BLAKE3 fingerprints of file contents.
pub struct Hasher;

impl Hasher {
    /// Hash a file's contents without holding it all in memory.
    pub async fn content_hash(path: &Path) -> std::io::Result<String> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = Blake3Hasher::new();

        let mut buffer = vec![0u8; 65536];
        loop {
            let bytes_read = file.read(&mut buffer).await?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self::truncate(hasher.finalize()))
    }

    /// Hash an in-memory byte buffer.
    ///
    /// Used when the file has already been read for decoding.
    pub fn content_hash_from_bytes(data: &[u8]) -> String {
        Self::truncate(blake3::hash(data))
    }

    fn truncate(hash: blake3::Hash) -> String {
        let mut hex = hash.to_hex().to_string();
        hex.truncate(CONTENT_HASH_LEN);
        hex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_from_bytes_is_short_and_stable() {
        let h1 = Hasher::content_hash_from_bytes(b"hello world");
        let h2 = Hasher::content_hash_from_bytes(b"hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), CONTENT_HASH_LEN);
        assert_ne!(h1, Hasher::content_hash_from_bytes(b"hello world!"));
    }

    #[tokio::test]
    async fn test_file_hash_matches_bytes_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let from_file = Hasher::content_hash(&path).await.unwrap();
        assert_eq!(from_file, Hasher::content_hash_from_bytes(&data));
    }

    #[tokio::test]
    async fn test_missing_file_errors() {
        let result = Hasher::content_hash(Path::new("/nonexistent/file.png")).await;
        assert!(result.is_err());
    }
}
