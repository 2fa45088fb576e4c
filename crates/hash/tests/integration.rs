//! Integration tests for hash crate

#[cfg(test)]
mod tests {
    use imgaudit_errors::{Error, IntegrityError, StorageError};
    use imgaudit_hash::*;
    use proptest::prelude::*;
    use tempfile::tempdir;
    use tokio::fs;

    #[tokio::test]
    async fn test_verify_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("gel_042.scn");

        let data = b"verify this content";
        fs::write(&file_path, data).await.unwrap();

        let hash = Hash::from_data(HashAlgorithm::Sha256, data);
        assert!(verify_file(&file_path, &hash).await.unwrap());

        let wrong_hash = Hash::from_data(HashAlgorithm::Sha256, b"different content");
        assert!(!verify_file(&file_path, &wrong_hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_repeated_hashing_is_stable() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("blot.scn");
        fs::write(&file_path, vec![7u8; 200_000]).await.unwrap();

        let first = Hash::hash_file(&file_path, HashAlgorithm::Sha256).await.unwrap();
        let second = Hash::hash_file(&file_path, HashAlgorithm::Sha256).await.unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[tokio::test]
    async fn test_missing_file_is_path_not_found() {
        let dir = tempdir().unwrap();
        let err = Hash::hash_file(&dir.path().join("absent.scn"), HashAlgorithm::Sha256)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::PathNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_directory_is_rejected() {
        let dir = tempdir().unwrap();
        let err = Hash::hash_file(dir.path(), HashAlgorithm::Sha256)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::NotAFile { .. })));
    }

    #[test]
    fn test_hash_from_hex_errors() {
        // Too short
        let result = Hash::from_hex(HashAlgorithm::Sha256, "1234");
        assert!(matches!(
            result,
            Err(Error::Integrity(IntegrityError::InvalidDigest { .. }))
        ));

        // Too long
        let result = Hash::from_hex(HashAlgorithm::Sha256, &"a".repeat(66));
        assert!(result.is_err());

        // Invalid hex
        let result = Hash::from_hex(HashAlgorithm::Blake3, "xyz123");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_with_and_without_algorithm_tag() {
        let hash = Hash::from_data(HashAlgorithm::Sha256, b"gel");
        let bare: Hash = hash.to_hex().parse().unwrap();
        assert_eq!(bare, hash);

        let tagged: Hash = format!("blake3:{}", hash.to_hex()).parse().unwrap();
        assert_eq!(tagged.algorithm(), HashAlgorithm::Blake3);
        assert_ne!(tagged, hash);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        // Streaming across chunk boundaries must agree with one-shot hashing.
        #[test]
        fn streamed_digest_matches_in_memory(data in proptest::collection::vec(any::<u8>(), 0..200_000)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
                let (streamed, size) = rt
                    .block_on(Hash::hash_reader(algorithm, std::io::Cursor::new(data.clone())))
                    .unwrap();
                prop_assert_eq!(size, data.len() as u64);
                prop_assert_eq!(streamed, Hash::from_data(algorithm, &data));
            }
        }
    }
}
