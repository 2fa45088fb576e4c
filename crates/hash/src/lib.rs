#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Streaming content digests for imgaudit
//!
//! Files are read in bounded chunks and folded into a SHA-256 (default)
//! or BLAKE3 accumulator, so images of any size hash in constant memory.

use imgaudit_errors::{Error, IntegrityError, StorageError};
pub use imgaudit_types::HashAlgorithm;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Size of chunks for streaming hash computation
const CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// Number of hex characters shown in diagnostics
pub const DISPLAY_PREFIX_LEN: usize = 16;

/// A content digest tagged with the algorithm that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    algorithm: HashAlgorithm,
    bytes: [u8; 32],
}

enum Accumulator {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(chunk),
            Self::Blake3(h) => {
                h.update(chunk);
            }
        }
    }

    fn finalize(self) -> Hash {
        match self {
            Self::Sha256(h) => {
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&h.finalize());
                Hash::from_bytes(HashAlgorithm::Sha256, bytes)
            }
            Self::Blake3(h) => Hash::from_bytes(HashAlgorithm::Blake3, *h.finalize().as_bytes()),
        }
    }
}

impl Hash {
    /// Create a hash from raw bytes
    #[must_use]
    pub fn from_bytes(algorithm: HashAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Get the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// First `len` hex characters, for human-facing diagnostics
    #[must_use]
    pub fn prefix(&self, len: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(len);
        hex
    }

    /// Short form used in verification details: 16 hex characters and an ellipsis
    #[must_use]
    pub fn display_prefix(&self) -> String {
        format!("{}...", self.prefix(DISPLAY_PREFIX_LEN))
    }

    /// Parse from hex string produced by [`Hash::to_hex`]
    ///
    /// # Errors
    /// Returns an error if the input is not valid hexadecimal or does not
    /// decode to the algorithm's digest length.
    pub fn from_hex(algorithm: HashAlgorithm, s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|e| IntegrityError::InvalidDigest {
            message: format!("invalid hex: {e}"),
        })?;

        let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            IntegrityError::InvalidDigest {
                message: format!(
                    "{algorithm} digest must be {} bytes, got {}",
                    algorithm.digest_len(),
                    bytes.len()
                ),
            }
        })?;

        Ok(Self::from_bytes(algorithm, array))
    }

    /// Compute hash of a byte slice
    #[must_use]
    pub fn from_data(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        let mut acc = Accumulator::new(algorithm);
        acc.update(data);
        acc.finalize()
    }

    /// Hash everything a reader yields, returning the digest and byte count
    ///
    /// # Errors
    /// Returns an error if reading fails.
    pub async fn hash_reader<R>(algorithm: HashAlgorithm, mut reader: R) -> Result<(Self, u64), Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut acc = Accumulator::new(algorithm);
        let mut buffer = vec![0; CHUNK_SIZE];
        let mut total_bytes = 0u64;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            acc.update(&buffer[..n]);
            total_bytes += n as u64;
        }

        Ok((acc.finalize(), total_bytes))
    }

    /// Compute hash of a file together with the number of bytes read
    ///
    /// # Errors
    /// Returns an error if the path does not exist, is not a regular file,
    /// or cannot be read.
    pub async fn hash_file_with_size(
        path: &Path,
        algorithm: HashAlgorithm,
    ) -> Result<(Self, u64), Error> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, path))?;
        if !metadata.is_file() {
            return Err(StorageError::NotAFile {
                path: path.display().to_string(),
            }
            .into());
        }

        let file = File::open(path)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, path))?;

        Self::hash_reader(algorithm, file)
            .await
            .map_err(|e| match e {
                Error::Io { kind, message, .. } => Error::Io {
                    kind,
                    message,
                    path: Some(path.to_path_buf()),
                },
                other => other,
            })
    }

    /// Compute hash of a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, read, or is a directory.
    pub async fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<Self, Error> {
        Ok(Self::hash_file_with_size(path, algorithm).await?.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = Error;

    /// Accepts `algorithm:hex` or bare hex (taken as SHA-256)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((algorithm, hex)) => {
                let algorithm = algorithm
                    .parse::<HashAlgorithm>()
                    .map_err(|e| IntegrityError::InvalidDigest {
                        message: e.to_string(),
                    })?;
                Self::from_hex(algorithm, hex)
            }
            None => Self::from_hex(HashAlgorithm::default(), s),
        }
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("{}:{}", self.algorithm, self.to_hex()))
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Verify a file matches an expected hash, using the expected hash's algorithm
///
/// # Errors
/// Returns an error if the file cannot be read or hashed.
pub async fn verify_file(path: &Path, expected: &Hash) -> Result<bool, Error> {
    let actual = Hash::hash_file(path, expected.algorithm()).await?;
    Ok(actual == *expected)
}
