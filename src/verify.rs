//! SHA-256 checksum computation and verification.
//!
//! A digest wrapper with a parse/format pair, streamed off disk in fixed-size chunks rather
//! than loading the whole artifact into memory first.

// std
use std::{fmt, path::Path};
// crates.io
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
// self
use crate::{Error, Result};

const READ_CHUNK: usize = 64 * 1024;

/// The sole integrity primitive in the core: `sha256:<lowercase hex>`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
	algorithm: String,
	hex: String,
}
impl Checksum {
	/// Parses `"<algo>:<hex>"`, or bare hex defaulting to `sha256`.
	pub fn parse(input: &str) -> Result<Self> {
		let trimmed = input.trim();

		if trimmed.is_empty() {
			return Err(Error::Validation { field: "checksum", reason: "Must not be empty.".into() });
		}

		let (algorithm, hex) = match trimmed.split_once(':') {
			Some((algo, hex)) => (algo.to_ascii_lowercase(), hex.to_ascii_lowercase()),
			None => ("sha256".to_string(), trimmed.to_ascii_lowercase()),
		};

		if algorithm != "sha256" {
			return Err(Error::UnsupportedChecksumAlgorithm(algorithm));
		}

		Ok(Self { algorithm, hex })
	}

	/// Builds a checksum directly from a known-good digest, skipping re-parsing.
	pub fn from_sha256_hex(hex: impl Into<String>) -> Self {
		Self { algorithm: "sha256".to_string(), hex: hex.into().to_ascii_lowercase() }
	}

	/// The lowercase hex digest, without the algorithm prefix.
	pub fn hex(&self) -> &str {
		&self.hex
	}
}
impl fmt::Display for Checksum {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.algorithm, self.hex)
	}
}
impl fmt::Debug for Checksum {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Checksum({self})")
	}
}
impl serde::Serialize for Checksum {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}
impl<'de> serde::Deserialize<'de> for Checksum {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;

		Self::parse(&raw).map_err(serde::de::Error::custom)
	}
}

/// Streams `path` through SHA-256 and returns the canonical `sha256:<hex>` checksum.
pub async fn compute(path: &Path) -> Result<Checksum> {
	let mut file = tokio::fs::File::open(path).await?;
	let mut hasher = Sha256::new();
	let mut buf = vec![0u8; READ_CHUNK];

	loop {
		let read = file.read(&mut buf).await?;

		if read == 0 {
			break;
		}

		hasher.update(&buf[..read]);
	}

	Ok(Checksum::from_sha256_hex(hex::encode(hasher.finalize())))
}

/// Hashes an in-memory buffer, used by the downloader on freshly fetched bytes before they are
/// written to the cache.
pub fn compute_bytes(bytes: &[u8]) -> Checksum {
	let digest = Sha256::digest(bytes);

	Checksum::from_sha256_hex(hex::encode(digest))
}

/// Verifies that the file at `path` matches `expected`.
pub async fn verify_file(path: &Path, expected: &Checksum) -> Result<bool> {
	let computed = compute(path).await?;

	Ok(computed.hex() == expected.hex())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_accepts_bare_hex_and_prefixed() {
		let bare = Checksum::parse("deadbeef").unwrap();
		let prefixed = Checksum::parse("sha256:DEADBEEF").unwrap();

		assert_eq!(bare.hex(), "deadbeef");
		assert_eq!(prefixed.hex(), "deadbeef");
		assert_eq!(prefixed.to_string(), "sha256:deadbeef");
	}

	#[test]
	fn parse_rejects_unsupported_algorithm() {
		let err = Checksum::parse("md5:abc123").unwrap_err();

		assert!(matches!(err, Error::UnsupportedChecksumAlgorithm(algo) if algo == "md5"));
	}

	#[test]
	fn compute_bytes_matches_known_vector() {
		// sha256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
		let checksum = compute_bytes(b"");

		assert_eq!(checksum.hex(), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
	}
}
