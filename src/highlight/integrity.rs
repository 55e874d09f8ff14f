//! Subresource-Integrity style checksums (`sha384-<base64>`)

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;

/// Digest algorithm of a checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    Sha256,
    #[default]
    Sha384,
    Sha512,
}

impl Algorithm {
    pub fn prefix(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        }
    }

    fn digest(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Algorithm::Sha256 => Sha256::digest(bytes).to_vec(),
            Algorithm::Sha384 => Sha384::digest(bytes).to_vec(),
            Algorithm::Sha512 => Sha512::digest(bytes).to_vec(),
        }
    }

    fn digest_len(self) -> usize {
        match self {
            Algorithm::Sha256 => 32,
            Algorithm::Sha384 => 48,
            Algorithm::Sha512 => 64,
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Algorithm::Sha256),
            "sha384" => Ok(Algorithm::Sha384),
            "sha512" => Ok(Algorithm::Sha512),
            other => Err(format!(
                "unsupported algorithm {:?} (expected sha256, sha384 or sha512)",
                other
            )),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A checksum: algorithm plus base64 digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integrity {
    pub algorithm: Algorithm,
    pub digest: String,
}

impl Integrity {
    /// Checksum of the given bytes
    pub fn compute(algorithm: Algorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            digest: STANDARD.encode(algorithm.digest(bytes)),
        }
    }

    /// Whether `bytes` hash to this checksum
    pub fn matches(&self, bytes: &[u8]) -> bool {
        Self::compute(self.algorithm, bytes) == *self
    }
}

impl FromStr for Integrity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (prefix, digest) = s
            .split_once('-')
            .ok_or_else(|| format!("expected `<algorithm>-<base64>`, got {:?}", s))?;
        let algorithm: Algorithm = prefix.parse()?;

        let raw = STANDARD
            .decode(digest)
            .map_err(|e| format!("digest is not valid base64: {}", e))?;
        if raw.len() != algorithm.digest_len() {
            return Err(format!(
                "{} digest must be {} bytes, got {}",
                algorithm,
                algorithm.digest_len(),
                raw.len()
            ));
        }

        Ok(Self {
            algorithm,
            digest: digest.to_string(),
        })
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.algorithm, self.digest)
    }
}
