//! Content digests for integrity verification and deduplication.
//!
//! Digests are blake3-256 in lowercase hex. They identify file content for
//! re-upload detection and release deduplication; tamper resistance against
//! credentialed uploaders is explicitly not a goal, so a fast hash is the
//! right trade-off.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

/// Length of a hex-encoded digest (blake3-256).
pub const DIGEST_HEX_LEN: usize = 64;

/// A content digest in lowercase hex form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Parse a digest from its hex form. Uppercase input is normalized.
    pub fn from_hex(s: &str) -> AppResult<Self> {
        if s.len() != DIGEST_HEX_LEN || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::validation(format!(
                "invalid digest: expected {DIGEST_HEX_LEN} hex characters"
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Return the digest as its hex string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Digest {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<blake3::Hash> for Digest {
    fn from(hash: blake3::Hash) -> Self {
        Self(hash.to_hex().to_string())
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::Postgres> for Digest {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "sqlx")]
impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Digest {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Digest {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <String as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Digest::from_hex(&raw).map_err(Into::into)
    }
}

/// Streaming digest computation.
///
/// Feed chunks with [`Hasher::update`] as they arrive; [`Hasher::finalize`]
/// may be called without consuming the hasher so a shared hasher can be
/// finalized after a stream has been drained.
pub struct Hasher(blake3::Hasher);

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hasher").finish()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a new streaming hasher.
    pub fn new() -> Self {
        Self(blake3::Hasher::new())
    }

    /// Absorb a chunk of input.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Compute the digest of everything absorbed so far.
    pub fn finalize(&self) -> Digest {
        Digest::from(self.0.finalize())
    }
}

/// Compute the digest of an in-memory buffer.
pub fn digest_bytes(data: &[u8]) -> Digest {
    Digest::from(blake3::hash(data))
}

/// Check an in-memory buffer against an expected digest.
pub fn verify(data: &[u8], expected: &Digest) -> bool {
    digest_bytes(data) == *expected
}

/// Compute the identity digest of a release's declared file set.
///
/// The `(name, digest)` pairs are framed as `name NUL digest LF` in sorted
/// name order (the `BTreeMap` iteration order), which makes the result
/// deterministic across processes and unambiguous for names that are
/// prefixes of one another.
pub fn batch_digest(files: &BTreeMap<String, Digest>) -> Digest {
    let mut hasher = Hasher::new();
    for (name, digest) in files {
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
        hasher.update(digest.as_str().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize()
}
