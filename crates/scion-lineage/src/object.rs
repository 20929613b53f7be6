//! Object identifiers.
//!
//! An [`ObjectId`] is a 128-bit UUID naming a single object instance (a part
//! or the root part of an object group) in a simulated region. Identifiers
//! are assigned by the host object model; the lineage registry only compares
//! and hashes them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ObjectId
// ---------------------------------------------------------------------------

/// A unique handle naming an object instance in the simulated world.
///
/// The text form is the canonical hyphenated UUID
/// (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// The empty identifier. Never tracked as a lineage root.
    pub const ZERO: ObjectId = ObjectId(Uuid::nil());

    /// Generate a fresh random (v4) identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct from a raw `u128`.
    #[inline]
    pub const fn from_u128(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }

    /// Raw `u128` representation.
    #[inline]
    pub const fn to_u128(self) -> u128 {
        self.0.as_u128()
    }

    /// Wrap an existing [`Uuid`].
    #[inline]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying [`Uuid`].
    #[inline]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns `true` for [`ObjectId::ZERO`].
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0.is_nil()
    }

    /// Parse an identifier from text.
    ///
    /// Surrounding whitespace is ignored. Hyphenated, simple (32 hex digits),
    /// braced and URN forms are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ParseObjectIdError`] if the text is not a UUID.
    pub fn parse(text: &str) -> Result<Self, ParseObjectIdError> {
        Uuid::parse_str(text.trim())
            .map(Self)
            .map_err(|source| ParseObjectIdError {
                text: text.to_owned(),
                source,
            })
    }
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for ObjectId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0.hyphenated())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

// ---------------------------------------------------------------------------
// ParseObjectIdError
// ---------------------------------------------------------------------------

/// Text could not be parsed as an [`ObjectId`].
#[derive(Debug, thiserror::Error)]
#[error("'{text}' is not a valid object id: {source}")]
pub struct ParseObjectIdError {
    /// The rejected input, verbatim.
    pub text: String,
    #[source]
    source: uuid::Error,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
