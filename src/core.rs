use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BundleError;

/// A 32-byte BLAKE3 hash used as the fingerprint of a bundle.
///
/// The hex form is used verbatim as the artifact file stem inside the cache
/// directory, so two groups with the same ordered `(handle, version)` pairs
/// always map to the same file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash32([u8; 32]);

impl<T> From<T> for Hash32
where
    T: Into<[u8; 32]>,
{
    fn from(value: T) -> Self {
        Hash32(value.into())
    }
}

impl Hash32 {
    pub fn to_hex(self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut acc = String::with_capacity(64);

        for &byte in &self.0 {
            acc.push(HEX[(byte >> 4) as usize] as char);
            acc.push(HEX[(byte & 0xF) as usize] as char);
        }

        acc
    }

    /// Whether `stem` looks like the hex form of a [`Hash32`].
    pub(crate) fn is_hex(stem: &str) -> bool {
        stem.len() == 64 && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl std::fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

impl Display for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Incremental builder for a [`Hash32`] over a sequence of fields.
///
/// Every field is length-prefixed, so `("ab", "c")` and `("a", "bc")` never
/// collide.
#[derive(Default)]
pub(crate) struct Blake3Hasher(blake3::Hasher);

impl Blake3Hasher {
    pub(crate) fn field(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.update(&(bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
        self
    }

    pub(crate) fn optional(&mut self, bytes: Option<&[u8]>) -> &mut Self {
        match bytes {
            Some(bytes) => {
                self.0.update(&[1]);
                self.field(bytes)
            }
            None => {
                self.0.update(&[0]);
                self
            }
        }
    }
}

impl From<Blake3Hasher> for Hash32 {
    fn from(value: Blake3Hasher) -> Self {
        let bytes: [u8; 32] = value.0.finalize().into();
        Hash32::from(bytes)
    }
}

/// The family of assets a dependency graph holds.
///
/// A graph either holds scripts or styles, never both. Everything that differs
/// between the two families lives here as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Script,
    Style,
}

impl AssetKind {
    /// File extension of cached artifacts.
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Script => "js",
            AssetKind::Style => "css",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            AssetKind::Script => "text/javascript",
            AssetKind::Style => "text/css",
        }
    }

    /// Name of the family, used inside bundle handles.
    pub fn family(self) -> &'static str {
        match self {
            AssetKind::Script => "scripts",
            AssetKind::Style => "styles",
        }
    }
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.family())
    }
}

impl FromStr for AssetKind {
    type Err = BundleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scripts" | "script" | "WP_Scripts" => Ok(AssetKind::Script),
            "styles" | "style" | "WP_Styles" => Ok(AssetKind::Style),
            other => Err(BundleError::UnsupportedGraph(other.to_string())),
        }
    }
}

/// Render position bucket. Each group is fingerprinted and bundled on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Group(pub u32);

impl Group {
    /// Emitted inside `<head>`.
    pub const HEADER: Group = Group(0);
    /// Emitted before `</body>`.
    pub const FOOTER: Group = Group(1);
}

impl Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
