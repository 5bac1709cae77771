//! Deterministic hash-based declaration identity.
//!
//! [`DeclHash`] is a 64-bit hash computed from a declaration's qualified path.
//! Unlike arena indices, it is stable across repeated compilation of the same
//! source, which is what the naming service relies on when it has to invent
//! names for hoisted declarations:
//!
//! - Same path = same hash, whatever order declarations were added in
//! - Local declarations mix in their ordinal, so two `Local`s with the same
//!   name in different blocks of one function never collide
//! - Member and local segments use different domain markers, so `a.b` and
//!   a local `b` declared inside `a` hash differently
//!
//! # Examples
//!
//! ```
//! use declower_core::DeclHash;
//!
//! let pair = DeclHash::from_path(&["geometry", "Pair"]);
//! assert_eq!(pair, DeclHash::from_path(&["geometry", "Pair"]));
//!
//! let member = pair.member("swap");
//! let local = pair.local("swap", 0);
//! assert_ne!(member, local);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

use crate::QualifiedName;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant for path components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for package paths.
    pub const PACKAGE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for member segments.
    pub const MEMBER: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for local segments.
    pub const LOCAL: u64 = 0x9a7f3d5e2b8c4601;

    /// Ordinal mixing constants for local declarations.
    ///
    /// Each ordinal gets its own constant; ordinals past the table wrap onto
    /// the first marker plus the ordinal.
    pub const ORDINAL_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit hash identifying a declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DeclHash(pub u64);

impl DeclHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: DeclHash = DeclHash(0);

    /// Hash a package-level path (package segments followed by the simple name).
    #[inline]
    pub fn from_path(segments: &[&str]) -> Self {
        let mut hash = hash_constants::PACKAGE;
        for segment in segments {
            hash = hash
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(xxh64(segment.as_bytes(), 0));
        }
        DeclHash(hash)
    }

    /// Hash a qualified name as a package-level path.
    pub fn from_qualified(name: &QualifiedName) -> Self {
        let mut segments: Vec<&str> = name.namespace.iter().map(String::as_str).collect();
        segments.push(&name.name);
        Self::from_path(&segments)
    }

    /// Hash of a member declared directly inside this declaration.
    #[inline]
    pub fn member(self, name: &str) -> Self {
        DeclHash(
            self.0.wrapping_mul(hash_constants::SEP)
                ^ hash_constants::MEMBER
                ^ xxh64(name.as_bytes(), 0),
        )
    }

    /// Hash of a local declaration inside this declaration's body.
    ///
    /// `ordinal` counts earlier locals of the same name in the same body.
    #[inline]
    pub fn local(self, name: &str, ordinal: usize) -> Self {
        let marker = hash_constants::ORDINAL_MARKERS
            .get(ordinal)
            .copied()
            .unwrap_or_else(|| hash_constants::ORDINAL_MARKERS[0].wrapping_add(ordinal as u64));
        DeclHash(
            self.0.wrapping_mul(hash_constants::SEP)
                ^ hash_constants::LOCAL
                ^ xxh64(name.as_bytes(), marker),
        )
    }

    /// Check if this is the empty hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the raw u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Short hexadecimal suffix suitable for synthesized names.
    pub fn short(self) -> String {
        format!("{:08x}", (self.0 >> 32) as u32)
    }
}

impl fmt::Debug for DeclHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeclHash({:#018x})", self.0)
    }
}

impl fmt::Display for DeclHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_hash_determinism() {
        let a = DeclHash::from_path(&["pkg", "Pair"]);
        let b = DeclHash::from_path(&["pkg", "Pair"]);
        assert_eq!(a, b);
    }

    #[test]
    fn path_hash_segments_matter() {
        let a = DeclHash::from_path(&["pkg", "Pair"]);
        let b = DeclHash::from_path(&["pkgPair"]);
        let c = DeclHash::from_path(&["Pair", "pkg"]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn qualified_matches_path() {
        let name = QualifiedName::new("Pair", vec!["geometry".into()]);
        assert_eq!(
            DeclHash::from_qualified(&name),
            DeclHash::from_path(&["geometry", "Pair"])
        );
    }

    #[test]
    fn member_and_local_are_distinct() {
        let owner = DeclHash::from_path(&["C"]);
        assert_ne!(owner.member("m"), owner.local("m", 0));
    }

    #[test]
    fn local_ordinal_matters() {
        let owner = DeclHash::from_path(&["f"]);
        assert_ne!(owner.local("L", 0), owner.local("L", 1));
        assert_ne!(owner.local("L", 20), owner.local("L", 21));
    }

    #[test]
    fn empty_hash() {
        assert!(DeclHash::EMPTY.is_empty());
        assert!(!DeclHash::from_path(&["x"]).is_empty());
    }

    #[test]
    fn short_is_eight_hex_digits() {
        let short = DeclHash::from_path(&["x"]).short();
        assert_eq!(short.len(), 8);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
