// transitcard-rs/transitcard/src/keys.rs

//! MIFARE Classic key lookup.

use crate::types::{ClassicKey, ClassicSectorKey};
use std::collections::BTreeMap;

/// Source of per-sector keys for a card.
pub trait KeyRetriever {
    /// Key declared for `sector`, if any.
    fn key_for_sector(&self, sector: usize) -> Option<ClassicSectorKey>;

    /// Every known key with the sector it was declared for, in priority order.
    fn all_keys(&self) -> Vec<(usize, ClassicSectorKey)>;
}

/// No caller keys. Only the well-known keys will be tried.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeys;

impl KeyRetriever for NoKeys {
    fn key_for_sector(&self, _sector: usize) -> Option<ClassicSectorKey> {
        None
    }

    fn all_keys(&self) -> Vec<(usize, ClassicSectorKey)> {
        Vec::new()
    }
}

/// In-memory key table, one key per sector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StaticKeys {
    keys: BTreeMap<usize, ClassicSectorKey>,
}

impl StaticKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_key(mut self, sector: usize, key: ClassicSectorKey) -> Self {
        self.insert(sector, key);
        self
    }

    pub fn insert(&mut self, sector: usize, key: ClassicSectorKey) {
        self.keys.insert(sector, key);
    }

    /// Same key for sectors `0..sector_count`.
    pub fn uniform(sector_count: usize, key: ClassicSectorKey) -> Self {
        Self {
            keys: (0..sector_count).map(|s| (s, key)).collect(),
        }
    }

    /// Parse `sector:type:hexkey` lines (`3:B:a0a1a2a3a4a5`). Blank lines and
    /// `#` comments are skipped.
    pub fn parse(text: &str) -> crate::Result<Self> {
        let mut keys = Self::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let bad = || crate::Error::UnsupportedOperation(format!("bad key line {}: {}", n + 1, line));
            let mut parts = line.split(':');
            let (Some(sector), Some(kind), Some(hex), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Err(bad());
            };
            let sector: usize = sector.trim().parse().map_err(|_| bad())?;
            let key = ClassicKey::from_hex(hex.trim())?;
            let key = match kind.trim() {
                "A" | "a" => ClassicSectorKey::key_a(key),
                "B" | "b" => ClassicSectorKey::key_b(key),
                _ => return Err(bad()),
            };
            keys.insert(sector, key);
        }
        Ok(keys)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyRetriever for StaticKeys {
    fn key_for_sector(&self, sector: usize) -> Option<ClassicSectorKey> {
        self.keys.get(&sector).copied()
    }

    fn all_keys(&self) -> Vec<(usize, ClassicSectorKey)> {
        self.keys.iter().map(|(s, k)| (*s, *k)).collect()
    }
}

/// Several retrievers queried in priority order.
#[derive(Default)]
pub struct MergedKeyRetriever<'a> {
    sources: Vec<&'a dyn KeyRetriever>,
}

impl<'a> MergedKeyRetriever<'a> {
    pub fn new(sources: Vec<&'a dyn KeyRetriever>) -> Self {
        Self { sources }
    }

    pub fn push(&mut self, source: &'a dyn KeyRetriever) {
        self.sources.push(source);
    }
}

impl KeyRetriever for MergedKeyRetriever<'_> {
    fn key_for_sector(&self, sector: usize) -> Option<ClassicSectorKey> {
        self.sources.iter().find_map(|s| s.key_for_sector(sector))
    }

    fn all_keys(&self) -> Vec<(usize, ClassicSectorKey)> {
        let mut out: Vec<(usize, ClassicSectorKey)> = Vec::new();
        for entry in self.sources.iter().flat_map(|s| s.all_keys()) {
            if !out.contains(&entry) {
                out.push(entry);
            }
        }
        out
    }
}
