//! Per-file-type primary-key digests.

use std::collections::HashMap;

/// One distinct primary-key tuple seen during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub tuple: Vec<String>,
    /// Set once any child row's foreign key matched this tuple.
    pub referenced: bool,
    /// Occurrences after the first.
    pub duplicates: u32,
    /// Shard (within the file type) holding the first occurrence.
    pub shard: usize,
}

/// Outcome of [`Digest::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    New(usize),
    Duplicate(usize),
}

/// Primary-key tuples of one file type, in first-seen order.
///
/// Entries are addressed by position, which stays stable for the life of
/// the digest.
#[derive(Debug, Clone, Default)]
pub struct Digest {
    index: HashMap<Vec<String>, usize>,
    entries: Vec<DigestEntry>,
}

impl Digest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a tuple as unreferenced. An existing entry is left untouched
    /// apart from its duplicate counter.
    pub fn insert(&mut self, tuple: &[String], shard: usize) -> Insertion {
        if let Some(&position) = self.index.get(tuple) {
            self.entries[position].duplicates += 1;
            return Insertion::Duplicate(position);
        }
        let position = self.entries.len();
        self.index.insert(tuple.to_vec(), position);
        self.entries.push(DigestEntry {
            tuple: tuple.to_vec(),
            referenced: false,
            duplicates: 0,
            shard,
        });
        Insertion::New(position)
    }

    pub fn position(&self, tuple: &[String]) -> Option<usize> {
        self.index.get(tuple).copied()
    }

    pub fn contains(&self, tuple: &[String]) -> bool {
        self.index.contains_key(tuple)
    }

    /// Mark a tuple as referenced, returning its position if present.
    pub fn mark_referenced(&mut self, tuple: &[String]) -> Option<usize> {
        let position = self.position(tuple)?;
        self.entries[position].referenced = true;
        Some(position)
    }

    pub fn entries(&self) -> &[DigestEntry] {
        &self.entries
    }

    pub fn entry(&self, position: usize) -> Option<&DigestEntry> {
        self.entries.get(position)
    }

    pub fn duplicate_count(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| u64::from(entry.duplicates))
            .sum()
    }

    pub fn unreferenced(&self) -> impl Iterator<Item = &DigestEntry> + '_ {
        self.entries.iter().filter(|entry| !entry.referenced)
    }
}
