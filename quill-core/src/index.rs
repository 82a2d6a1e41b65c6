//! Posting-list cursors and the index abstraction.
//!
//! `PostingCursor` is the read-only view the evaluators consume: a stateful
//! position over one term's postings with `next`/`next_geq` movement. The
//! on-disk compressed index lives elsewhere; `RamIndex` is the in-memory
//! implementation used by the serving shell and the tests.

use crate::{DocId, TermFreq, TermId};

// ── PostingCursor trait ──────────────────────────────────────────────────

/// Stateful position over one term's postings, sorted by doc-id.
///
/// Cursors start on the first posting. Once the list is consumed, `docid()`
/// returns the index's `num_docs` rather than a real document.
pub trait PostingCursor {
    /// Current doc-id, or `num_docs` when exhausted.
    fn docid(&self) -> DocId;

    /// Term frequency at the current posting. Only valid while not exhausted.
    fn freq(&self) -> TermFreq;

    /// Total number of postings in the list (the term's document frequency).
    fn size(&self) -> u64;

    /// Advance by one posting.
    fn next(&mut self);

    /// Advance to the smallest doc-id >= `target`. Idempotent when the
    /// cursor already satisfies the bound.
    fn next_geq(&mut self, target: DocId);
}

/// Read-only index surface: the total document count plus per-term cursors.
pub trait Index {
    type Cursor<'a>: PostingCursor
    where
        Self: 'a;

    fn num_docs(&self) -> u64;

    /// Cursor over `term`'s posting list, positioned on the first posting.
    /// Terms without postings yield an exhausted cursor.
    fn cursor(&self, term: TermId) -> Self::Cursor<'_>;
}

// ── RamIndex ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct PostingList {
    docs: Vec<DocId>,
    freqs: Vec<TermFreq>,
}

/// In-memory inverted index backed by sorted posting vectors.
#[derive(Debug, Clone)]
pub struct RamIndex {
    num_docs: u64,
    postings: Vec<PostingList>,
}

impl RamIndex {
    pub fn new(num_docs: u64) -> Self {
        Self {
            num_docs,
            postings: Vec::new(),
        }
    }

    /// Append a term's posting list and return its term-id. Postings must be
    /// strictly increasing in doc-id, with every doc-id below `num_docs`.
    pub fn push_term(&mut self, postings: &[(DocId, TermFreq)]) -> TermId {
        let mut docs = Vec::with_capacity(postings.len());
        let mut freqs = Vec::with_capacity(postings.len());
        for &(doc, freq) in postings {
            debug_assert!(doc < self.num_docs, "doc-id {doc} out of range");
            debug_assert!(
                docs.last().map_or(true, |&last| last < doc),
                "postings must be strictly increasing"
            );
            docs.push(doc);
            freqs.push(freq);
        }
        let term_id = self.postings.len() as TermId;
        self.postings.push(PostingList { docs, freqs });
        term_id
    }

    pub fn num_terms(&self) -> u32 {
        self.postings.len() as u32
    }

    /// Document frequency of `term` (0 for unknown terms).
    pub fn df(&self, term: TermId) -> u64 {
        self.postings
            .get(term as usize)
            .map_or(0, |p| p.docs.len() as u64)
    }

    /// Iterate `term`'s postings as `(doc-id, freq)` pairs.
    pub fn postings(&self, term: TermId) -> impl Iterator<Item = (DocId, TermFreq)> + '_ {
        let list = self.postings.get(term as usize);
        let docs = list.map_or(&[][..], |p| &p.docs);
        let freqs = list.map_or(&[][..], |p| &p.freqs);
        docs.iter().copied().zip(freqs.iter().copied())
    }
}

impl Index for RamIndex {
    type Cursor<'a> = RamCursor<'a>;

    fn num_docs(&self) -> u64 {
        self.num_docs
    }

    fn cursor(&self, term: TermId) -> RamCursor<'_> {
        let list = self.postings.get(term as usize);
        RamCursor {
            docs: list.map_or(&[][..], |p| &p.docs),
            freqs: list.map_or(&[][..], |p| &p.freqs),
            pos: 0,
            num_docs: self.num_docs,
        }
    }
}

/// Cursor over a `RamIndex` posting list. Binary search for `next_geq`.
pub struct RamCursor<'a> {
    docs: &'a [DocId],
    freqs: &'a [TermFreq],
    pos: usize,
    num_docs: u64,
}

impl PostingCursor for RamCursor<'_> {
    #[inline]
    fn docid(&self) -> DocId {
        self.docs.get(self.pos).copied().unwrap_or(self.num_docs)
    }

    #[inline]
    fn freq(&self) -> TermFreq {
        self.freqs.get(self.pos).copied().unwrap_or(0)
    }

    #[inline]
    fn size(&self) -> u64 {
        self.docs.len() as u64
    }

    #[inline]
    fn next(&mut self) {
        if self.pos < self.docs.len() {
            self.pos += 1;
        }
    }

    fn next_geq(&mut self, target: DocId) {
        if self.pos >= self.docs.len() || self.docs[self.pos] >= target {
            return;
        }
        let remaining = &self.docs[self.pos..];
        self.pos += match remaining.binary_search(&target) {
            Ok(offset) => offset,
            Err(offset) => offset,
        };
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(postings: &[(DocId, TermFreq)]) -> RamIndex {
        let mut index = RamIndex::new(100);
        index.push_term(postings);
        index
    }

    #[test]
    fn cursor_walk() {
        let index = index_with(&[(1, 2), (3, 1), (5, 4)]);
        let mut c = index.cursor(0);

        assert_eq!(c.size(), 3);
        assert_eq!(c.docid(), 1);
        assert_eq!(c.freq(), 2);
        c.next();
        assert_eq!(c.docid(), 3);
        assert_eq!(c.freq(), 1);
        c.next();
        assert_eq!(c.docid(), 5);
        c.next();
        assert_eq!(c.docid(), 100);
    }

    #[test]
    fn cursor_next_geq() {
        let index = index_with(&[(1, 1), (5, 1), (10, 1), (20, 1)]);
        let mut c = index.cursor(0);

        c.next_geq(3);
        assert_eq!(c.docid(), 5);
        // idempotent when already >= target
        c.next_geq(3);
        assert_eq!(c.docid(), 5);
        c.next_geq(10);
        assert_eq!(c.docid(), 10);
        c.next_geq(21);
        assert_eq!(c.docid(), 100);
    }

    #[test]
    fn unknown_term_is_exhausted() {
        let index = RamIndex::new(50);
        let mut c = index.cursor(7);
        assert_eq!(c.size(), 0);
        assert_eq!(c.docid(), 50);
        c.next();
        assert_eq!(c.docid(), 50);
    }

    #[test]
    fn empty_posting_list() {
        let index = index_with(&[]);
        let c = index.cursor(0);
        assert_eq!(c.docid(), 100);
        assert_eq!(c.size(), 0);
    }
}
