//! Conjunction over N posting cursors by next-geq alignment.

use super::{
    empty_outcome, finish_count, finish_ranked, normalize_rel, normalize_terms, validate,
    EvalOptions, Mode, Outcome, RelWalker,
};
use crate::error::Result;
use crate::index::{Index, PostingCursor};
use crate::scorer::Scorer;
use crate::topk::TopKQueue;
use crate::wand::WandData;
use crate::{Score, TermId};

/// Count or rank the documents containing every term in `terms`.
///
/// One cursor leads and the others chase it with `next_geq`; any mismatch
/// promotes the offending cursor's doc-id to the new candidate. With
/// `normalize` on, cursors are ordered rarest-first so the leader does the
/// least work.
pub fn and_query<S: Scorer, I: Index>(
    index: &I,
    wand: Option<&dyn WandData>,
    mut terms: Vec<TermId>,
    mut options: EvalOptions,
) -> Result<Outcome> {
    validate(&options, wand.is_some())?;
    if let Some(rel) = options.rel.as_mut() {
        normalize_rel(rel);
    }
    if terms.is_empty() {
        return Ok(empty_outcome(&options));
    }
    if options.normalize {
        normalize_terms(&mut terms);
    }

    let num_docs = index.num_docs();
    let mut cursors: Vec<_> = terms.iter().map(|&t| index.cursor(t)).collect();
    if options.normalize {
        // rarest first
        cursors.sort_by_key(|c| c.size());
    }

    let ranked = matches!(options.mode, Mode::Ranked { .. });
    let weights: Vec<Score> = if ranked {
        cursors
            .iter()
            .map(|c| S::query_term_weight(1, c.size(), num_docs))
            .collect()
    } else {
        Vec::new()
    };
    let mut top_k = match options.mode {
        Mode::Ranked { k } => Some(TopKQueue::new(k as usize)),
        Mode::Count => None,
    };

    let mut results = 0u64;
    let mut rel_walker = if ranked {
        None
    } else {
        options.rel.as_deref().map(RelWalker::new)
    };

    let mut candidate = cursors[0].docid();
    let mut i = 1;
    while candidate < num_docs {
        let mut aligned = true;
        while i < cursors.len() {
            cursors[i].next_geq(candidate);
            if cursors[i].docid() != candidate {
                candidate = cursors[i].docid();
                i = 0;
                aligned = false;
                break;
            }
            i += 1;
        }
        if !aligned {
            continue;
        }

        if let Some(top_k) = top_k.as_mut() {
            let norm_len = wand.expect("validated").norm_len(candidate);
            let mut score = 0.0;
            for (cursor, weight) in cursors.iter().zip(&weights) {
                score += weight * S::doc_term_weight(cursor.freq(), norm_len);
            }
            top_k.insert(candidate, score);
        } else {
            results += 1;
            if let Some(walker) = rel_walker.as_mut() {
                walker.observe(candidate);
            }
            if options.with_freqs {
                for cursor in &cursors {
                    std::hint::black_box(cursor.freq());
                }
            }
        }

        cursors[0].next();
        candidate = cursors[0].docid();
        i = 1;
    }

    Ok(match top_k {
        Some(top_k) => finish_ranked(top_k, options.rel.as_deref()),
        None => finish_count(results, rel_walker),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RamIndex;
    use crate::scorer::Bm25;
    use crate::wand::RamWandData;

    fn three_term_index() -> RamIndex {
        let mut index = RamIndex::new(10);
        index.push_term(&[(1, 1), (3, 1), (5, 1), (7, 1)]); // a
        index.push_term(&[(2, 1), (3, 1), (5, 1), (8, 1)]); // b
        index.push_term(&[(3, 1), (5, 1), (9, 1)]); // c
        index
    }

    #[test]
    fn intersects_three_lists() {
        let index = three_term_index();
        let outcome = and_query::<Bm25, _>(
            &index,
            None,
            vec![0, 1, 2],
            EvalOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.num_returned, 2); // docs 3 and 5
        assert_eq!(outcome.num_rel_returned, None);
    }

    #[test]
    fn single_term_walks_the_posting_list() {
        let index = three_term_index();
        let outcome =
            and_query::<Bm25, _>(&index, None, vec![2], EvalOptions::default()).unwrap();
        assert_eq!(outcome.num_returned, 3);
    }

    #[test]
    fn duplicate_terms_normalize_away() {
        let mut index = RamIndex::new(10);
        index.push_term(&[(1, 1), (2, 1)]); // x
        index.push_term(&[(2, 1), (3, 1)]); // y
        let dup = and_query::<Bm25, _>(
            &index,
            None,
            vec![0, 0, 1],
            EvalOptions::default(),
        )
        .unwrap();
        let plain =
            and_query::<Bm25, _>(&index, None, vec![0, 1], EvalOptions::default()).unwrap();
        assert_eq!(dup.num_returned, plain.num_returned);
        assert_eq!(dup.num_returned, 1); // doc 2
    }

    #[test]
    fn empty_query_returns_zero() {
        let index = three_term_index();
        let outcome =
            and_query::<Bm25, _>(&index, None, vec![], EvalOptions::default()).unwrap();
        assert_eq!(outcome.num_returned, 0);
    }

    #[test]
    fn relevance_counting() {
        let index = three_term_index();
        let options = EvalOptions {
            rel: Some(vec![5, 9, 5]),
            ..EvalOptions::default()
        };
        let outcome = and_query::<Bm25, _>(&index, None, vec![0, 1, 2], options).unwrap();
        assert_eq!(outcome.num_returned, 2);
        assert_eq!(outcome.num_rel_returned, Some(1)); // only doc 5
    }

    #[test]
    fn ranked_returns_matches_when_k_exceeds_them() {
        let index = three_term_index();
        let wdata = RamWandData::build::<Bm25>(&index);
        let options = EvalOptions {
            mode: Mode::Ranked { k: 10 },
            ..EvalOptions::default()
        };
        let outcome =
            and_query::<Bm25, _>(&index, Some(&wdata), vec![0, 1, 2], options).unwrap();
        assert_eq!(outcome.num_returned, 2);
        assert_eq!(outcome.top_docs.len(), 2);
        let mut docs: Vec<_> = outcome.top_docs.iter().map(|e| e.docid).collect();
        docs.sort_unstable();
        assert_eq!(docs, [3, 5]);
    }

    #[test]
    fn ranked_without_wand_is_rejected() {
        let index = three_term_index();
        let options = EvalOptions {
            mode: Mode::Ranked { k: 5 },
            ..EvalOptions::default()
        };
        assert!(and_query::<Bm25, _>(&index, None, vec![0], options).is_err());
    }

    #[test]
    fn ranked_with_k_zero_is_rejected() {
        let index = three_term_index();
        let wdata = RamWandData::build::<Bm25>(&index);
        let options = EvalOptions {
            mode: Mode::Ranked { k: 0 },
            ..EvalOptions::default()
        };
        assert!(and_query::<Bm25, _>(&index, Some(&wdata), vec![0], options).is_err());
    }
}
