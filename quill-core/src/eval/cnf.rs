//! CNF evaluation: AND over OR-groups with per-group mismatch tracking.

use super::{
    empty_outcome, finish_count, finish_ranked, normalize_cnf, normalize_rel, validate,
    EvalOptions, Mode, Outcome, RelWalker,
};
use crate::error::Result;
use crate::index::{Index, PostingCursor};
use crate::scorer::Scorer;
use crate::topk::TopKQueue;
use crate::wand::WandData;
use crate::{Score, TermId};

/// Count or rank the documents matching `AND_g OR_{t in g} t`.
///
/// Cursors are flattened into one vector walked group by group. While
/// scanning a candidate, each group tracks the smallest doc-id at or beyond
/// it seen so far; the scan stops at the first group with no cursor on the
/// candidate, and the minimum recorded there is the next candidate (nothing
/// smaller can satisfy that group). When every group matches, all matched
/// cursors step forward and the next candidate is the maximum over the
/// per-group minima, the tightest bound that can satisfy all groups at once.
///
/// With `normalize` on, each group puts its most frequent term first (an
/// early in-group match ends that group's scan sooner) and groups are
/// ordered by the frequency of their first term, rarest leading.
pub fn cnf_query<S: Scorer, I: Index>(
    index: &I,
    wand: Option<&dyn WandData>,
    mut groups: Vec<Vec<TermId>>,
    mut options: EvalOptions,
) -> Result<Outcome> {
    validate(&options, wand.is_some())?;
    if let Some(rel) = options.rel.as_mut() {
        normalize_rel(rel);
    }
    if groups.is_empty() || groups.iter().any(|g| g.is_empty()) {
        return Ok(empty_outcome(&options));
    }
    if options.normalize {
        normalize_cnf(&mut groups);
    }

    let num_docs = index.num_docs();
    let mut group_cursors: Vec<Vec<I::Cursor<'_>>> = groups
        .iter()
        .map(|group| group.iter().map(|&t| index.cursor(t)).collect())
        .collect();
    if options.normalize {
        for cursors in group_cursors.iter_mut() {
            // most frequent first within the group
            cursors.sort_by(|a, b| b.size().cmp(&a.size()));
        }
        // rarest leading term decides the group order
        group_cursors.sort_by_key(|cursors| cursors[0].size());
    }

    // flatten to one cursor vector with group bookkeeping
    let num_groups = group_cursors.len();
    let num_terms: usize = group_cursors.iter().map(|g| g.len()).sum();
    let mut cursors = Vec::with_capacity(num_terms);
    let mut pos_to_group = Vec::with_capacity(num_terms);
    let mut group_start = vec![0usize; num_groups + 1];
    for (g, group) in group_cursors.into_iter().enumerate() {
        group_start[g + 1] = group_start[g] + group.len();
        for cursor in group {
            pos_to_group.push(g);
            cursors.push(cursor);
        }
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

    let mut matches = vec![0usize; num_terms];
    let mut num_matches = 0usize;
    let mut groups_min_docid = vec![0u64; num_groups];
    let mut num_groups_matched = 0usize;

    let mut cur = cursors[0].docid();
    for k in 1..group_start[1] {
        cur = cur.min(cursors[k].docid());
    }

    while cur < num_docs {
        groups_min_docid[0] = num_docs;
        let mut last_group = 0usize;
        for k in 0..num_terms {
            let group = pos_to_group[k];
            // the previous group never matched: no point scanning further
            if num_groups_matched < group {
                break;
            }
            if last_group != group {
                groups_min_docid[group] = num_docs;
                last_group = group;
            }

            cursors[k].next_geq(cur);
            let docid = cursors[k].docid();
            if docid == cur {
                matches[num_matches] = k;
                num_matches += 1;
                if num_groups_matched == group {
                    num_groups_matched += 1;
                }
            } else if docid < groups_min_docid[group] {
                groups_min_docid[group] = docid;
            }
        }

        if num_groups_matched == num_groups {
            if let Some(top_k) = top_k.as_mut() {
                let norm_len = wand.expect("validated").norm_len(cur);
                let mut score = 0.0;
                for &k in &matches[..num_matches] {
                    score += weights[k] * S::doc_term_weight(cursors[k].freq(), norm_len);
                }
                top_k.insert(cur, score);
            } else {
                results += 1;
                if let Some(walker) = rel_walker.as_mut() {
                    walker.observe(cur);
                }
                if options.with_freqs {
                    for &k in &matches[..num_matches] {
                        if cursors[k].docid() == cur {
                            std::hint::black_box(cursors[k].freq());
                        }
                    }
                }
            }

            // step the matched cursors past the hit, refreshing their
            // groups' minima
            for &k in &matches[..num_matches] {
                let group = pos_to_group[k];
                cursors[k].next();
                let docid = cursors[k].docid();
                if docid < groups_min_docid[group] {
                    groups_min_docid[group] = docid;
                }
            }

            // every group was scanned this round, so all minima are fresh
            let mut next = 0u64;
            for g in 0..num_groups {
                if groups_min_docid[g] > next {
                    next = groups_min_docid[g];
                }
            }
            cur = next;
        } else {
            cur = groups_min_docid[num_groups_matched];
        }

        num_matches = 0;
        num_groups_matched = 0;
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

    fn cnf_index() -> RamIndex {
        let mut index = RamIndex::new(10);
        index.push_term(&[(1, 1), (3, 1), (5, 1)]); // a
        index.push_term(&[(2, 1), (3, 1), (7, 1)]); // b
        index.push_term(&[(3, 1), (5, 1), (7, 1)]); // c
        index
    }

    #[test]
    fn and_of_or_groups() {
        // (a | b) c -> docs 3, 5, 7
        let index = cnf_index();
        let outcome = cnf_query::<Bm25, _>(
            &index,
            None,
            vec![vec![0, 1], vec![2]],
            EvalOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.num_returned, 3);
    }

    #[test]
    fn single_singleton_group_walks_the_posting_list() {
        let index = cnf_index();
        let outcome =
            cnf_query::<Bm25, _>(&index, None, vec![vec![2]], EvalOptions::default()).unwrap();
        assert_eq!(outcome.num_returned, 3);
    }

    #[test]
    fn empty_group_returns_zero() {
        let index = cnf_index();
        let outcome = cnf_query::<Bm25, _>(
            &index,
            None,
            vec![vec![0], vec![]],
            EvalOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.num_returned, 0);
    }

    #[test]
    fn empty_query_returns_zero() {
        let index = cnf_index();
        let outcome =
            cnf_query::<Bm25, _>(&index, None, vec![], EvalOptions::default()).unwrap();
        assert_eq!(outcome.num_returned, 0);
    }

    #[test]
    fn disjoint_groups_have_no_hits() {
        let mut index = RamIndex::new(10);
        index.push_term(&[(1, 1), (2, 1)]);
        index.push_term(&[(8, 1), (9, 1)]);
        let outcome = cnf_query::<Bm25, _>(
            &index,
            None,
            vec![vec![0], vec![1]],
            EvalOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.num_returned, 0);
    }

    #[test]
    fn relevance_counting() {
        let index = cnf_index();
        let options = EvalOptions {
            rel: Some(vec![3, 7, 8]),
            ..EvalOptions::default()
        };
        let outcome =
            cnf_query::<Bm25, _>(&index, None, vec![vec![0, 1], vec![2]], options).unwrap();
        assert_eq!(outcome.num_returned, 3);
        assert_eq!(outcome.num_rel_returned, Some(2));
    }
}
