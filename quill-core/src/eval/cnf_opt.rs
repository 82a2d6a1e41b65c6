//! CNF evaluation with group-level shortcuts.
//!
//! Same hit set as [`super::cnf_query`], less cursor work:
//!
//! - groups are ordered by their total posting volume (sum of document
//!   frequencies), a tighter proxy than the basic walker's first-cursor one;
//! - a group is abandoned the moment one of its cursors matches the
//!   candidate, jumping straight to the next group;
//! - a mismatch in group `g` promotes the minimum doc-id within `g` to the
//!   new candidate. Groups before `g` are known to hold a posting at or
//!   beyond the old candidate, so they can still match the new one and are
//!   re-aligned by `next_geq` on the next round.

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

/// Count or rank the documents matching `AND_g OR_{t in g} t`, skipping
/// redundant in-group work.
pub fn cnf_opt_query<S: Scorer, I: Index>(
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
    let mut group_cursors: Vec<(u64, Vec<I::Cursor<'_>>)> = groups
        .iter()
        .map(|group| {
            let cursors: Vec<_> = group.iter().map(|&t| index.cursor(t)).collect();
            let volume: u64 = cursors.iter().map(|c| c.size()).sum();
            (volume, cursors)
        })
        .collect();
    if options.normalize {
        for (_, cursors) in group_cursors.iter_mut() {
            // most frequent first within the group
            cursors.sort_by(|a, b| b.size().cmp(&a.size()));
        }
        // lightest group leads the AND
        group_cursors.sort_by_key(|&(volume, _)| volume);
    }

    // flatten; the extra trailing entry makes the scan of a fully-matched
    // query an empty range
    let num_groups = group_cursors.len();
    let num_terms: usize = group_cursors.iter().map(|(_, g)| g.len()).sum();
    let mut cursors = Vec::with_capacity(num_terms);
    let mut group_start = vec![0usize; num_groups + 2];
    for (g, (_, group)) in group_cursors.into_iter().enumerate() {
        group_start[g + 1] = group_start[g] + group.len();
        cursors.extend(group);
    }
    group_start[num_groups + 1] = group_start[num_groups];

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

    let mut cur = cursors[0].docid();
    for k in 1..group_start[1] {
        cur = cur.min(cursors[k].docid());
    }

    let mut k = 0usize;
    let mut num_groups_matched = 0usize;
    while cur < num_docs {
        let mut k_end = group_start[num_groups_matched + 1];
        while k < k_end {
            cursors[k].next_geq(cur);
            if cursors[k].docid() == cur {
                // the group is proven; skip its remaining cursors
                num_groups_matched += 1;
                k = group_start[num_groups_matched];
                k_end = group_start[num_groups_matched + 1];
            } else {
                k += 1;
            }
        }

        if num_groups_matched == num_groups {
            // re-align every cursor, including the ones skipped by the
            // group shortcut
            for cursor in cursors.iter_mut() {
                cursor.next_geq(cur);
            }

            if let Some(top_k) = top_k.as_mut() {
                let norm_len = wand.expect("validated").norm_len(cur);
                let mut score = 0.0;
                for (i, cursor) in cursors.iter().enumerate() {
                    if cursor.docid() == cur {
                        score += weights[i] * S::doc_term_weight(cursor.freq(), norm_len);
                    }
                }
                top_k.insert(cur, score);
            } else {
                results += 1;
                if let Some(walker) = rel_walker.as_mut() {
                    walker.observe(cur);
                }
                if options.with_freqs {
                    for cursor in &cursors {
                        if cursor.docid() == cur {
                            std::hint::black_box(cursor.freq());
                        }
                    }
                }
            }

            // the next candidate is the minimum of the first group, whose
            // cursors on the hit step forward; group 0 is then already
            // proven for that candidate
            let mut next = num_docs;
            for i in 0..group_start[1] {
                if cursors[i].docid() == cur {
                    cursors[i].next();
                }
                next = next.min(cursors[i].docid());
            }
            cur = next;
            k = group_start[1];
            num_groups_matched = 1;
        } else {
            // mismatch: jump to the minimum within the failing group
            let mut next = num_docs;
            for i in group_start[num_groups_matched]..group_start[num_groups_matched + 1] {
                next = next.min(cursors[i].docid());
            }
            cur = next;

            if num_groups_matched == 0 {
                // the candidate came from group 0 itself, so group 0 holds
                // a posting exactly there
                k = group_start[1];
                num_groups_matched = 1;
            } else {
                k = 0;
                num_groups_matched = 0;
            }
        }
    }

    Ok(match top_k {
        Some(top_k) => finish_ranked(top_k, options.rel.as_deref()),
        None => finish_count(results, rel_walker),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::cnf_query;
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
    fn matches_the_basic_walker() {
        let index = cnf_index();
        let groups = vec![vec![0, 1], vec![2]];
        let basic =
            cnf_query::<Bm25, _>(&index, None, groups.clone(), EvalOptions::default()).unwrap();
        let opt =
            cnf_opt_query::<Bm25, _>(&index, None, groups, EvalOptions::default()).unwrap();
        assert_eq!(basic.num_returned, 3);
        assert_eq!(opt.num_returned, basic.num_returned);
    }

    #[test]
    fn single_group_counts_the_union() {
        let index = cnf_index();
        let outcome = cnf_opt_query::<Bm25, _>(
            &index,
            None,
            vec![vec![0, 1]],
            EvalOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.num_returned, 5); // docs 1, 2, 3, 5, 7
    }

    #[test]
    fn empty_group_returns_zero() {
        let index = cnf_index();
        let outcome = cnf_opt_query::<Bm25, _>(
            &index,
            None,
            vec![vec![], vec![0]],
            EvalOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.num_returned, 0);
    }

    #[test]
    fn three_groups() {
        let mut index = RamIndex::new(20);
        index.push_term(&[(1, 1), (5, 1), (9, 1), (13, 1)]); // a
        index.push_term(&[(2, 1), (5, 1), (9, 1), (14, 1)]); // b
        index.push_term(&[(5, 1), (9, 1), (15, 1)]); // c
        index.push_term(&[(3, 1), (9, 1)]); // d
        // (a | b) c (d) -> docs with c and d and (a or b): 9
        let outcome = cnf_opt_query::<Bm25, _>(
            &index,
            None,
            vec![vec![0, 1], vec![2], vec![3]],
            EvalOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.num_returned, 1);
    }

    #[test]
    fn relevance_counting() {
        let index = cnf_index();
        let options = EvalOptions {
            rel: Some(vec![3, 7, 8]),
            ..EvalOptions::default()
        };
        let outcome =
            cnf_opt_query::<Bm25, _>(&index, None, vec![vec![0, 1], vec![2]], options).unwrap();
        assert_eq!(outcome.num_returned, 3);
        assert_eq!(outcome.num_rel_returned, Some(2));
    }
}
