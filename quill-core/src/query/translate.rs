//! Lexeme to term-id translation.
//!
//! Unknown lexemes are silently dropped; an OR-group emptied by the drops is
//! removed. An empty result is legal and evaluates to zero hits.

use rustc_hash::FxHashMap;

use super::expr::QueryExpr;
use crate::TermId;

/// Lexeme -> term-id lookup, typically backed by the index's term dictionary.
pub trait TermDictionary {
    fn term_id(&self, lexeme: &str) -> Option<TermId>;
}

impl TermDictionary for FxHashMap<String, TermId> {
    fn term_id(&self, lexeme: &str) -> Option<TermId> {
        self.get(lexeme).copied()
    }
}

/// A query expression after translation, ready for evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslatedQuery {
    /// Flat AND or OR: the connective is chosen by the evaluator.
    Flat(Vec<TermId>),
    /// CNF: AND over OR-groups.
    Cnf(Vec<Vec<TermId>>),
}

/// Map an expression's lexemes through `dict`, preserving duplicates and
/// order. Flat shapes translate to a flat id vector, CNF to a vector of
/// groups with empty groups dropped.
pub fn translate<D: TermDictionary>(expr: &QueryExpr, dict: &D) -> TranslatedQuery {
    match expr {
        QueryExpr::And(terms) | QueryExpr::Or(terms) => TranslatedQuery::Flat(
            terms
                .iter()
                .filter_map(|t| dict.term_id(&t.lexeme))
                .collect(),
        ),
        QueryExpr::Cnf(groups) => TranslatedQuery::Cnf(
            groups
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .filter_map(|t| dict.term_id(&t.lexeme))
                        .collect::<Vec<_>>()
                })
                .filter(|group| !group.is_empty())
                .collect(),
        ),
    }
}
