//! Wire types for the newline-delimited JSON protocol.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on `ranked_at`.
pub const MAX_RANKED_AT: u32 = 1_000_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub query: String,
    /// `"and"`, `"or"`, `"cnf"`, `"cnf opt"` or `"maxscore"`; default `"cnf"`.
    #[serde(default)]
    pub query_type: Option<String>,
    /// `"true"` or `"false"`; default `"true"`.
    #[serde(default)]
    pub query_normalization: Option<String>,
    /// When present, rank at the given depth instead of counting.
    #[serde(default)]
    pub ranked_at: Option<u32>,
    /// Relevance doc-ids in the caller's (pre-remap) id space.
    #[serde(default)]
    pub rel: Option<Vec<u64>>,
}

impl Request {
    pub fn normalization(&self) -> Result<bool> {
        match self.query_normalization.as_deref() {
            None | Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => bail!("unrecognized query_normalization {other:?}"),
        }
    }

    pub fn ranked_at(&self) -> Result<Option<u32>> {
        match self.ranked_at {
            None => Ok(None),
            Some(k) if k > 0 && k <= MAX_RANKED_AT => Ok(Some(k)),
            Some(k) => bail!("ranked_at must be greater than 0 and at most {MAX_RANKED_AT}, got {k}"),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ret: Option<u64>,
    /// Evaluation time of the timed (relevance-free) run, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exe_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_rel_ret: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_rel: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let request: Request = serde_json::from_str(r#"{"query": "a b"}"#).unwrap();
        assert_eq!(request.query, "a b");
        assert!(request.query_type.is_none());
        assert!(request.normalization().unwrap());
        assert_eq!(request.ranked_at().unwrap(), None);
        assert!(request.rel.is_none());
    }

    #[test]
    fn full_request() {
        let request: Request = serde_json::from_str(
            r#"{"query": "(a | b) c", "query_type": "cnf opt",
                "query_normalization": "false", "ranked_at": 10, "rel": [4, 2]}"#,
        )
        .unwrap();
        assert_eq!(request.query_type.as_deref(), Some("cnf opt"));
        assert!(!request.normalization().unwrap());
        assert_eq!(request.ranked_at().unwrap(), Some(10));
        assert_eq!(request.rel, Some(vec![4, 2]));
    }

    #[test]
    fn bad_options_are_rejected() {
        let request: Request =
            serde_json::from_str(r#"{"query": "a", "query_normalization": "maybe"}"#).unwrap();
        assert!(request.normalization().is_err());

        let request: Request =
            serde_json::from_str(r#"{"query": "a", "ranked_at": 0}"#).unwrap();
        assert!(request.ranked_at().is_err());

        let request: Request =
            serde_json::from_str(r#"{"query": "a", "ranked_at": 2000000}"#).unwrap();
        assert!(request.ranked_at().is_err());
    }

    #[test]
    fn reply_omits_unset_fields() {
        let reply = Reply {
            num_ret: Some(3),
            exe_time: Some(0.25),
            ..Reply::default()
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"num_ret":3,"exe_time":0.25}"#);
    }
}
