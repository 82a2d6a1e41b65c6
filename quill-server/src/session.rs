//! Per-connection session loop and request evaluation.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use rustc_hash::FxHashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use quill_core::{
    evaluate, translate, Algorithm, Bm25, DocId, EvalOptions, Mode, QueryParser, RamIndex,
    RamWandData, TermId, TranslatedQuery,
};

use crate::protocol::{Reply, Request};

/// Shared read-only search state: any number of sessions may evaluate
/// concurrently against it.
pub struct SearchContext {
    pub index: RamIndex,
    pub wdata: RamWandData,
    pub dictionary: FxHashMap<String, TermId>,
    /// Optional old -> new doc-id remapping applied to relevance lists.
    pub docid_map: Option<FxHashMap<u64, DocId>>,
}

/// Serve one connection: newline-delimited JSON requests in, JSON replies
/// out. Malformed requests produce an `error` reply without dropping the
/// connection.
pub async fn run_session(stream: TcpStream, context: Arc<SearchContext>) -> Result<()> {
    let peer = stream.peer_addr()?;
    info!("client connected: {peer}");
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<Request>(&line) {
            Ok(request) => match handle_request(&context, &request) {
                Ok(reply) => reply,
                Err(err) => Reply::error(format!("{err:#}")),
            },
            Err(err) => Reply::error(format!("invalid request: {err}")),
        };
        let mut encoded = serde_json::to_string(&reply)?;
        encoded.push('\n');
        write_half.write_all(encoded.as_bytes()).await?;
    }

    info!("client disconnected: {peer}");
    Ok(())
}

/// Evaluate one request: parse and translate the query, remap the relevance
/// list, then run the evaluation twice in the benchmark-server manner: the
/// first run carries the relevance list and produces the counts, the second
/// rel-free run is the one timed.
pub fn handle_request(context: &SearchContext, request: &Request) -> Result<Reply> {
    let normalize = request.normalization()?;
    let ranked_at = request.ranked_at()?;
    let rel = remap_rel(context, request.rel.as_deref())?;

    let (algorithm, query) = parse_query(context, request)?;
    debug!(
        "evaluating {algorithm:?} query {:?} (normalize={normalize}, ranked_at={ranked_at:?})",
        request.query
    );

    let mode = match ranked_at {
        Some(k) => Mode::Ranked { k },
        None => Mode::Count,
    };
    let options = EvalOptions {
        normalize,
        with_freqs: true,
        mode,
        rel: rel.clone(),
    };

    let outcome = evaluate::<Bm25, _>(
        &context.index,
        Some(&context.wdata),
        algorithm,
        query.clone(),
        options.clone(),
    )?;

    let timed_options = EvalOptions {
        rel: None,
        ..options
    };
    let started = Instant::now();
    evaluate::<Bm25, _>(
        &context.index,
        Some(&context.wdata),
        algorithm,
        query,
        timed_options,
    )?;
    let exe_time = started.elapsed().as_secs_f64() * 1000.0;

    Ok(Reply {
        num_ret: Some(outcome.num_returned),
        exe_time: Some(exe_time),
        num_rel_ret: outcome.num_rel_returned,
        num_rel: rel.map(|rel| rel.len() as u64),
        error: None,
    })
}

fn parse_query(
    context: &SearchContext,
    request: &Request,
) -> Result<(Algorithm, TranslatedQuery)> {
    let query = request.query.as_str();
    let (algorithm, expr) = match request.query_type.as_deref() {
        Some("and") => (Algorithm::And, QueryParser::parse_and(query)?),
        Some("or") => (Algorithm::Or, QueryParser::parse_or(query)?),
        Some("maxscore") => (Algorithm::MaxScore, QueryParser::parse_or(query)?),
        None | Some("cnf") => (Algorithm::Cnf, QueryParser::parse_cnf(query)?),
        Some("cnf opt") => (Algorithm::CnfOpt, QueryParser::parse_cnf(query)?),
        Some(other) => bail!("unrecognized query_type {other:?}"),
    };
    Ok((algorithm, translate(&expr, &context.dictionary)))
}

/// Remap a relevance list through the doc-id map. Every id must be known;
/// an empty list is an error, as in the wire contract.
fn remap_rel(context: &SearchContext, rel: Option<&[u64]>) -> Result<Option<Vec<DocId>>> {
    let Some(rel) = rel else {
        return Ok(None);
    };
    if rel.is_empty() {
        bail!("empty rel option");
    }
    let Some(map) = context.docid_map.as_ref() else {
        return Ok(Some(rel.to_vec()));
    };
    rel.iter()
        .map(|old| {
            map.get(old)
                .copied()
                .with_context(|| format!("unable to find doc-id {old} in the doc-id map"))
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}
