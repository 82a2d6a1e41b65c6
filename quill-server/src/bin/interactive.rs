//! Interactive query console over pre-translated term-ids.
//!
//! Reads one query per stdin line:
//!
//! ```text
//! and 1 2 3
//! or 4 5
//! cnf 2 2 1 10 11 12
//! ```
//!
//! The `cnf` form lists the group count, then each group's size, then the
//! term-ids in group order. Each query runs twice, a warm-up and a timed
//! run; elapsed microseconds and the hit count are printed.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use quill_core::{evaluate, Algorithm, Bm25, EvalOptions, Index, TermId, TranslatedQuery};
use quill_server::artifacts;

/// Interactive counting console
#[derive(Parser, Debug)]
#[command(name = "quill-interactive")]
struct Args {
    /// Plain-text postings file ("num_docs <N>" header, one term per line)
    #[arg(long)]
    index: PathBuf,
}

fn parse_flat(fields: &[&str]) -> Result<Vec<TermId>> {
    let terms = fields
        .iter()
        .map(|f| f.parse::<TermId>().context("malformed term-id"))
        .collect::<Result<Vec<_>>>()?;
    if terms.is_empty() {
        bail!("the query is empty");
    }
    Ok(terms)
}

fn parse_cnf(fields: &[&str]) -> Result<Vec<Vec<TermId>>> {
    let mut it = fields.iter();
    let num_groups: usize = it
        .next()
        .context("unable to read the group counter")?
        .parse()?;
    let mut sizes = Vec::with_capacity(num_groups);
    for g in 0..num_groups {
        let size: usize = it
            .next()
            .with_context(|| format!("unable to read the size of group {}", g + 1))?
            .parse()?;
        if size == 0 {
            bail!("the size of group {} is zero", g + 1);
        }
        sizes.push(size);
    }
    let mut groups = Vec::with_capacity(num_groups);
    for size in sizes {
        let mut group = Vec::with_capacity(size);
        for _ in 0..size {
            group.push(
                it.next()
                    .context("fewer term-ids than the group sizes require")?
                    .parse::<TermId>()?,
            );
        }
        groups.push(group);
    }
    if it.next().is_some() {
        bail!("more term-ids than the group sizes require");
    }
    Ok(groups)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("loading the index from {}", args.index.display());
    let index = artifacts::load_index(&args.index)?;
    info!(
        "loaded {} terms over {} documents; ready to answer queries",
        index.num_terms(),
        index.num_docs()
    );

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some((&op, rest)) = fields.split_first() else {
            continue;
        };

        let parsed = match op {
            "and" => parse_flat(rest).map(|t| (Algorithm::And, TranslatedQuery::Flat(t))),
            "or" => parse_flat(rest).map(|t| (Algorithm::Or, TranslatedQuery::Flat(t))),
            "cnf" => parse_cnf(rest).map(|g| (Algorithm::Cnf, TranslatedQuery::Cnf(g))),
            other => {
                eprintln!("unrecognized operation type {other}");
                continue;
            }
        };
        let (algorithm, query) = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                eprintln!("{err:#}");
                continue;
            }
        };

        // warm-up, then the timed run
        let run = || {
            evaluate::<Bm25, _>(
                &index,
                None,
                algorithm,
                query.clone(),
                EvalOptions::default(),
            )
        };
        run()?;
        let started = Instant::now();
        let outcome = run()?;
        let elapsed = started.elapsed().as_micros();

        println!("{elapsed} us\t{} docs", outcome.num_returned);
    }

    Ok(())
}
