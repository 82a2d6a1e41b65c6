//! Startup artifacts: term dictionary, doc-id map, and the postings file.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use log::warn;
use rustc_hash::FxHashMap;

use quill_core::{DocId, RamIndex, TermFreq, TermId};

/// Size of one old-id -> new-id record in the doc-id map file.
const DOCID_MAP_RECORD: u64 = 12;

/// Load the term dictionary: one term per line, the line number is the
/// term-id. Duplicate terms keep their first id.
pub fn load_term_dictionary(path: &Path) -> Result<FxHashMap<String, TermId>> {
    let file = File::open(path).with_context(|| format!("opening term file {}", path.display()))?;
    let mut dict = FxHashMap::default();
    let mut count: TermId = 0;
    for line in BufReader::new(file).lines() {
        let term = line?;
        if term.is_empty() {
            continue;
        }
        if dict.contains_key(&term) {
            warn!("the term {term:?} appears twice in the term file");
            continue;
        }
        dict.insert(term, count);
        count += 1;
    }
    Ok(dict)
}

/// Load the old -> new doc-id map: binary little-endian records of a `u64`
/// old id followed by a `u32` new id.
pub fn load_docid_map(path: &Path) -> Result<FxHashMap<u64, DocId>> {
    let file =
        File::open(path).with_context(|| format!("opening doc-id map {}", path.display()))?;
    let len = file.metadata()?.len();
    if len % DOCID_MAP_RECORD != 0 {
        bail!(
            "incompatible doc-id map size {len}: not a multiple of {DOCID_MAP_RECORD}"
        );
    }
    let mut reader = BufReader::new(file);
    let mut map = FxHashMap::default();
    for _ in 0..len / DOCID_MAP_RECORD {
        let old = reader.read_u64::<LittleEndian>()?;
        let new = reader.read_u32::<LittleEndian>()?;
        map.insert(old, new as DocId);
    }
    Ok(map)
}

/// Load a plain-text postings file into a `RamIndex`.
///
/// The first line is `num_docs <N>`; every following line holds one term's
/// postings as whitespace-separated `doc:freq` pairs, in increasing doc-id
/// order. Line `g` (zero-based, after the header) defines term `g`. An
/// empty line is a term without postings.
pub fn load_index(path: &Path) -> Result<RamIndex> {
    let file =
        File::open(path).with_context(|| format!("opening postings file {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut header = String::new();
    reader.read_line(&mut header)?;
    let num_docs = parse_header(header.trim_end())?;

    let mut index = RamIndex::new(num_docs);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    for (line_no, line) in contents.lines().enumerate() {
        let postings = parse_postings(line, num_docs)
            .with_context(|| format!("postings line {}", line_no + 2))?;
        index.push_term(&postings);
    }
    Ok(index)
}

fn parse_header(line: &str) -> Result<u64> {
    match line.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["num_docs", n] => Ok(n.parse()?),
        _ => bail!("postings file must start with a 'num_docs <N>' header"),
    }
}

fn parse_postings(line: &str, num_docs: u64) -> Result<Vec<(DocId, TermFreq)>> {
    let mut postings: Vec<(DocId, TermFreq)> = Vec::new();
    for pair in line.split_whitespace() {
        let (doc, freq) = pair
            .split_once(':')
            .with_context(|| format!("malformed posting {pair:?}"))?;
        let doc: DocId = doc.parse()?;
        let freq: TermFreq = freq.parse()?;
        if doc >= num_docs {
            bail!("doc-id {doc} is out of range (num_docs = {num_docs})");
        }
        if let Some(&(last, _)) = postings.last() {
            if last >= doc {
                bail!("doc-ids must be strictly increasing, found {last} then {doc}");
            }
        }
        postings.push((doc, freq));
    }
    Ok(postings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use quill_core::Index;
    use std::io::Write;

    #[test]
    fn term_dictionary_assigns_line_numbers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "apple\nbanana\n\napple\ncherry").unwrap();
        let dict = load_term_dictionary(file.path()).unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict["apple"], 0);
        assert_eq!(dict["banana"], 1);
        assert_eq!(dict["cherry"], 2);
    }

    #[test]
    fn docid_map_reads_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for (old, new) in [(1000u64, 5u32), (2000, 9)] {
            file.write_u64::<LittleEndian>(old).unwrap();
            file.write_u32::<LittleEndian>(new).unwrap();
        }
        file.flush().unwrap();
        let map = load_docid_map(file.path()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&1000], 5);
        assert_eq!(map[&2000], 9);
    }

    #[test]
    fn docid_map_rejects_truncated_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 13]).unwrap();
        file.flush().unwrap();
        assert!(load_docid_map(file.path()).is_err());
    }

    #[test]
    fn postings_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "num_docs 20").unwrap();
        writeln!(file, "1:2 5:1 9:3").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "0:1 19:7").unwrap();
        let index = load_index(file.path()).unwrap();
        assert_eq!(index.num_docs(), 20);
        assert_eq!(index.num_terms(), 3);
        assert_eq!(index.df(0), 3);
        assert_eq!(index.df(1), 0);
        assert_eq!(
            index.postings(2).collect::<Vec<_>>(),
            vec![(0, 1), (19, 7)]
        );
    }

    #[test]
    fn postings_file_rejects_unsorted_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "num_docs 20").unwrap();
        writeln!(file, "5:1 1:2").unwrap();
        assert!(load_index(file.path()).is_err());
    }
}
