//! Tab-delimited edge input.
//!
//! Two layouts are supported, selected explicitly by [`InputFormat`]:
//! - mutation pairs: `mut1 mut2 incr12 <unused> incr21`, header rows start with `mut`
//! - edge list: one header row, then `source target weight`
//!
//! Errors name the 1-based line of the offending row.

use crate::graph::{EdgeRecord, MutationGraph};
use crate::{Error, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputFormat {
    /// Raw co-occurrence counts per mutation pair; directed edges are derived.
    MutationPairs,
    /// A ready-to-read `source target weight` network.
    EdgeList,
}

/// Read directed edges from `path`.
pub fn read_edges(path: impl AsRef<Path>, format: InputFormat) -> Result<Vec<EdgeRecord>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::InputNotFound(path.to_path_buf()));
    }
    info!("Reading {:?} input from {}", format, path.display());
    let edges = parse_edges(File::open(path)?, format)?;
    info!("Parsed {} directed edges", edges.len());
    Ok(edges)
}

/// Read `path` and build the graph in one step.
pub fn load_graph(path: impl AsRef<Path>, format: InputFormat) -> Result<MutationGraph> {
    MutationGraph::from_edges(read_edges(path, format)?)
}

/// Parse directed edges from any reader.
pub fn parse_edges<R: Read>(reader: R, format: InputFormat) -> Result<Vec<EdgeRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut edges = Vec::new();
    let mut seen_header = false;
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let line = record.position().map_or(i + 1, |p| p.line() as usize);
        if record.iter().all(str::is_empty) {
            continue;
        }
        match format {
            InputFormat::EdgeList => {
                if !seen_header {
                    seen_header = true;
                    debug!("Skipping edge-list header at line {line}");
                    continue;
                }
                edges.push(parse_edge_row(&record, line)?);
            }
            InputFormat::MutationPairs => {
                if record.get(0).is_some_and(|f| f.starts_with("mut")) {
                    continue;
                }
                push_pair_edges(parse_pair_row(&record, line)?, &mut edges);
            }
        }
    }
    Ok(edges)
}

fn parse_edge_row(record: &csv::StringRecord, line: usize) -> Result<EdgeRecord> {
    if record.len() != 3 {
        return Err(Error::Parse {
            line,
            message: format!("expected 3 columns (source, target, weight), found {}", record.len()),
        });
    }
    let source = label_field(record, 0, line)?;
    let target = label_field(record, 1, line)?;
    let raw = &record[2];
    let weight: f64 = raw.parse().map_err(|_| Error::Parse {
        line,
        message: format!("weight `{raw}` is not a number"),
    })?;
    if !weight.is_finite() || weight <= 0.0 {
        return Err(Error::Parse {
            line,
            message: format!("weight must be positive, got {raw}"),
        });
    }
    Ok(EdgeRecord::new(source, target, weight))
}

/// One row of a mutation-pair file: how often `mut2` followed `mut1` and vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MutationPair {
    pub mut1: String,
    pub mut2: String,
    pub incr12: u64,
    pub incr21: u64,
}

/// Derive directed edges from mutation pairs.
///
/// `mut1 -> mut2` is emitted when `incr12 >= 1` and `mut2 -> mut1` when `incr21 >= 1`, each
/// weighted by its count. Pairs with neither count give no edge.
pub fn pairs_to_edges<I>(pairs: I) -> Vec<EdgeRecord>
where
    I: IntoIterator<Item = MutationPair>,
{
    let mut edges = Vec::new();
    for pair in pairs {
        push_pair_edges(pair, &mut edges);
    }
    edges
}

fn push_pair_edges(pair: MutationPair, out: &mut Vec<EdgeRecord>) {
    if pair.incr12 >= 1 {
        out.push(EdgeRecord::new(pair.mut1.clone(), pair.mut2.clone(), pair.incr12 as f64));
    }
    if pair.incr21 >= 1 {
        out.push(EdgeRecord::new(pair.mut2, pair.mut1, pair.incr21 as f64));
    }
}

fn parse_pair_row(record: &csv::StringRecord, line: usize) -> Result<MutationPair> {
    if record.len() < 5 {
        return Err(Error::Parse {
            line,
            message: format!("expected at least 5 columns (mut1, mut2, incr12, _, incr21), found {}", record.len()),
        });
    }
    Ok(MutationPair {
        mut1: label_field(record, 0, line)?.to_string(),
        mut2: label_field(record, 1, line)?.to_string(),
        incr12: count_field(record, 2, line)?,
        incr21: count_field(record, 4, line)?,
    })
}

fn label_field<'r>(record: &'r csv::StringRecord, col: usize, line: usize) -> Result<&'r str> {
    match &record[col] {
        "" => Err(Error::Parse {
            line,
            message: format!("empty mutation label in column {}", col + 1),
        }),
        label => Ok(label),
    }
}

fn count_field(record: &csv::StringRecord, col: usize, line: usize) -> Result<u64> {
    let raw = &record[col];
    raw.parse().map_err(|_| Error::Parse {
        line,
        message: format!("count `{raw}` in column {} is not a non-negative integer", col + 1),
    })
}

/// Write edges as a tab-delimited edge list readable with [`InputFormat::EdgeList`].
pub fn write_edge_list<W: Write>(writer: W, edges: &[EdgeRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(["source", "target", "weight"])?;
    for e in edges {
        let weight = e.weight.to_string();
        wtr.write_record([e.source.as_str(), e.target.as_str(), weight.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_emit_one_edge_per_positive_direction() {
        let input = "mut1\tmut2\tincr12\tboth\tincr21\n\
                     A\tB\t3\t0\t0\n\
                     B\tC\t0\t5\t2\n\
                     C\tD\t1\t0\t1\n";
        let edges = parse_edges(input.as_bytes(), InputFormat::MutationPairs).unwrap();
        assert_eq!(
            edges,
            vec![
                EdgeRecord::new("A", "B", 3.0),
                EdgeRecord::new("C", "B", 2.0),
                EdgeRecord::new("C", "D", 1.0),
                EdgeRecord::new("D", "C", 1.0),
            ]
        );
    }

    #[test]
    fn pairs_to_edges_skips_zero_counts() {
        let pair = |a: &str, b: &str, incr12, incr21| MutationPair {
            mut1: a.to_string(),
            mut2: b.to_string(),
            incr12,
            incr21,
        };
        let edges = pairs_to_edges(vec![pair("A", "B", 0, 0), pair("A", "B", 2, 7), pair("C", "A", 0, 1)]);
        assert_eq!(
            edges,
            vec![
                EdgeRecord::new("A", "B", 2.0),
                EdgeRecord::new("B", "A", 7.0),
                EdgeRecord::new("A", "C", 1.0),
            ]
        );
        assert!(pairs_to_edges(Vec::new()).is_empty());
    }

    #[test]
    fn edge_list_skips_only_the_first_row() {
        let input = "source\ttarget\tweight\nA\tB\t4\n\nB\tC\t1.5\n";
        let edges = parse_edges(input.as_bytes(), InputFormat::EdgeList).unwrap();
        assert_eq!(
            edges,
            vec![EdgeRecord::new("A", "B", 4.0), EdgeRecord::new("B", "C", 1.5)]
        );
    }

    #[test]
    fn zero_weight_is_a_parse_error_naming_the_line() {
        let input = "source\ttarget\tweight\nA\tB\t4\nB\tC\t0\n";
        let err = parse_edges(input.as_bytes(), InputFormat::EdgeList).unwrap_err();
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let cases = [
            ("h\th\th\nA\tB\tx\n", InputFormat::EdgeList),
            ("h\th\th\nA\tB\n", InputFormat::EdgeList),
            ("h\th\th\nA\tB\t-2\n", InputFormat::EdgeList),
            ("A\tB\t1\t0\n", InputFormat::MutationPairs),
            ("A\tB\t-1\t0\t0\n", InputFormat::MutationPairs),
            ("A\t\t1\t0\t0\n", InputFormat::MutationPairs),
        ];
        for (input, format) in cases {
            let err = parse_edges(input.as_bytes(), format).unwrap_err();
            assert!(matches!(err, Error::Parse { .. }), "{input:?}: got {err:?}");
        }
    }

    #[test]
    fn written_edge_list_parses_back() {
        let edges = vec![EdgeRecord::new("A12T", "G7C", 4.0), EdgeRecord::new("G7C", "A12T", 2.5)];
        let mut buf = Vec::new();
        write_edge_list(&mut buf, &edges).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("source\ttarget\tweight\n"));
        let back = parse_edges(buf.as_slice(), InputFormat::EdgeList).unwrap();
        assert_eq!(back, edges);
    }
}
