//! Tab-delimited result tables.
//!
//! Each table is a header row followed by one row per entry, in deterministic order (node id
//! order for nodes, path key order for paths). A path is written as its node labels joined by
//! [`PATH_DELIMITER`]; labels that would make that encoding ambiguous are rejected.

use crate::centrality::KPathCentrality;
use crate::graph::MutationGraph;
use crate::{Error, Result};
use log::debug;
use std::io::Write;

/// Separator between node labels in a serialized path.
pub const PATH_DELIMITER: &str = "->";

/// Serialize a path of node ids as `A->B->C`.
pub fn format_path(graph: &MutationGraph, path: &[usize]) -> Result<String> {
    let mut out = String::new();
    for (i, &v) in path.iter().enumerate() {
        let label = graph
            .label(v)
            .ok_or_else(|| Error::InvalidParameter(format!("node id {v} is not in the graph")))?;
        if label.contains(PATH_DELIMITER) || label.contains(['\t', '\n', '\r']) {
            return Err(Error::UnencodableLabel(label.to_string()));
        }
        if i > 0 {
            out.push_str(PATH_DELIMITER);
        }
        out.push_str(label);
    }
    Ok(out)
}

/// Split a serialized path back into labels.
pub fn parse_path(serialized: &str) -> Vec<&str> {
    serialized.split(PATH_DELIMITER).collect()
}

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer)
}

/// `Node  kPathCentrality` table.
pub fn write_node_table<W: Write>(writer: W, graph: &MutationGraph, result: &KPathCentrality) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record(["Node", "kPathCentrality"])?;
    for (label, score) in result.labelled_nodes(graph) {
        if label.contains(['\t', '\n', '\r']) {
            return Err(Error::UnencodableLabel(label.to_string()));
        }
        wtr.write_record([label, score.to_string().as_str()])?;
    }
    wtr.flush()?;
    debug!("Wrote {} node rows", result.node.len());
    Ok(())
}

/// `Path  kPathCentrality` table of raw path counts.
pub fn write_path_table<W: Write>(writer: W, graph: &MutationGraph, result: &KPathCentrality) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record(["Path", "kPathCentrality"])?;
    for (path, count) in &result.path {
        wtr.write_record([format_path(graph, path)?, count.to_string()])?;
    }
    wtr.flush()?;
    debug!("Wrote {} path rows", result.path.len());
    Ok(())
}

/// `Path  kPathProbCent` table of path probabilities.
pub fn write_prob_path_table<W: Write>(
    writer: W,
    graph: &MutationGraph,
    result: &KPathCentrality,
) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record(["Path", "kPathProbCent"])?;
    for (path, prob) in &result.prob_path {
        wtr.write_record([format_path(graph, path)?, prob.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}
