//! Results persistence module

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::assemble::GraphArtifact;
use crate::cluster::ClusterReport;
use crate::error::Result;

/// On-disk graph artifact encodings, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Json,
    Bincode,
    GraphMl,
}

impl GraphFormat {
    /// `.bin` and `.graphml` select their encodings; anything else is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") => GraphFormat::Bincode,
            Some("graphml") => GraphFormat::GraphMl,
            _ => GraphFormat::Json,
        }
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Save a cluster report as pretty-printed JSON
pub fn save_report(report: &ClusterReport, path: &Path) -> Result<()> {
    log::info!("Saving {} clusters to {}", report.cluster_count(), path.display());
    let mut file = create(path)?;
    serde_json::to_writer_pretty(&mut file, report)?;
    file.flush()?;
    Ok(())
}

pub fn load_report(path: &Path) -> Result<ClusterReport> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Save a graph artifact in the format implied by `path`
pub fn save_graph(artifact: &GraphArtifact, path: &Path) -> Result<()> {
    let format = GraphFormat::from_path(path);
    log::info!("Saving graph to {} ({:?})", path.display(), format);

    let mut file = create(path)?;
    match format {
        GraphFormat::Json => serde_json::to_writer_pretty(&mut file, artifact)?,
        GraphFormat::Bincode => bincode::serialize_into(&mut file, artifact)?,
        GraphFormat::GraphMl => write_graphml(artifact, &mut file)?,
    }
    file.flush()?;
    Ok(())
}

/// Load a JSON or bincode graph artifact
pub fn load_graph(path: &Path) -> Result<GraphArtifact> {
    let reader = BufReader::new(File::open(path)?);
    match GraphFormat::from_path(path) {
        GraphFormat::Bincode => Ok(bincode::deserialize_from(reader)?),
        GraphFormat::Json => Ok(serde_json::from_reader(reader)?),
        GraphFormat::GraphMl => Err(crate::Error::Unsupported("reading GraphML artifacts")),
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write every decade's works and citations as one directed GraphML graph.
/// Node IDs are `{decade}:{work}` so a work present in two decades stays two nodes.
pub fn write_graphml<W: Write>(artifact: &GraphArtifact, out: &mut W) -> Result<()> {
    writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(out, "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">")?;
    writeln!(out, "  <key id=\"work\" for=\"node\" attr.name=\"work\" attr.type=\"string\"/>")?;
    writeln!(out, "  <key id=\"cluster\" for=\"node\" attr.name=\"cluster\" attr.type=\"string\"/>")?;
    writeln!(out, "  <key id=\"decade\" for=\"all\" attr.name=\"decade_start\" attr.type=\"int\"/>")?;
    writeln!(out, "  <graph id=\"G\" edgedefault=\"directed\">")?;

    let mut edge_id = 0;
    for (decade, graph) in &artifact.decades {
        for node in &graph.nodes {
            let id = escape_xml(&node.id);
            writeln!(out, "    <node id=\"{decade}:{id}\">")?;
            writeln!(out, "      <data key=\"work\">{id}</data>")?;
            writeln!(out, "      <data key=\"cluster\">{}</data>", escape_xml(&node.cluster))?;
            writeln!(out, "      <data key=\"decade\">{decade}</data>")?;
            writeln!(out, "    </node>")?;
        }
        for edge in &graph.edges {
            writeln!(
                out,
                "    <edge id=\"e{}\" source=\"{}:{}\" target=\"{}:{}\"><data key=\"decade\">{}</data></edge>",
                edge_id,
                decade,
                escape_xml(&edge.from_id),
                decade,
                escape_xml(&edge.to_id),
                edge.decade_start
            )?;
            edge_id += 1;
        }
    }

    writeln!(out, "  </graph>")?;
    writeln!(out, "</graphml>")?;
    Ok(())
}
