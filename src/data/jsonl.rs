//! JSON Lines loading for raw bibliographic records

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

use serde::Deserialize;

use crate::data::preprocessing::{abstract_from_inverted_index, normalize_work};
use crate::error::{Error, Result};
use crate::model::Work;

#[derive(Debug, Deserialize)]
struct DisplayName {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrimaryTopic {
    display_name: Option<String>,
    field: Option<DisplayName>,
    domain: Option<DisplayName>,
}

/// A record either in the flattened corpus layout or as returned by the
/// bibliographic source (`id` URL, inverted-index abstract, nested topic)
#[derive(Debug, Deserialize)]
struct RawWork {
    #[serde(alias = "oa_id")]
    id: String,
    doi: Option<String>,
    title: Option<String>,
    publication_year: Option<i32>,
    #[serde(default)]
    cited_by_count: i64,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    abstract_inverted_index: Option<BTreeMap<String, Vec<usize>>>,
    #[serde(default)]
    referenced_works: Vec<String>,
    primary_topic: Option<PrimaryTopic>,
    domain: Option<String>,
    field: Option<String>,
    topic: Option<String>,
    #[serde(default)]
    layer: u32,
    #[serde(default)]
    in_decade_references: Vec<String>,
}

impl RawWork {
    fn into_work(self) -> Result<Option<Work>> {
        let Some(publication_year) = self.publication_year else {
            return Ok(None);
        };
        let abstract_text = match (self.abstract_text, &self.abstract_inverted_index) {
            (Some(text), _) => Some(text),
            (None, Some(index)) => abstract_from_inverted_index(index)?,
            (None, None) => None,
        };
        let (topic, field, domain) = match self.primary_topic {
            Some(pt) => (
                pt.display_name,
                pt.field.and_then(|f| f.display_name),
                pt.domain.and_then(|d| d.display_name),
            ),
            None => (self.topic, self.field, self.domain),
        };

        let mut work = Work {
            id: self.id,
            doi: self.doi,
            title: self.title,
            publication_year,
            cited_by_count: self.cited_by_count,
            abstract_text,
            referenced_works: self.referenced_works,
            domain,
            field,
            topic,
            layer: self.layer,
            in_decade_references: self.in_decade_references,
        };
        normalize_work(&mut work);
        Ok(Some(work))
    }
}

pub fn parse_line(line: &str) -> Result<Option<Work>> {
    let raw: RawWork = serde_json::from_str(line)?;
    raw.into_work()
}

/// Load one work per non-empty line; records without a publication year are skipped
pub fn load_works(path: &str) -> Result<Vec<Work>> {
    log::info!("Reading JSON Lines file: {}", path);
    let file = File::open(path).map_err(|e| Error::Input(format!("{path}: {e}")))?;

    let mut works = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed = parse_line(&line)
            .map_err(|e| Error::Input(format!("{path}:{}: {e}", lineno + 1)))?;
        match parsed {
            Some(work) => works.push(work),
            None => log::warn!("{}:{}: record has no publication year, skipped", path, lineno + 1),
        }
    }

    log::info!("Parsed {} works from {}", works.len(), path);
    Ok(works)
}
