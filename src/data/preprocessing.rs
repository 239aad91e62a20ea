//! Record normalization and duplicate suppression

use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::model::Work;

/// Largest word position accepted in an inverted-index abstract
pub const MAX_ABSTRACT_POSITION: usize = 100_000;

/// Strip a URL prefix from a work identifier (`https://openalex.org/W12` -> `W12`)
pub fn short_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.rsplit_once('/') {
        Some((_, tail)) => tail.to_string(),
        None => trimmed.to_string(),
    }
}

/// Lowercase, trim and collapse internal whitespace
pub fn normalize_title(title: &str) -> Option<String> {
    let collapsed = title.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

pub fn normalize_doi(doi: &str) -> Option<String> {
    let doi = doi.trim().to_lowercase();
    if doi.is_empty() {
        None
    } else {
        Some(doi)
    }
}

/// Rebuild abstract text from a word -> positions inverted index.
/// Positions above `MAX_ABSTRACT_POSITION` are rejected as malformed input.
pub fn abstract_from_inverted_index(index: &BTreeMap<String, Vec<usize>>) -> Result<Option<String>> {
    let Some(max_pos) = index.values().flatten().copied().max() else {
        return Ok(None);
    };
    let len = max_pos
        .checked_add(1)
        .filter(|&len| len <= MAX_ABSTRACT_POSITION + 1)
        .ok_or_else(|| {
            Error::Input(format!(
                "abstract word position {max_pos} exceeds {MAX_ABSTRACT_POSITION}"
            ))
        })?;
    let mut words = vec![""; len];
    for (word, positions) in index {
        for &pos in positions {
            words[pos] = word.as_str();
        }
    }
    let text = words.join(" ").trim().to_string();
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Normalize identifiers and text fields in place
pub fn normalize_work(work: &mut Work) {
    work.id = short_id(&work.id);
    work.doi = work.doi.as_deref().and_then(normalize_doi);
    work.title = work.title.as_deref().and_then(normalize_title);
    work.referenced_works = work
        .referenced_works
        .iter()
        .filter(|r| !r.trim().is_empty())
        .map(|r| short_id(r))
        .collect();
    work.in_decade_references = work
        .in_decade_references
        .iter()
        .map(|r| short_id(r))
        .collect();
}

/// Keeps the first work seen per ID, DOI or normalized title
#[derive(Debug, Default)]
pub struct Deduper {
    by_id: HashSet<String>,
    by_doi: HashSet<String>,
    by_title: HashSet<String>,
}

impl Deduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the work was not seen before and is now recorded
    pub fn admit(&mut self, work: &Work) -> bool {
        let doi = work.doi.as_deref().and_then(normalize_doi);
        let title = work.title.as_deref().and_then(normalize_title);

        if self.by_id.contains(&work.id) {
            return false;
        }
        if doi.as_ref().is_some_and(|d| self.by_doi.contains(d)) {
            return false;
        }
        if title.as_ref().is_some_and(|t| self.by_title.contains(t)) {
            return false;
        }

        self.by_id.insert(work.id.clone());
        if let Some(d) = doi {
            self.by_doi.insert(d);
        }
        if let Some(t) = title {
            self.by_title.insert(t);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
