//! Record store interface consumed by the pipeline

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::model::{decade_of, CitationEdge, Work};

/// Predicate for `RecordStore::fetch_by_filter`. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct WorkFilter {
    /// Restrict to these IDs
    pub ids: Option<Vec<String>>,

    /// Case-insensitive term matched against title, abstract and topic
    pub search: Option<String>,

    /// Inclusive lower bound on cited-by count
    pub min_cited_by: Option<i64>,

    /// Exclusive lower bound on publication year
    pub published_after: Option<i32>,

    /// Restrict to works published in the decade starting here
    pub decade: Option<i32>,
}

impl WorkFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn matches(&self, work: &Work) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| id == &work.id) {
                return false;
            }
        }
        if let Some(term) = &self.search {
            if !work.matches_search(term) {
                return false;
            }
        }
        if let Some(min) = self.min_cited_by {
            if work.cited_by_count < min {
                return false;
            }
        }
        if let Some(year) = self.published_after {
            if work.publication_year <= year {
                return false;
            }
        }
        if let Some(decade) = self.decade {
            if decade_of(work.publication_year) != decade {
                return false;
            }
        }
        true
    }
}

/// Optional columns returned by `fetch_per_decade_data`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraColumn {
    Topic,
    Field,
    Domain,
    ReferencedWorks,
}

/// One row of the per-decade bulk read. Extra columns are `None` unless requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecadeRow {
    pub oa_id: String,
    pub in_decade_references: Vec<String>,
    pub topic: Option<String>,
    pub field: Option<String>,
    pub domain: Option<String>,
    pub referenced_works: Option<Vec<String>>,
}

impl DecadeRow {
    pub(crate) fn from_work(work: &Work, extra: &[ExtraColumn]) -> Self {
        let mut row = DecadeRow {
            oa_id: work.id.clone(),
            in_decade_references: work.in_decade_references.clone(),
            ..DecadeRow::default()
        };
        for column in extra {
            match column {
                ExtraColumn::Topic => row.topic = work.topic.clone(),
                ExtraColumn::Field => row.field = work.field.clone(),
                ExtraColumn::Domain => row.domain = work.domain.clone(),
                ExtraColumn::ReferencedWorks => {
                    row.referenced_works = Some(work.referenced_works.clone())
                }
            }
        }
        row
    }
}

/// Persistent store of works and citation edges.
///
/// Lookups that find nothing return empty results rather than errors; only
/// connectivity and query failures surface as `Err`.
pub trait RecordStore {
    fn fetch_by_filter(&self, filter: &WorkFilter) -> Result<Vec<Work>>;

    /// Works whose reference list contains `work_id`
    fn fetch_citing(&self, work_id: &str) -> Result<Vec<Work>>;

    /// Works referenced by `work_id` that are present in the store
    fn fetch_cited(&self, work_id: &str) -> Result<Vec<Work>>;

    /// Insert or replace a work keyed by its ID
    fn upsert(&mut self, work: &Work) -> Result<()>;

    fn bulk_insert(&mut self, works: &[Work]) -> Result<usize> {
        for work in works {
            self.upsert(work)?;
        }
        Ok(works.len())
    }

    /// Overwrite the in-decade reference column for the given works
    fn update_in_decade_references(&mut self, updates: &[(String, Vec<String>)]) -> Result<()>;

    fn fetch_per_decade_data(
        &self,
        decade_start: i32,
        extra_columns: &[ExtraColumn],
    ) -> Result<Vec<DecadeRow>>;

    /// Insert edges, ignoring pairs already present. Returns the number inserted.
    fn insert_citation_edges(&mut self, edges: &[CitationEdge]) -> Result<usize>;

    /// Ad-hoc query escape hatch; every value rendered as text
    fn execute_query(&self, sql: &str) -> Result<Vec<Vec<String>>>;
}

pub(crate) fn check_decade_start(decade_start: i32) -> Result<()> {
    if decade_start.rem_euclid(10) != 0 {
        return Err(crate::error::Error::config(
            "decade_start",
            format!("{decade_start} is not a multiple of 10"),
        ));
    }
    Ok(())
}
