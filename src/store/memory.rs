//! In-process record store

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{Error, Result};
use crate::model::{CitationEdge, Work};
use crate::store::{check_decade_start, DecadeRow, ExtraColumn, RecordStore, WorkFilter};

/// Works kept in ID order, with a reverse citation index
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    works: BTreeMap<String, Work>,
    citing: HashMap<String, BTreeSet<String>>,
    edges: BTreeMap<(String, String), i32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_works<I: IntoIterator<Item = Work>>(works: I) -> Self {
        let mut store = Self::new();
        for work in works {
            store.put(work);
        }
        store
    }

    pub fn get(&self, id: &str) -> Option<&Work> {
        self.works.get(id)
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }

    fn put(&mut self, work: Work) {
        if let Some(previous) = self.works.get(&work.id) {
            for r in &previous.referenced_works {
                if let Some(citers) = self.citing.get_mut(r) {
                    citers.remove(&work.id);
                }
            }
        }
        for r in &work.referenced_works {
            self.citing.entry(r.clone()).or_default().insert(work.id.clone());
        }
        self.works.insert(work.id.clone(), work);
    }
}

impl RecordStore for MemoryStore {
    fn fetch_by_filter(&self, filter: &WorkFilter) -> Result<Vec<Work>> {
        Ok(self
            .works
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect())
    }

    fn fetch_citing(&self, work_id: &str) -> Result<Vec<Work>> {
        Ok(self
            .citing
            .get(work_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.works.get(id))
            .cloned()
            .collect())
    }

    fn fetch_cited(&self, work_id: &str) -> Result<Vec<Work>> {
        let Some(work) = self.works.get(work_id) else {
            return Ok(Vec::new());
        };
        Ok(work
            .referenced_works
            .iter()
            .filter_map(|id| self.works.get(id))
            .cloned()
            .collect())
    }

    fn upsert(&mut self, work: &Work) -> Result<()> {
        self.put(work.clone());
        Ok(())
    }

    fn update_in_decade_references(&mut self, updates: &[(String, Vec<String>)]) -> Result<()> {
        for (id, refs) in updates {
            if let Some(work) = self.works.get_mut(id) {
                work.in_decade_references = refs.clone();
            }
        }
        Ok(())
    }

    fn fetch_per_decade_data(
        &self,
        decade_start: i32,
        extra_columns: &[ExtraColumn],
    ) -> Result<Vec<DecadeRow>> {
        check_decade_start(decade_start)?;
        Ok(self
            .works
            .values()
            .filter(|w| w.decade() == decade_start)
            .map(|w| DecadeRow::from_work(w, extra_columns))
            .collect())
    }

    fn insert_citation_edges(&mut self, edges: &[CitationEdge]) -> Result<usize> {
        let mut inserted = 0;
        for edge in edges {
            let key = (edge.from_id.clone(), edge.to_id.clone());
            if !self.edges.contains_key(&key) {
                self.edges.insert(key, edge.decade_start);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn execute_query(&self, _sql: &str) -> Result<Vec<Vec<String>>> {
        Err(Error::Unsupported("execute_query"))
    }
}
