//! Bibliographic records and citation relations

use serde::{Deserialize, Serialize};

/// Decade boundary of a publication year (1987 -> 1980)
pub fn decade_of(year: i32) -> i32 {
    year.div_euclid(10) * 10
}

/// A bibliographic work as stored in the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    /// Short work identifier (e.g. `W2741809807`)
    pub id: String,

    #[serde(default)]
    pub doi: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    pub publication_year: i32,

    #[serde(default)]
    pub cited_by_count: i64,

    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,

    /// IDs of works cited by this one; may reference works absent from the corpus
    #[serde(default)]
    pub referenced_works: Vec<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub field: Option<String>,

    #[serde(default)]
    pub topic: Option<String>,

    /// Hop distance from the nearest seed
    #[serde(default)]
    pub layer: u32,

    /// Subset of `referenced_works` published in the same decade
    #[serde(default)]
    pub in_decade_references: Vec<String>,
}

impl Work {
    pub fn new(id: impl Into<String>, publication_year: i32) -> Self {
        Self {
            id: id.into(),
            doi: None,
            title: None,
            publication_year,
            cited_by_count: 0,
            abstract_text: None,
            referenced_works: Vec::new(),
            domain: None,
            field: None,
            topic: None,
            layer: 0,
            in_decade_references: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_citations(mut self, cited_by_count: i64) -> Self {
        self.cited_by_count = cited_by_count;
        self
    }

    pub fn with_references<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.referenced_works = refs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_classification(
        mut self,
        domain: impl Into<String>,
        field: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        self.domain = Some(domain.into());
        self.field = Some(field.into());
        self.topic = Some(topic.into());
        self
    }

    pub fn decade(&self) -> i32 {
        decade_of(self.publication_year)
    }

    /// Case-insensitive match of a search term against title, abstract and topic
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        [&self.title, &self.abstract_text, &self.topic]
            .into_iter()
            .flatten()
            .any(|text| text.to_lowercase().contains(&needle))
    }
}

/// A directed citation `from_id -> to_id` inside one decade partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CitationEdge {
    pub from_id: String,
    pub to_id: String,
    pub decade_start: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decade_floors_the_year() {
        assert_eq!(decade_of(1950), 1950);
        assert_eq!(decade_of(1959), 1950);
        assert_eq!(decade_of(1991), 1990);
        assert_eq!(decade_of(2000), 2000);
        assert_eq!(decade_of(-5), -10);
    }

    #[test]
    fn search_matches_title_or_topic() {
        let work = Work::new("W1", 1990)
            .with_title("on vector spaces of functions")
            .with_classification("Physical Sciences", "Mathematics", "Linear Algebra");
        assert!(work.matches_search("Vector Space"));
        assert!(work.matches_search("linear algebra"));
        assert!(!work.matches_search("graph theory"));
    }

    #[test]
    fn abstract_field_uses_source_column_name() {
        let json = r#"{"id":"W1","publication_year":1999,"abstract":"text"}"#;
        let work: Work = serde_json::from_str(json).unwrap();
        assert_eq!(work.abstract_text.as_deref(), Some("text"));
        assert_eq!(work.layer, 0);
        assert!(work.referenced_works.is_empty());
    }
}
