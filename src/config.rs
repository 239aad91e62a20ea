//! Configuration for the crawl and clustering steps

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Community detection algorithm used per decade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringMethod {
    Leiden,
    Louvain,
    Components,
}

impl FromStr for ClusteringMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "leiden" => Ok(ClusteringMethod::Leiden),
            "louvain" => Ok(ClusteringMethod::Louvain),
            "components" => Ok(ClusteringMethod::Components),
            other => Err(Error::config(
                "clustering_method",
                format!("unsupported method `{other}` (expected leiden, louvain or components)"),
            )),
        }
    }
}

impl fmt::Display for ClusteringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClusteringMethod::Leiden => "leiden",
            ClusteringMethod::Louvain => "louvain",
            ClusteringMethod::Components => "components",
        };
        f.write_str(name)
    }
}

/// Seed discovery and citation crawl parameters
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Search term seeds must match
    pub search_term: String,

    /// Maximum hop count from any seed
    pub max_hops: u32,

    /// Minimum cited-by count for seeds and admitted works
    pub min_citations: i64,

    /// Works must be published strictly after this year
    pub min_year_exclusive: i32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            search_term: "vector space".to_string(),
            max_hops: 2,
            min_citations: 20,
            min_year_exclusive: 1920,
        }
    }
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_citations < 0 {
            return Err(Error::config("min_citations", "must not be negative"));
        }
        Ok(())
    }
}

/// Per-decade clustering parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub clustering_method: ClusteringMethod,

    /// First decade processed; must be a multiple of 10
    pub decade_start: i32,

    /// Last decade processed (inclusive)
    pub decade_end: i32,

    /// Minimum retained cluster size
    pub cluster_size_cutoff: usize,

    /// Maximum clusters retained per decade
    pub top_n: usize,

    /// Modularity resolution parameter
    pub resolution: f64,

    /// Seed for every random choice made by the clustering algorithm
    pub seed: u64,

    /// Upper bound on move/refine/aggregate rounds
    pub max_iterations: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            clustering_method: ClusteringMethod::Leiden,
            decade_start: 1950,
            decade_end: 2020,
            cluster_size_cutoff: 5,
            top_n: 10,
            resolution: 1.0,
            seed: 42,
            max_iterations: 10,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.decade_start.rem_euclid(10) != 0 {
            return Err(Error::config(
                "decade_start",
                format!("{} is not a multiple of 10", self.decade_start),
            ));
        }
        if self.decade_end < self.decade_start {
            return Err(Error::config(
                "decade_end",
                format!("{} is before decade_start {}", self.decade_end, self.decade_start),
            ));
        }
        if self.cluster_size_cutoff == 0 {
            return Err(Error::config("cluster_size_cutoff", "must be positive"));
        }
        if self.top_n == 0 {
            return Err(Error::config("top_n", "must be positive"));
        }
        if !(self.resolution > 0.0 && self.resolution.is_finite()) {
            return Err(Error::config("resolution", "must be a positive number"));
        }
        if self.max_iterations == 0 {
            return Err(Error::config("max_iterations", "must be positive"));
        }
        Ok(())
    }

    /// Decade boundaries processed, in order
    pub fn decades(&self) -> impl Iterator<Item = i32> {
        (self.decade_start..=self.decade_end).step_by(10)
    }
}
