//! Decade-bounded citation graph crawling, resolution, clustering and assembly

pub mod assemble;
pub mod cluster;
pub mod config;
pub mod crawl;
pub mod data;
pub mod error;
pub mod graph;
pub mod model;
pub mod resolve;
pub mod storage;
pub mod store;

pub use error::{Error, Result};
