//! Graph representations and algorithms

pub mod algorithms;
pub mod builder;
pub mod citation;
pub mod compressed;

pub use citation::CitationGraph;
pub use compressed::CompressedGraph;
