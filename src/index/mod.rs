pub mod adapter;
pub mod document;
pub mod inverted;
pub mod posting;
pub mod searcher;
pub mod writer;
