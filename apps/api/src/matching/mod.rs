pub mod handlers;
pub mod rerank;
pub mod retrieval;
pub mod service;
pub mod vector;
