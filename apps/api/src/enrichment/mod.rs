pub mod batch;
pub mod handlers;
pub mod pipeline;
pub mod text;
pub mod worker;
