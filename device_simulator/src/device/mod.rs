pub mod engine;
pub mod store;
pub mod structures;
