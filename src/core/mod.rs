pub mod engine;
pub mod generation;
pub mod normalize;
pub mod types;
