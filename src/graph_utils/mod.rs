pub mod graph;
pub mod rows;
