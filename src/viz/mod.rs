pub mod engine;
pub mod extract;
pub mod host;
pub mod resolver;
pub mod style;
pub mod viewport;
