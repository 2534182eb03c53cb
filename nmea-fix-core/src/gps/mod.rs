// gps/mod.rs
pub mod parser;
pub mod precision;
pub mod provider;
pub mod types;

pub use parser::*;
pub use precision::*;
pub use provider::*;
pub use types::*;
