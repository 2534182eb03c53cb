// lib.rs
#![no_std]

mod macros;

pub mod datacells;
pub mod fix;
pub mod gps;
pub mod transport;
pub mod types;

pub use datacells::DataCell;
pub use fix::*;
pub use gps::parser::{validate_checksum, NmeaReader};
pub use gps::precision::{GsaPrecision, NoPrecision, PrecisionSource};
pub use gps::provider::FieldProvider;
pub use gps::types::*;
pub use transport::*;
pub use types::*;
