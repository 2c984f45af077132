//! Period resolution, financial rollups, record search and report export

pub mod aggregation;
pub mod export;
pub mod filter;
pub mod search;

pub use aggregation::*;
pub use export::*;
pub use filter::*;
pub use search::*;
