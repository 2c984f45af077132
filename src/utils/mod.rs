//! Utility modules

pub mod clock;
pub mod logging;
pub mod memory_storage;
pub mod validation;

pub use clock::*;
pub use logging::*;
pub use memory_storage::*;
pub use validation::*;
