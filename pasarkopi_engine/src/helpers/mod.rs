//! Small helpers shared across the engine.

mod validation;

pub use validation::is_valid_phone;
