//! Common amount, identifier and pool types

pub mod errors;
pub mod fixed_point;
pub mod identifiers;
pub mod pool;
pub mod tolerance;
