//! Sample applications built on the engine.

pub mod animals;
pub mod counter;
