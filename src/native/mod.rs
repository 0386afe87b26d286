/// Native module contains implementations of core traits
/// that run submissions as plain child processes of the judge,
/// without containers or any other isolation layer.
pub mod executor;
pub mod probe;
pub mod runtime;
pub mod staging;
