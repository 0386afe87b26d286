pub mod executor;
pub mod probe;
pub mod stager;
