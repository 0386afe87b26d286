pub mod domain;
pub mod judge;
pub mod normalize;
pub mod pipeline;
pub mod sampler;
pub mod traits;
