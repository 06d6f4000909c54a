mod engine;
mod layer;
mod synth;

pub use engine::*;
pub use layer::*;
pub use synth::*;
