mod export;
mod loader;

pub use export::*;
pub use loader::*;
