mod feature;
mod output;
mod viewport;

pub use feature::*;
pub use output::*;
pub use viewport::*;
