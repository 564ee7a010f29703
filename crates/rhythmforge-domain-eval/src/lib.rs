pub mod judge;
pub mod score;
pub mod stats;

pub use judge::*;
pub use score::*;
pub use stats::*;
