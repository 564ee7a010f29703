pub mod builder;
pub mod lanes;
pub mod model;
pub mod onset;
pub mod spectrum;

pub use builder::*;
pub use lanes::*;
pub use model::*;
pub use onset::*;
pub use spectrum::*;
