pub mod acquisition;
pub mod analysis;
pub mod audio;
pub mod media;
pub mod storage;
pub mod types;

pub use acquisition::*;
pub use analysis::*;
pub use audio::*;
pub use media::*;
pub use storage::*;
pub use types::*;
