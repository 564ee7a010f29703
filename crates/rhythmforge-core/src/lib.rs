pub mod app;
pub mod clock;
pub mod generation;
pub mod ipc;
pub mod jobs;
pub mod session;
pub mod sessions;

pub use app::*;
pub use clock::*;
pub use generation::*;
pub use ipc::*;
pub use jobs::*;
pub use session::*;
pub use sessions::*;
