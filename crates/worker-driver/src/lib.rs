pub mod errors;
pub mod model;
pub mod page;
pub mod ports;

mod runner;

pub use errors::DriveError;
pub use model::{DriveCtx, DriveTempo, PageScript};
pub use page::MemoryPage;
pub use ports::PagePort;
pub use runner::{run, RuntimeDeps};
