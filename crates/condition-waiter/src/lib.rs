pub mod errors;
pub mod memory;
pub mod ports;
pub mod wait;

pub use errors::WaitError;
pub use memory::{MemoryDocument, NodeSpec};
pub use ports::{
    DocumentPort, Locator, MutationBatch, MutationFilter, MutationRecord, NodeHandle, Scope,
};
pub use wait::{wait_for_appearance, wait_for_stable_attribute, WaitOpts};
