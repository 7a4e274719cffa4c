pub mod snapshot;
pub mod types;

pub use snapshot::Snapshot;
pub use types::{Metadata, WindowId, WindowRecord, WindowShape};
