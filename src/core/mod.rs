//! Core types shared by the pool and its callers

pub mod error;
pub mod job;
pub mod result;
pub mod status;

pub use error::{PoolError, Result};
pub use job::JobRecord;
pub use result::{result_slot, ResultHandle, ResultSlot};
pub use status::{JobStatus, StatusHandle};
