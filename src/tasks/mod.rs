//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expired entry sweep: purges expired fallback entries at configured intervals
//! - Recovery probe: re-enables a disabled primary store when it answers again

mod cleanup;
mod recovery;

pub use cleanup::spawn_cleanup_task;
pub use recovery::spawn_recovery_task;
