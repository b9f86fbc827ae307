//! Markdown formatting for records and operation results.
//!
//! Domain models implement [`std::fmt::Display`] directly (see [`models`]);
//! operation results do the same in [`reports`]. Collections are wrapped in
//! newtypes so empty listings print a sentence instead of nothing. Both the
//! CLI renderer and the MCP server print these strings as they are.
//!
//! - [`collections`]: listing wrappers (SessionSummaries, PlanListing)
//! - [`reports`]: validation, gate, audit and synthesis results
//! - [`status`]: one-line confirmations (OperationStatus)
//! - [`datetime`]: timestamp and duration formatting
//!
//! ```rust
//! use cohort_core::display::OperationStatus;
//!
//! let status = OperationStatus::success("Phase design passed");
//! assert_eq!(status.to_string(), "Success: Phase design passed\n");
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod reports;
pub mod status;

pub use collections::{PlanListing, SessionSummaries, StatusRecords};
pub use datetime::{Elapsed, LocalDateTime};
pub use status::OperationStatus;
