//! SQL query implementations.
//!
//! Every query runs on an open transaction; callers own commit and rollback.

pub mod collections;
pub mod purchases;
pub mod table_objects;
