//! Domain model for the students-choose-advisors dataset.
//!
//! # Responsibility
//! - Define the records both stores persist.
//! - Validate input before any store write.
//!
//! # Invariants
//! - Entity ids are positive and assigned by the caller, never by a store.
//! - A link pair `(student_id, advisor_id)` is unique.

pub mod link;
pub mod person;
