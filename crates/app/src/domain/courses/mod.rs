//! Courses
//!
//! Course content is managed elsewhere; enrollment reads a snapshot and owns only
//! the enrolled-student counter.

pub mod records;
pub(crate) mod repository;
