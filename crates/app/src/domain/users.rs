//! Users
//!
//! Users are owned by the upstream identity layer; this crate only references them.

use crate::uuids::TypedUuid;

/// Marker for user identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct User;

/// User UUID
pub type UserUuid = TypedUuid<User>;
