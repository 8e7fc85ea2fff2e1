//! Token families and lifecycle records.

pub mod family;
pub mod record;
