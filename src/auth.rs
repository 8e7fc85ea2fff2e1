//! Identifiers, scopes, secrets, and token models shared by flows and stores.

pub mod id;
pub mod scope;
pub mod secret;
pub mod token;

pub use id::*;
pub use scope::*;
pub use secret::*;
pub use token::{family::*, record::*};
