//! Provider descriptors (data) and strategies (behavior).
//!
//! [`ProviderDescriptor`] carries validated, HTTPS-only endpoint metadata, enabled grants, the
//! client authentication method, and scope delimiter. [`ProviderStrategy`] classifies
//! token endpoint failures into the crate error taxonomy. [`kroger`] holds the production
//! Kroger descriptor and scope names.

pub mod descriptor;
pub mod grant;
pub mod kroger;
pub mod strategy;

pub use descriptor::*;
pub use grant::*;
pub use strategy::*;
