//! Kroger public API credentials, OAuth 2.0 tokens, and local session state in one crate.
//!
//! Load the developer application's settings with [`config::KrogerConfig`], build a
//! [`session::KrogerSession`] from them, and ask it for application or user tokens. The session
//! keeps tokens cached, refreshes user tokens from the token file when possible, and reports
//! [`Error::AuthenticationRequired`] when the customer must sign in again.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod preferences;
pub mod pricing;
pub mod provider;
pub mod session;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, hash_map::DefaultHasher},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tracing_subscriber as _};
