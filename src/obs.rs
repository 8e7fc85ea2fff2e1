//! Spans and counters for broker flows.
//!
//! Every flow runs inside a `kroger_connect.flow` span carrying `flow` and `stage` fields.
//! With the `metrics` feature, each attempt, success, and failure also increments
//! `kroger_connect_flow_total`, labeled by `flow` and `outcome`.

mod metrics;
mod span;

pub use metrics::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authorization code + PKCE exchange.
	AuthorizationCode,
	/// Refresh token rotation.
	Refresh,
	/// Client credentials grant.
	ClientCredentials,
}
impl FlowKind {
	/// Stable label for span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::Refresh => "refresh",
			FlowKind::ClientCredentials => "client_credentials",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome recorded for a flow invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Flow entered.
	Attempt,
	/// Flow returned a token.
	Success,
	/// Flow returned an error.
	Failure,
}
impl FlowOutcome {
	/// Stable label for span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Outcome matching a flow result.
	pub fn of<T>(result: &Result<T>) -> Self {
		if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure }
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
