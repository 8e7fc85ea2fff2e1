// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome through the global metrics recorder, when enabled.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	tracing::trace!(flow = kind.as_str(), outcome = outcome.as_str(), "flow outcome");

	#[cfg(feature = "metrics")]
	metrics::counter!(
		"kroger_connect_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
}
