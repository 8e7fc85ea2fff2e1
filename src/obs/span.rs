// crates.io
use tracing::{Span, instrument::Instrumented, span::EnteredSpan};
// self
use crate::obs::FlowKind;

/// Span wrapper used by broker flows.
#[derive(Clone, Debug)]
pub struct FlowSpan(Span);
impl FlowSpan {
	/// Creates a `kroger_connect.flow` span tagged with the flow kind and stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		Self(tracing::info_span!("kroger_connect.flow", flow = kind.as_str(), stage))
	}

	/// Enters the span for a synchronous section.
	pub fn entered(self) -> EnteredSpan {
		self.0.entered()
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.0.clone())
	}
}
