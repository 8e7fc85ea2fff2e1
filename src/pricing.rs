//! Price rendering for product listings.

/// Formats an optional price as US dollars; prices Kroger did not supply render as `N/A`.
pub fn format_currency(value: Option<f64>) -> String {
	match value {
		Some(value) => format!("${value:.2}"),
		None => "N/A".into(),
	}
}
