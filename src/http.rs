//! Transport seam for token endpoint calls.
//!
//! [`TokenHttpClient`] hands the OAuth facade short-lived [`AsyncHttpClient`] handles that
//! report the HTTP status and `Retry-After` hint of each response through a
//! [`ResponseMetadataSlot`], so error mapping can classify failures consistently no matter
//! which HTTP stack runs underneath.

// crates.io
use oauth2::AsyncHttpClient;
#[cfg(feature = "reqwest")] use oauth2::{HttpClientError, HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")] use reqwest::header::{HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// HTTP transport able to execute token requests while publishing response metadata.
///
/// Handles must own whatever they need so their request futures stay `Send`.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = oauth2::HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle that records outcomes in `slot`.
	///
	/// Implementations call [`ResponseMetadataSlot::take`] before dispatching and
	/// [`ResponseMetadataSlot::store`] once a status line is known.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Metadata from the most recent token endpoint response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response arrived.
	pub status: Option<u16>,
	/// `Retry-After` hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Shared slot carrying [`ResponseMetadata`] from the transport to the error mapper.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Removes and returns the captured metadata.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Reqwest-backed [`TokenHttpClient`].
///
/// Token endpoints answer directly, so a custom [`ReqwestClient`] passed to
/// [`with_client`](Self::with_client) should not follow redirects.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ReqwestHandle(Arc::new((self.0.clone(), slot)))
	}
}

/// Handle returned by [`ReqwestHttpClient::with_metadata`].
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHandle(Arc<(ReqwestClient, ResponseMetadataSlot)>);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let inner = Arc::clone(&self.0);

		Box::pin(async move {
			let (client, slot) = &*inner;

			slot.take();

			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			slot.store(ResponseMetadata {
				status: Some(status.as_u16()),
				retry_after: parse_retry_after(&headers, OffsetDateTime::now_utc()),
			});

			let mut converted =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap, now: OffsetDateTime) -> Option<Duration> {
	let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return Some(Duration::seconds(secs.max(0)));
	}

	let delta = OffsetDateTime::parse(raw, &Rfc2822).ok()? - now;

	delta.is_positive().then_some(delta)
}
