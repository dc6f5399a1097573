//! Response guard: recovers a protected call from a `401` with one refresh and one replay.
//!
//! A call moves through `dispatch -> response`. A `2xx` resolves it, any other status rejects
//! it with the response preserved. Only a `401` on a call that targets a protected endpoint
//! and has not been retried yet enters the refresh path: the coordinator is asked for a fresh
//! token, and on success the call is re-dispatched exactly once with that token. The replay's
//! outcome is final, so a call reaches the transport at most twice.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenSecret},
	error::ConfigError,
	http::{ApiRequest, HttpResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{RefreshOutcome, Session, annotate},
};

/// Call captured by the guard, with the marker that bounds authorization retries.
#[derive(Clone, Debug)]
pub struct PendingRequest {
	/// Call exactly as the caller described it, before annotation.
	pub original: ApiRequest,
	/// Set once the call has been replayed after a refresh.
	pub already_retried: bool,
}
impl PendingRequest {
	/// Captures a call that has not been dispatched yet.
	pub fn new(original: ApiRequest) -> Self {
		Self { original, already_retried: false }
	}

	/// Returns the record for the single replay of this call.
	pub fn into_retry(self) -> Self {
		Self { original: self.original, already_retried: true }
	}

	/// Builds the replay request carrying `token` as its bearer credential.
	pub fn replay_with(&self, token: &TokenSecret) -> Result<ApiRequest, ConfigError> {
		let mut request = self.original.clone();

		request.set_bearer(token)?;

		Ok(request)
	}
}

impl<T> Session<T>
where
	T: ?Sized + HttpTransport,
{
	/// Sends `request` through the authenticated pipeline.
	///
	/// Non-2xx responses are returned as [`Error::Api`] with status and body untouched; a
	/// `401` that could not be recovered carries the original response. The same error is
	/// returned whether the refresh failed or the session was reset (logout, login) while the
	/// call was waiting on it; check [`Session::cached_identity`] or the navigation sink to tell
	/// the two apart.
	///
	/// A `401` on a call that went out without a token while no refresh token is stored is
	/// rejected as is: there is no session left to refresh or tear down.
	pub async fn send(&self, request: ApiRequest) -> Result<HttpResponse> {
		let pending = PendingRequest::new(request);
		let path = pending.original.path.clone();
		let (sent_with, response) = self.dispatch(&pending).await?;

		if !self.should_refresh(&pending, &response)
			|| (sent_with.is_none() && self.store.get(TokenKind::Refresh)?.is_none())
		{
			return Ok(response.error_for_status(&path)?);
		}

		let retry = pending.into_retry();

		match self.coordinator.refresh_after(sent_with.as_ref()).await {
			RefreshOutcome::Refreshed(token) => self.replay(&retry, &token).await,
			RefreshOutcome::Failed | RefreshOutcome::Discarded =>
				Err(response.into_api_error(&path).into()),
		}
	}

	/// Sends `request` and decodes a `2xx` JSON body.
	pub async fn send_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let path = request.path.clone();
		let response = self.send(request).await?;

		Ok(response.json(&path)?)
	}

	/// Shorthand for a guarded `GET` that decodes JSON.
	pub async fn get_json<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.send_json(ApiRequest::get(path)).await
	}

	async fn dispatch(
		&self,
		pending: &PendingRequest,
	) -> Result<(Option<TokenSecret>, HttpResponse)> {
		let mut request = pending.original.clone();
		let sent_with = annotate(&mut request, &self.config, &self.store)?;
		let response = self.transport.send(request.resolve(&self.config)?).await?;

		Ok((sent_with, response))
	}

	fn should_refresh(&self, pending: &PendingRequest, response: &HttpResponse) -> bool {
		response.is_unauthorized()
			&& !pending.already_retried
			&& !self.config.is_auth_path(&pending.original.path)
	}

	async fn replay(&self, retry: &PendingRequest, token: &TokenSecret) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::Replay;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = retry.replay_with(token)?.resolve(&self.config)?;
				let response = self.transport.send(request).await?;

				Ok(response.error_for_status(&retry.original.path)?)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}
