// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by session flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("bearer_session.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warning that a session was torn down and where the user is sent.
pub fn session_terminated(redirect: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(redirect, "refresh failed; session terminated");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = redirect;
	}
}

/// Emits a debug event when a call joins an in-flight refresh instead of starting one.
pub fn refresh_coalesced(queued: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(queued, "waiting on in-flight refresh");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = queued;
	}
}

/// Emits an error when a teardown redirected the user but could not clear the stored session.
pub fn teardown_incomplete(error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(error = %error, "session teardown left credentials in the store");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Emits a warning when a stored token could not be read and is treated as absent.
pub fn token_unreadable(error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %error, "stored access token unreadable; treating it as absent");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Emits a debug event when a cached identity no longer parses and is ignored.
pub fn identity_discarded(error: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(error = %error, "could not parse cached identity");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
