//! Single-flight refresh coordination.
//!
//! The first caller that needs a fresh access token while no exchange is running becomes the
//! owner of a new expiry episode and performs the refresh exchange. Every caller that arrives
//! while the episode is open is queued as a waiter and receives the owner's outcome, in the
//! order it registered, once the exchange settles. The check-then-set on the in-progress flag
//! runs under one lock that is never held across an `.await`.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{TokenKind, TokenSecret},
	http::HttpTransport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{RefreshGrant, SessionTerminator, TokenExchange},
	store::CredentialStore,
};

/// Result handed to the owner and every waiter of an expiry episode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The exchange succeeded and the new access token is already persisted.
	Refreshed(TokenSecret),
	/// The exchange failed; the session has been torn down.
	Failed,
	/// The episode was abandoned by [`RefreshCoordinator::reset`] or by its owner being dropped.
	Discarded,
}
impl RefreshOutcome {
	/// Returns the fresh token, if any.
	pub fn token(self) -> Option<TokenSecret> {
		match self {
			Self::Refreshed(token) => Some(token),
			Self::Failed | Self::Discarded => None,
		}
	}
}

struct Waiter {
	seq: u64,
	tx: oneshot::Sender<RefreshOutcome>,
}

#[derive(Default)]
struct RefreshState {
	in_progress: bool,
	episode: u64,
	next_seq: u64,
	waiters: VecDeque<Waiter>,
}
impl RefreshState {
	fn begin(&mut self) -> u64 {
		self.in_progress = true;
		self.episode += 1;

		self.episode
	}

	/// Queues a waiter after pruning the ones whose callers went away.
	fn enqueue(&mut self) -> oneshot::Receiver<RefreshOutcome> {
		let (tx, rx) = oneshot::channel();

		self.waiters.retain(|waiter| !waiter.tx.is_canceled());
		self.waiters.push_back(Waiter { seq: self.next_seq, tx });
		self.next_seq += 1;

		rx
	}

	fn owns(&self, episode: u64) -> bool {
		self.in_progress && self.episode == episode
	}

	fn take_waiters(&mut self) -> VecDeque<Waiter> {
		mem::take(&mut self.waiters)
	}

	/// Ends the current episode; dropped waiters observe [`RefreshOutcome::Discarded`].
	fn reset(&mut self) -> usize {
		let discarded = self.waiters.len();

		self.in_progress = false;
		self.episode += 1;
		self.waiters.clear();

		discarded
	}
}

enum Ticket {
	Owner(u64),
	Waiter(oneshot::Receiver<RefreshOutcome>),
	Ready(RefreshOutcome),
}

/// Ends the episode if the owning future is dropped before the exchange settles.
struct AbandonGuard<'a> {
	state: &'a Mutex<RefreshState>,
	metrics: &'a RefreshMetrics,
	episode: u64,
	armed: bool,
}
impl Drop for AbandonGuard<'_> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}

		let mut state = self.state.lock();

		if state.owns(self.episode) {
			let discarded = state.reset();

			self.metrics.record_discarded(discarded);
		}
	}
}

/// Guarantees at most one refresh exchange per expiry episode.
pub struct RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	exchange: TokenExchange<T>,
	store: CredentialStore,
	terminator: SessionTerminator,
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl<T> RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an idle coordinator.
	pub fn new(
		exchange: TokenExchange<T>,
		store: CredentialStore,
		terminator: SessionTerminator,
	) -> Self {
		Self {
			exchange,
			store,
			terminator,
			state: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Authentication endpoint client used for the refresh exchange.
	pub fn exchange(&self) -> &TokenExchange<T> {
		&self.exchange
	}

	/// Counters describing every episode handled so far.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns `true` while an exchange is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().in_progress
	}

	/// Number of callers currently queued behind the in-flight exchange.
	pub fn pending_waiters(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Returns a fresh access token, starting or joining the current expiry episode.
	pub async fn ensure_fresh_token(&self) -> RefreshOutcome {
		self.refresh_after(None).await
	}

	/// Like [`ensure_fresh_token`](Self::ensure_fresh_token), for a call rejected while
	/// carrying `rejected`.
	///
	/// If no episode is open and the stored access token already differs from `rejected`, an
	/// earlier episode has replaced it and that token is returned without a new exchange.
	pub async fn refresh_after(&self, rejected: Option<&TokenSecret>) -> RefreshOutcome {
		match self.ticket(rejected) {
			Ticket::Ready(outcome) => outcome,
			Ticket::Waiter(rx) => rx.await.unwrap_or(RefreshOutcome::Discarded),
			Ticket::Owner(episode) => self.run_episode(episode).await,
		}
	}

	/// Abandons the current episode: clears the in-progress flag and drops queued waiters.
	///
	/// An exchange still running under the abandoned episode neither persists its token nor
	/// tears the session down when it completes.
	pub fn reset(&self) {
		let discarded = self.state.lock().reset();

		self.metrics.record_discarded(discarded);
	}

	fn ticket(&self, rejected: Option<&TokenSecret>) -> Ticket {
		let mut state = self.state.lock();

		if state.in_progress {
			let rx = state.enqueue();

			self.metrics.record_coalesced();
			obs::refresh_coalesced(state.waiters.len());

			return Ticket::Waiter(rx);
		}
		if let Some(current) = self.replaced_token(rejected) {
			self.metrics.record_reused();

			return Ticket::Ready(RefreshOutcome::Refreshed(current));
		}

		Ticket::Owner(state.begin())
	}

	fn replaced_token(&self, rejected: Option<&TokenSecret>) -> Option<TokenSecret> {
		let rejected = rejected?;
		// An unreadable store means no replacement is known; the caller falls through to a
		// regular episode.
		let current = match self.store.get(TokenKind::Access) {
			Ok(current) => current?,
			Err(e) => {
				obs::token_unreadable(&e);

				return None;
			},
		};

		(&current != rejected).then_some(current)
	}

	async fn run_episode(&self, episode: u64) -> RefreshOutcome {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "ensure_fresh_token");
		let mut abandon =
			AbandonGuard { state: &self.state, metrics: &self.metrics, episode, armed: true };

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span.instrument(self.exchange_stored_refresh()).await;

		abandon.armed = false;
		obs::record_result(KIND, &result);

		self.settle(episode, result)
	}

	async fn exchange_stored_refresh(&self) -> Result<RefreshGrant> {
		let refresh = self.store.get(TokenKind::Refresh)?.ok_or(Error::NotAuthenticated)?;

		self.exchange.refresh(&refresh).await
	}

	fn persist(&self, grant: &RefreshGrant) -> Result<()> {
		match &grant.refresh {
			Some(rotated) => self.store.set_access_and_refresh(&grant.access, rotated)?,
			None => self.store.set_access(&grant.access)?,
		}

		Ok(())
	}

	fn settle(&self, episode: u64, result: Result<RefreshGrant>) -> RefreshOutcome {
		let (outcome, waiters) = {
			let mut state = self.state.lock();

			if !state.owns(episode) {
				return RefreshOutcome::Discarded;
			}

			match result.and_then(|grant| self.persist(&grant).map(|()| grant.access)) {
				Ok(token) => {
					state.in_progress = false;

					(RefreshOutcome::Refreshed(token), state.take_waiters())
				},
				// The flag stays set until the terminator resets it so no new episode can open
				// against credentials that are about to be cleared.
				Err(_) => (RefreshOutcome::Failed, state.take_waiters()),
			}
		};

		match outcome {
			RefreshOutcome::Refreshed(_) => self.metrics.record_success(),
			_ => {
				self.metrics.record_failure();

				if let Err(e) = self.terminator.terminate(self) {
					self.metrics.record_teardown_failure();
					obs::teardown_incomplete(&e);
				}
			},
		}

		for waiter in waiters {
			let _ = waiter.tx.send(outcome.clone());
		}

		outcome
	}
}
impl<T> Debug for RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RefreshCoordinator")
			.field("in_progress", &state.in_progress)
			.field("episode", &state.episode)
			.field("waiters", &state.waiters.len())
			.finish()
	}
}
