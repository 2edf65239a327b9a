use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::cache::token::TokenRecord;
use crate::error::AuthorizationError;
use crate::helpers::time::Clock;
use crate::sources::FetchToken;

type PendingToken = Shared<BoxFuture<'static, Result<TokenRecord, AuthorizationError>>>;

/// Observable state of the cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Fetching,
    Valid,
    Expired,
}

/// Token served by the cache.
pub struct CachedToken {
    pub record: TokenRecord,
    /// resolved before this read, no fetch was started or joined
    pub from_cache: bool,
    pending: PendingToken,
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("record", &self.record)
            .field("from_cache", &self.from_cache)
            .finish_non_exhaustive()
    }
}

/// Single-slot token cache.
///
/// The slot holds at most one token computation: either still running or
/// resolved. A reader joins the computation in the slot, or replaces it with a
/// new one when the slot is empty, failed or holds an expired token. The swap
/// happens under the slot lock, so concurrent readers always share one fetch.
pub struct TokenCache<S> {
    source: Arc<S>,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<PendingToken>>,
}

impl<S: FetchToken> TokenCache<S> {
    pub fn new(source: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Cached token if still valid, otherwise the result of exactly one fetch
    /// shared with every concurrent caller.
    pub async fn get_or_refresh(&self) -> Result<TokenRecord, AuthorizationError> {
        self.read().await.map(|token| token.record)
    }

    /// Same as [`TokenCache::get_or_refresh`], keeping track of where the
    /// token came from so a caller can invalidate exactly that computation.
    pub async fn read(&self) -> Result<CachedToken, AuthorizationError> {
        let (pending, from_cache) = self.current_or_fetch();
        match pending.clone().await {
            Ok(record) => Ok(CachedToken {
                record,
                from_cache,
                pending,
            }),
            Err(err) => {
                // failures are not cached: back to empty, unless someone already started over
                self.clear_if_current(&pending);
                Err(err)
            }
        }
    }

    /// Drop whatever the slot holds; the next read fetches again.
    pub fn invalidate(&self) {
        debug!("token cache invalidated");
        *self.lock_slot() = None;
    }

    /// Drop the computation `token` came from. A newer computation already in
    /// the slot is kept, so concurrent callers holding the same stale token
    /// trigger one refetch between them. Returns whether the slot was cleared.
    pub fn invalidate_stale(&self, token: &CachedToken) -> bool {
        let cleared = self.clear_if_current(&token.pending);
        if cleared {
            debug!("stale token invalidated");
        }
        cleared
    }

    fn clear_if_current(&self, pending: &PendingToken) -> bool {
        let mut slot = self.lock_slot();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(pending)) {
            *slot = None;
            return true;
        }
        false
    }

    pub fn state(&self) -> SlotState {
        let slot = self.lock_slot();
        match slot.as_ref().map(|pending| pending.peek()) {
            None => SlotState::Empty,
            Some(None) => SlotState::Fetching,
            Some(Some(Ok(record))) if record.is_valid_at(self.clock.now()) => SlotState::Valid,
            Some(Some(Ok(_))) => SlotState::Expired,
            Some(Some(Err(_))) => SlotState::Empty,
        }
    }

    /// Computation to await, and whether it is a token that was already there.
    fn current_or_fetch(&self) -> (PendingToken, bool) {
        let mut slot = self.lock_slot();
        if let Some(pending) = slot.as_ref() {
            match pending.peek() {
                None => {
                    debug!("joining in-flight token fetch");
                    return (pending.clone(), false);
                }
                Some(Ok(record)) if record.is_valid_at(self.clock.now()) => {
                    return (pending.clone(), true);
                }
                Some(Ok(record)) => {
                    debug!("cached token expired at {}, refreshing", record.expires_at);
                }
                Some(Err(_)) => {}
            }
        }

        let source = self.source.clone();
        let pending = async move { source.fetch_token().await }.boxed().shared();
        *slot = Some(pending.clone());
        (pending, false)
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<PendingToken>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> fmt::Debug for TokenCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache").finish_non_exhaustive()
    }
}
