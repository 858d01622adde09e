//! The search client boundary.

use async_trait::async_trait;
use derive_more::{Display, From};
use magpie_types::{Credentials, DayWindow, Post, Result};

use crate::SessionData;

/// Opaque continuation token for fetching the next page of results.
#[derive(Debug, Clone, PartialEq, Eq, Display, From)]
pub struct PageCursor(String);

impl PageCursor {
    /// Creates a cursor from its opaque string form.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The opaque token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A search scoped to a single day window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// The free-text query.
    pub text: String,
    /// The day window results must fall into.
    pub window: DayWindow,
    /// Requested results per page.
    pub page_size: usize,
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Posts on this page, in upstream order.
    pub posts: Vec<Post>,
    /// Cursor for the next page, absent on the last page.
    pub next: Option<PageCursor>,
}

/// A confirmed authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{handle}")]
pub struct Identity {
    /// Screen name the session is logged in as.
    pub handle: String,
}

impl Identity {
    /// Creates an identity from a screen name.
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
        }
    }
}

/// An authenticated search client owned by exactly one worker.
///
/// All methods take `&self` so callers can re-issue an operation through a
/// retry policy without re-borrowing; implementations synchronize any
/// interior connection or cookie state themselves.
///
/// Failures are reported through the [`magpie_types::HarvestError`]
/// taxonomy: `ResourceGone` for a permanently missing target, `RateLimited`
/// for throttling, `Transient` for anything else recoverable.
#[async_trait]
pub trait SearchSession: Send + Sync {
    /// Resumes a previously persisted session.
    async fn restore(&self, session: &SessionData) -> Result<Identity>;

    /// Authenticates from scratch, returning the session to persist.
    async fn login(&self, credentials: &Credentials) -> Result<SessionData>;

    /// Fetches the identity the session is currently authenticated as.
    async fn identity(&self) -> Result<Identity>;

    /// Fetches one page of search results.
    ///
    /// Passing no cursor fetches the first page; passing the cursor from a
    /// previous [`SearchPage`] fetches the following one.
    async fn search(&self, query: &SearchQuery, cursor: Option<&PageCursor>) -> Result<SearchPage>;
}

/// Creates one [`SearchSession`] per worker.
///
/// The seam the orchestrator uses to stay independent of any concrete
/// client; tests plug in scripted sessions here.
pub trait SessionFactory: Send + Sync {
    /// Builds the session for the given worker and its credentials.
    fn create(&self, worker: usize, credentials: &Credentials) -> Box<dyn SearchSession>;
}
