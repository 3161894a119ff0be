//! Infinite-scroll pagination over a search endpoint.
//!
//! [`PaginationController`] owns the [`SearchSession`] and is the only thing
//! that mutates it. Commands (`submit_query`, `notify_scroll_edge`, `retry`,
//! `clear_query`) return immediately; the page fetches they start run as
//! spawned tasks and report back through a channel. Responses are applied when
//! the owner drains that channel, and only if their sequence number is still
//! the latest one issued for the active session.

use crate::api::{BackoffHttpClient, Item, ItemPage, RequestSpec, SearchEndpoint};
use crate::edge::{ScrollEdgeDetector, Viewport};
use crate::error::{ErrorKind, FetchError};
use crate::sequencer::{RequestSequencer, SessionId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Idle,
    Loading,
    Success,
    NoMore,
    Error,
}

impl SearchStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SearchStatus::Idle => "idle",
            SearchStatus::Loading => "loading",
            SearchStatus::Success => "success",
            SearchStatus::NoMore => "no_more",
            SearchStatus::Error => "error",
        }
    }
}

/// One query's pagination lifecycle
#[derive(Debug, Clone)]
pub struct SearchSession {
    pub query_text: String,
    pub session_id: SessionId,
    pub current_page: u32,
    pub page_size: u32,
    pub has_next_page: bool,
    pub total_items: Option<u32>,
    /// Append-only for the lifetime of the session
    pub accumulated_results: Vec<Item>,
    pub status: SearchStatus,
    pub last_error: Option<FetchError>,
    pub started_at: DateTime<Utc>,
}

impl SearchSession {
    fn new(session_id: SessionId, query_text: String, page_size: u32) -> Self {
        Self {
            query_text,
            session_id,
            current_page: 1,
            page_size,
            has_next_page: false,
            total_items: None,
            accumulated_results: Vec::new(),
            status: SearchStatus::Idle,
            last_error: None,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchAttempt {
    pub session_id: SessionId,
    pub sequence_number: u64,
    pub page: u32,
    pub retry_count: u32,
}

/// A finished page fetch on its way back to the controller
#[derive(Debug)]
pub struct PageOutcome {
    pub attempt: FetchAttempt,
    pub result: Result<ItemPage, FetchError>,
}

/// What applying a [`PageOutcome`] did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Applied(SearchStatus),
    Failed(ErrorKind),
    Discarded,
}

/// Read-only view handed to the rendering layer
#[derive(Debug, Clone, Serialize)]
pub struct SearchSnapshot<'a> {
    pub query: &'a str,
    pub results: &'a [Item],
    pub status: SearchStatus,
    pub is_loading: bool,
    pub has_next_page: bool,
    pub total_items: Option<u32>,
    pub error_kind: Option<ErrorKind>,
    pub started_at: DateTime<Utc>,
}

pub struct PaginationController {
    client: Arc<BackoffHttpClient>,
    endpoint: SearchEndpoint,
    page_size: u32,
    sequencer: RequestSequencer,
    session: SearchSession,
    last_attempt: Option<FetchAttempt>,
    outcomes_tx: mpsc::UnboundedSender<PageOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<PageOutcome>,
    /// Spawned fetches whose outcome has not been received yet
    outstanding: usize,
}

impl PaginationController {
    pub fn new(client: Arc<BackoffHttpClient>, endpoint: SearchEndpoint, page_size: u32) -> Self {
        let mut sequencer = RequestSequencer::new();
        let session = SearchSession::new(sequencer.begin_session(), String::new(), page_size);
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        Self {
            client,
            endpoint,
            page_size,
            sequencer,
            session,
            last_attempt: None,
            outcomes_tx,
            outcomes_rx,
            outstanding: 0,
        }
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn last_attempt(&self) -> Option<FetchAttempt> {
        self.last_attempt
    }

    /// Number of fetches still on the wire, stale ones included
    pub fn in_flight(&self) -> usize {
        self.outstanding
    }

    pub fn snapshot(&self) -> SearchSnapshot<'_> {
        SearchSnapshot {
            query: &self.session.query_text,
            results: &self.session.accumulated_results,
            status: self.session.status,
            is_loading: self.session.status == SearchStatus::Loading,
            has_next_page: self.session.has_next_page,
            total_items: self.session.total_items,
            error_kind: self.session.last_error.as_ref().map(FetchError::kind),
            started_at: self.session.started_at,
        }
    }

    /// Start a new session for `text` and fetch its first page.
    ///
    /// Blank input is rejected without touching the current session. Must be
    /// called from within a Tokio runtime.
    pub fn submit_query(&mut self, text: &str) -> Result<SessionId, FetchError> {
        let query = text.trim();
        if query.is_empty() {
            debug!("Ignoring blank query");
            return Err(FetchError::Validation("query is empty".to_string()));
        }

        self.reset_session(query.to_string());
        info!(
            query = %self.session.query_text,
            session = %self.session.session_id,
            "Starting search session"
        );
        self.issue_fetch();

        Ok(self.session.session_id)
    }

    /// Request the next page if the list end came into view.
    ///
    /// Accepted only in `Success` with more pages available. Returns whether a
    /// fetch was issued.
    pub fn notify_scroll_edge(&mut self) -> bool {
        if self.session.status != SearchStatus::Success || !self.session.has_next_page {
            debug!(
                status = self.session.status.as_str(),
                has_next_page = self.session.has_next_page,
                "Dropping scroll edge"
            );
            return false;
        }

        self.session.current_page += 1;
        self.issue_fetch();
        true
    }

    /// Feed a viewport through `detector` and forward any edge event.
    pub fn observe_viewport(
        &mut self,
        detector: &impl ScrollEdgeDetector,
        viewport: &Viewport,
    ) -> bool {
        detector.is_near_end(viewport) && self.notify_scroll_edge()
    }

    /// Reissue the failed page of the current session.
    pub fn retry(&mut self) -> bool {
        if self.session.status != SearchStatus::Error {
            return false;
        }

        info!(
            session = %self.session.session_id,
            page = self.session.current_page,
            "Retrying page"
        );
        self.issue_fetch();
        true
    }

    /// Drop the current query and everything fetched for it.
    pub fn clear_query(&mut self) {
        self.reset_session(String::new());
        debug!(session = %self.session.session_id, "Cleared query");
    }

    /// Wait for the next fetch to finish and apply it.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn next_outcome(&mut self) -> Option<Disposition> {
        if self.outstanding == 0 {
            return None;
        }
        let outcome = self.outcomes_rx.recv().await?;
        self.outstanding -= 1;
        Some(self.apply(outcome))
    }

    /// Apply outcomes until nothing is left in flight.
    pub async fn settle(&mut self) {
        while self.next_outcome().await.is_some() {}
    }

    /// Apply every outcome that has already arrived, without waiting.
    pub fn apply_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            self.outstanding = self.outstanding.saturating_sub(1);
            self.apply(outcome);
            applied += 1;
        }
        applied
    }

    fn reset_session(&mut self, query: String) {
        let session_id = self.sequencer.begin_session();
        self.session = SearchSession::new(session_id, query, self.page_size);
        self.last_attempt = None;
    }

    fn issue_fetch(&mut self) {
        let session_id = self.session.session_id;
        let attempt = FetchAttempt {
            session_id,
            sequence_number: self.sequencer.next_sequence(session_id),
            page: self.session.current_page,
            retry_count: 0,
        };
        let request = RequestSpec::search(
            self.endpoint,
            self.session.query_text.clone(),
            attempt.page,
            self.session.page_size,
        );

        self.session.status = SearchStatus::Loading;
        self.session.last_error = None;
        self.last_attempt = Some(attempt);
        self.outstanding += 1;

        debug!(
            session = %session_id,
            seq = attempt.sequence_number,
            page = attempt.page,
            "Fetching page"
        );

        let client = Arc::clone(&self.client);
        let outcomes_tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let (result, backoff) = client.execute_tracked(&request).await;
            let attempt = FetchAttempt {
                retry_count: backoff.retry_count,
                ..attempt
            };
            // The controller may already be gone
            let _ = outcomes_tx.send(PageOutcome { attempt, result });
        });
    }

    pub(crate) fn apply(&mut self, outcome: PageOutcome) -> Disposition {
        let PageOutcome { attempt, result } = outcome;

        if !self.sequencer.is_fresh(attempt.session_id, attempt.sequence_number) {
            debug!(
                session = %attempt.session_id,
                seq = attempt.sequence_number,
                page = attempt.page,
                kind = %ErrorKind::StaleResponseDiscarded,
                "Discarding stale page response"
            );
            return Disposition::Discarded;
        }
        self.last_attempt = Some(attempt);

        match result {
            Ok(page) => {
                let received = page.items.len();
                self.session.accumulated_results.extend(page.items);
                self.session.has_next_page = page.has_next_page;
                if page.total_items.is_some() {
                    self.session.total_items = page.total_items;
                }
                self.session.status = if page.has_next_page {
                    SearchStatus::Success
                } else {
                    SearchStatus::NoMore
                };

                info!(
                    session = %attempt.session_id,
                    page = attempt.page,
                    received,
                    accumulated = self.session.accumulated_results.len(),
                    retries = attempt.retry_count,
                    status = self.session.status.as_str(),
                    "Applied page"
                );
                Disposition::Applied(self.session.status)
            }
            Err(err) => {
                let kind = err.kind();
                warn!(
                    session = %attempt.session_id,
                    page = attempt.page,
                    error = %err,
                    "Page fetch failed"
                );
                self.session.status = SearchStatus::Error;
                self.session.last_error = Some(err);
                Disposition::Failed(kind)
            }
        }
    }
}
