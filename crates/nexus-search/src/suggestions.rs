//! Debounced type-ahead suggestions across characters and anime.
//!
//! Keystrokes only re-arm a timer. When the timer elapses without further
//! input, one batch is issued: a character search and an anime search under a
//! single sequence number. Each category lands independently, so one failing
//! category still leaves the other's results on screen.

use crate::api::{BackoffHttpClient, Item, ItemPage, RequestSpec, SearchEndpoint};
use crate::error::{ErrorKind, FetchError};
use crate::sequencer::{RequestSequencer, SessionId};
use serde::Serialize;
use shared::SuggestionConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionCategory {
    Character,
    Anime,
}

impl SuggestionCategory {
    fn endpoint(&self) -> SearchEndpoint {
        match self {
            SuggestionCategory::Character => SearchEndpoint::Characters,
            SuggestionCategory::Anime => SearchEndpoint::Anime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub category: SuggestionCategory,
    pub item: Item,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryResults {
    Pending,
    Ready(Vec<Item>),
    Failed(ErrorKind),
}

impl CategoryResults {
    fn items(&self) -> &[Item] {
        match self {
            CategoryResults::Ready(items) => items,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuggestionBatch {
    pub query_text: String,
    pub sequence_number: u64,
    pub character_results: CategoryResults,
    pub anime_results: CategoryResults,
    /// Characters first, then anime, each in API relevance order
    pub merged_results: Vec<Suggestion>,
}

impl SuggestionBatch {
    fn new(query_text: String, sequence_number: u64) -> Self {
        Self {
            query_text,
            sequence_number,
            character_results: CategoryResults::Pending,
            anime_results: CategoryResults::Pending,
            merged_results: Vec::new(),
        }
    }

    fn slot(&mut self, category: SuggestionCategory) -> &mut CategoryResults {
        match category {
            SuggestionCategory::Character => &mut self.character_results,
            SuggestionCategory::Anime => &mut self.anime_results,
        }
    }

    fn remerge(&mut self) {
        let characters = self
            .character_results
            .items()
            .iter()
            .map(|item| (SuggestionCategory::Character, item));
        let anime = self
            .anime_results
            .items()
            .iter()
            .map(|item| (SuggestionCategory::Anime, item));

        self.merged_results = characters
            .chain(anime)
            .map(|(category, item)| Suggestion {
                category,
                item: item.clone(),
            })
            .collect();
    }

    pub fn is_complete(&self) -> bool {
        self.character_results != CategoryResults::Pending
            && self.anime_results != CategoryResults::Pending
    }
}

#[derive(Debug)]
enum SuggestionEvent {
    DebounceElapsed {
        generation: u64,
    },
    CategoryArrived {
        session: SessionId,
        sequence: u64,
        category: SuggestionCategory,
        result: Result<ItemPage, FetchError>,
    },
}

/// Effect of one processed event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionUpdate {
    /// The debounce window closed and a batch went out
    BatchIssued { sequence: u64 },
    /// A category landed in the current batch
    Merged {
        category: SuggestionCategory,
        error: Option<ErrorKind>,
    },
    /// A timer or category result that no longer matters
    Discarded,
}

#[derive(Debug, Clone, Copy)]
pub struct SuggestionSettings {
    pub debounce: Duration,
    pub min_query_chars: usize,
    pub limit_per_category: u32,
}

impl From<&SuggestionConfig> for SuggestionSettings {
    fn from(config: &SuggestionConfig) -> Self {
        Self {
            debounce: config.debounce_window(),
            min_query_chars: config.min_query_chars,
            limit_per_category: config.limit_per_category,
        }
    }
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self::from(&SuggestionConfig::default())
    }
}

pub struct SuggestionController {
    client: Arc<BackoffHttpClient>,
    settings: SuggestionSettings,
    sequencer: RequestSequencer,
    session: SessionId,
    query_text: String,
    debounce_generation: u64,
    debounce_timer: Option<JoinHandle<()>>,
    batch: Option<SuggestionBatch>,
    events_tx: mpsc::UnboundedSender<SuggestionEvent>,
    events_rx: mpsc::UnboundedReceiver<SuggestionEvent>,
    pending_fetches: usize,
}

impl SuggestionController {
    pub fn new(client: Arc<BackoffHttpClient>, settings: SuggestionSettings) -> Self {
        let mut sequencer = RequestSequencer::new();
        let session = sequencer.begin_session();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            client,
            settings,
            sequencer,
            session,
            query_text: String::new(),
            debounce_generation: 0,
            debounce_timer: None,
            batch: None,
            events_tx,
            events_rx,
            pending_fetches: 0,
        }
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// Merged suggestions of the current batch
    pub fn suggestions(&self) -> &[Suggestion] {
        self.batch
            .as_ref()
            .map(|batch| batch.merged_results.as_slice())
            .unwrap_or(&[])
    }

    pub fn batch(&self) -> Option<&SuggestionBatch> {
        self.batch.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.batch.as_ref().is_some_and(|batch| !batch.is_complete())
    }

    pub fn is_debouncing(&self) -> bool {
        self.debounce_timer.is_some()
    }

    /// React to an edit of the query text. Must be called from within a Tokio
    /// runtime.
    pub fn on_query_text_changed(&mut self, text: &str) {
        self.query_text = text.to_string();
        self.cancel_debounce();

        if text.trim().chars().count() < self.settings.min_query_chars {
            self.clear_suggestions();
            return;
        }

        self.debounce_generation += 1;
        let generation = self.debounce_generation;
        let window = self.settings.debounce;
        let events_tx = self.events_tx.clone();

        self.debounce_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = events_tx.send(SuggestionEvent::DebounceElapsed { generation });
        }));
    }

    /// Empty the query and drop all suggestions, including in-flight ones.
    pub fn clear_query(&mut self) {
        self.query_text.clear();
        self.cancel_debounce();
        self.clear_suggestions();
    }

    /// Wait for the next timer or category result and process it.
    ///
    /// Returns `None` when no timer is armed and no fetch is in flight.
    pub async fn next_event(&mut self) -> Option<SuggestionUpdate> {
        if self.debounce_timer.is_none() && self.pending_fetches == 0 {
            return None;
        }
        let event = self.events_rx.recv().await?;
        Some(self.handle(event))
    }

    /// Process events until the controller is quiet.
    pub async fn settle(&mut self) {
        while self.next_event().await.is_some() {}
    }

    /// Process every event that has already arrived, without waiting.
    pub fn apply_ready(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    fn cancel_debounce(&mut self) {
        if let Some(timer) = self.debounce_timer.take() {
            timer.abort();
        }
    }

    fn clear_suggestions(&mut self) {
        // In-flight category results for the old session become stale
        self.session = self.sequencer.begin_session();
        self.batch = None;
    }

    fn handle(&mut self, event: SuggestionEvent) -> SuggestionUpdate {
        match event {
            SuggestionEvent::DebounceElapsed { generation } => {
                if generation != self.debounce_generation || self.debounce_timer.is_none() {
                    return SuggestionUpdate::Discarded;
                }
                self.debounce_timer = None;
                self.issue_batch()
            }
            SuggestionEvent::CategoryArrived {
                session,
                sequence,
                category,
                result,
            } => {
                self.pending_fetches = self.pending_fetches.saturating_sub(1);
                self.apply_category(session, sequence, category, result)
            }
        }
    }

    fn issue_batch(&mut self) -> SuggestionUpdate {
        let query = self.query_text.trim().to_string();
        let sequence = self.sequencer.next_sequence(self.session);
        self.batch = Some(SuggestionBatch::new(query.clone(), sequence));

        info!(query = %query, seq = sequence, "Fetching suggestions");

        for category in [SuggestionCategory::Character, SuggestionCategory::Anime] {
            let request = RequestSpec::search(
                category.endpoint(),
                query.clone(),
                1,
                self.settings.limit_per_category,
            );
            let client = Arc::clone(&self.client);
            let events_tx = self.events_tx.clone();
            let session = self.session;

            self.pending_fetches += 1;
            tokio::spawn(async move {
                let result = client.execute(&request).await;
                let _ = events_tx.send(SuggestionEvent::CategoryArrived {
                    session,
                    sequence,
                    category,
                    result,
                });
            });
        }

        SuggestionUpdate::BatchIssued { sequence }
    }

    fn apply_category(
        &mut self,
        session: SessionId,
        sequence: u64,
        category: SuggestionCategory,
        result: Result<ItemPage, FetchError>,
    ) -> SuggestionUpdate {
        let batch = match self.batch.as_mut() {
            Some(batch) if self.sequencer.is_fresh(session, sequence) => batch,
            _ => {
                debug!(
                    seq = sequence,
                    category = ?category,
                    kind = %ErrorKind::StaleResponseDiscarded,
                    "Discarding stale suggestions"
                );
                return SuggestionUpdate::Discarded;
            }
        };

        let error = match result {
            Ok(page) => {
                *batch.slot(category) = CategoryResults::Ready(page.items);
                None
            }
            Err(err) => {
                warn!(category = ?category, error = %err, "Suggestion category failed");
                let kind = err.kind();
                *batch.slot(category) = CategoryResults::Failed(kind);
                Some(kind)
            }
        };
        batch.remerge();

        debug!(
            seq = sequence,
            category = ?category,
            merged = batch.merged_results.len(),
            "Merged suggestions"
        );
        SuggestionUpdate::Merged { category, error }
    }
}

impl Drop for SuggestionController {
    fn drop(&mut self) {
        self.cancel_debounce();
    }
}
