//! Jikan API client with rate-limit backoff.

use super::pacer::RequestPacer;
use super::request::{ItemKind, RequestSpec};
use super::transport::{ReqwestTransport, Transport, TransportError};
use super::types::*;
use crate::error::{FetchError, Result};
use serde::de::DeserializeOwned;
use shared::{BackoffKind, JikanConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Retry budget for rate-limited requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub kind: BackoffKind,
}

impl BackoffPolicy {
    pub fn fixed(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            kind: BackoffKind::Fixed,
        }
    }

    pub fn exponential(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            kind: BackoffKind::Exponential,
        }
    }

    /// Delay before the retry that follows `retry_count` earlier retries
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        match self.kind {
            BackoffKind::Fixed => self.base_delay,
            BackoffKind::Exponential => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(retry_count.min(16))),
        }
    }
}

/// Backoff bookkeeping for one fetch attempt; never shared between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    pub retry_count: u32,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl BackoffState {
    fn new(policy: &BackoffPolicy) -> Self {
        Self {
            retry_count: 0,
            max_retries: policy.max_retries,
            base_delay: policy.base_delay,
        }
    }

    fn exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Jikan API client. Retries 429 responses per its [`BackoffPolicy`]; every
/// other failure is returned to the caller immediately.
pub struct BackoffHttpClient {
    transport: Arc<dyn Transport>,
    policy: BackoffPolicy,
    request_timeout: Duration,
    pacer: Option<Mutex<RequestPacer>>,
}

impl BackoffHttpClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: BackoffPolicy,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            policy,
            request_timeout,
            pacer: None,
        }
    }

    /// Space out every send, retries included, through `pacer`
    pub fn with_pacer(mut self, pacer: RequestPacer) -> Self {
        self.pacer = Some(Mutex::new(pacer));
        self
    }

    /// Build a reqwest-backed client from the `[jikan]` config section
    pub fn from_config(config: &JikanConfig) -> anyhow::Result<Self> {
        let request_timeout = config.request_timeout();
        let transport = ReqwestTransport::new(config.base_url.clone(), request_timeout)?;
        let policy = BackoffPolicy {
            max_retries: config.max_retries,
            base_delay: config.retry_delay(),
            kind: config.backoff,
        };
        let pacer = RequestPacer::new(
            config.pacing.requests_per_second,
            config.pacing.requests_per_minute,
        );

        Ok(Self::new(Arc::new(transport), policy, request_timeout).with_pacer(pacer))
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Fetch one page of a paginated listing
    pub async fn execute(&self, request: &RequestSpec) -> Result<ItemPage> {
        self.execute_tracked(request).await.0
    }

    /// Like [`execute`](Self::execute), also reporting how many retries it took
    pub async fn execute_tracked(&self, request: &RequestSpec) -> (Result<ItemPage>, BackoffState) {
        let (body, state) = self.send_with_backoff(request).await;
        let page = body.and_then(|body| decode_page(request, &body));
        (page, state)
    }

    /// Fetch a single resource wrapped in `{ "data": ... }`
    pub async fn fetch_data<T: DeserializeOwned>(&self, request: &RequestSpec) -> Result<T> {
        let (body, _) = self.send_with_backoff(request).await;
        let response: DataResponse<T> = decode(request, &body?)?;
        Ok(response.data)
    }

    async fn send_with_backoff(&self, request: &RequestSpec) -> (Result<String>, BackoffState) {
        let mut state = BackoffState::new(&self.policy);

        loop {
            if let Some(pacer) = &self.pacer {
                pacer.lock().await.acquire().await;
            }

            debug!(request = %request, attempt = state.retry_count + 1, "Making API request");

            let response = match timeout(self.request_timeout, self.transport.send(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(TransportError::Timeout)) | Err(_) => {
                    warn!(request = %request, "Request timed out");
                    let timeout_ms = self.request_timeout.as_millis() as u64;
                    return (Err(FetchError::SlowResponse { timeout_ms }), state);
                }
                Ok(Err(TransportError::Connect(e))) => {
                    warn!(request = %request, error = %e, "Request error");
                    return (Err(FetchError::Network(e)), state);
                }
            };

            match response.status {
                200..=299 => {
                    debug!(request = %request, retries = state.retry_count, "Request successful");
                    return (Ok(response.body), state);
                }
                HTTP_TOO_MANY_REQUESTS => {
                    if state.exhausted() {
                        warn!(
                            request = %request,
                            retries = state.retry_count,
                            "Rate limit budget exhausted"
                        );
                        let retries = state.retry_count;
                        return (Err(FetchError::RateLimitExceeded { retries }), state);
                    }

                    let delay = self.policy.delay_for(state.retry_count);
                    warn!(
                        request = %request,
                        delay_ms = delay.as_millis() as u64,
                        retry = state.retry_count + 1,
                        "Rate limited by server, waiting"
                    );
                    sleep(delay).await;
                    state.retry_count += 1;
                }
                status @ 400..=499 => {
                    let message = serde_json::from_str::<JikanError>(&response.body)
                        .ok()
                        .map(|error| error.message);
                    warn!(
                        request = %request,
                        status,
                        message = message.as_deref().unwrap_or(""),
                        "Request rejected"
                    );
                    return (Err(FetchError::Client { status, message }), state);
                }
                status => {
                    warn!(request = %request, status, "Server failed request");
                    return (Err(FetchError::Server { status }), state);
                }
            }
        }
    }
}

fn decode<T: DeserializeOwned>(request: &RequestSpec, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        warn!(request = %request, error = %e, "Failed to parse response");
        FetchError::Decode(e.to_string())
    })
}

fn decode_page(request: &RequestSpec, body: &str) -> Result<ItemPage> {
    let requested_page = request.page.unwrap_or(1);
    match request.item_kind() {
        Some(ItemKind::Character) => {
            let response: PaginatedResponse<CharacterEntry> = decode(request, body)?;
            Ok(ItemPage::from_response(response, requested_page))
        }
        Some(ItemKind::Anime) => {
            let response: PaginatedResponse<AnimeEntry> = decode(request, body)?;
            Ok(ItemPage::from_response(response, requested_page))
        }
        None => Err(FetchError::Validation(format!(
            "{} is not a paginated listing",
            request.path()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::request::{Resource, SearchEndpoint};
    use crate::api::transport::RawResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::time::Instant;

    /// Replays canned responses in order and records every request it sees.
    struct Scripted {
        responses: StdMutex<VecDeque<std::result::Result<RawResponse, TransportError>>>,
        seen: StdMutex<Vec<RequestSpec>>,
    }

    impl Scripted {
        fn new(responses: Vec<std::result::Result<RawResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses.into()),
                seen: StdMutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<RequestSpec> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(
            &self,
            request: &RequestSpec,
        ) -> std::result::Result<RawResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(RawResponse::new(429, "")))
        }
    }

    struct Hangs;

    #[async_trait]
    impl Transport for Hangs {
        async fn send(
            &self,
            _request: &RequestSpec,
        ) -> std::result::Result<RawResponse, TransportError> {
            std::future::pending().await
        }
    }

    fn page_body(names: &[&str], has_next: bool) -> String {
        let data: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                serde_json::json!({
                    "mal_id": i + 1,
                    "images": { "jpg": { "image_url": null } },
                    "name": name,
                    "favorites": 10,
                })
            })
            .collect();
        serde_json::json!({
            "pagination": { "has_next_page": has_next, "current_page": 1 },
            "data": data,
        })
        .to_string()
    }

    fn client(transport: Arc<dyn Transport>, max_retries: u32) -> BackoffHttpClient {
        BackoffHttpClient::new(
            transport,
            BackoffPolicy::fixed(max_retries, Duration::from_millis(1000)),
            Duration::from_secs(5),
        )
    }

    fn search() -> RequestSpec {
        RequestSpec::search(SearchEndpoint::Characters, "naruto", 1, 20)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_budget_is_bounded() {
        let transport = Scripted::new(vec![]);
        let client = client(transport.clone(), 3);

        let start = Instant::now();
        let (result, state) = client.execute_tracked(&search()).await;

        assert_eq!(result, Err(FetchError::RateLimitExceeded { retries: 3 }));
        assert_eq!(state.retry_count, 3);
        // The original request plus exactly three retries
        assert_eq!(transport.seen().len(), 4);
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    /// Records when each send happens; always answers 429.
    struct Timed {
        sent: StdMutex<Vec<(Instant, RequestSpec)>>,
    }

    #[async_trait]
    impl Transport for Timed {
        async fn send(
            &self,
            request: &RequestSpec,
        ) -> std::result::Result<RawResponse, TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push((Instant::now(), request.clone()));
            Ok(RawResponse::new(429, ""))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_spaces_retries() {
        let transport = Arc::new(Timed {
            sent: StdMutex::new(Vec::new()),
        });
        let client = BackoffHttpClient::new(
            transport.clone(),
            BackoffPolicy::fixed(3, Duration::ZERO),
            Duration::from_secs(5),
        )
        .with_pacer(RequestPacer::new(1.0, 60));

        let result = client.execute(&search()).await;

        assert_eq!(result, Err(FetchError::RateLimitExceeded { retries: 3 }));
        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 4);
        for pair in sent.windows(2) {
            assert!(pair[1].0.duration_since(pair[0].0) >= Duration::from_secs(1));
            assert_eq!(pair[1].1, pair[0].1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_reuse_identical_request() {
        let transport = Scripted::new(vec![
            Ok(RawResponse::new(429, "")),
            Ok(RawResponse::new(429, "")),
            Ok(RawResponse::new(200, page_body(&["Naruto Uzumaki"], false))),
        ]);
        let client = client(transport.clone(), 3);

        let (result, state) = client.execute_tracked(&search()).await;

        let page = result.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(state.retry_count, 2);
        let seen = transport.seen();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|r| *r == search()));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let transport = Scripted::new(vec![Ok(RawResponse::new(400, "bad query"))]);
        let client = client(transport.clone(), 3);

        let result = client.execute(&search()).await;

        assert_eq!(
            result,
            Err(FetchError::Client {
                status: 400,
                message: None,
            })
        );
        assert_eq!(transport.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_client_error_carries_jikan_message() {
        let body = r#"{"status":404,"message":"Not Found","type":"BadResponseException"}"#;
        let transport = Scripted::new(vec![Ok(RawResponse::new(404, body))]);
        let client = client(transport, 3);

        let result = client.execute(&search()).await;

        assert_eq!(
            result,
            Err(FetchError::Client {
                status: 404,
                message: Some("Not Found".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_server_and_network_errors_fail_fast() {
        let transport = Scripted::new(vec![
            Ok(RawResponse::new(503, "")),
            Err(TransportError::Connect("refused".into())),
        ]);
        let client = client(transport.clone(), 3);

        assert_eq!(
            client.execute(&search()).await,
            Err(FetchError::Server { status: 503 })
        );
        assert_eq!(
            client.execute(&search()).await,
            Err(FetchError::Network("refused".into()))
        );
        assert_eq!(transport.seen().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_transport_times_out() {
        let client = BackoffHttpClient::new(
            Arc::new(Hangs),
            BackoffPolicy::fixed(3, Duration::from_millis(10)),
            Duration::from_millis(250),
        );

        let result = client.execute(&search()).await;
        assert_eq!(result, Err(FetchError::SlowResponse { timeout_ms: 250 }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let transport = Scripted::new(vec![Ok(RawResponse::new(200, "<html>"))]);
        let client = client(transport, 3);

        let result = client.execute(&search()).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_data_unwraps_envelope() {
        let body = r#"{"data":[{"role":"Main","anime":{"mal_id":20,"title":"Naruto"}}]}"#;
        let transport = Scripted::new(vec![Ok(RawResponse::new(200, body))]);
        let client = client(transport, 3);

        let appearances: Vec<AnimeAppearance> = client
            .fetch_data(&RequestSpec::single(Resource::CharacterAnime(17)))
            .await
            .unwrap();
        assert_eq!(appearances[0].anime.title, "Naruto");
    }

    #[test]
    fn test_exponential_delays() {
        let policy = BackoffPolicy::exponential(3, Duration::from_millis(500));
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));

        let fixed = BackoffPolicy::fixed(3, Duration::from_millis(500));
        assert_eq!(fixed.delay_for(2), Duration::from_millis(500));
    }

    #[test]
    fn test_client_from_config() {
        let config = shared::Config::default();
        assert!(BackoffHttpClient::from_config(&config.jikan).is_ok());
    }
}
