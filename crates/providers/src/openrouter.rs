use std::env;
use std::sync::LazyLock;
use std::time::Duration;

use futures::future::{AbortRegistration, Abortable};
use futures::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use shared::agent_api::{ChatMessage, CompletionResult, StreamEvent};
use shared::catalog::{ModelCatalogEntry, Pricing};
use shared::conversation::Usage;
use shared::error::ChatError;
use shared::settings::Settings;
use tracing::{debug, warn};

use crate::sse;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";
pub const APP_TITLE: &str = "LLM UI";
const REFERER: &str = "https://openrouter.ai";

/// Generation records are not queryable the instant a stream closes.
pub const GENERATION_DETAIL_DELAY: Duration = Duration::from_secs(1);

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

// ── Request types ────────────────────────────────────────────────────

/// Everything needed for one completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    /// `Some(n)` enables the web plugin with `n` results.
    pub web_search_results: Option<u32>,
    /// Catalog pricing for `model`, used to estimate cost from streamed usage.
    pub pricing: Option<Pricing>,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    plugins: Option<Vec<WebPlugin>>,
}

#[derive(Debug, Serialize)]
struct WebPlugin {
    id: &'static str,
    max_results: u32,
}

impl<'a> CompletionBody<'a> {
    fn new(req: &'a CompletionRequest) -> Self {
        Self {
            model: &req.model,
            messages: &req.messages,
            stream: true,
            max_tokens: req.max_tokens,
            plugins: req.web_search_results.map(|n| {
                vec![WebPlugin {
                    id: "web",
                    max_results: n,
                }]
            }),
        }
    }
}

// ── Streaming response types ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StreamRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    total_cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationEnvelope {
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ModelsEnvelope {
    #[serde(default)]
    data: Vec<RawModel>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    pricing: Option<Pricing>,
    #[serde(default)]
    context_length: Option<u64>,
}

impl From<RawModel> for ModelCatalogEntry {
    fn from(raw: RawModel) -> Self {
        let provider = ModelCatalogEntry::provider_of(&raw.id);
        Self {
            name: raw.name.unwrap_or_else(|| raw.id.clone()),
            description: raw.description.unwrap_or_default(),
            pricing: raw.pricing,
            provider,
            context_length: raw.context_length,
            id: raw.id,
        }
    }
}

/// What the stream phase produced before any generation lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutcome {
    pub full_content: String,
    pub request_id: Option<String>,
    pub cost_estimate: Option<f64>,
    pub usage: Option<Usage>,
}

/// Authoritative accounting for a finished generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationDetail {
    pub total_cost: Option<f64>,
    pub usage: Option<Usage>,
    pub raw: serde_json::Value,
}

impl GenerationDetail {
    fn from_data(raw: serde_json::Value) -> Self {
        let total_cost = raw.get("total_cost").and_then(|v| v.as_f64());
        let prompt = raw.get("tokens_prompt").and_then(|v| v.as_u64());
        let completion = raw.get("tokens_completion").and_then(|v| v.as_u64());
        let usage = match (prompt, completion) {
            (None, None) => None,
            (p, c) => {
                let (p, c) = (p.unwrap_or(0), c.unwrap_or(0));
                Some(Usage {
                    prompt_tokens: p,
                    completion_tokens: c,
                    total_tokens: p + c,
                })
            }
        };
        Self {
            total_cost,
            usage,
            raw,
        }
    }
}

/// Detail cost wins when present; otherwise the streamed estimate stands.
pub fn resolve_result(outcome: StreamOutcome, detail: Option<GenerationDetail>) -> CompletionResult {
    let (cost, usage, generation) = match detail {
        Some(d) => (
            d.total_cost.or(outcome.cost_estimate),
            d.usage.or(outcome.usage),
            Some(d.raw),
        ),
        None => (outcome.cost_estimate, outcome.usage, None),
    };
    CompletionResult {
        full_content: outcome.full_content,
        cost,
        usage,
        request_id: outcome.request_id,
        generation,
    }
}

fn estimate_cost(usage: &Usage, pricing: &Pricing) -> f64 {
    usage.prompt_tokens as f64 * pricing.prompt + usage.completion_tokens as f64 * pricing.completion
}

/// Drive a chunked completion body to the end, reporting progress through `on_event`.
///
/// Individual malformed records are logged and skipped. A transport error
/// aborts with `ChatError::Network`.
pub async fn consume_stream<S, B, E>(
    body: S,
    pricing: Option<&Pricing>,
    on_event: &mut impl FnMut(StreamEvent),
) -> Result<StreamOutcome, ChatError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut outcome = StreamOutcome::default();
    let events = sse::events(body);
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        let event = event.map_err(|e| ChatError::Network(e.to_string()))?;
        if event.is_done() {
            continue;
        }
        let record: StreamRecord = match serde_json::from_str(&event.data) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "skipping malformed stream record: {}",
                    ChatError::Parse(e.to_string())
                );
                continue;
            }
        };

        if let Some(content) = record
            .choices
            .first()
            .and_then(|c| c.delta.as_ref())
            .and_then(|d| d.content.as_deref())
        {
            if !content.is_empty() {
                outcome.full_content.push_str(content);
                on_event(StreamEvent::Delta(content.to_string()));
            }
        }

        if let Some(usage) = record.usage {
            if let Some(pricing) = pricing {
                let estimate = estimate_cost(&usage, pricing);
                outcome.cost_estimate = Some(estimate);
                on_event(StreamEvent::CostEstimate(estimate));
            }
            outcome.usage = Some(usage);
        }

        if let Some(id) = record.id {
            if let Some(cost) = record.total_cost {
                outcome.cost_estimate = Some(cost);
                on_event(StreamEvent::CostEstimate(cost));
            }
            outcome.request_id = Some(id);
        }
    }

    Ok(outcome)
}

// ── Client ───────────────────────────────────────────────────────────

pub struct OpenRouterClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: Option<String>, base_url: Option<&str>) -> Self {
        Self {
            http: SHARED_HTTP.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// Key from settings (or `OPENROUTER_API_KEY`), base URL from `OPENROUTER_BASE_URL`.
    pub fn from_settings(settings: &Settings) -> Self {
        let base_url = env::var(BASE_URL_ENV).ok().filter(|u| !u.trim().is_empty());
        Self::new(settings.effective_api_key(), base_url.as_deref())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE);
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    /// One full completion: request, stream, then the generation lookup.
    ///
    /// `abort` covers every phase, the detail delay included. Aborting yields
    /// `ChatError::Cancelled`, never a request error.
    pub async fn complete(
        &self,
        req: &CompletionRequest,
        abort: AbortRegistration,
        mut on_event: impl FnMut(StreamEvent),
    ) -> Result<CompletionResult, ChatError> {
        if self.api_key.is_none() {
            return Err(ChatError::missing_api_key());
        }

        let run = async {
            let outcome = self.stream_completion(req, &mut on_event).await?;
            let detail = match &outcome.request_id {
                Some(id) => {
                    tokio::time::sleep(GENERATION_DETAIL_DELAY).await;
                    match self.generation_detail(id).await {
                        Ok(detail) => Some(detail),
                        Err(e) => {
                            warn!("generation lookup for {} failed: {}", id, e);
                            None
                        }
                    }
                }
                None => None,
            };
            Ok::<_, ChatError>(resolve_result(outcome, detail))
        };

        match Abortable::new(run, abort).await {
            Ok(result) => result,
            Err(_aborted) => Err(ChatError::Cancelled),
        }
    }

    /// POST the request and consume the streamed body.
    pub async fn stream_completion(
        &self,
        req: &CompletionRequest,
        on_event: &mut impl FnMut(StreamEvent),
    ) -> Result<StreamOutcome, ChatError> {
        if self.api_key.is_none() {
            return Err(ChatError::missing_api_key());
        }

        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {} model={} messages={}", url, req.model, req.messages.len());
        let resp = self
            .authed(self.http.post(&url))
            .header("Content-Type", "application/json")
            .json(&CompletionBody::new(req))
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        let resp = check_status(resp).await?;

        consume_stream(resp.bytes_stream(), req.pricing.as_ref(), on_event).await
    }

    pub async fn generation_detail(&self, id: &str) -> Result<GenerationDetail, ChatError> {
        let url = format!("{}/generation?id={}", self.base_url, urlencoding::encode(id));
        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        let resp = check_status(resp).await?;
        let envelope: GenerationEnvelope = resp
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;
        Ok(GenerationDetail::from_data(envelope.data))
    }

    pub async fn list_models(&self) -> Result<Vec<ModelCatalogEntry>, ChatError> {
        let url = format!("{}/models", self.base_url);
        let resp = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        let resp = check_status(resp).await?;
        let envelope: ModelsEnvelope = resp
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;
        Ok(envelope.data.into_iter().map(ModelCatalogEntry::from).collect())
    }
}

async fn check_status(resp: Response) -> Result<Response, ChatError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ChatError::Request {
        status: status.as_u16(),
        message: error_message(status.as_u16(), &body),
    })
}

/// `error.message`, then `message`, then a generic line with the status.
fn error_message(status: u16, body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("API request failed with status {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::AbortHandle;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STREAM_WITH_ID: &str = "data: {\"id\":\"gen-1\",\"choices\":[{\"delta\":{\"content\":\"Hi\"}}],\"total_cost\":0.5}\n\ndata: [DONE]\n\n";

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<&'static [u8], String>> {
        let items: Vec<Result<&'static [u8], String>> =
            parts.iter().copied().map(|p| Ok(p.as_bytes())).collect();
        futures::stream::iter(items)
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "openai/gpt-4o".into(),
            messages: vec![ChatMessage::new("user", "hello")],
            max_tokens: 2048,
            web_search_results: None,
            pricing: None,
        }
    }

    #[tokio::test]
    async fn test_stream_assembles_content() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\ndata: [DONE]\n\n",
        ]);
        let mut deltas = Vec::new();
        let outcome = consume_stream(body, None, &mut |ev| {
            if let StreamEvent::Delta(text) = ev {
                deltas.push(text);
            }
        })
        .await
        .unwrap();
        assert_eq!(outcome.full_content, "Hi there");
        assert_eq!(deltas, vec!["Hi".to_string(), " there".to_string()]);
        assert_eq!(outcome.request_id, None);
    }

    #[tokio::test]
    async fn test_records_split_across_chunks_and_done_is_not_terminal() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"con",
            "tent\":\"A\"}}]}\ndata: [DONE]\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}",
        ]);
        let outcome = consume_stream(body, None, &mut |_| {}).await.unwrap();
        assert_eq!(outcome.full_content, "AB");
    }

    #[tokio::test]
    async fn test_malformed_record_is_skipped() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"one\"}}]}\n",
            "data: {not json}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" two\"}}]}\n",
        ]);
        let outcome = consume_stream(body, None, &mut |_| {}).await.unwrap();
        assert_eq!(outcome.full_content, "one two");
    }

    #[tokio::test]
    async fn test_generation_id_and_cost_estimate() {
        let body = chunks(&[
            "data: {\"id\":\"gen-1\",\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
            "data: {\"id\":\"gen-2\",\"choices\":[],\"total_cost\":0.0042}\n",
        ]);
        let mut estimates = Vec::new();
        let outcome = consume_stream(body, None, &mut |ev| {
            if let StreamEvent::CostEstimate(c) = ev {
                estimates.push(c);
            }
        })
        .await
        .unwrap();
        assert_eq!(outcome.request_id.as_deref(), Some("gen-2"));
        assert_eq!(outcome.cost_estimate, Some(0.0042));
        assert_eq!(estimates, vec![0.0042]);
    }

    #[tokio::test]
    async fn test_usage_priced_estimate() {
        let pricing = Pricing {
            prompt: 0.000001,
            completion: 0.000002,
        };
        let body = chunks(&[
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":100,\"completion_tokens\":50,\"total_tokens\":150}}\n",
        ]);
        let outcome = consume_stream(body, Some(&pricing), &mut |_| {}).await.unwrap();
        let cost = outcome.cost_estimate.unwrap();
        assert!((cost - 0.0002).abs() < 1e-12);
        assert_eq!(outcome.usage.map(|u| u.total_tokens), Some(150));
    }

    #[tokio::test]
    async fn test_transport_error_is_network_error() {
        let items: Vec<Result<&'static [u8], String>> = vec![
            Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n".as_slice()),
            Err("connection reset".into()),
        ];
        let err = consume_stream(futures::stream::iter(items), None, &mut |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, ChatError::Network("connection reset".into()));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        // Port 9 (discard) is never listening here; a real request would be a network error.
        let client = OpenRouterClient::new(Some("   ".into()), Some("http://127.0.0.1:9/api/v1"));
        let (_handle, reg) = AbortHandle::new_pair();
        let mut events = 0;
        let err = client
            .complete(&request(), reg, |_| events += 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
        assert_eq!(events, 0);
    }

    #[tokio::test]
    async fn test_abort_before_send_is_cancelled() {
        let client = OpenRouterClient::new(Some("sk-test".into()), Some("http://127.0.0.1:9/api/v1"));
        let (handle, reg) = AbortHandle::new_pair();
        handle.abort();
        let err = client.complete(&request(), reg, |_| {}).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_detail_overrides_estimate() {
        let outcome = StreamOutcome {
            full_content: "done".into(),
            request_id: Some("gen-1".into()),
            cost_estimate: Some(0.01),
            usage: None,
        };
        let detail = GenerationDetail::from_data(serde_json::json!({
            "total_cost": 0.02, "tokens_prompt": 10, "tokens_completion": 5
        }));
        let result = resolve_result(outcome.clone(), Some(detail));
        assert_eq!(result.cost, Some(0.02));
        assert_eq!(result.usage.map(|u| u.total_tokens), Some(15));
        assert!(result.generation.is_some());

        let no_cost = GenerationDetail::from_data(serde_json::json!({"model": "x"}));
        assert_eq!(resolve_result(outcome.clone(), Some(no_cost)).cost, Some(0.01));
        assert_eq!(resolve_result(outcome, None).cost, Some(0.01));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(401, r#"{"error":{"message":"No auth credentials found","code":401}}"#),
            "No auth credentials found"
        );
        assert_eq!(error_message(400, r#"{"message":"bad"}"#), "bad");
        assert_eq!(error_message(502, "<html>"), "API request failed with status 502");
    }

    #[test]
    fn test_body_carries_web_plugin() {
        let mut req = request();
        let plain = serde_json::to_value(CompletionBody::new(&req)).unwrap();
        assert_eq!(plain["stream"], true);
        assert_eq!(plain["max_tokens"], 2048);
        assert!(plain.get("plugins").is_none());

        req.web_search_results = Some(3);
        let body = serde_json::to_value(CompletionBody::new(&req)).unwrap();
        assert_eq!(body["plugins"], serde_json::json!([{"id": "web", "max_results": 3}]));
    }

    #[test]
    fn test_raw_model_transform() {
        let raw: ModelsEnvelope = serde_json::from_str(
            r#"{"data":[{"id":"anthropic/claude-3-haiku","name":"Claude 3 Haiku","description":"fast","pricing":{"prompt":"0.00000025","completion":"0.00000125"},"context_length":200000}]}"#,
        )
        .unwrap();
        let entries: Vec<ModelCatalogEntry> = raw.data.into_iter().map(Into::into).collect();
        assert_eq!(entries[0].provider, "anthropic");
        assert_eq!(entries[0].context_length, Some(200000));
        assert!(entries[0].pricing.is_some());
    }

    // ── Against a local HTTP server ──────────────────────────────────

    fn event_stream(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
    }

    async fn streaming_server(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(event_stream(body))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn client_for(server: &MockServer) -> OpenRouterClient {
        OpenRouterClient::new(Some("sk-test".into()), Some(&server.uri()))
    }

    #[tokio::test]
    async fn test_error_status_fails_before_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Invalid key", "code": 401}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/generation"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (_handle, reg) = AbortHandle::new_pair();
        let mut events = 0;
        let err = client_for(&server)
            .complete(&request(), reg, |_| events += 1)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ChatError::Request {
                status: 401,
                message: "Invalid key".into()
            }
        );
        assert_eq!(events, 0);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_failed_detail_lookup_keeps_streamed_cost() {
        let server = streaming_server(STREAM_WITH_ID).await;
        Mock::given(method("GET"))
            .and(path("/generation"))
            .and(query_param("id", "gen-1"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let (_handle, reg) = AbortHandle::new_pair();
        let result = client_for(&server).complete(&request(), reg, |_| {}).await.unwrap();
        assert_eq!(result.full_content, "Hi");
        assert_eq!(result.cost, Some(0.5));
        assert_eq!(result.request_id.as_deref(), Some("gen-1"));
        assert!(result.generation.is_none());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_detail_cost_replaces_streamed_cost() {
        let server = streaming_server(STREAM_WITH_ID).await;
        Mock::given(method("GET"))
            .and(path("/generation"))
            .and(query_param("id", "gen-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"total_cost": 0.7, "tokens_prompt": 3, "tokens_completion": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (_handle, reg) = AbortHandle::new_pair();
        let result = client_for(&server).complete(&request(), reg, |_| {}).await.unwrap();
        assert_eq!(result.cost, Some(0.7));
        assert_eq!(result.usage.map(|u| u.total_tokens), Some(4));
        assert_eq!(
            result.generation.and_then(|g| g.get("total_cost").and_then(|c| c.as_f64())),
            Some(0.7)
        );
    }

    #[tokio::test]
    async fn test_abort_during_transfer_is_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(event_stream(STREAM_WITH_ID).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let (handle, reg) = AbortHandle::new_pair();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.abort();
        });
        let mut deltas = 0;
        let err = client_for(&server)
            .complete(&request(), reg, |_| deltas += 1)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(deltas, 0);
    }

    #[tokio::test]
    async fn test_abort_during_detail_delay_is_cancelled() {
        let server = streaming_server(STREAM_WITH_ID).await;
        Mock::given(method("GET"))
            .and(path("/generation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"total_cost": 0.7}
            })))
            .expect(0)
            .mount(&server)
            .await;

        // Abort shortly after the first delta, i.e. inside the 1s detail delay.
        let (handle, reg) = AbortHandle::new_pair();
        let mut pending = Some(handle);
        let mut deltas = Vec::new();
        let err = client_for(&server)
            .complete(&request(), reg, |ev| {
                if let StreamEvent::Delta(text) = ev {
                    deltas.push(text);
                    if let Some(handle) = pending.take() {
                        tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            handle.abort();
                        });
                    }
                }
            })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(deltas, vec!["Hi".to_string()]);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_list_models_from_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "id": "openai/gpt-4o",
                    "name": "GPT-4o",
                    "pricing": {"prompt": "0.000005", "completion": "0.000015"}
                }]
            })))
            .mount(&server)
            .await;

        let models = client_for(&server).list_models().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].provider, "openai");
        assert_eq!(models[0].description, "");
        assert!((models[0].pricing.unwrap().completion - 0.000015).abs() < 1e-12);
    }
}
