//! Throttled HTTP transport
//!
//! Every outbound call of a provider instance goes through one
//! [`RateLimiter`]: at most `max_requests` dispatches inside any sliding
//! window of `period`. Callers over budget sleep until the oldest slot in the
//! window expires.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_runtime::config::RateLimitConfig;
use core_runtime::logging::redact_if_sensitive;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, trace, warn};

use crate::error::{QobuzError, Result};
use crate::types::Params;

/// Longest body excerpt written to the log on failure
const LOGGED_BODY_LIMIT: usize = 512;

/// Sliding-window rate limiter shared by all requests
pub struct RateLimiter {
    max_requests: usize,
    period: Duration,
    dispatched: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests.max(1) as usize,
            period: config.period,
            dispatched: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait for a free slot and claim it
    pub async fn acquire(&self) {
        loop {
            let mut dispatched = self.dispatched.lock().await;
            let now = Instant::now();

            while let Some(&oldest) = dispatched.front() {
                if now.duration_since(oldest) >= self.period {
                    dispatched.pop_front();
                } else {
                    break;
                }
            }

            let wait = match dispatched.front() {
                Some(&oldest) if dispatched.len() >= self.max_requests => {
                    self.period - now.duration_since(oldest)
                }
                _ => {
                    dispatched.push_back(now);
                    return;
                }
            };

            drop(dispatched);
            debug!(wait_ms = wait.as_millis() as u64, "Rate limiting: waiting for a slot");
            sleep(wait).await;
        }
    }
}

/// HTTP access to the Qobuz JSON API behind the shared [`RateLimiter`]
pub struct ThrottledTransport {
    http: Arc<dyn HttpClient>,
    limiter: RateLimiter,
    base_url: String,
    app_id: String,
    timeout: Duration,
}

impl ThrottledTransport {
    pub fn new(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        rate_limit: RateLimitConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            limiter: RateLimiter::new(rate_limit),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            timeout,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    fn url(&self, endpoint: &str, params: &Params) -> String {
        let mut url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    /// GET an endpoint. `auth_token` is sent as `X-User-Auth-Token` when set.
    #[instrument(skip(self, params, auth_token))]
    pub async fn get(
        &self,
        endpoint: &str,
        params: &Params,
        auth_token: Option<&str>,
    ) -> Result<Value> {
        let mut request = HttpRequest::new(HttpMethod::Get, self.url(endpoint, params))
            .header("X-App-Id", self.app_id.as_str())
            .timeout(self.timeout);
        if let Some(token) = auth_token {
            request = request.header("X-User-Auth-Token", token);
        }

        self.dispatch(endpoint, params, request).await
    }

    /// POST a JSON body; `app_id` and `user_auth_token` travel as query params
    #[instrument(skip(self, body, auth_token))]
    pub async fn post_json(&self, endpoint: &str, body: &Value, auth_token: &str) -> Result<Value> {
        let mut params = Params::new();
        params.insert("app_id".to_string(), self.app_id.clone());
        params.insert("user_auth_token".to_string(), auth_token.to_string());

        let request = HttpRequest::new(HttpMethod::Post, self.url(endpoint, &params))
            .timeout(self.timeout)
            .json(body)?;

        self.dispatch(endpoint, &params, request).await
    }

    async fn dispatch(&self, endpoint: &str, params: &Params, request: HttpRequest) -> Result<Value> {
        self.limiter.acquire().await;
        trace!(endpoint, method = request.method.as_str(), "Dispatching request");

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    endpoint,
                    params = %loggable_params(params),
                    error = %e,
                    "Qobuz request failed"
                );
                return Err(QobuzError::Network(e.to_string()));
            }
        };

        interpret_response(&response).map_err(|e| {
            warn!(
                endpoint,
                status = response.status,
                params = %loggable_params(params),
                body = %body_excerpt(&response),
                error = %e,
                "Qobuz request returned an error"
            );
            e
        })
    }
}

/// Turn a raw response into a JSON payload or a classified failure
fn interpret_response(response: &HttpResponse) -> Result<Value> {
    if response.status == 401 {
        return Err(QobuzError::Unauthorized(body_excerpt(response)));
    }

    let payload: Value = match response.json() {
        Ok(payload) => payload,
        Err(_) if !response.is_success() => {
            return Err(QobuzError::ApiError {
                code: response.status,
                message: body_excerpt(response),
            })
        }
        Err(e) => return Err(QobuzError::ParseError(e.to_string())),
    };

    let is_error = payload.get("error").is_some()
        || payload.get("status").and_then(Value::as_str) == Some("error");

    if is_error || !response.is_success() {
        let code = payload
            .get("code")
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(response.status);
        let message = payload
            .get("message")
            .or_else(|| payload.get("error"))
            .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
            .unwrap_or_else(|| "unknown error".to_string());

        if code == 401 {
            return Err(QobuzError::Unauthorized(message));
        }
        return Err(QobuzError::ApiError { code, message });
    }

    let empty = match &payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        return Err(QobuzError::ApiError {
            code: response.status,
            message: "empty response".to_string(),
        });
    }

    Ok(payload)
}

fn loggable_params(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, redact_if_sensitive(k, v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn body_excerpt(response: &HttpResponse) -> String {
    let text = String::from_utf8_lossy(&response.body);
    text.chars().take(LOGGED_BODY_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::params;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn transport(mock: MockHttp) -> ThrottledTransport {
        ThrottledTransport::new(
            Arc::new(mock),
            "https://www.qobuz.com/api.json/0.2/",
            "100000000",
            RateLimitConfig::default(),
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn test_get_sends_headers_and_query() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url
                        == "https://www.qobuz.com/api.json/0.2/catalog/search?limit=5&query=kind%20of%20blue"
                    && req.headers.get("X-App-Id") == Some(&"100000000".to_string())
                    && req.headers.get("X-User-Auth-Token") == Some(&"tok".to_string())
            })
            .times(1)
            .returning(|_| Ok(response(200, r#"{"albums": {"items": [], "total": 0}}"#)));

        let payload = transport(mock)
            .get(
                "catalog/search",
                &params([("query", "kind of blue"), ("limit", "5")]),
                Some("tok"),
            )
            .await
            .unwrap();

        assert_eq!(payload["albums"]["total"], 0);
    }

    #[tokio::test]
    async fn test_login_has_no_token_header() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .withf(|req| !req.headers.contains_key("X-User-Auth-Token"))
            .times(1)
            .returning(|_| Ok(response(200, r#"{"user_auth_token": "tok"}"#)));

        let result = transport(mock)
            .get("user/login", &params([("username", "u")]), None)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_error_field_is_api_error() {
        let mut mock = MockHttp::new();
        mock.expect_execute().returning(|_| {
            Ok(response(
                400,
                r#"{"status": "error", "code": 400, "message": "Invalid argument: album_id"}"#,
            ))
        });

        let err = transport(mock)
            .get("album/get", &Params::new(), Some("tok"))
            .await
            .unwrap_err();

        match err {
            QobuzError::ApiError { code, message } => {
                assert_eq!(code, 400);
                assert!(message.contains("album_id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_401_is_unauthorized() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(response(401, r#"{"status": "error", "code": 401}"#)));

        let err = transport(mock)
            .get("favorite/getUserFavorites", &Params::new(), Some("stale"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_json_error_code_401_is_unauthorized() {
        let mut mock = MockHttp::new();
        mock.expect_execute().returning(|_| {
            Ok(response(
                200,
                r#"{"status": "error", "code": 401, "message": "User authentication is required."}"#,
            ))
        });

        let err = transport(mock)
            .get("track/get", &Params::new(), Some("stale"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_non_json_body_is_parse_error() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .returning(|_| Ok(response(200, "<html>maintenance</html>")));

        let err = transport(mock)
            .get("track/get", &Params::new(), Some("tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, QobuzError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_empty_payload_is_failure() {
        let mut mock = MockHttp::new();
        mock.expect_execute().returning(|_| Ok(response(200, "{}")));

        let result = transport(mock)
            .get("track/get", &Params::new(), Some("tok"))
            .await;
        assert!(matches!(result, Err(QobuzError::ApiError { .. })));
    }

    #[tokio::test]
    async fn test_network_failure() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .returning(|_| Err(BridgeError::OperationFailed("Request timed out".to_string())));

        let err = transport(mock)
            .get("track/get", &Params::new(), Some("tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, QobuzError::Network(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn test_post_json_sends_body_and_credentials() {
        let mut mock = MockHttp::new();
        mock.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Post
                    && req.url
                        == "https://www.qobuz.com/api.json/0.2/track/reportStreamingStart?app_id=100000000&user_auth_token=tok"
                    && req.body.as_deref() == Some(br#"[{"track_id":"1"}]"#.as_slice())
            })
            .times(1)
            .returning(|_| Ok(response(200, r#"{"status": "success"}"#)));

        let result = transport(mock)
            .post_json(
                "track/reportStreamingStart",
                &serde_json::json!([{"track_id": "1"}]),
                "tok",
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_allows_two_per_second() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_is_shared_between_tasks() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            max_requests: 2,
            period: Duration::from_secs(1),
        }));
        let start = Instant::now();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        // No 1s window holds more than two dispatches
        for pair in times.windows(3) {
            assert!(pair[2].duration_since(pair[0]) >= Duration::from_secs(1));
        }
        assert!(times[5].duration_since(start) >= Duration::from_secs(2));
    }
}
