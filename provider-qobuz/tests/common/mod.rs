//! Scripted Qobuz API for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::MemoryCacheStore;
use bridge_traits::cache::CacheStore;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::{Clock, FixedClock};
use bytes::Bytes;
use core_runtime::config::ProviderConfig;
use provider_qobuz::QobuzProvider;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

pub const BASE_URL: &str = "https://www.qobuz.com/api.json/0.2";
pub const APP_ID: &str = "100000000";
pub const APP_SECRET: &str = "app-secret";
pub const NOW: i64 = 1_700_000_000;

/// A request as seen by the fake server
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: HttpMethod,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

impl Recorded {
    pub fn token(&self) -> Option<&str> {
        self.headers.get("X-User-Auth-Token").map(String::as_str)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

type Handler = Box<dyn Fn(&Recorded) -> (u16, String) + Send + Sync>;

pub struct FakeQobuz {
    handler: Handler,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeQobuz {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Serves `user/login` with [`login_payload`] and delegates the rest
    pub fn with_login<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    {
        Self::new(move |req| {
            if req.path == "user/login" {
                ok(login_payload("tok-1"))
            } else {
                handler(req)
            }
        })
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }
}

#[async_trait]
impl HttpClient for FakeQobuz {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let recorded = parse_request(&request);
        let (status, body) = (self.handler)(&recorded);
        self.requests.lock().unwrap().push(recorded);

        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body),
        })
    }
}

fn parse_request(request: &HttpRequest) -> Recorded {
    let url = request
        .url
        .strip_prefix(BASE_URL)
        .unwrap_or(&request.url)
        .trim_start_matches('/');
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    let query = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| {
            (
                urlencoding::decode(k).unwrap().into_owned(),
                urlencoding::decode(v).unwrap().into_owned(),
            )
        })
        .collect();

    Recorded {
        method: request.method,
        path: path.to_string(),
        query,
        headers: request.headers.clone(),
        body: request
            .body
            .as_ref()
            .map(|b| serde_json::from_slice(b).unwrap()),
    }
}

pub fn ok(payload: Value) -> (u16, String) {
    (200, payload.to_string())
}

pub fn api_error(status: u16, message: &str) -> (u16, String) {
    (
        status,
        json!({"status": "error", "code": status, "message": message}).to_string(),
    )
}

pub fn login_payload(token: &str) -> Value {
    json!({
        "user_auth_token": token,
        "user": {
            "id": 42,
            "display_name": "Listener",
            "device": {"id": 7},
            "credential": {"id": 9}
        }
    })
}

pub fn config() -> ProviderConfig {
    ProviderConfig::builder()
        .enabled(true)
        .username("listener@example.com")
        .password("secret-pass")
        .app_id(APP_ID)
        .app_secret(APP_SECRET)
        .build()
        .unwrap()
}

pub fn provider(server: &Arc<FakeQobuz>) -> QobuzProvider {
    provider_with(
        server,
        Arc::new(MemoryCacheStore::new(256)),
        Arc::new(FixedClock::at_unix(NOW)),
    )
}

/// Provider over a caller-owned cache, e.g. one shared between instances
pub fn provider_with(
    server: &Arc<FakeQobuz>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
) -> QobuzProvider {
    QobuzProvider::with_clock(config(), Arc::clone(server) as Arc<dyn HttpClient>, cache, clock)
        .unwrap()
}

pub fn playlist_json(id: u64, owner_id: u64) -> Value {
    json!({"id": id, "name": format!("Playlist {id}"), "owner": {"id": owner_id, "name": "Listener"}})
}

pub fn artist_json(id: u64, name: &str) -> Value {
    json!({"id": id, "name": name})
}

pub fn album_json(id: &str, artist_id: u64) -> Value {
    json!({
        "id": id,
        "title": format!("Album {id}"),
        "streamable": true,
        "displayable": true,
        "artist": {"id": artist_id, "name": "Miles Davis"},
        "maximum_sampling_rate": 44.1,
        "maximum_bit_depth": 16
    })
}

pub fn track_json(id: u64, performer_id: u64) -> Value {
    json!({
        "id": id,
        "title": format!("Track {id}"),
        "streamable": true,
        "displayable": true,
        "duration": 300,
        "media_number": 1,
        "track_number": 1,
        "performer": {"id": performer_id, "name": "Miles Davis"},
        "maximum_sampling_rate": 96,
        "maximum_bit_depth": 24
    })
}

/// One page of `total` generated artists, honouring `limit`/`offset`
pub fn artist_page(req: &Recorded, total: u64) -> Value {
    let limit: u64 = req.param("limit").unwrap_or("200").parse().unwrap();
    let offset: u64 = req.param("offset").unwrap_or("0").parse().unwrap();
    let items: Vec<Value> = (offset..total.min(offset + limit))
        .map(|i| artist_json(i + 1, &format!("Artist {}", i + 1)))
        .collect();
    json!({"artists": {"items": items, "total": total, "limit": limit, "offset": offset}})
}
