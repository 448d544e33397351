//! Scripted collaborators for controller scenarios

use async_trait::async_trait;
use odata_harvest::auth::{AuthError, Authenticator};
use odata_harvest::cache::{
    CacheStore, MemoryObjectStore, ObjectStore, ObjectStoreError, ObjectStoreResult,
};
use odata_harvest::crawler::{Controller, ControllerSettings};
use odata_harvest::frontier::{Frontier, FrontierError, FrontierResult, SetStore};
use odata_harvest::transport::{CookieSet, HttpRequest, HttpResponse, Transport, TransportError};
use odata_harvest::url::Scope;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const ROOT: &str = "https://crm.example.com/Org.svc/";

/// Absolute URL under the service root
pub fn svc(path: &str) -> String {
    Url::parse(ROOT).unwrap().join(path).unwrap().to_string()
}

pub fn service_root(names: &[&str]) -> String {
    serde_json::json!({ "d": { "EntitySets": names } }).to_string()
}

pub fn page(ids: &[u32], next: Option<&str>) -> String {
    let results: Vec<_> = ids.iter().map(|id| serde_json::json!({ "Id": id })).collect();
    let document = match next {
        Some(next) => serde_json::json!({ "d": { "results": results, "__next": next } }),
        None => serde_json::json!({ "d": { "results": results } }),
    };
    document.to_string()
}

/// One scripted reply
#[derive(Clone)]
pub enum Reply {
    Status(u16),
    Body(String),
}

/// Answers each URL from its own queue; the last reply repeats
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, replies: Vec<Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(Url::parse(url).unwrap().to_string(), replies.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        let url = Url::parse(url).unwrap().to_string();
        self.requests().iter().filter(|r| **r == url).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        _cookies: &CookieSet,
    ) -> Result<HttpResponse, TransportError> {
        let url = request.url.to_string();
        self.requests.lock().unwrap().push(url.clone());

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(&url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        Ok(match reply {
            Some(Reply::Body(body)) => HttpResponse::new(200, request.url.clone())
                .with_header("Content-Type", "application/json")
                .with_body(body),
            Some(Reply::Status(status)) => HttpResponse::new(status, request.url.clone())
                .with_header("Location", "https://sts.example.com/adfs/ls/"),
            None => HttpResponse::new(404, request.url.clone()),
        })
    }
}

/// Hands out `session-<n>` tokens and counts logins
#[derive(Default)]
pub struct CountingAuthenticator {
    logins: AtomicUsize,
}

impl CountingAuthenticator {
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for CountingAuthenticator {
    async fn login(&self) -> Result<CookieSet, AuthError> {
        let n = self.logins.fetch_add(1, Ordering::SeqCst);
        let mut cookies = CookieSet::new(".example.com");
        cookies.insert("MSISAuth", format!("session-{}", n));
        Ok(cookies)
    }
}

pub fn settings(seeds: &[&str], entities: &[&str]) -> ControllerSettings {
    let mut settings = ControllerSettings::new(
        seeds.iter().map(|s| Url::parse(s).unwrap()).collect(),
        entities.iter().map(|e| e.to_string()).collect(),
        Scope::new(["crm.example.com"]),
    );
    settings.retry_delay = Duration::from_millis(1);
    settings
}

/// A controller over the given collaborators with an in-memory cache
pub fn controller(
    settings: ControllerSettings,
    transport: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn ObjectStore>,
    frontier: Frontier,
) -> Controller {
    Controller::new(
        settings,
        transport,
        authenticator,
        CacheStore::new(store, "httpcache"),
        frontier,
    )
}

pub fn memory_store() -> Arc<dyn ObjectStore> {
    Arc::new(MemoryObjectStore::new())
}

/// Object store whose disk is gone: every call is an I/O error
pub struct BrokenObjectStore;

fn disk_error(key: &str) -> ObjectStoreError {
    ObjectStoreError::Io {
        key: key.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "disk unavailable"),
    }
}

#[async_trait]
impl ObjectStore for BrokenObjectStore {
    async fn read(&self, key: &str) -> ObjectStoreResult<Vec<u8>> {
        Err(disk_error(key))
    }

    async fn write(&self, key: &str, _bytes: &[u8]) -> ObjectStoreResult<()> {
        Err(disk_error(key))
    }

    async fn delete_many(&self, keys: &[String]) -> ObjectStoreResult<()> {
        Err(disk_error(keys.first().map(String::as_str).unwrap_or("")))
    }

    async fn list(&self, prefix: &str) -> ObjectStoreResult<Vec<String>> {
        Err(disk_error(prefix))
    }
}

/// Set store that fails every operation
pub struct BrokenSetStore;

fn set_error() -> FrontierError {
    FrontierError::Io(std::io::Error::new(std::io::ErrorKind::Other, "database locked"))
}

impl SetStore for BrokenSetStore {
    fn set_add(&self, _set: &str, _member: &str) -> FrontierResult<bool> {
        Err(set_error())
    }

    fn set_remove(&self, _set: &str, _member: &str) -> FrontierResult<bool> {
        Err(set_error())
    }

    fn set_scan(&self, _set: &str, _cursor: u64, _count: usize) -> FrontierResult<(u64, Vec<String>)> {
        Err(set_error())
    }
}
