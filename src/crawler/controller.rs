//! Crawl controller - main crawl orchestration logic
//!
//! This module drives a crawl from login to completion, including:
//! - Establishing the session and re-authenticating when it expires
//! - Fetching service roots and filtering their collections
//! - Following pagination links and keeping the frontier current
//! - Serving repeat requests from the cache
//! - Bounding concurrency and the overall crawl time

use crate::auth::{Authenticator, SsoAuthenticator};
use crate::cache::{CacheStore, FsObjectStore};
use crate::config::{parse_http_url, Config};
use crate::crawler::odata::{collection_from_url, excerpt, parse_page, parse_service_root};
use crate::crawler::report::CrawlReport;
use crate::crawler::request::{CrawlRequest, Origin};
use crate::crawler::session::SessionManager;
use crate::frontier::Frontier;
use crate::output::{FetchedPage, JsonLinesSink, NullSink, PageSink};
use crate::state::{CrawlPhase, PhaseTracker};
use crate::transport::{
    ExpiryPolicy, HttpRequest, HttpResponse, ReqwestTransport, StatusExpiry, Transport,
    TransportConfig,
};
use crate::url::{canonicalize_url, extract_domain, Scope};
use crate::{ConfigError, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use url::Url;

/// Crawl parameters resolved from the configuration
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Service roots to enumerate
    pub seeds: Vec<Url>,

    /// Collection allow-list
    pub entities: Vec<String>,

    /// Domains next links may point to
    pub scope: Scope,

    /// Re-authentications allowed per request
    pub max_retries: u32,

    /// Retries allowed per request for transient failures
    pub transient_retries: u32,

    /// Pause before a transient retry
    pub retry_delay: Duration,

    /// Maximum number of requests in flight
    pub max_concurrent: usize,

    /// Optional bound on the whole crawl
    pub crawl_timeout: Option<Duration>,
}

impl ControllerSettings {
    /// Settings with the default retry and concurrency limits
    pub fn new(seeds: Vec<Url>, entities: Vec<String>, scope: Scope) -> Self {
        Self {
            seeds,
            entities,
            scope,
            max_retries: 5,
            transient_retries: 3,
            retry_delay: Duration::from_millis(500),
            max_concurrent: 8,
            crawl_timeout: None,
        }
    }

    /// Resolves the crawl parameters from a validated configuration
    ///
    /// Without `allowed-domains` the scope is the base URL host.
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        let seeds = config
            .service
            .seeds
            .iter()
            .map(|seed| parse_http_url("seed", seed))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let scope = if config.service.allowed_domains.is_empty() {
            let base_url = parse_http_url("base-url", &config.service.base_url)?;
            let host = extract_domain(&base_url).ok_or_else(|| {
                ConfigError::InvalidUrl(format!("base-url has no host: '{}'", base_url))
            })?;
            Scope::new([host])
        } else {
            Scope::new(&config.service.allowed_domains)
        };

        let crawler = &config.crawler;
        Ok(Self {
            seeds,
            entities: crawler.entities.clone(),
            scope,
            max_retries: crawler.max_retries,
            transient_retries: crawler.transient_retries,
            retry_delay: Duration::from_millis(crawler.retry_delay_ms),
            max_concurrent: crawler.max_concurrent_requests as usize,
            crawl_timeout: crawler.crawl_timeout_secs.map(Duration::from_secs),
        })
    }

    /// Returns true if the collection is on the allow-list
    ///
    /// Names match exactly, or with the `Set` suffix the service appends to
    /// entity names (`account` allows `accountSet`).
    pub fn allows_collection(&self, name: &str) -> bool {
        self.entities
            .iter()
            .any(|entity| entity == name || name.strip_suffix("Set") == Some(entity.as_str()))
    }
}

/// Orchestrates authentication, caching, frontier and fetching for one crawl
pub struct Controller {
    settings: ControllerSettings,
    transport: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
    cache: CacheStore,
    frontier: Frontier,
    expiry: Arc<dyn ExpiryPolicy>,
    sink: Arc<dyn PageSink>,
}

impl Controller {
    /// Creates a controller that treats any redirect as an expired session
    /// and discards fetched pages
    pub fn new(
        settings: ControllerSettings,
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
        cache: CacheStore,
        frontier: Frontier,
    ) -> Self {
        let expiry: Arc<dyn ExpiryPolicy> = Arc::new(StatusExpiry::any_redirect());
        Self {
            settings,
            transport,
            authenticator,
            cache: cache.with_expiry(expiry.clone()),
            frontier,
            expiry,
            sink: Arc::new(NullSink),
        }
    }

    /// Replaces the session-expiry predicate for fetches and the cache
    pub fn with_expiry(mut self, expiry: Arc<dyn ExpiryPolicy>) -> Self {
        self.cache = self.cache.with_expiry(expiry.clone());
        self.expiry = expiry;
        self
    }

    /// Hands every page fetched from the network to `sink`
    ///
    /// Pages served from the cache were written when first fetched and are
    /// not written again.
    pub fn with_sink(mut self, sink: Arc<dyn PageSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builds a controller wired to the network, the filesystem cache, the
    /// configured frontier and the configured records file
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Controller)` - Ready to run
    /// * `Err(HarvestError)` - A component could not be opened
    pub async fn from_config(config: &Config) -> Result<Self> {
        let settings = ControllerSettings::from_config(config)?;

        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&TransportConfig {
            user_agent: config.service.user_agent.clone(),
            timeout: Duration::from_secs(config.crawler.request_timeout_secs),
            ..TransportConfig::default()
        })?);

        let authenticator = SsoAuthenticator::new(
            transport.clone(),
            parse_http_url("login-url", &config.service.login_url)?,
            parse_http_url("base-url", &config.service.base_url)?,
            config.credentials.username.clone(),
            config.credentials.password.clone(),
        )
        .with_user_agent(config.service.user_agent.clone());

        let cache = CacheStore::new(
            Arc::new(FsObjectStore::new(&config.cache.directory)),
            config.cache.prefix.clone(),
        );

        let frontier = Frontier::open(
            config.frontier.database_path.as_deref().map(Path::new),
            &config.frontier.set_name,
        )?;

        let sink: Arc<dyn PageSink> = match &config.output.records_path {
            Some(path) => Arc::new(JsonLinesSink::append(path).await?),
            None => Arc::new(NullSink),
        };

        let expiry = Arc::new(StatusExpiry::with_statuses(
            config.crawler.auth_redirect_statuses.clone(),
        ));

        Ok(Self::new(settings, transport, Arc::new(authenticator), cache, frontier)
            .with_expiry(expiry)
            .with_sink(sink))
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl reached `Done`, possibly with abandoned
    ///   or cancelled requests
    /// * `Err(HarvestError)` - Authentication failed; the crawl stopped
    pub async fn run(&self) -> Result<CrawlReport> {
        let phase = Mutex::new(PhaseTracker::new());

        tracing::info!(seeds = self.settings.seeds.len(), "Starting crawl");
        let session = SessionManager::establish(self.authenticator.clone()).await?;
        lock(&phase).advance(CrawlPhase::Authenticated)?;

        let worker = Arc::new(Worker {
            settings: self.settings.clone(),
            transport: self.transport.clone(),
            cache: self.cache.clone(),
            expiry: self.expiry.clone(),
            sink: self.sink.clone(),
            session,
            phase,
            permits: Semaphore::new(self.settings.max_concurrent.max(1)),
        });

        let mut initial: Vec<CrawlRequest> = self
            .settings
            .seeds
            .iter()
            .cloned()
            .map(CrawlRequest::seed)
            .collect();
        initial.extend(self.resumed_requests());

        let mut report = CrawlReport::new();
        let mut seen = HashSet::new();
        let mut finished = HashSet::new();
        let mut tasks = JoinSet::new();
        for request in initial {
            schedule(&worker, &mut tasks, &mut seen, request);
        }

        let deadline = self.settings.crawl_timeout.map(|d| Instant::now() + d);

        loop {
            let joined = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        report.cancelled = tasks.len();
                        tracing::warn!(
                            cancelled = report.cancelled,
                            "Crawl timeout reached, cancelling outstanding requests"
                        );
                        tasks.shutdown().await;
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            let Some(joined) = joined else {
                break;
            };

            let outcome = match joined {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Crawl aborted");
                    tasks.shutdown().await;
                    finish_output(worker.sink.as_ref()).await;
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Fetch task failed");
                    report.abandoned += 1;
                    continue;
                }
            };

            report.retried += outcome.retried;
            report.records += outcome.records;
            report.skipped_collections.extend(outcome.skipped);
            if outcome.from_cache {
                report.cache_hits += 1;
            }
            if outcome.completed {
                report.completed += 1;
            } else {
                report.abandoned += 1;
                report.failed_urls.push(outcome.url.to_string());
            }

            for request in outcome.collections {
                schedule(&worker, &mut tasks, &mut seen, request);
            }

            // Frontier writes stay on this loop; a finished page is never re-added.
            if let Some(next) = outcome.next {
                if !finished.contains(&dedup_key(&next.url)) {
                    if let Err(e) = self.frontier.add(next.url.as_str()) {
                        tracing::warn!(url = %next.url, error = %e, "Failed to record next link in frontier");
                    }
                    schedule(&worker, &mut tasks, &mut seen, next);
                }
            }
            if outcome.retire {
                if let Err(e) = self.frontier.remove(outcome.url.as_str()) {
                    tracing::warn!(url = %outcome.url, error = %e, "Failed to remove page from frontier");
                }
                finished.insert(dedup_key(&outcome.url));
            }
        }

        finish_output(worker.sink.as_ref()).await;

        report.reauthenticated = worker.session.refreshes();
        report.pending = match self.frontier.len() {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to count frontier entries");
                0
            }
        };

        let mut phase = lock(&worker.phase);
        phase.advance(CrawlPhase::Done)?;
        report.phase = phase.current();
        drop(phase);

        tracing::info!(
            completed = report.completed,
            abandoned = report.abandoned,
            retried = report.retried,
            reauthenticated = report.reauthenticated,
            cache_hits = report.cache_hits,
            cancelled = report.cancelled,
            pending = report.pending,
            "Crawl finished"
        );
        Ok(report)
    }

    /// Pages left in the frontier by an earlier run
    fn resumed_requests(&self) -> Vec<CrawlRequest> {
        let mut requests = Vec::new();
        for member in self.frontier.pending() {
            match member {
                Ok(member) => match Url::parse(&member) {
                    Ok(url) => requests.push(CrawlRequest::resumed(url)),
                    Err(e) => tracing::warn!(url = %member, error = %e, "Ignoring invalid frontier entry"),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to scan frontier; resuming with what was read");
                    break;
                }
            }
        }

        if !requests.is_empty() {
            tracing::info!(count = requests.len(), "Resuming pages from frontier");
        }
        requests
    }
}

/// Spawns `request` unless its URL was already scheduled in this run
fn schedule(
    worker: &Arc<Worker>,
    tasks: &mut JoinSet<Result<Outcome>>,
    seen: &mut HashSet<String>,
    request: CrawlRequest,
) {
    if !seen.insert(dedup_key(&request.url)) {
        tracing::debug!(url = %request.url, "Already scheduled");
        return;
    }
    tasks.spawn(worker.clone().process(request));
}

fn dedup_key(url: &Url) -> String {
    canonicalize_url(url.as_str())
        .map(|url| url.to_string())
        .unwrap_or_else(|_| url.to_string())
}

async fn finish_output(sink: &dyn PageSink) {
    if let Err(e) = sink.finish().await {
        tracing::error!(error = %e, "Failed to finish page output");
    }
}

fn lock(phase: &Mutex<PhaseTracker>) -> MutexGuard<'_, PhaseTracker> {
    phase.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What a single fetch task produced
#[derive(Debug)]
struct Outcome {
    url: Url,
    completed: bool,
    from_cache: bool,
    retried: usize,
    records: usize,
    skipped: Vec<String>,
    /// First pages of allowed collections
    collections: Vec<CrawlRequest>,
    /// The page's in-scope next link
    next: Option<CrawlRequest>,
    /// The page is done and leaves the frontier
    retire: bool,
}

impl Outcome {
    fn new(url: &Url) -> Self {
        Self {
            url: url.clone(),
            completed: false,
            from_cache: false,
            retried: 0,
            records: 0,
            skipped: Vec::new(),
            collections: Vec::new(),
            next: None,
            retire: false,
        }
    }
}

/// State shared by the fetch tasks of one run
struct Worker {
    settings: ControllerSettings,
    transport: Arc<dyn Transport>,
    cache: CacheStore,
    expiry: Arc<dyn ExpiryPolicy>,
    sink: Arc<dyn PageSink>,
    session: SessionManager,
    phase: Mutex<PhaseTracker>,
    permits: Semaphore,
}

impl Worker {
    /// Fetches one URL and interprets the response according to its origin
    async fn process(self: Arc<Self>, request: CrawlRequest) -> Result<Outcome> {
        let mut outcome = Outcome::new(&request.url);
        tracing::debug!(url = %request.url, origin = request.origin.as_str(), "Processing request");

        let http = HttpRequest::get(request.url.clone()).with_header("Accept", "application/json");
        let Some(response) = self.fetch(&http, &mut outcome).await? else {
            return Ok(outcome);
        };

        match request.origin {
            Origin::Seed => self.enumerate_collections(&request, &response, &mut outcome)?,
            Origin::Resumed | Origin::Discovered => {
                self.handle_page(&request, &response, &mut outcome).await?
            }
        }
        Ok(outcome)
    }

    /// Cache first, then the network with expiry and transient retries
    ///
    /// Returns `None` when the request was abandoned.
    async fn fetch(&self, request: &HttpRequest, outcome: &mut Outcome) -> Result<Option<HttpResponse>> {
        match self.cache.get(request).await {
            Ok(Some(response)) => {
                tracing::debug!(url = %request.url, "Served from cache");
                outcome.from_cache = true;
                return Ok(Some(response));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "Cache read failed, fetching from network")
            }
        }

        let mut transient = 0;

        loop {
            let (sent, session) = {
                let Ok(_permit) = self.permits.acquire().await else {
                    return Ok(None);
                };
                // Read after the permit so a refresh finished meanwhile is seen.
                let session = self.session.current().await;
                (self.transport.send(request, session.cookies()).await, session)
            };

            let response = match sent {
                Ok(response) => response,
                Err(e) if e.is_transient() && transient < self.settings.transient_retries => {
                    transient += 1;
                    tracing::warn!(url = %request.url, error = %e, attempt = transient, "Transient failure, retrying");
                    tokio::time::sleep(self.settings.retry_delay).await;
                    continue;
                }
                Err(e) => {
                    tracing::error!(url = %request.url, error = %e, "Request failed, abandoning");
                    return Ok(None);
                }
            };

            if self.expiry.is_expired(&response) {
                if outcome.retried >= self.settings.max_retries as usize {
                    tracing::error!(
                        url = %request.url,
                        status = response.status,
                        retries = outcome.retried,
                        "Session still expired after retry limit, abandoning"
                    );
                    return Ok(None);
                }

                outcome.retried += 1;
                lock(&self.phase).begin_retry();
                let refreshed = self.session.refresh(&session).await;
                lock(&self.phase).end_retry();
                refreshed?;
                tracing::debug!(url = %request.url, retry = outcome.retried, "Re-issuing request with refreshed session");
                continue;
            }

            if is_transient_status(response.status) && transient < self.settings.transient_retries {
                transient += 1;
                tracing::warn!(url = %request.url, status = response.status, attempt = transient, "Transient status, retrying");
                tokio::time::sleep(self.settings.retry_delay).await;
                continue;
            }

            if !response.is_success() {
                tracing::error!(url = %request.url, status = response.status, "Unexpected status, abandoning");
                return Ok(None);
            }

            if let Err(e) = self.cache.put(request, &response).await {
                tracing::warn!(url = %request.url, error = %e, "Cache write failed");
            }
            tracing::debug!(url = %request.url, status = response.status, bytes = response.body.len(), "Fetched");
            return Ok(Some(response));
        }
    }

    /// Spawns the first page of every allowed collection in a service root
    fn enumerate_collections(
        &self,
        request: &CrawlRequest,
        response: &HttpResponse,
        outcome: &mut Outcome,
    ) -> Result<()> {
        let collections = match parse_service_root(&response.body, &request.url) {
            Ok(collections) => collections,
            Err(e) => {
                tracing::error!(
                    url = %request.url,
                    error = %e,
                    body = %excerpt(&response.body),
                    "Malformed service root, abandoning"
                );
                return Ok(());
            }
        };

        for collection in collections {
            if self.settings.allows_collection(&collection.name) {
                tracing::debug!(collection = %collection.name, "Queueing collection");
                outcome
                    .collections
                    .push(CrawlRequest::discovered(collection.url, collection.name));
            } else {
                tracing::info!(collection = %collection.name, "Skipping collection not in allow-list");
                outcome.skipped.push(collection.name);
            }
        }

        tracing::info!(
            url = %request.url,
            queued = outcome.collections.len(),
            skipped = outcome.skipped.len(),
            "Service root fetched"
        );
        outcome.completed = true;
        lock(&self.phase).reach(CrawlPhase::HomepageFetched)
    }

    /// Emits a fresh page's records and picks up its next link
    async fn handle_page(
        &self,
        request: &CrawlRequest,
        response: &HttpResponse,
        outcome: &mut Outcome,
    ) -> Result<()> {
        let page = match parse_page(&response.body, &request.url) {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(
                    url = %request.url,
                    error = %e,
                    body = %excerpt(&response.body),
                    "Malformed page, leaving it in the frontier"
                );
                return Ok(());
            }
        };

        let collection = request
            .collection
            .clone()
            .or_else(|| collection_from_url(&request.url));

        if outcome.from_cache {
            tracing::debug!(url = %request.url, "Records already written by an earlier run");
        } else {
            let fetched = FetchedPage {
                url: request.url.clone(),
                collection: collection.clone(),
                records: page.records,
            };
            outcome.records = match self.sink.accept(&fetched).await {
                Ok(written) => written,
                Err(e) => {
                    tracing::error!(url = %request.url, error = %e, "Failed to write page, leaving it in the frontier");
                    return Ok(());
                }
            };
        }

        match page.next_link {
            Some(next) if self.settings.scope.allows(&next) => {
                outcome.next = Some(CrawlRequest {
                    url: next,
                    origin: Origin::Discovered,
                    collection,
                });
            }
            Some(next) => {
                tracing::warn!(url = %next, "Next link outside allowed domains, ignoring");
            }
            None => {
                tracing::info!(url = %request.url, "Reached last page of collection");
            }
        }

        outcome.completed = true;
        outcome.retire = true;
        lock(&self.phase).reach(CrawlPhase::Paginating)
    }
}

/// Statuses worth retrying without re-authenticating
fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..600).contains(&status)
}
