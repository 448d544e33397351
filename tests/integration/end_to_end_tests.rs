//! End-to-end crawls over HTTP against a wiremock service

use crate::support::{page, service_root, settings, CountingAuthenticator};
use odata_harvest::cache::{CacheStore, FsObjectStore};
use odata_harvest::crawler::Controller;
use odata_harvest::frontier::Frontier;
use odata_harvest::output::{collect, JsonLinesSink};
use odata_harvest::transport::{ReqwestTransport, TransportConfig};
use odata_harvest::url::Scope;
use odata_harvest::CrawlPhase;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn json(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "application/json")
        .set_body_string(body)
}

fn transport() -> Arc<ReqwestTransport> {
    Arc::new(ReqwestTransport::new(&TransportConfig::default()).unwrap())
}

#[tokio::test]
async fn test_crawl_and_collect_over_http() {
    let server = MockServer::start().await;
    let root = format!("{}/Org.svc/", server.uri());
    let second = format!("{}/Org.svc/AccountSet?$skiptoken=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/Org.svc/"))
        .and(header("cookie", "MSISAuth=session-0"))
        .respond_with(json(service_root(&["AccountSet", "ContactSet"])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Org.svc/AccountSet"))
        .and(|request: &Request| request.url.query().is_none())
        .respond_with(json(page(&[1, 2], Some(&second))))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Org.svc/AccountSet"))
        .and(query_param("$skiptoken", "2"))
        .respond_with(json(page(&[3], None)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Org.svc/ContactSet"))
        .respond_with(json(page(&[9], None)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let records_path = dir.path().join("records.jsonl");
    let store = Arc::new(FsObjectStore::new(dir.path().join("cache")));

    let mut crawl_settings = settings(&[], &["AccountSet"]);
    crawl_settings.seeds = vec![Url::parse(&root).unwrap()];
    crawl_settings.scope = Scope::new(["127.0.0.1"]);

    let controller = Controller::new(
        crawl_settings,
        transport(),
        Arc::new(CountingAuthenticator::default()),
        CacheStore::new(store.clone(), "httpcache"),
        Frontier::in_memory(),
    )
    .with_sink(Arc::new(JsonLinesSink::create(&records_path).await.unwrap()));

    let report = controller.run().await.unwrap();

    assert_eq!(report.phase, CrawlPhase::Done);
    assert_eq!(report.completed, 3);
    assert_eq!(report.records, 3);
    assert_eq!(report.skipped_collections, vec!["ContactSet".to_string()]);

    let written = std::fs::read_to_string(&records_path).unwrap();
    assert_eq!(written.lines().count(), 3);

    let replay_path = dir.path().join("replay.jsonl");
    let replay = JsonLinesSink::create(&replay_path).await.unwrap();
    let collected = collect(store.as_ref(), "httpcache", &replay).await.unwrap();

    assert_eq!(collected.documents, 3);
    assert_eq!(collected.service_roots, 1);
    assert_eq!(collected.pages, 2);
    assert_eq!(collected.records, 3);
    assert_eq!(
        std::fs::read_to_string(&replay_path).unwrap().lines().count(),
        3
    );
}

#[tokio::test]
async fn test_redirect_to_identity_provider_triggers_login() {
    let server = MockServer::start().await;
    let root = format!("{}/Org.svc/", server.uri());

    Mock::given(method("GET"))
        .and(path("/Org.svc/"))
        .and(header("cookie", "MSISAuth=session-0"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "https://sts.example.com/adfs/ls/?wa=wsignin1.0"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Org.svc/"))
        .and(header("cookie", "MSISAuth=session-1"))
        .respond_with(json(service_root(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let auth = Arc::new(CountingAuthenticator::default());
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FsObjectStore::new(dir.path()));

    let mut crawl_settings = settings(&[], &["AccountSet"]);
    crawl_settings.seeds = vec![Url::parse(&root).unwrap()];

    let report = Controller::new(
        crawl_settings,
        transport(),
        auth.clone(),
        CacheStore::new(store, "httpcache"),
        Frontier::in_memory(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(auth.logins(), 2);
    assert_eq!(report.retried, 1);
    assert_eq!(report.reauthenticated, 1);
    assert_eq!(report.completed, 1);
}
