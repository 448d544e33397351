//! Controller scenarios: collection filtering, session expiry and caching

use crate::support::{
    controller, memory_store, page, service_root, settings, svc, CountingAuthenticator, Reply,
    ScriptedTransport, ROOT,
};
use async_trait::async_trait;
use odata_harvest::frontier::Frontier;
use odata_harvest::transport::{CookieSet, HttpRequest, HttpResponse, Transport, TransportError};
use odata_harvest::CrawlPhase;
use std::sync::Arc;

#[tokio::test]
async fn test_skipped_collection_is_never_requested() {
    let next = svc("C?$skiptoken=1");
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A", "B", "C"]))])
            .route(&svc("A"), vec![Reply::Body(page(&[1], None))])
            .route(&svc("B"), vec![Reply::Body(page(&[2], None))])
            .route(&svc("C"), vec![Reply::Body(page(&[3], Some(&next)))])
            .route(&next, vec![Reply::Body(page(&[4], None))]),
    );
    let auth = Arc::new(CountingAuthenticator::default());

    let report = controller(
        settings(&[ROOT], &["A", "C"]),
        transport.clone(),
        auth.clone(),
        memory_store(),
        Frontier::in_memory(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(transport.count(&svc("B")), 0);
    assert_eq!(transport.count(&svc("A")), 1);
    assert_eq!(transport.count(&next), 1);
    assert_eq!(report.skipped_collections, vec!["B".to_string()]);
    assert_eq!(report.completed, 4);
    assert_eq!(report.records, 3);
    assert_eq!(report.abandoned, 0);
    assert_eq!(report.pending, 0);
    assert_eq!(report.phase, CrawlPhase::Done);
    assert_eq!(auth.logins(), 1);
}

#[tokio::test]
async fn test_expired_session_retried_until_success() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A"]))])
            .route(
                &svc("A"),
                vec![
                    Reply::Status(302),
                    Reply::Status(302),
                    Reply::Status(302),
                    Reply::Body(page(&[1, 2], None)),
                ],
            ),
    );
    let auth = Arc::new(CountingAuthenticator::default());

    let report = controller(
        settings(&[ROOT], &["A"]),
        transport.clone(),
        auth.clone(),
        memory_store(),
        Frontier::in_memory(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.retried, 3);
    assert_eq!(report.reauthenticated, 3);
    assert_eq!(auth.logins(), 4);
    assert_eq!(report.completed, 2);
    assert_eq!(report.records, 2);
    assert!(report.is_clean());
    assert_eq!(transport.count(&svc("A")), 4);
}

#[tokio::test]
async fn test_expired_session_abandoned_after_retry_limit() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A"]))])
            .route(&svc("A"), vec![Reply::Status(302)]),
    );
    let auth = Arc::new(CountingAuthenticator::default());

    let report = controller(
        settings(&[ROOT], &["A"]),
        transport.clone(),
        auth.clone(),
        memory_store(),
        Frontier::in_memory(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(transport.count(&svc("A")), 6);
    assert_eq!(report.retried, 5);
    assert_eq!(report.reauthenticated, 5);
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.failed_urls, vec![svc("A")]);
    assert_eq!(report.completed, 1);
    assert_eq!(report.phase, CrawlPhase::Done);
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let store = memory_store();
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A"]))])
            .route(&svc("A"), vec![Reply::Body(page(&[1], None))]),
    );

    let first = controller(
        settings(&[ROOT], &["A"]),
        transport.clone(),
        Arc::new(CountingAuthenticator::default()),
        store.clone(),
        Frontier::in_memory(),
    )
    .run()
    .await
    .unwrap();
    assert_eq!(first.cache_hits, 0);
    assert_eq!(transport.requests().len(), 2);

    let offline = Arc::new(ScriptedTransport::new());
    let second = controller(
        settings(&[ROOT], &["A"]),
        offline.clone(),
        Arc::new(CountingAuthenticator::default()),
        store,
        Frontier::in_memory(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(second.cache_hits, 2);
    assert_eq!(second.completed, 2);
    assert!(offline.requests().is_empty());
}

#[tokio::test]
async fn test_malformed_page_stays_in_frontier() {
    let broken = svc("A?$skiptoken=7");
    let frontier = Frontier::in_memory();
    frontier.add(&broken).unwrap();

    let transport = Arc::new(
        ScriptedTransport::new()
            .route(&broken, vec![Reply::Body("<html>Sign in</html>".to_string())]),
    );

    let report = controller(
        settings(&[], &["A"]),
        transport,
        Arc::new(CountingAuthenticator::default()),
        memory_store(),
        frontier.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.abandoned, 1);
    assert_eq!(report.pending, 1);
    assert_eq!(frontier.pending().next().unwrap().unwrap(), broken);
}

#[tokio::test]
async fn test_next_link_outside_scope_is_ignored() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A"]))])
            .route(
                &svc("A"),
                vec![Reply::Body(page(
                    &[1],
                    Some("https://elsewhere.example.org/A?$skiptoken=1"),
                ))],
            ),
    );
    let frontier = Frontier::in_memory();

    let report = controller(
        settings(&[ROOT], &["A"]),
        transport.clone(),
        Arc::new(CountingAuthenticator::default()),
        memory_store(),
        frontier.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.completed, 2);
    assert_eq!(transport.requests().len(), 2);
    assert!(frontier.is_empty().unwrap());
}

/// Redirects any request carrying the first session's token
struct FirstSessionExpires;

#[async_trait]
impl Transport for FirstSessionExpires {
    async fn send(
        &self,
        request: &HttpRequest,
        cookies: &CookieSet,
    ) -> Result<HttpResponse, TransportError> {
        tokio::task::yield_now().await;
        if cookies.get("MSISAuth") == Some("session-0") {
            return Ok(HttpResponse::new(302, request.url.clone()));
        }
        Ok(HttpResponse::new(200, request.url.clone()).with_body(page(&[1], None)))
    }
}

#[tokio::test]
async fn test_concurrent_expiry_triggers_one_login() {
    let frontier = Frontier::in_memory();
    for name in ["A", "B", "C"] {
        frontier.add(&svc(name)).unwrap();
    }
    let auth = Arc::new(CountingAuthenticator::default());

    let report = controller(
        settings(&[], &["A", "B", "C"]),
        Arc::new(FirstSessionExpires),
        auth.clone(),
        memory_store(),
        frontier,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(auth.logins(), 2);
    assert_eq!(report.reauthenticated, 1);
    assert_eq!(report.completed, 3);
    assert_eq!(report.pending, 0);
}

#[tokio::test]
async fn test_queued_requests_use_refreshed_session() {
    let frontier = Frontier::in_memory();
    for name in ["A", "B", "C"] {
        frontier.add(&svc(name)).unwrap();
    }
    let auth = Arc::new(CountingAuthenticator::default());
    let mut serial = settings(&[], &["A", "B", "C"]);
    serial.max_concurrent = 1;

    let report = controller(
        serial,
        Arc::new(FirstSessionExpires),
        auth.clone(),
        memory_store(),
        frontier,
    )
    .run()
    .await
    .unwrap();

    // Only the request holding the permit saw the expired session.
    assert_eq!(report.retried, 1);
    assert_eq!(auth.logins(), 2);
    assert_eq!(report.completed, 3);
}
