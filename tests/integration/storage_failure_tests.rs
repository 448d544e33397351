//! Crawls that keep going when the cache or the frontier fails

use crate::support::{
    controller, memory_store, page, service_root, settings, svc, BrokenObjectStore,
    BrokenSetStore, CountingAuthenticator, Reply, ScriptedTransport, ROOT,
};
use odata_harvest::cache::{CacheError, CacheStore, ObjectStoreError};
use odata_harvest::frontier::Frontier;
use odata_harvest::transport::{HttpRequest, HttpResponse};
use odata_harvest::CrawlPhase;
use std::sync::Arc;
use url::Url;

#[tokio::test]
async fn test_cache_errors_propagate_from_store() {
    let cache = CacheStore::new(Arc::new(BrokenObjectStore), "httpcache");
    let url = Url::parse(&svc("A")).unwrap();
    let request = HttpRequest::get(url.clone());

    let read = cache.get(&request).await;
    assert!(matches!(read, Err(CacheError::Store(ObjectStoreError::Io { .. }))));

    let response = HttpResponse::new(200, url).with_body(page(&[1], None));
    let written = cache.put(&request, &response).await;
    assert!(matches!(written, Err(CacheError::Store(ObjectStoreError::Io { .. }))));
}

#[tokio::test]
async fn test_crawl_completes_when_cache_is_unavailable() {
    let next = svc("A?$skiptoken=1");
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A"]))])
            .route(&svc("A"), vec![Reply::Body(page(&[1, 2], Some(&next)))])
            .route(&next, vec![Reply::Body(page(&[3], None))]),
    );
    let frontier = Frontier::in_memory();

    let report = controller(
        settings(&[ROOT], &["A"]),
        transport.clone(),
        Arc::new(CountingAuthenticator::default()),
        Arc::new(BrokenObjectStore),
        frontier.clone(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.completed, 3);
    assert_eq!(report.abandoned, 0);
    assert_eq!(report.cache_hits, 0);
    assert_eq!(report.records, 3);
    assert_eq!(transport.requests().len(), 3);
    assert!(frontier.is_empty().unwrap());
}

#[tokio::test]
async fn test_crawl_continues_when_frontier_is_unavailable() {
    let next = svc("A?$skiptoken=1");
    let transport = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A"]))])
            .route(&svc("A"), vec![Reply::Body(page(&[1], Some(&next)))])
            .route(&next, vec![Reply::Body(page(&[2], None))]),
    );

    let report = controller(
        settings(&[ROOT], &["A"]),
        transport.clone(),
        Arc::new(CountingAuthenticator::default()),
        memory_store(),
        Frontier::new(Arc::new(BrokenSetStore), "frontier"),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.completed, 3);
    assert_eq!(report.abandoned, 0);
    assert_eq!(report.pending, 0);
    assert_eq!(report.phase, CrawlPhase::Done);
    assert_eq!(transport.count(&next), 1);
}
