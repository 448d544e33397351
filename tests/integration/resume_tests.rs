//! Resuming an interrupted crawl from a durable frontier

use crate::support::{
    controller, memory_store, page, service_root, settings, svc, CountingAuthenticator, Reply,
    ScriptedTransport, ROOT,
};
use odata_harvest::frontier::{Frontier, SqliteSetStore};
use std::sync::Arc;
use tempfile::TempDir;

fn open_frontier(dir: &TempDir) -> Frontier {
    let store = SqliteSetStore::new(&dir.path().join("frontier.db")).unwrap();
    Frontier::new(Arc::new(store), "frontier")
}

#[tokio::test]
async fn test_unfinished_page_is_fetched_on_next_run() {
    let dir = TempDir::new().unwrap();
    let store = memory_store();
    let second_page = svc("A?$skiptoken=2");

    // First run: page two keeps failing and is abandoned.
    let failing = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A"]))])
            .route(&svc("A"), vec![Reply::Body(page(&[1], Some(&second_page)))])
            .route(&second_page, vec![Reply::Status(503)]),
    );
    let first = controller(
        settings(&[ROOT], &["A"]),
        failing.clone(),
        Arc::new(CountingAuthenticator::default()),
        store.clone(),
        open_frontier(&dir),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(first.abandoned, 1);
    assert_eq!(first.failed_urls, vec![second_page.clone()]);
    assert_eq!(first.pending, 1);
    assert_eq!(failing.count(&second_page), 4);

    // Second run: a fresh process reopens the same database.
    let healthy = Arc::new(
        ScriptedTransport::new().route(&second_page, vec![Reply::Body(page(&[2], None))]),
    );
    let second = controller(
        settings(&[ROOT], &["A"]),
        healthy.clone(),
        Arc::new(CountingAuthenticator::default()),
        store,
        open_frontier(&dir),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(second.abandoned, 0);
    assert_eq!(second.pending, 0);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(second.completed, 3);
    assert_eq!(healthy.requests(), vec![second_page.clone()]);
    assert!(open_frontier(&dir).is_empty().unwrap());
}

#[tokio::test]
async fn test_cleared_frontier_starts_from_seeds() {
    let dir = TempDir::new().unwrap();
    let frontier = open_frontier(&dir);
    frontier.add(&svc("A?$skiptoken=9")).unwrap();
    assert_eq!(frontier.clear().unwrap(), 1);

    let transport = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A"]))])
            .route(&svc("A"), vec![Reply::Body(page(&[1], None))]),
    );
    let report = controller(
        settings(&[ROOT], &["A"]),
        transport.clone(),
        Arc::new(CountingAuthenticator::default()),
        memory_store(),
        frontier,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(transport.count(&svc("A?$skiptoken=9")), 0);
    assert_eq!(report.completed, 2);
}
