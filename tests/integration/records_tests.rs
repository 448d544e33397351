//! Records written during a crawl

use crate::support::{
    controller, memory_store, page, service_root, settings, svc, CountingAuthenticator, Reply,
    ScriptedTransport, ROOT,
};
use async_trait::async_trait;
use odata_harvest::auth::{AuthError, Authenticator};
use odata_harvest::frontier::Frontier;
use odata_harvest::output::JsonLinesSink;
use odata_harvest::transport::CookieSet;
use odata_harvest::HarvestError;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn line_count(path: &Path) -> usize {
    std::fs::read_to_string(path).unwrap().lines().count()
}

#[tokio::test]
async fn test_rerun_does_not_duplicate_records() {
    let dir = TempDir::new().unwrap();
    let records_path = dir.path().join("records.jsonl");
    let store = memory_store();

    let online = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A"]))])
            .route(&svc("A"), vec![Reply::Body(page(&[1, 2], None))]),
    );
    let first = controller(
        settings(&[ROOT], &["A"]),
        online,
        Arc::new(CountingAuthenticator::default()),
        store.clone(),
        Frontier::in_memory(),
    )
    .with_sink(Arc::new(JsonLinesSink::append(&records_path).await.unwrap()))
    .run()
    .await
    .unwrap();
    assert_eq!(first.records, 2);
    assert_eq!(line_count(&records_path), 2);

    let second = controller(
        settings(&[ROOT], &["A"]),
        Arc::new(ScriptedTransport::new()),
        Arc::new(CountingAuthenticator::default()),
        store,
        Frontier::in_memory(),
    )
    .with_sink(Arc::new(JsonLinesSink::append(&records_path).await.unwrap()))
    .run()
    .await
    .unwrap();

    assert_eq!(second.cache_hits, 2);
    assert_eq!(second.completed, 2);
    assert_eq!(second.records, 0);
    assert_eq!(line_count(&records_path), 2);
}

/// Signs in once; every later login is rejected
#[derive(Default)]
struct SingleLogin {
    logins: AtomicUsize,
}

#[async_trait]
impl Authenticator for SingleLogin {
    async fn login(&self) -> Result<CookieSet, AuthError> {
        if self.logins.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(AuthError::MissingField("Username".to_string()));
        }
        let mut cookies = CookieSet::new(".example.com");
        cookies.insert("MSISAuth", "session-0");
        Ok(cookies)
    }
}

#[tokio::test]
async fn test_records_are_flushed_when_reauthentication_fails() {
    let dir = TempDir::new().unwrap();
    let records_path = dir.path().join("records.jsonl");
    let next = svc("A?$skiptoken=2");

    let transport = Arc::new(
        ScriptedTransport::new()
            .route(ROOT, vec![Reply::Body(service_root(&["A"]))])
            .route(&svc("A"), vec![Reply::Body(page(&[1, 2], Some(&next)))])
            .route(&next, vec![Reply::Status(302)]),
    );

    let result = controller(
        settings(&[ROOT], &["A"]),
        transport,
        Arc::new(SingleLogin::default()),
        memory_store(),
        Frontier::in_memory(),
    )
    .with_sink(Arc::new(JsonLinesSink::create(&records_path).await.unwrap()))
    .run()
    .await;

    assert!(matches!(result, Err(HarvestError::Auth(_))));
    assert_eq!(line_count(&records_path), 2);
}
