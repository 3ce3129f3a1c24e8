//! Scoped acquisition through PooledConnection

use std::sync::Arc;

use anyhow::{bail, Result};
use tests::{dormant_pool_with, AbsentFactory, ConnectionPool, CountingFactory, MockConnection};

async fn use_then_fail(pool: &ConnectionPool<MockConnection>) -> Result<usize> {
    let conn = pool.acquire("svc").await?.expect("connection");
    assert_eq!(conn.handle().ref_count(), 1);
    if conn.id == "svc" {
        bail!("request failed halfway");
    }
    Ok(conn.serial)
}

#[tokio::test]
async fn test_guard_releases_on_drop() {
    let factory = Arc::new(CountingFactory::new());
    let pool = dormant_pool_with(factory, 10);

    let handle = {
        let conn = pool.acquire("svc").await.unwrap().expect("connection");
        assert_eq!(conn.id(), "svc");
        assert_eq!(conn.id, "svc");
        assert_eq!(conn.handle().ref_count(), 1);
        Arc::clone(conn.handle())
    };

    assert_eq!(handle.ref_count(), 0);
    assert!(pool.contains("svc").await);

    pool.close().await;
}

#[tokio::test]
async fn test_guard_releases_on_error_path() {
    let factory = Arc::new(CountingFactory::new());
    let pool = dormant_pool_with(factory, 10);

    assert!(use_then_fail(&pool).await.is_err());

    let handles = pool.list_handles().await;
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].ref_count(), 0);

    pool.close().await;
}

#[tokio::test]
async fn test_guards_share_connection() {
    let factory = Arc::new(CountingFactory::new());
    let pool = dormant_pool_with(factory.clone(), 10);

    let first = pool.acquire("svc").await.unwrap().unwrap();
    let second = pool.acquire("svc").await.unwrap().unwrap();

    assert!(Arc::ptr_eq(first.handle(), second.handle()));
    assert_eq!(first.handle().ref_count(), 2);

    drop(first);
    assert_eq!(second.handle().ref_count(), 1);
    assert_eq!(factory.created(), 1);

    drop(second);
    pool.close().await;
}

#[tokio::test]
async fn test_guard_report_error_evicts_and_releases() {
    let factory = Arc::new(CountingFactory::new());
    let pool = dormant_pool_with(factory.clone(), 10);

    let conn = pool.acquire("svc").await.unwrap().unwrap();
    let handle = Arc::clone(conn.handle());

    conn.report_error("connection reset").await;

    assert_eq!(handle.ref_count(), 0);
    assert!(pool.is_empty().await);

    let fresh = pool.acquire("svc").await.unwrap().unwrap();
    assert_ne!(fresh.serial, handle.connection().serial);
    assert_eq!(factory.created(), 2);

    drop(fresh);
    pool.close().await;
}

#[tokio::test]
async fn test_acquire_without_connection() {
    let factory = Arc::new(AbsentFactory::new());
    let pool = dormant_pool_with(factory, 10);

    assert!(pool.acquire("svc").await.unwrap().is_none());
    pool.close().await;
}

#[tokio::test]
async fn test_guard_outlives_close() {
    let factory = Arc::new(CountingFactory::new());
    let pool = dormant_pool_with(factory, 10);

    let conn = pool.acquire("svc").await.unwrap().unwrap();
    let handle = Arc::clone(conn.handle());
    pool.close().await;

    assert_eq!(conn.serial, 0);
    drop(conn);
    assert_eq!(handle.ref_count(), 0);
}
