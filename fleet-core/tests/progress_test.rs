use fleet_core::{
    MemoryProgressStore, Operation, ProgressStore, RouteFilter, SealedSecret,
    SqliteProgressStore, WalletRecord,
};
use std::sync::Arc;
use tempfile::TempDir;

// Sealing is not under test here; any well-formed hex will do.
fn record(address: &str) -> WalletRecord {
    WalletRecord {
        address: address.to_string(),
        sealed: SealedSecret {
            ciphertext: "00".to_string(),
            iv: "11".to_string(),
            salt: "22".to_string(),
            tag: "33".to_string(),
        },
        proxy: Some("http://10.0.0.1:8080".to_string()),
    }
}

async fn sqlite_store(dir: &TempDir) -> SqliteProgressStore {
    let path = dir.path().join("progress.db");
    SqliteProgressStore::connect(path.to_str().unwrap())
        .await
        .unwrap()
}

const ROUTE: [Operation; 3] = [Operation::Faucet, Operation::CollectPulses, Operation::Bridge];

#[tokio::test]
async fn test_memory_store_resumes_after_completion() {
    let store = MemoryProgressStore::new();
    store.register_wallet(record("0xA"), &ROUTE).await;

    store
        .record_complete("0xa", Operation::Faucet)
        .await
        .unwrap();

    let routes = store.uncompleted(&RouteFilter::all()).await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(
        routes[0].tasks,
        vec![Operation::CollectPulses, Operation::Bridge]
    );
}

#[tokio::test]
async fn test_memory_store_record_is_idempotent() {
    let store = MemoryProgressStore::new();
    store.register_wallet(record("0xa"), &ROUTE).await;

    store.record_complete("0xa", Operation::Bridge).await.unwrap();
    let first = store.completions("0xa").await.unwrap();
    store.record_complete("0xa", Operation::Bridge).await.unwrap();
    let second = store.completions("0xa").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.len(), 1);
}

#[tokio::test]
async fn test_memory_store_drops_finished_wallets() {
    let store = MemoryProgressStore::new();
    store
        .register_wallet(record("0xa"), &[Operation::Faucet])
        .await;
    store
        .register_wallet(record("0xb"), &[Operation::Faucet])
        .await;

    store.record_complete("0xa", Operation::Faucet).await.unwrap();

    let routes = store.uncompleted(&RouteFilter::all()).await.unwrap();
    let addresses: Vec<&str> = routes.iter().map(|r| r.wallet.address.as_str()).collect();
    assert_eq!(addresses, vec!["0xb"]);
}

#[tokio::test]
async fn test_sqlite_store_resumes_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = sqlite_store(&dir).await;
        store.register_wallet(&record("0xa"), &ROUTE).await.unwrap();
        store
            .record_complete("0xa", Operation::Faucet)
            .await
            .unwrap();
    }

    let store = sqlite_store(&dir).await;
    let routes = store.uncompleted(&RouteFilter::all()).await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].wallet, record("0xa"));
    assert_eq!(
        routes[0].tasks,
        vec![Operation::CollectPulses, Operation::Bridge]
    );

    let completions = store.completions("0xa").await.unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].operation, Operation::Faucet);
}

#[tokio::test]
async fn test_sqlite_store_record_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;
    store.register_wallet(&record("0xa"), &ROUTE).await.unwrap();

    store.record_complete("0xa", Operation::Bridge).await.unwrap();
    let first = store.completions("0xa").await.unwrap();
    store.record_complete("0xA", Operation::Bridge).await.unwrap();
    let second = store.completions("0xa").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.len(), 1);
}

#[tokio::test]
async fn test_sqlite_reregistration_keeps_history() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;
    store
        .register_wallet(&record("0xa"), &[Operation::Faucet, Operation::Bridge])
        .await
        .unwrap();
    store.record_complete("0xa", Operation::Faucet).await.unwrap();

    store
        .register_wallet(
            &record("0xa"),
            &[Operation::Faucet, Operation::ChatWithAgents],
        )
        .await
        .unwrap();

    let routes = store.uncompleted(&RouteFilter::all()).await.unwrap();
    assert_eq!(
        routes[0].tasks,
        vec![Operation::Bridge, Operation::ChatWithAgents]
    );
    assert_eq!(store.completions("0xa").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sqlite_filter_and_limit() {
    let dir = TempDir::new().unwrap();
    let store = sqlite_store(&dir).await;
    for address in ["0xa", "0xb", "0xc"] {
        store
            .register_wallet(&record(address), &[Operation::Faucet, Operation::CycleSwaps])
            .await
            .unwrap();
    }

    let limited = store
        .uncompleted(&RouteFilter::all().with_limit(2))
        .await
        .unwrap();
    let addresses: Vec<&str> = limited.iter().map(|r| r.wallet.address.as_str()).collect();
    assert_eq!(addresses, vec!["0xa", "0xb"]);

    let picked = store
        .uncompleted(&RouteFilter::all().with_addresses(["0xC"]))
        .await
        .unwrap();
    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].wallet.address, "0xc");
    assert_eq!(
        picked[0].tasks,
        vec![Operation::Faucet, Operation::CycleSwaps]
    );
}

#[tokio::test]
async fn test_sqlite_concurrent_records() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(sqlite_store(&dir).await);
    for i in 0..10 {
        store
            .register_wallet(&record(&format!("0x{:02}", i)), &ROUTE)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..10 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let address = format!("0x{:02}", i);
            for op in ROUTE {
                store.record_complete(&address, op).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(store
        .uncompleted(&RouteFilter::all())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(store.get_metrics().total_errors, 0);
}
