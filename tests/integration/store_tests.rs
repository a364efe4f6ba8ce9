// Store round trips, run against both backends where the behavior is
// shared

use std::sync::Arc;

use huurwatch::store::{MemoryStore, ResultStore, SqliteStore};

use super::addresses;

async fn exercise_baseline_replacement(store: Arc<dyn ResultStore>) -> anyhow::Result<()> {
    assert!(store.get_known("REBO").await?.is_empty());

    store.set_known("REBO", &addresses(&["a", "b"])).await?;
    let known = store.get_known("REBO").await?;
    assert_eq!(known.len(), 2);
    assert!(known.contains("a") && known.contains("b"));

    // Full replacement: addresses that dropped out leave the baseline
    store.set_known("REBO", &addresses(&["b", "c"])).await?;
    let known = store.get_known("REBO").await?;
    assert_eq!(known.len(), 2);
    assert!(known.contains("b") && known.contains("c"));
    assert!(!known.contains("a"));

    // Another source never bleeds through
    store.set_known("VESTEDA", &addresses(&["x"])).await?;
    assert_eq!(store.get_known("REBO").await?.len(), 2);

    // An empty baseline write is refused as a wipe guard
    store.set_known("REBO", &[]).await?;
    assert_eq!(store.get_known("REBO").await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_memory_baseline_replacement() -> anyhow::Result<()> {
    exercise_baseline_replacement(Arc::new(MemoryStore::new())).await
}

#[tokio::test]
async fn test_sqlite_baseline_replacement() -> anyhow::Result<()> {
    exercise_baseline_replacement(Arc::new(SqliteStore::open_in_memory().await?)).await
}

#[tokio::test]
async fn test_sqlite_persists_across_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("listings.db");
    let path = path.to_str().unwrap();

    {
        let store = SqliteStore::open(path).await?;
        store
            .set_known("BEUMER", &addresses(&["Vleutenseweg 210"]))
            .await?;
    }

    let store = SqliteStore::open(path).await?;
    let known = store.get_known("BEUMER").await?;
    assert!(known.contains("Vleutenseweg 210"));
    Ok(())
}

#[tokio::test]
async fn test_sqlite_keeps_history_for_returning_listing() -> anyhow::Result<()> {
    let store = SqliteStore::open_in_memory().await?;

    store
        .set_known("REBO", &addresses(&["Oudegracht 12", "Biltstraat 43"]))
        .await?;
    let first_seen = store
        .active_listings("REBO")
        .await?
        .into_iter()
        .find(|listing| listing.address == "Oudegracht 12")
        .map(|listing| listing.first_seen)
        .unwrap();

    // The listing disappears and later comes back
    store.set_known("REBO", &addresses(&["Biltstraat 43"])).await?;
    assert!(!store.get_known("REBO").await?.contains("Oudegracht 12"));

    store
        .set_known("REBO", &addresses(&["Oudegracht 12", "Biltstraat 43"]))
        .await?;
    let returned = store
        .active_listings("REBO")
        .await?
        .into_iter()
        .find(|listing| listing.address == "Oudegracht 12")
        .unwrap();

    // Reactivated in place, original first sighting retained
    assert!(returned.active);
    assert_eq!(returned.first_seen, first_seen);
    Ok(())
}
