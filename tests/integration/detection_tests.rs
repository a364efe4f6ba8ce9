// Multi-cycle detection scenarios, fed to the detector the same way
// the poll loop does

use std::sync::Arc;

use huurwatch::detector::{ChangeDetector, Classification, SourceState};
use huurwatch::models::Extraction;
use huurwatch::notify::AlertDispatcher;
use huurwatch::store::{MemoryStore, ResultStore, SqliteStore};

use super::*;

#[tokio::test]
async fn test_steady_state_stays_quiet() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    store
        .set_known("REBO", &addresses(&["Oudegracht 12", "Biltstraat 43"]))
        .await?;
    let (detector, recorder) = recording_detector(store, false);
    let mut state = SourceState::new("REBO");

    for _ in 0..3 {
        let outcome = detector
            .process(&mut state, &cycle(&["Oudegracht 12", "Biltstraat 43"]))
            .await?;
        assert_eq!(outcome, Classification::Unchanged);
    }

    assert!(recorder.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_new_listing_alerts_exactly_once() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.set_known("REBO", &addresses(&["Oudegracht 12"])).await?;
    let (detector, recorder) = recording_detector(store, false);
    let mut state = SourceState::new("REBO");

    let outcome = detector
        .process(&mut state, &cycle(&["Oudegracht 12", "Biltstraat 43"]))
        .await?;
    assert_eq!(outcome, Classification::Fresh("Biltstraat 43".to_string()));
    assert_eq!(recorder.sent().len(), 1);

    // The same listing on the next cycle is already known
    let outcome = detector
        .process(&mut state, &cycle(&["Oudegracht 12", "Biltstraat 43"]))
        .await?;
    assert_eq!(outcome, Classification::Unchanged);
    assert_eq!(recorder.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_burst_confirmed_after_hold() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.set_known("REBO", &addresses(&["Oudegracht 12"])).await?;
    let (detector, recorder) = recording_detector(store, false);
    let mut state = SourceState::new("REBO");
    let burst = cycle(&["Oudegracht 12", "Vleutenseweg 210", "Amsterdamsestraatweg 5"]);

    // A sudden batch is held without alerting
    detector.process(&mut state, &burst).await?;
    assert!(recorder.sent().is_empty());

    // Still there a cycle later: one aggregated alert
    detector.process(&mut state, &burst).await?;
    let sent = recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "REBO: Multiple new results found!");
    assert!(sent[0].1.contains("Vleutenseweg 210"));
    assert!(sent[0].1.contains("Amsterdamsestraatweg 5"));

    // And never again for the same batch
    detector.process(&mut state, &burst).await?;
    assert_eq!(recorder.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_vanished_burst_never_alerts() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.set_known("REBO", &addresses(&["Oudegracht 12"])).await?;
    let (detector, recorder) = recording_detector(store, false);
    let mut state = SourceState::new("REBO");

    detector
        .process(
            &mut state,
            &cycle(&["Oudegracht 12", "Vleutenseweg 210", "Amsterdamsestraatweg 5"]),
        )
        .await?;
    let outcome = detector.process(&mut state, &cycle(&["Oudegracht 12"])).await?;
    assert_eq!(outcome, Classification::Unchanged);

    assert!(recorder.sent().is_empty());
    assert!(state.pending.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_partial_failure_alerts_again_on_clean_cycle() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.set_known("REBO", &addresses(&["Oudegracht 12"])).await?;
    let (detector, recorder) = recording_detector(store, false);
    let mut state = SourceState::new("REBO");

    // The failing extraction still surfaces the listing it managed to
    // collect, but the baseline is withheld
    let partial = Extraction::failed(
        addresses(&["Oudegracht 12", "Biltstraat 43"]),
        "page 2: Timed out waiting for listing titles on page 2",
    );
    detector.process(&mut state, &partial).await?;
    assert_eq!(recorder.sent().len(), 1);

    // The clean cycle re-detects the same listing; the duplicate
    // alert is the accepted cost of never losing one
    detector
        .process(&mut state, &cycle(&["Oudegracht 12", "Biltstraat 43"]))
        .await?;
    assert_eq!(recorder.sent().len(), 2);

    detector
        .process(&mut state, &cycle(&["Oudegracht 12", "Biltstraat 43"]))
        .await?;
    assert_eq!(recorder.sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_debug_mode_tracks_without_alerting() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    store.set_known("REBO", &addresses(&["Oudegracht 12"])).await?;
    let (detector, recorder) = recording_detector(store, true);
    let mut state = SourceState::new("REBO");

    let outcome = detector
        .process(&mut state, &cycle(&["Oudegracht 12", "Biltstraat 43"]))
        .await?;
    assert_eq!(outcome, Classification::Fresh("Biltstraat 43".to_string()));
    assert!(recorder.sent().is_empty());

    // Detection still advanced the baseline
    let outcome = detector
        .process(&mut state, &cycle(&["Oudegracht 12", "Biltstraat 43"]))
        .await?;
    assert_eq!(outcome, Classification::Unchanged);
    assert!(recorder.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_sources_keep_separate_baselines() -> anyhow::Result<()> {
    let store: Arc<dyn ResultStore> = Arc::new(MemoryStore::new());
    store.set_known("REBO", &addresses(&["Oudegracht 12"])).await?;
    let (detector, recorder) = recording_detector(store.clone(), false);

    // The same address is unseen from the other source's perspective
    let mut vesteda = SourceState::new("VESTEDA");
    let outcome = detector
        .process(&mut vesteda, &cycle(&["Oudegracht 12"]))
        .await?;
    assert_eq!(outcome, Classification::Fresh("Oudegracht 12".to_string()));
    assert_eq!(recorder.sent().len(), 1);

    let mut rebo = SourceState::new("REBO");
    let outcome = detector.process(&mut rebo, &cycle(&["Oudegracht 12"])).await?;
    assert_eq!(outcome, Classification::Unchanged);
    assert_eq!(recorder.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_burst_routing_respects_channel_capability() -> anyhow::Result<()> {
    let store: Arc<dyn ResultStore> = Arc::new(MemoryStore::new());
    store.set_known("REBO", &addresses(&["Oudegracht 12"])).await?;

    let sms = RecordingChannel::new("sms", false);
    let email = RecordingChannel::new("email", true);
    let dispatcher =
        AlertDispatcher::new(vec![Box::new(sms.clone()), Box::new(email.clone())]);
    let detector = ChangeDetector::new(store, dispatcher, false);
    let mut state = SourceState::new("REBO");
    let burst = cycle(&["Oudegracht 12", "Vleutenseweg 210", "Amsterdamsestraatweg 5"]);

    detector.process(&mut state, &burst).await?;
    detector.process(&mut state, &burst).await?;

    // The aggregated alert only goes long-form
    assert_eq!(email.sent().len(), 1);
    assert!(sms.sent().is_empty());

    // A single listing goes out over every channel
    detector
        .process(
            &mut state,
            &cycle(&[
                "Oudegracht 12",
                "Vleutenseweg 210",
                "Amsterdamsestraatweg 5",
                "Lange Nieuwstraat 5",
            ]),
        )
        .await?;
    assert_eq!(email.sent().len(), 2);
    assert_eq!(sms.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_backend_runs_the_same_flow() -> anyhow::Result<()> {
    let store = Arc::new(SqliteStore::open_in_memory().await?);
    store.set_known("REBO", &addresses(&["Oudegracht 12"])).await?;
    let (detector, recorder) = recording_detector(store.clone(), false);
    let mut state = SourceState::new("REBO");
    let burst = cycle(&["Oudegracht 12", "Vleutenseweg 210", "Amsterdamsestraatweg 5"]);

    detector.process(&mut state, &burst).await?;
    detector.process(&mut state, &burst).await?;
    assert_eq!(recorder.sent().len(), 1);

    let active = store.active_listings("REBO").await?;
    assert_eq!(active.len(), 3);
    assert!(active.iter().all(|listing| listing.active));
    Ok(())
}
