// Integration tests for huurwatch
// These tests verify detection, storage and alerting work together

pub mod detection_tests;
pub mod store_tests;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use huurwatch::detector::ChangeDetector;
use huurwatch::models::Extraction;
use huurwatch::notify::{AlertChannel, AlertDispatcher};
use huurwatch::store::ResultStore;

/// Captures everything the dispatcher sends so scenarios can assert
/// on alert counts and content.
#[derive(Clone)]
pub struct RecordingChannel {
    label: &'static str,
    burst_capable: bool,
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingChannel {
    pub fn new(label: &'static str, burst_capable: bool) -> Self {
        Self {
            label,
            burst_capable,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertChannel for RecordingChannel {
    fn name(&self) -> &str {
        self.label
    }

    fn supports_burst(&self) -> bool {
        self.burst_capable
    }

    async fn send(&self, subject: &str, body: &str) -> huurwatch::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// A detector over the given store with one burst-capable recording
/// channel attached.
pub fn recording_detector(
    store: Arc<dyn ResultStore>,
    debug: bool,
) -> (ChangeDetector, RecordingChannel) {
    let recorder = RecordingChannel::new("recording", true);
    let dispatcher = AlertDispatcher::new(vec![Box::new(recorder.clone())]);
    (ChangeDetector::new(store, dispatcher, debug), recorder)
}

pub fn addresses(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn cycle(items: &[&str]) -> Extraction {
    Extraction::complete(addresses(items))
}
