use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One address observed on a rental site. Uniqueness is on
/// (address, source); the row id comes from the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Listing {
    pub id: i64,
    pub address: String,
    pub source: String,

    // Observation window
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,

    // Cleared once the address stops appearing in extraction results
    pub active: bool,
}

impl Listing {
    pub fn new(address: impl Into<String>, source: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            address: address.into(),
            source: source.into(),
            first_seen: now,
            last_seen: now,
            active: true,
        }
    }
}

/// Outcome of one extraction attempt against a site. A cycle that blew
/// up halfway still reports the items it collected before failing, so
/// detection can run over partial results while the baseline update is
/// withheld.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Extraction {
    pub items: Vec<String>,
    pub error: Option<String>,
}

impl Extraction {
    pub fn complete(items: Vec<String>) -> Self {
        Self { items, error: None }
    }

    pub fn failed(items: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            items,
            error: Some(error.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
