//! Campaign attribution metadata
//!
//! The embedding host pushes metadata bags at any time; the last one wins.
//! The controller holds an [`AttributionSubscription`] for its lifetime and
//! reads a snapshot at submit time. Once the subscription is dropped the
//! publisher's sends report that nobody is listening.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tokio::sync::watch;

/// Attribution keys copied into the sink payload, in output order
pub const ATTRIBUTION_KEYS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
];

/// Snapshot of the named attribution values. Keys never supplied are empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributionMetadata {
    values: Vec<String>,
}

impl Default for AttributionMetadata {
    fn default() -> Self {
        Self {
            values: vec![String::new(); ATTRIBUTION_KEYS.len()],
        }
    }
}

impl AttributionMetadata {
    /// Build from arbitrary key/value pairs; unknown keys are dropped.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut metadata = Self::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            match ATTRIBUTION_KEYS.iter().position(|k| *k == key) {
                Some(idx) => metadata.values[idx] = value.into(),
                None => tracing::debug!("Ignoring unknown attribution key '{}'", key),
            }
        }
        metadata
    }

    /// Build from a JSON message body. Non-object bodies yield defaults;
    /// non-string values are skipped.
    pub fn from_json(body: &Value) -> Self {
        let Some(object) = body.as_object() else {
            tracing::debug!("Attribution message is not an object; using defaults");
            return Self::default();
        };

        Self::from_pairs(
            object
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s.to_string()))),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        ATTRIBUTION_KEYS
            .iter()
            .position(|k| *k == key)
            .map(|idx| self.values[idx].as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        ATTRIBUTION_KEYS
            .iter()
            .copied()
            .zip(self.values.iter().map(String::as_str))
    }
}

impl Serialize for AttributionMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ATTRIBUTION_KEYS.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Host-side handle for delivering metadata bags
#[derive(Debug, Clone)]
pub struct AttributionPublisher {
    tx: watch::Sender<AttributionMetadata>,
}

impl AttributionPublisher {
    /// Replace the current metadata. Returns false once the wizard is gone.
    pub fn publish(&self, metadata: AttributionMetadata) -> bool {
        if self.tx.send(metadata).is_err() {
            tracing::debug!("Attribution received after wizard shut down; dropped");
            return false;
        }
        true
    }
}

/// Controller-side view of the latest metadata
#[derive(Debug)]
pub struct AttributionSubscription {
    rx: watch::Receiver<AttributionMetadata>,
}

impl AttributionSubscription {
    /// The most recently published metadata, or defaults if none arrived
    pub fn current(&self) -> AttributionMetadata {
        self.rx.borrow().clone()
    }
}

/// Create a connected publisher/subscription pair
pub fn attribution_channel() -> (AttributionPublisher, AttributionSubscription) {
    let (tx, rx) = watch::channel(AttributionMetadata::default());
    (AttributionPublisher { tx }, AttributionSubscription { rx })
}
