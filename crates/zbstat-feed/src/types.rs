//! Status feed data types.

use serde::{Deserialize, Serialize};

/// Pre-declared tracked key with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedItem {
    /// Stable identifier used by the server (e.g., "genshin").
    pub key: String,
    /// Human-readable label.
    pub display: String,
}

impl SeedItem {
    pub fn new(key: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display: display.into(),
        }
    }

    /// Seed set of the stock status server: Genshin, ZZZ and Star Rail.
    pub fn defaults() -> Vec<SeedItem> {
        vec![
            SeedItem::new("genshin", "Genshin"),
            SeedItem::new("zzz", "ZZZ"),
            SeedItem::new("hkrpg", "Star Rail"),
        ]
    }
}

/// One tracked status category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub key: String,
    /// Set at initialization, never touched by updates.
    pub display: String,
    /// Last received progress value.
    pub curr: i64,
    /// Last received capacity value.
    pub max: i64,
}

impl TrackedItem {
    pub(crate) fn from_seed(seed: SeedItem) -> Self {
        Self {
            key: seed.key,
            display: seed.display,
            curr: 0,
            max: 0,
        }
    }
}

impl std::fmt::Display for TrackedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}/{}", self.display, self.curr, self.max)
    }
}

/// Owned copy of the published state, in seed order.
///
/// `status` serializes as a map of key to `{ display, curr, max }`,
/// with entries written in seed order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub connected: bool,
    #[serde(with = "status_map")]
    pub status: Vec<TrackedItem>,
}

impl StatusSnapshot {
    /// Look up a tracked item by key.
    pub fn get(&self, key: &str) -> Option<&TrackedItem> {
        self.status.iter().find(|item| item.key == key)
    }

    /// Render the panel line shown by a status bar.
    ///
    /// Returns `None` while disconnected: a missing panel is the
    /// error signal.
    pub fn status_line(&self) -> Option<String> {
        if !self.connected {
            return None;
        }
        let parts: Vec<String> = self.status.iter().map(ToString::to_string).collect();
        Some(parts.join(" | "))
    }
}

mod status_map {
    use super::TrackedItem;
    use serde::de::{self, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashSet;
    use std::fmt;

    #[derive(Serialize)]
    struct RecordRef<'a> {
        display: &'a str,
        curr: i64,
        max: i64,
    }

    #[derive(Deserialize)]
    struct Record {
        display: String,
        curr: i64,
        max: i64,
    }

    pub fn serialize<S>(items: &[TrackedItem], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(items.len()))?;
        for item in items {
            let record = RecordRef {
                display: &item.display,
                curr: item.curr,
                max: item.max,
            };
            map.serialize_entry(&item.key, &record)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<TrackedItem>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(StatusMapVisitor)
    }

    struct StatusMapVisitor;

    impl<'de> Visitor<'de> for StatusMapVisitor {
        type Value = Vec<TrackedItem>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of tracked key to status record")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut seen = HashSet::new();
            let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, record)) = access.next_entry::<String, Record>()? {
                if !seen.insert(key.clone()) {
                    return Err(de::Error::custom(format!("duplicate tracked key: {key}")));
                }
                items.push(TrackedItem {
                    key,
                    display: record.display,
                    curr: record.curr,
                    max: record.max,
                });
            }
            Ok(items)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, display: &str, curr: i64, max: i64) -> TrackedItem {
        TrackedItem {
            key: key.to_string(),
            display: display.to_string(),
            curr,
            max,
        }
    }

    #[test]
    fn test_default_seed_order() {
        let keys: Vec<String> = SeedItem::defaults().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["genshin", "zzz", "hkrpg"]);
    }

    #[test]
    fn test_status_line_connected() {
        let snapshot = StatusSnapshot {
            connected: true,
            status: vec![
                item("genshin", "Genshin", 3, 10),
                item("hkrpg", "Star Rail", 0, 240),
            ],
        };
        assert_eq!(
            snapshot.status_line().as_deref(),
            Some("Genshin: 3/10 | Star Rail: 0/240")
        );
    }

    #[test]
    fn test_status_line_hidden_when_disconnected() {
        let snapshot = StatusSnapshot {
            connected: false,
            status: vec![item("genshin", "Genshin", 3, 10)],
        };
        assert!(snapshot.status_line().is_none());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = StatusSnapshot {
            connected: true,
            status: vec![item("zzz", "ZZZ", 120, 240)],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["connected"], true);
        assert_eq!(json["status"]["zzz"]["display"], "ZZZ");
        assert_eq!(json["status"]["zzz"]["curr"], 120);
        assert_eq!(json["status"]["zzz"]["max"], 240);
        assert!(json["status"]["zzz"].get("key").is_none());
    }

    #[test]
    fn test_snapshot_json_keeps_seed_order() {
        let snapshot = StatusSnapshot {
            connected: true,
            status: vec![
                item("zzz", "ZZZ", 1, 2),
                item("genshin", "Genshin", 3, 4),
            ],
        };
        let text = serde_json::to_string(&snapshot).unwrap();
        let zzz = text.find("\"zzz\"").unwrap();
        let genshin = text.find("\"genshin\"").unwrap();
        assert!(zzz < genshin, "entries written in seed order: {text}");

        let parsed: StatusSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_snapshot_rejects_duplicate_keys() {
        let text = r#"{"connected":true,"status":{
            "a":{"display":"A","curr":1,"max":1},
            "a":{"display":"B","curr":2,"max":2}}}"#;
        assert!(serde_json::from_str::<StatusSnapshot>(text).is_err());
    }
}
