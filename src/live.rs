//! Push subscriptions over store paths.
//!
//! A subscription names one path. Whenever a write touches that path the
//! subscriber gets the whole collection again; there is no diffing. Events
//! are queued while a request is handled and flushed after its response.

use crate::model::{Assignment, Student, StreamPost, Trainer};
use crate::store::{admins, assignments, streams, students, trainers};
use rusqlite::Connection;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorePath {
    Admin,
    Students,
    Trainers,
    Assignments(String),
    Stream(String),
}

impl StorePath {
    /// Same collection, possibly a different trainer or batch.
    pub fn same_kind(&self, other: &StorePath) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn default_sort(&self) -> Option<SortSpec> {
        match self {
            Self::Stream(_) => Some(SortSpec {
                key: SortKey::Timestamp,
                direction: SortDirection::Desc,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Students => f.write_str("students"),
            Self::Trainers => f.write_str("trainers"),
            Self::Assignments(trainer_id) => write!(f, "assignments/{trainer_id}"),
            Self::Stream(batch) => write!(f, "streams/{batch}"),
        }
    }
}

impl FromStr for StorePath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('/');
        let mut parts = trimmed.split('/');
        let head = parts.next().unwrap_or_default();
        let key = parts.next();
        if parts.next().is_some() {
            return Err(format!("path too deep: {s}"));
        }
        let key = key.map(str::trim);
        match (head, key) {
            ("admin", None) => Ok(Self::Admin),
            ("students", None) => Ok(Self::Students),
            ("trainers", None) => Ok(Self::Trainers),
            ("assignments", Some(k)) if !k.is_empty() => Ok(Self::Assignments(k.to_string())),
            ("streams", Some(k)) if !k.is_empty() => Ok(Self::Stream(k.to_string())),
            _ => Err(format!("unknown store path: {s}")),
        }
    }
}

impl Serialize for StorePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Timestamp,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    #[serde(default = "default_direction")]
    pub direction: SortDirection,
}

fn default_direction() -> SortDirection {
    SortDirection::Asc
}

pub trait Sortable {
    fn sort_timestamp(&self) -> Option<&str>;
    fn sort_name(&self) -> &str;
}

impl Sortable for Trainer {
    fn sort_timestamp(&self) -> Option<&str> {
        Some(&self.created_at)
    }
    fn sort_name(&self) -> &str {
        &self.name
    }
}

impl Sortable for Student {
    fn sort_timestamp(&self) -> Option<&str> {
        Some(&self.created_at)
    }
    fn sort_name(&self) -> &str {
        &self.name
    }
}

impl Sortable for Assignment {
    fn sort_timestamp(&self) -> Option<&str> {
        Some(&self.submitted_at)
    }
    fn sort_name(&self) -> &str {
        &self.student_name
    }
}

impl Sortable for StreamPost {
    fn sort_timestamp(&self) -> Option<&str> {
        Some(&self.timestamp)
    }
    fn sort_name(&self) -> &str {
        &self.author_name
    }
}

impl Sortable for String {
    fn sort_timestamp(&self) -> Option<&str> {
        None
    }
    fn sort_name(&self) -> &str {
        self
    }
}

/// Stable: equal keys keep their creation order in both directions.
pub fn sort_records<T: Sortable>(items: &mut [T], spec: SortSpec) {
    items.sort_by(|a, b| {
        let ord = match spec.key {
            SortKey::Timestamp => a.sort_timestamp().cmp(&b.sort_timestamp()),
            SortKey::Name => a
                .sort_name()
                .to_lowercase()
                .cmp(&b.sort_name().to_lowercase()),
        };
        match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

fn sorted_value<T: Sortable + Serialize>(
    mut items: Vec<T>,
    sort: Option<SortSpec>,
) -> anyhow::Result<serde_json::Value> {
    if let Some(spec) = sort {
        sort_records(&mut items, spec);
    }
    Ok(serde_json::to_value(items)?)
}

pub trait SnapshotSource {
    fn snapshot(&self, path: &StorePath, sort: Option<SortSpec>)
        -> anyhow::Result<serde_json::Value>;
}

impl SnapshotSource for Connection {
    fn snapshot(
        &self,
        path: &StorePath,
        sort: Option<SortSpec>,
    ) -> anyhow::Result<serde_json::Value> {
        match path {
            StorePath::Admin => sorted_value(admins::list(self)?, sort),
            StorePath::Students => sorted_value(students::list(self)?, sort),
            StorePath::Trainers => sorted_value(trainers::list(self)?, sort),
            StorePath::Assignments(trainer_id) => {
                sorted_value(assignments::list(self, trainer_id)?, sort)
            }
            StorePath::Stream(batch) => sorted_value(streams::list(self, batch)?, sort),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum LiveEvent {
    #[serde(rename_all = "camelCase")]
    Snapshot {
        subscription_id: String,
        path: StorePath,
        value: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        subscription_id: String,
        path: StorePath,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub path: StorePath,
    pub sort: Option<SortSpec>,
}

#[derive(Debug, Default)]
pub struct LiveHub {
    subs: BTreeMap<String, Subscription>,
    /// Subscriptions owed an initial snapshot, in registration order.
    fresh: Vec<String>,
    touched: Vec<StorePath>,
}

impl LiveHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// `sort: None` falls back to the path's default ordering.
    pub fn subscribe(&mut self, path: StorePath, sort: Option<SortSpec>) -> String {
        let id = Uuid::new_v4().to_string();
        let sort = sort.or_else(|| path.default_sort());
        tracing::debug!(subscription_id = %id, path = %path, "subscribed");
        self.subs.insert(
            id.clone(),
            Subscription {
                id: id.clone(),
                path,
                sort,
            },
        );
        self.fresh.push(id.clone());
        id
    }

    /// Re-points an existing subscription. Nothing for the old path is
    /// delivered under this id afterwards. Without `sort`, a switch within
    /// the same collection kind keeps the current ordering; a switch to
    /// another kind takes that path's default.
    pub fn switch(&mut self, id: &str, path: StorePath, sort: Option<SortSpec>) -> bool {
        let Some(sub) = self.subs.get_mut(id) else {
            return false;
        };
        tracing::debug!(subscription_id = %id, from = %sub.path, to = %path, "subscription switched");
        sub.sort = match sort {
            Some(spec) => Some(spec),
            None if sub.path.same_kind(&path) => sub.sort,
            None => path.default_sort(),
        };
        sub.path = path;
        if !self.fresh.iter().any(|f| f == id) {
            self.fresh.push(id.to_string());
        }
        true
    }

    /// False when the id is unknown, including a second unsubscribe.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        let removed = self.subs.remove(id).is_some();
        if removed {
            self.fresh.retain(|f| f != id);
            tracing::debug!(subscription_id = %id, "unsubscribed");
        }
        removed
    }

    pub fn touch(&mut self, path: StorePath) {
        if !self.touched.contains(&path) {
            self.touched.push(path);
        }
    }

    /// Everything is stale after the backing store is swapped.
    pub fn touch_all(&mut self) {
        let paths: Vec<StorePath> = self.subs.values().map(|s| s.path.clone()).collect();
        for path in paths {
            self.touch(path);
        }
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subs.values().cloned().collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.fresh.is_empty() || !self.touched.is_empty()
    }

    /// Discards queued work; used when no store is open to read from.
    pub fn clear_pending(&mut self) {
        self.fresh.clear();
        self.touched.clear();
    }

    pub fn flush<S: SnapshotSource + ?Sized>(&mut self, source: &S) -> Vec<LiveEvent> {
        let mut due = std::mem::take(&mut self.fresh);
        let touched = std::mem::take(&mut self.touched);
        for path in &touched {
            for (id, sub) in &self.subs {
                if &sub.path == path && !due.contains(id) {
                    due.push(id.clone());
                }
            }
        }

        due.into_iter()
            .filter_map(|id| self.subs.get(&id))
            .map(|sub| match source.snapshot(&sub.path, sub.sort) {
                Ok(value) => LiveEvent::Snapshot {
                    subscription_id: sub.id.clone(),
                    path: sub.path.clone(),
                    value,
                },
                Err(e) => {
                    tracing::error!(subscription_id = %sub.id, path = %sub.path, error = %e, "snapshot failed");
                    LiveEvent::Error {
                        subscription_id: sub.id.clone(),
                        path: sub.path.clone(),
                        message: e.to_string(),
                    }
                }
            })
            .collect()
    }
}
