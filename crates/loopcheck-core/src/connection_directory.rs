use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::check_error::CheckError;

/// One currently-active endpoint of the messaging channel.
///
/// Records are owned by the channel's own connect handling; only
/// `connection_id` is guaranteed present and unique at any instant, and a
/// record may vanish between a listing and a later use of its handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub connection_id: String,
    pub device_id: String,
    pub user_id: Option<String>,
    pub source_ip: String,
    pub connected_at: String,
}

/// Exactly one way of picking a target out of the directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolveCriteria {
    ConnectionId(String),
    UserId(String),
    DeviceId(String),
    SourceIp(String),
    /// Newest record wins.
    #[default]
    Newest,
}

impl fmt::Display for ResolveCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionId(value) => write!(f, "connectionId={value}"),
            Self::UserId(value) => write!(f, "userId={value}"),
            Self::DeviceId(value) => write!(f, "deviceId={value}"),
            Self::SourceIp(value) => write!(f, "sourceIp={value}"),
            Self::Newest => write!(f, "most recent connection"),
        }
    }
}

/// Read-only scan over the externally-owned connection registry.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    async fn scan_connections(&self) -> Result<Vec<ConnectionRecord>, CheckError>;
}

/// Resolves a target bot's routing identity from the registry of active
/// connections, by explicit identity or by most-recent fallback.
pub struct ConnectionDirectory {
    registry: Arc<dyn ConnectionRegistry>,
}

impl ConnectionDirectory {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// All active connections, newest-first by `connected_at`.
    pub async fn list(&self) -> Result<Vec<ConnectionRecord>, CheckError> {
        let mut records = self.registry.scan_connections().await?;
        records.sort_by(|a, b| b.connected_at.cmp(&a.connected_at));
        Ok(records)
    }

    /// First-match-wins lookup against the newest-first listing.
    ///
    /// Absence is a valid outcome of lookup, never retried: an empty
    /// directory or an unmatched criterion yields [`CheckError::NotFound`].
    pub async fn resolve(
        &self,
        criteria: &ResolveCriteria,
    ) -> Result<ConnectionRecord, CheckError> {
        let records = self.list().await?;
        let not_found = || CheckError::NotFound {
            criteria: criteria.to_string(),
        };
        if records.is_empty() {
            return Err(not_found());
        }

        let matched = match criteria {
            ResolveCriteria::ConnectionId(id) => {
                records.into_iter().find(|r| r.connection_id == *id)
            }
            ResolveCriteria::UserId(id) => records
                .into_iter()
                .find(|r| r.user_id.as_deref() == Some(id.as_str())),
            ResolveCriteria::DeviceId(id) => records.into_iter().find(|r| r.device_id == *id),
            ResolveCriteria::SourceIp(ip) => records.into_iter().find(|r| r.source_ip == *ip),
            ResolveCriteria::Newest => records.into_iter().next(),
        };
        matched.ok_or_else(not_found)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{ConnectionDirectory, ConnectionRecord, ConnectionRegistry, ResolveCriteria};
    use crate::check_error::CheckError;

    struct FixedRegistry {
        records: Vec<ConnectionRecord>,
    }

    #[async_trait]
    impl ConnectionRegistry for FixedRegistry {
        async fn scan_connections(&self) -> Result<Vec<ConnectionRecord>, CheckError> {
            Ok(self.records.clone())
        }
    }

    fn record(connection_id: &str, connected_at: &str) -> ConnectionRecord {
        ConnectionRecord {
            connection_id: connection_id.to_string(),
            device_id: format!("device-{connection_id}"),
            user_id: None,
            source_ip: "10.0.0.1".to_string(),
            connected_at: connected_at.to_string(),
        }
    }

    fn directory(records: Vec<ConnectionRecord>) -> ConnectionDirectory {
        ConnectionDirectory::new(Arc::new(FixedRegistry { records }))
    }

    #[tokio::test]
    async fn unit_list_orders_newest_first() {
        let directory = directory(vec![
            record("old", "2024-01-01T00:00:00Z"),
            record("new", "2024-03-01T00:00:00Z"),
            record("mid", "2024-02-01T00:00:00Z"),
        ]);
        let listed = directory.list().await.expect("list");
        let ids: Vec<&str> = listed.iter().map(|r| r.connection_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn functional_resolve_newest_returns_single_record() {
        let directory = directory(vec![record("c1", "2024-01-01T00:00:00Z")]);
        let resolved = directory
            .resolve(&ResolveCriteria::Newest)
            .await
            .expect("resolve");
        assert_eq!(resolved.connection_id, "c1");
    }

    #[tokio::test]
    async fn functional_resolve_is_first_match_wins_against_listed_order() {
        let mut older = record("older", "2024-01-01T00:00:00Z");
        older.user_id = Some("bot".to_string());
        let mut newer = record("newer", "2024-02-01T00:00:00Z");
        newer.user_id = Some("bot".to_string());
        let directory = directory(vec![older, newer]);

        let resolved = directory
            .resolve(&ResolveCriteria::UserId("bot".to_string()))
            .await
            .expect("resolve");
        assert_eq!(resolved.connection_id, "newer");
    }

    #[tokio::test]
    async fn functional_resolve_matches_each_explicit_criterion() {
        let mut target = record("c2", "2024-01-02T00:00:00Z");
        target.user_id = Some("bot-user".to_string());
        target.source_ip = "192.0.2.7".to_string();
        let directory = directory(vec![record("c1", "2024-01-03T00:00:00Z"), target.clone()]);

        for criteria in [
            ResolveCriteria::ConnectionId("c2".to_string()),
            ResolveCriteria::UserId("bot-user".to_string()),
            ResolveCriteria::DeviceId("device-c2".to_string()),
            ResolveCriteria::SourceIp("192.0.2.7".to_string()),
        ] {
            let resolved = directory.resolve(&criteria).await.expect("resolve");
            assert_eq!(resolved, target, "criteria {criteria}");
        }
    }

    #[tokio::test]
    async fn unit_resolve_is_idempotent_for_unchanged_registry() {
        let directory = directory(vec![
            record("a", "2024-01-01T00:00:00Z"),
            record("b", "2024-01-02T00:00:00Z"),
        ]);
        let criteria = ResolveCriteria::DeviceId("device-a".to_string());
        let first = directory.resolve(&criteria).await.expect("first");
        let second = directory.resolve(&criteria).await.expect("second");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn regression_empty_directory_is_not_found_for_every_criterion() {
        let directory = directory(Vec::new());
        for criteria in [
            ResolveCriteria::ConnectionId("c1".to_string()),
            ResolveCriteria::UserId("u1".to_string()),
            ResolveCriteria::DeviceId("d1".to_string()),
            ResolveCriteria::SourceIp("10.0.0.1".to_string()),
            ResolveCriteria::Newest,
        ] {
            let error = directory
                .resolve(&criteria)
                .await
                .expect_err("empty directory must not resolve");
            assert!(matches!(error, CheckError::NotFound { .. }), "criteria {criteria}");
        }
    }

    #[tokio::test]
    async fn unit_unmatched_criterion_on_nonempty_directory_is_not_found() {
        let directory = directory(vec![record("c1", "2024-01-01T00:00:00Z")]);
        let error = directory
            .resolve(&ResolveCriteria::ConnectionId("absent".to_string()))
            .await
            .expect_err("must not match");
        assert_eq!(
            error,
            CheckError::NotFound {
                criteria: "connectionId=absent".to_string()
            }
        );
    }
}
