use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use time::Date;

/// A user's contribution count for a single day
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
pub(crate) struct DailyCount {
    pub(crate) date: Date,
    pub(crate) count: u32,
}

/// Source of raw activity data.  Calls for different years are independent of
/// each other and may be made from different threads at once.
pub(crate) trait ActivityFetcher: Sync {
    fn fetch_daily_counts(&self, username: &str, year: i32) -> Result<Vec<DailyCount>, FetchError>;

    fn fetch_repos_created_in_year(&self, username: &str, year: i32) -> Result<u32, FetchError>;

    /// Years in which the user has any recorded activity, in ascending order
    fn contribution_years(&self, username: &str) -> Result<Vec<i32>, FetchError>;
}

impl<T: ActivityFetcher + ?Sized> ActivityFetcher for &T {
    fn fetch_daily_counts(&self, username: &str, year: i32) -> Result<Vec<DailyCount>, FetchError> {
        (**self).fetch_daily_counts(username, year)
    }

    fn fetch_repos_created_in_year(&self, username: &str, year: i32) -> Result<u32, FetchError> {
        (**self).fetch_repos_created_in_year(username, year)
    }

    fn contribution_years(&self, username: &str) -> Result<Vec<i32>, FetchError> {
        (**self).contribution_years(username)
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum FetchError {
    #[error("user {0:?} not found")]
    UserNotFound(String),
    #[error("rate limited by the activity source")]
    RateLimited { retry_after: Option<Duration> },
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    username: String,
    #[serde(default)]
    contributions: Vec<DailyCount>,
    #[serde(default)]
    repos_created: BTreeMap<i32, u32>,
}

/// Serves activity for a single user from a previously exported JSON
/// document
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct SnapshotFetcher {
    snapshot: Snapshot,
}

impl SnapshotFetcher {
    pub(crate) fn from_json(src: &str) -> Result<SnapshotFetcher, serde_json::Error> {
        let snapshot = serde_json::from_str::<Snapshot>(src)?;
        tracing::debug!(
            username = %snapshot.username,
            days = snapshot.contributions.len(),
            "Loaded contribution snapshot"
        );
        Ok(SnapshotFetcher { snapshot })
    }

    pub(crate) fn from_path(path: &Path) -> Result<SnapshotFetcher, SnapshotError> {
        let src = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.display().to_string(),
            source,
        })?;
        SnapshotFetcher::from_json(&src).map_err(|source| SnapshotError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn check_user(&self, username: &str) -> Result<(), FetchError> {
        if self.snapshot.username.eq_ignore_ascii_case(username) {
            Ok(())
        } else {
            Err(FetchError::UserNotFound(username.to_owned()))
        }
    }
}

impl ActivityFetcher for SnapshotFetcher {
    fn fetch_daily_counts(&self, username: &str, year: i32) -> Result<Vec<DailyCount>, FetchError> {
        self.check_user(username)?;
        Ok(self
            .snapshot
            .contributions
            .iter()
            .filter(|dc| dc.date.year() == year)
            .copied()
            .collect())
    }

    fn fetch_repos_created_in_year(&self, username: &str, year: i32) -> Result<u32, FetchError> {
        self.check_user(username)?;
        Ok(self
            .snapshot
            .repos_created
            .get(&year)
            .copied()
            .unwrap_or_default())
    }

    fn contribution_years(&self, username: &str) -> Result<Vec<i32>, FetchError> {
        self.check_user(username)?;
        let mut years = self
            .snapshot
            .contributions
            .iter()
            .filter(|dc| dc.count > 0)
            .map(|dc| dc.date.year())
            .chain(self.snapshot.repos_created.keys().copied())
            .collect::<Vec<_>>();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }
}

#[derive(Debug, Error)]
pub(crate) enum SnapshotError {
    #[error("failed to read {path}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}
