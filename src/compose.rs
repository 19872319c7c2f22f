use crate::calendar::{GridBuilder, InvalidYearError, WeekStart};
use crate::fetch::{ActivityFetcher, DailyCount, FetchError};
use crate::model::{AssembleError, GraphModel, YearEntry, assemble};
use std::thread;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) enum YearOrder {
    Ascending,
    #[default]
    Descending,
}

/// Everything a single graph request depends on.  Nothing is read from
/// global state while composing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct GraphRequest {
    pub(crate) username: String,
    /// Years to include; if empty, every year the fetcher reports activity in
    pub(crate) years: Vec<i32>,
    pub(crate) week_start: WeekStart,
    pub(crate) order: YearOrder,
    pub(crate) generated_at: OffsetDateTime,
}

impl GraphRequest {
    pub(crate) fn new(username: &str, generated_at: OffsetDateTime) -> GraphRequest {
        GraphRequest {
            username: username.to_owned(),
            years: Vec::new(),
            week_start: WeekStart::default(),
            order: YearOrder::default(),
            generated_at,
        }
    }

    pub(crate) fn years<I: IntoIterator<Item = i32>>(mut self, years: I) -> Self {
        self.years = years.into_iter().collect();
        self
    }

    pub(crate) fn week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    pub(crate) fn order(mut self, order: YearOrder) -> Self {
        self.order = order;
        self
    }
}

type YearFetch = Result<(Vec<DailyCount>, u32), FetchError>;

/// Fetch, build, and assemble every requested year.  All fetches must succeed;
/// if any fail, the error for the first failing year in output order is
/// returned and nothing is assembled.
#[tracing::instrument(skip_all, fields(username = %request.username))]
pub(crate) fn compose<F: ActivityFetcher>(
    fetcher: &F,
    request: &GraphRequest,
) -> Result<GraphModel, ComposeError> {
    let builder = GridBuilder::new(request.week_start, request.generated_at);
    let latest = request.generated_at.year();
    let mut years = if request.years.is_empty() {
        // Reported years outside the supported range are skipped
        let (supported, skipped): (Vec<i32>, Vec<i32>) = fetcher
            .contribution_years(&request.username)
            .map_err(|source| ComposeError::Years { source })?
            .into_iter()
            .partition(|&year| InvalidYearError::check(year, latest).is_ok());
        if !skipped.is_empty() {
            tracing::warn!(?skipped, "Ignoring reported years outside the supported range");
        }
        supported
    } else {
        request.years.clone()
    };
    years.sort_unstable();
    years.dedup();
    if request.order == YearOrder::Descending {
        years.reverse();
    }
    if years.is_empty() {
        return Err(ComposeError::NoYears);
    }
    for &year in &years {
        builder.check_year(year)?;
    }
    tracing::info!(?years, "Fetching contribution data");
    let fetched = fetch_all(fetcher, &request.username, &years);
    let mut entries = Vec::with_capacity(years.len());
    for (year, r) in years.into_iter().zip(fetched) {
        let (counts, repos_created) = r.map_err(|source| {
            tracing::warn!(year, error = %source, "Failed to fetch year");
            ComposeError::Fetch { year, source }
        })?;
        let grid = builder.build(year, &counts)?;
        entries.push(YearEntry {
            year,
            grid,
            repos_created,
        });
    }
    let model = assemble(&request.username, entries, request.generated_at)?;
    tracing::info!(
        years = model.years.len(),
        total = model.total_contributions(),
        "Composed contribution graph"
    );
    Ok(model)
}

// Issues one fetch per year concurrently and returns the results in the same
// order as `years`
fn fetch_all<F: ActivityFetcher>(fetcher: &F, username: &str, years: &[i32]) -> Vec<YearFetch> {
    thread::scope(|s| {
        let handles = years
            .iter()
            .map(|&year| {
                s.spawn(move || -> YearFetch {
                    let counts = fetcher.fetch_daily_counts(username, year)?;
                    let repos = fetcher.fetch_repos_created_in_year(username, year)?;
                    tracing::debug!(year, days = counts.len(), repos, "Fetched year");
                    Ok((counts, repos))
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(FetchError::Network(String::from("fetch thread panicked")))
                })
            })
            .collect()
    })
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum ComposeError {
    #[error("failed to determine which years to fetch")]
    Years { source: FetchError },
    #[error("failed to fetch contributions for {year}")]
    Fetch { year: i32, source: FetchError },
    #[error("no years with activity to show")]
    NoYears,
    #[error(transparent)]
    InvalidYear(#[from] InvalidYearError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

impl ComposeError {
    /// The collaborator failure behind this error, if any
    pub(crate) fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            ComposeError::Years { source } | ComposeError::Fetch { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::SnapshotFetcher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::{date, datetime};

    const NOW: OffsetDateTime = datetime!(2024-11-20 10:00 UTC);

    static SNAPSHOT: &str = r#"{
        "username": "octocat",
        "contributions": [
            {"date": "2022-02-02", "count": 1},
            {"date": "2024-01-01", "count": 3},
            {"date": "2024-07-04", "count": 12}
        ],
        "reposCreated": {"2024": 2}
    }"#;

    /// Fails every call for one year and counts how often it was asked
    #[derive(Debug)]
    struct FlakyFetcher {
        bad_year: i32,
        error: FetchError,
        calls: AtomicUsize,
    }

    impl ActivityFetcher for FlakyFetcher {
        fn fetch_daily_counts(
            &self,
            _username: &str,
            year: i32,
        ) -> Result<Vec<DailyCount>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if year == self.bad_year {
                Err(self.error.clone())
            } else {
                Ok(vec![DailyCount {
                    date: date!(2020 - 06 - 01).replace_year(year).unwrap(),
                    count: 1,
                }])
            }
        }

        fn fetch_repos_created_in_year(&self, _username: &str, _year: i32) -> Result<u32, FetchError> {
            Ok(0)
        }

        fn contribution_years(&self, _username: &str) -> Result<Vec<i32>, FetchError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_compose_explicit_years() {
        let fetcher = SnapshotFetcher::from_json(SNAPSHOT).unwrap();
        let request = GraphRequest::new("octocat", NOW).years([2023, 2024]);
        let model = compose(&fetcher, &request).unwrap();
        let years = model.years.iter().map(|y| y.year).collect::<Vec<_>>();
        assert_eq!(years, [2024, 2023]);
        assert_eq!(model.years[0].total_contributions, 15);
        assert_eq!(model.years[0].repos_created, 2);
        assert_eq!(model.years[1].total_contributions, 0);
        assert_eq!(model.generated_at, NOW);
    }

    #[test]
    fn test_compose_reported_years_ascending() {
        let fetcher = SnapshotFetcher::from_json(SNAPSHOT).unwrap();
        let request = GraphRequest::new("octocat", NOW)
            .order(YearOrder::Ascending)
            .week_start(WeekStart::Monday);
        let model = compose(&fetcher, &request).unwrap();
        let years = model.years.iter().map(|y| y.year).collect::<Vec<_>>();
        assert_eq!(years, [2022, 2024]);
        assert!(model.years.iter().all(|y| y.week_start == WeekStart::Monday));
    }

    #[test]
    fn test_compose_dedups_years() {
        let fetcher = SnapshotFetcher::from_json(SNAPSHOT).unwrap();
        let request = GraphRequest::new("octocat", NOW).years([2024, 2024]);
        let model = compose(&fetcher, &request).unwrap();
        assert_eq!(model.years.len(), 1);
    }

    #[test]
    fn test_one_failed_year_fails_all() {
        let fetcher = FlakyFetcher {
            bad_year: 2022,
            error: FetchError::RateLimited { retry_after: None },
            calls: AtomicUsize::new(0),
        };
        let request = GraphRequest::new("octocat", NOW).years([2021, 2022, 2023]);
        let r = compose(&fetcher, &request);
        assert_eq!(
            r,
            Err(ComposeError::Fetch {
                year: 2022,
                source: FetchError::RateLimited { retry_after: None }
            })
        );
        // No retries
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_invalid_year_checked_before_fetching() {
        let fetcher = FlakyFetcher {
            bad_year: 0,
            error: FetchError::Network("unused".into()),
            calls: AtomicUsize::new(0),
        };
        let request = GraphRequest::new("octocat", NOW).years([2024, 2030]);
        assert_eq!(
            compose(&fetcher, &request),
            Err(ComposeError::InvalidYear(InvalidYearError {
                year: 2030,
                latest: 2024
            }))
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reported_years_outside_range_skipped() {
        let fetcher = SnapshotFetcher::from_json(
            r#"{
                "username": "octocat",
                "contributions": [
                    {"date": "2024-03-03", "count": 2},
                    {"date": "2025-01-05", "count": 1}
                ],
                "reposCreated": {"2007": 1, "2024": 1}
            }"#,
        )
        .unwrap();
        let model = compose(&fetcher, &GraphRequest::new("octocat", NOW)).unwrap();
        let years = model.years.iter().map(|y| y.year).collect::<Vec<_>>();
        assert_eq!(years, [2024]);
        assert_eq!(model.years[0].total_contributions, 2);
    }

    #[test]
    fn test_only_unsupported_reported_years() {
        let fetcher = SnapshotFetcher::from_json(
            r#"{"username": "octocat", "reposCreated": {"2007": 3}}"#,
        )
        .unwrap();
        assert_eq!(
            compose(&fetcher, &GraphRequest::new("octocat", NOW)),
            Err(ComposeError::NoYears)
        );
    }

    #[test]
    fn test_unknown_user() {
        let fetcher = SnapshotFetcher::from_json(SNAPSHOT).unwrap();
        let request = GraphRequest::new("hubot", NOW);
        let err = compose(&fetcher, &request).unwrap_err();
        assert_eq!(
            err.fetch_error(),
            Some(&FetchError::UserNotFound("hubot".into()))
        );
    }

    #[test]
    fn test_no_years() {
        let fetcher = SnapshotFetcher::from_json(r#"{"username": "ghost"}"#).unwrap();
        let request = GraphRequest::new("ghost", NOW);
        assert_eq!(compose(&fetcher, &request), Err(ComposeError::NoYears));
    }
}
