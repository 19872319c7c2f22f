use crate::calendar::YearGraph;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use time::OffsetDateTime;

/// Everything needed to present one user's contribution walls.  Built once
/// per request and never modified afterwards.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphModel {
    pub(crate) username: String,
    #[serde(rename = "data")]
    pub(crate) years: Vec<YearGraph>,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) generated_at: OffsetDateTime,
}

impl GraphModel {
    pub(crate) fn total_contributions(&self) -> u64 {
        self.years.iter().map(|y| y.total_contributions).sum()
    }
}

/// A built grid paired with the year it is for and the number of
/// repositories the user created that year
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct YearEntry {
    pub(crate) year: i32,
    pub(crate) grid: YearGraph,
    pub(crate) repos_created: u32,
}

/// Combine per-year grids into a [`GraphModel`], keeping the order in which
/// the entries were given.  Each year's total is recomputed from its grid.
pub(crate) fn assemble(
    username: &str,
    per_year: Vec<YearEntry>,
    generated_at: OffsetDateTime,
) -> Result<GraphModel, AssembleError> {
    let mut seen = BTreeSet::new();
    for entry in &per_year {
        if !seen.insert(entry.year) {
            return Err(AssembleError::DuplicateYear(entry.year));
        }
        if entry.grid.year != entry.year {
            return Err(AssembleError::MismatchedYear {
                expected: entry.year,
                found: entry.grid.year,
            });
        }
    }
    let years = per_year
        .into_iter()
        .map(|entry| {
            let total_contributions = entry.grid.sum_counts();
            YearGraph {
                total_contributions,
                repos_created: entry.repos_created,
                ..entry.grid
            }
        })
        .collect();
    Ok(GraphModel {
        username: username.to_owned(),
        years,
        generated_at,
    })
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub(crate) enum AssembleError {
    #[error("year {0} was supplied more than once")]
    DuplicateYear(i32),
    #[error("grid for year {found} was supplied as year {expected}")]
    MismatchedYear { expected: i32, found: i32 },
}
