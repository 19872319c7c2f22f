use super::util::{DAYS_IN_WEEK, WeekdayExt, iter_days_of_year_from};
use super::WeekStart;
use crate::fetch::DailyCount;
use crate::level::Level;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use time::{Date, Month, OffsetDateTime};

/// The year GitHub launched; no contributions can predate it
pub(crate) const EARLIEST_YEAR: i32 = 2008;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub(crate) struct DayCell {
    pub(crate) date: Date,
    pub(crate) count: u32,
    pub(crate) level: Level,
}

/// One slot of a week column.  `Empty` cells pad out the partial weeks at
/// either end of the year.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub(crate) enum Cell {
    #[default]
    Empty,
    Active(DayCell),
}

impl Cell {
    pub(crate) fn day(&self) -> Option<DayCell> {
        match self {
            Cell::Empty => None,
            Cell::Active(d) => Some(*d),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub(crate) struct WeekColumn([Cell; DAYS_IN_WEEK]);

impl WeekColumn {
    fn set(&mut self, index: usize, day: DayCell) {
        assert!(index < DAYS_IN_WEEK, "weekday index out of range");
        self.0[index] = Cell::Active(day);
    }

    fn is_empty(&self) -> bool {
        self.0.iter().all(|c| *c == Cell::Empty)
    }

    pub(crate) fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.0.iter()
    }

    pub(crate) fn days(&self) -> impl Iterator<Item = DayCell> + '_ {
        self.0.iter().filter_map(Cell::day)
    }

    /// Returns the month whose first day falls in this week, if any
    pub(crate) fn month_start(&self) -> Option<Month> {
        self.days()
            .find(|d| d.date.day() == 1)
            .map(|d| d.date.month())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct YearGraph {
    pub(crate) year: i32,
    pub(crate) week_start: WeekStart,
    pub(crate) weeks: Vec<WeekColumn>,
    pub(crate) total_contributions: u64,
    pub(crate) repos_created: u32,
}

impl YearGraph {
    pub(crate) fn days(&self) -> impl Iterator<Item = DayCell> + '_ {
        self.weeks.iter().flat_map(WeekColumn::days)
    }

    pub(crate) fn sum_counts(&self) -> u64 {
        self.days().map(|d| u64::from(d.count)).sum()
    }

    /// Pairs of (week column index, month) for each month start in the year
    pub(crate) fn month_starts(&self) -> Vec<(usize, Month)> {
        self.weeks
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.month_start().map(|m| (i, m)))
            .collect()
    }
}

/// Lays out a year's daily counts as week columns.  The builder is
/// deterministic: the only clock-derived input is the latest permitted year,
/// fixed at construction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct GridBuilder {
    week_start: WeekStart,
    latest_year: i32,
}

impl GridBuilder {
    pub(crate) fn new(week_start: WeekStart, generated_at: OffsetDateTime) -> GridBuilder {
        GridBuilder {
            week_start,
            latest_year: generated_at.year(),
        }
    }

    pub(crate) fn check_year(&self, year: i32) -> Result<Date, InvalidYearError> {
        InvalidYearError::check(year, self.latest_year)?;
        Date::from_calendar_date(year, Month::January, 1).map_err(|_| InvalidYearError {
            year,
            latest: self.latest_year,
        })
    }

    pub(crate) fn build(
        &self,
        year: i32,
        daily_counts: &[DailyCount],
    ) -> Result<YearGraph, InvalidYearError> {
        let jan1 = self.check_year(year)?;
        let mut counts = BTreeMap::new();
        for dc in daily_counts.iter().filter(|dc| dc.date.year() == year) {
            let c = counts.entry(dc.date).or_insert(0u32);
            *c = c.saturating_add(dc.count);
        }
        let mut weeks = Vec::with_capacity(54);
        let mut week = WeekColumn::default();
        for date in iter_days_of_year_from(jan1) {
            let i = date.weekday().index0(self.week_start);
            if i == 0 && !week.is_empty() {
                weeks.push(std::mem::take(&mut week));
            }
            let count = counts.get(&date).copied().unwrap_or_default();
            week.set(
                i,
                DayCell {
                    date,
                    count,
                    level: Level::for_count(count),
                },
            );
        }
        weeks.push(week);
        let mut graph = YearGraph {
            year,
            week_start: self.week_start,
            weeks,
            total_contributions: 0,
            repos_created: 0,
        };
        graph.total_contributions = graph.sum_counts();
        Ok(graph)
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("year {year} is outside the supported range {EARLIEST_YEAR}-{latest}")]
pub(crate) struct InvalidYearError {
    pub(crate) year: i32,
    pub(crate) latest: i32,
}

impl InvalidYearError {
    /// Succeeds if `year` falls between GitHub's launch and `latest`
    /// inclusive
    pub(crate) fn check(year: i32, latest: i32) -> Result<(), InvalidYearError> {
        if (EARLIEST_YEAR..=latest).contains(&year) {
            Ok(())
        } else {
            Err(InvalidYearError { year, latest })
        }
    }
}
