use super::WeekStart;
use std::iter::successors;
use time::{Date, Weekday};

pub(super) const DAYS_IN_WEEK: usize = 7;

pub(super) trait WeekdayExt {
    /// Position of the weekday within a week beginning on `start`, from 0 to 6
    fn index0(&self, start: WeekStart) -> usize;
}

impl WeekdayExt for Weekday {
    fn index0(&self, start: WeekStart) -> usize {
        usize::from(match start {
            WeekStart::Sunday => self.number_days_from_sunday(),
            WeekStart::Monday => self.number_days_from_monday(),
        })
    }
}

/// Iterate over `date` and every following day, stopping after the last day
/// of `date`'s year
pub(super) fn iter_days_of_year_from(date: Date) -> impl Iterator<Item = Date> {
    let year = date.year();
    successors(Some(date), |&d| d.next_day()).take_while(move |d| d.year() == year)
}
