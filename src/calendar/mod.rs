mod grid;
mod util;
mod widget;
pub(crate) use self::grid::{GridBuilder, InvalidYearError, YearGraph};
pub(crate) use self::widget::Wall;
use serde::Serialize;
use time::Weekday;

/// The weekday shown in the top row of every week column
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub(crate) fn first_weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sunday,
            WeekStart::Monday => Weekday::Monday,
        }
    }
}
