use super::YearGraph;
use crate::model::GraphModel;
use crate::theme::ColorBinding;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Text,
    widgets::{Paragraph, Widget},
};
use time::{Month, Weekday};

/// Number of columns on the left side of the wall, used as the margin in
/// which the weekdays are written
const LEFT_MARGIN: u16 = 6;

/// Column at which weekday abbreviations start
const WEEKDAY_COL: u16 = 2;

/// Number of columns per week
const CELL_WIDTH: u16 = 2;

/// Number of lines taken up by the username and the blank line below it
const HEADER_LINES: u16 = 2;

/// Number of lines taken up by each year: title, month labels, seven weekday
/// rows, and a blank separator
const YEAR_LINES: u16 = 10;

/// Offset of the first weekday row within a year's block
const DAYS_OFFSET: u16 = 2;

const DAY_GLYPH: &str = "■";

/// Renders a [`GraphModel`] as stacked contribution walls, one per year,
/// colored according to a [`ColorBinding`]
#[derive(Clone, Copy, Debug)]
pub(crate) struct Wall<'a> {
    model: &'a GraphModel,
    binding: &'a ColorBinding,
    first_year: usize,
}

impl<'a> Wall<'a> {
    pub(crate) fn new(model: &'a GraphModel, binding: &'a ColorBinding) -> Self {
        Wall {
            model,
            binding,
            first_year: 0,
        }
    }

    /// Skip the first `n` years of the model when drawing
    pub(crate) fn first_year(mut self, n: usize) -> Self {
        self.first_year = n;
        self
    }

    pub(crate) fn years_for_lines(lines: u16) -> usize {
        // ceil((lines - HEADER_LINES) / YEAR_LINES), so that a partially
        // visible year is still drawn
        usize::from(
            lines
                .saturating_sub(HEADER_LINES)
                .saturating_add(YEAR_LINES - 1)
                / YEAR_LINES,
        )
    }
}

impl Widget for Wall<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, self.binding.base_style());
        let mut canvas = BufferCanvas::new(area, buf, self.binding);
        canvas.draw_header(&self.model.username, self.model.total_contributions());
        let visible = Self::years_for_lines(area.height);
        for (i, graph) in std::iter::zip(0u16.., self.model.years.iter().skip(self.first_year))
            .take(visible)
        {
            canvas.draw_year(HEADER_LINES + i * YEAR_LINES, graph);
        }
    }
}

#[derive(Debug)]
struct BufferCanvas<'a> {
    area: Rect,
    buf: &'a mut Buffer,
    binding: &'a ColorBinding,
}

impl<'a> BufferCanvas<'a> {
    fn new(area: Rect, buf: &'a mut Buffer, binding: &'a ColorBinding) -> Self {
        Self { area, buf, binding }
    }

    fn draw_header(&mut self, username: &str, total: u64) {
        self.mvprint(0, 0, username, self.binding.title_style());
        let x = u16::try_from(username.len())
            .unwrap_or(u16::MAX)
            .saturating_add(2);
        self.mvprint(0, x, contributions(total), self.binding.label_style());
    }

    fn draw_year(&mut self, top: u16, graph: &YearGraph) {
        self.mvprint(top, 0, graph.year.to_string(), self.binding.title_style());
        let summary = format!(
            "{}, {} created",
            contributions(graph.total_contributions),
            plural(u64::from(graph.repos_created), "repository", "repositories"),
        );
        self.mvprint(top, LEFT_MARGIN, summary, self.binding.label_style());
        for (week_no, month) in graph.month_starts() {
            let x = week_column(week_no);
            self.mvprint(top + 1, x, month_abbrev(month), self.binding.label_style());
        }
        let mut wd = graph.week_start.first_weekday();
        for row in 0..7 {
            self.mvprint(
                top + DAYS_OFFSET + row,
                WEEKDAY_COL,
                weekday_abbrev(wd),
                self.binding.label_style(),
            );
            wd = wd.next();
        }
        for (week_no, week) in graph.weeks.iter().enumerate() {
            let x = week_column(week_no);
            for (row, cell) in std::iter::zip(0u16.., week.cells()) {
                if let Some(day) = cell.day() {
                    self.mvprint(
                        top + DAYS_OFFSET + row,
                        x,
                        DAY_GLYPH,
                        self.binding.cell_style(day.level),
                    );
                }
            }
        }
    }

    fn mvprint<S: AsRef<str>>(&mut self, y: u16, x: u16, s: S, style: Style) {
        if y < self.area.height && x < self.area.width {
            let text = Text::styled(s.as_ref(), style);
            let width = u16::try_from(text.width()).unwrap_or(u16::MAX);
            // Using a Paragraph lets us truncate text that extends beyond the
            // wall's area, though we need to be sure that the Rect passed to
            // the Paragraph is entirely within the frame lest a panic result.
            Paragraph::new(text).render(
                Rect {
                    x: x + self.area.x,
                    y: y + self.area.y,
                    width: (self.area.width - x).min(width),
                    height: 1,
                },
                self.buf,
            );
        }
    }
}

fn week_column(week_no: usize) -> u16 {
    u16::try_from(week_no)
        .unwrap_or(u16::MAX)
        .saturating_mul(CELL_WIDTH)
        .saturating_add(LEFT_MARGIN)
}

fn contributions(n: u64) -> String {
    plural(n, "contribution", "contributions")
}

fn plural(n: u64, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn weekday_abbrev(wd: Weekday) -> &'static str {
    match wd {
        Weekday::Sunday => "Su",
        Weekday::Monday => "Mo",
        Weekday::Tuesday => "Tu",
        Weekday::Wednesday => "We",
        Weekday::Thursday => "Th",
        Weekday::Friday => "Fr",
        Weekday::Saturday => "Sa",
    }
}

fn month_abbrev(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}
