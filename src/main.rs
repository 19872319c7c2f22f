mod api;
mod app;
mod calendar;
mod compose;
mod fetch;
mod help;
mod level;
mod model;
mod request;
mod theme;
use crate::app::App;
use crate::calendar::{InvalidYearError, WeekStart};
use crate::compose::{GraphRequest, YearOrder, compose};
use crate::fetch::SnapshotFetcher;
use crate::request::RequestState;
use crate::theme::{InvalidThemeError, ThemeSlot, ThemeSpec, builtin_themes};
use anyhow::Context;
use lexopt::{Arg, Parser, ValueExt};
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives
static LOG_ENV: &str = "GREENWALL_LOG";

#[derive(Clone, Debug, Eq, PartialEq)]
enum Command {
    Run(RunOptions),
    Help,
    Version,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct RunOptions {
    username: Option<String>,
    data: Option<PathBuf>,
    years: Vec<i32>,
    theme: Option<String>,
    week_start: WeekStart,
    order: YearOrder,
    json: bool,
    api: Option<String>,
}

impl Command {
    /// `latest_year` is the newest year that `--year` may name
    fn from_parser(mut parser: Parser, latest_year: i32) -> Result<Command, lexopt::Error> {
        let mut opts = RunOptions::default();
        while let Some(arg) = parser.next()? {
            match arg {
                Arg::Short('h') | Arg::Long("help") => return Ok(Command::Help),
                Arg::Short('V') | Arg::Long("version") => return Ok(Command::Version),
                Arg::Short('d') | Arg::Long("data") => {
                    opts.data = Some(PathBuf::from(parser.value()?));
                }
                Arg::Short('y') | Arg::Long("year") => {
                    let value = parser.value()?.string()?;
                    opts.years.extend(parse_years(&value, latest_year)?);
                }
                Arg::Short('t') | Arg::Long("theme") => {
                    opts.theme = Some(parser.value()?.string()?);
                }
                Arg::Short('m') | Arg::Long("monday") => opts.week_start = WeekStart::Monday,
                Arg::Long("ascending") => opts.order = YearOrder::Ascending,
                Arg::Long("json") => opts.json = true,
                Arg::Long("api") => opts.api = Some(parser.value()?.string()?),
                Arg::Value(value) if opts.username.is_none() => {
                    opts.username = Some(value.string()?);
                }
                _ => return Err(arg.unexpected()),
            }
        }
        if opts.data.is_none() {
            return Err(lexopt::Error::MissingValue {
                option: Some(String::from("--data")),
            });
        }
        if opts.username.is_none() && opts.api.is_none() {
            return Err(lexopt::Error::Custom(
                "missing required argument: USERNAME".into(),
            ));
        }
        Ok(Command::Run(opts))
    }

    fn run(self, now: OffsetDateTime) -> anyhow::Result<()> {
        match self {
            Command::Run(opts) => opts.run(now),
            Command::Help => {
                println!("Usage: greenwall [OPTIONS] <USERNAME>");
                println!();
                println!("Render a GitHub user's yearly contribution walls as themed calendar grids");
                println!();
                println!("Options:");
                println!("  -d, --data FILE     Read contributions from a JSON snapshot [required]");
                println!("  -y, --year YEAR     Show YEAR (or START-END); may be repeated");
                println!("  -t, --theme NAME    Color theme: {}", theme_names());
                println!("  -m, --monday        Start weeks on Monday instead of Sunday");
                println!("      --ascending     List years oldest first");
                println!("      --json          Print the graph as JSON instead of drawing it");
                println!("      --api TARGET    Answer an API request such as");
                println!("                      '/api/graph?username=USER&year=YEAR' or '/api/USER'");
                println!("  -h, --help          Display this help message and exit");
                println!("  -V, --version       Show the program version and exit");
                println!();
                println!("Set {LOG_ENV} (e.g. {LOG_ENV}=debug) to adjust logging on stderr.");
                Ok(())
            }
            Command::Version => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

impl RunOptions {
    fn run(self, now: OffsetDateTime) -> anyhow::Result<()> {
        let data = self.data.context("no snapshot file given")?;
        let fetcher = SnapshotFetcher::from_path(&data)?;
        if let Some(target) = self.api {
            let response = api::route(&fetcher, &target, now);
            eprintln!("HTTP {}", response.status);
            println!("{}", serde_json::to_string_pretty(&response.body)?);
            return Ok(());
        }
        let username = self.username.context("no username given")?.trim().to_owned();
        let themes = builtin_themes();
        let theme_name = self.theme.as_deref().unwrap_or("classic");
        let spec = ThemeSpec::builtin(theme_name)
            .ok_or_else(|| InvalidThemeError::Unknown(theme_name.to_owned()))?;
        let slot = ThemeSlot::new(spec.apply()?);
        let theme_index = themes.iter().position(|t| *t == spec).unwrap_or_default();
        let request = GraphRequest::new(&username, now)
            .years(self.years)
            .week_start(self.week_start)
            .order(self.order);
        let mut state = RequestState::new();
        state.submit(&request.username);
        match compose(&fetcher, &request) {
            Ok(model) => {
                state.resolve(model);
            }
            Err(e) => {
                state.reject(&e);
                tracing::error!(error = state.error(), "Graph request failed");
                return Err(anyhow::Error::new(e)
                    .context(format!("failed to build contribution graph for {username}")));
            }
        }
        let model = state
            .model()
            .context("graph request did not complete")?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&*model)?);
            return Ok(());
        }
        with_terminal(|terminal| {
            App::new(model, themes, theme_index, slot).run(terminal)?;
            Ok(())
        })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    Command::from_parser(Parser::from_env(), now.year())?.run(now)
}

fn with_terminal<F, T>(func: F) -> anyhow::Result<T>
where
    F: FnOnce(DefaultTerminal) -> anyhow::Result<T>,
{
    let terminal = ratatui::init();
    let r = func(terminal);
    ratatui::restore();
    r
}

fn theme_names() -> String {
    builtin_themes()
        .into_iter()
        .map(|t| t.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a `--year` value: either a single year or an inclusive `START-END`
/// range.  Every year must lie in the supported range ending at `latest`.
fn parse_years(value: &str, latest: i32) -> Result<Vec<i32>, lexopt::Error> {
    let parse = |s: &str| {
        s.trim()
            .parse::<i32>()
            .map_err(|e| lexopt::Error::ParsingFailed {
                value: value.to_owned(),
                error: Box::new(e),
            })
    };
    let (start, end) = match value.split_once('-') {
        Some((start, end)) => (parse(start)?, parse(end)?),
        None => {
            let year = parse(value)?;
            (year, year)
        }
    };
    if start > end {
        return Err(lexopt::Error::Custom(
            format!("year range {value:?} ends before it starts").into(),
        ));
    }
    for year in [start, end] {
        InvalidYearError::check(year, latest).map_err(|e| lexopt::Error::Custom(e.into()))?;
    }
    Ok((start..=end).collect())
}
