use crate::level::Level;
use ratatui::style::{Color, Modifier, Style};
use std::str::FromStr;
use thiserror::Error;

/// A named palette as supplied by a user or the built-in list.  Colors are
/// kept as strings (`#rrggbb` or a color name) until the theme is applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ThemeSpec {
    pub(crate) name: String,
    pub(crate) level_colors: Vec<String>,
    pub(crate) background: String,
    pub(crate) text_color: String,
}

impl ThemeSpec {
    fn from_static(name: &str, levels: [&str; Level::COUNT], background: &str, text: &str) -> Self {
        ThemeSpec {
            name: name.to_owned(),
            level_colors: levels.iter().map(|&s| s.to_owned()).collect(),
            background: background.to_owned(),
            text_color: text.to_owned(),
        }
    }

    pub(crate) fn builtin(name: &str) -> Option<ThemeSpec> {
        builtin_themes()
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Resolve the palette to concrete colors.  Either the whole theme is
    /// valid or nothing is returned.
    pub(crate) fn apply(&self) -> Result<ColorBinding, InvalidThemeError> {
        let parse = |s: &str| {
            Color::from_str(s).map_err(|_| InvalidThemeError::BadColor {
                theme: self.name.clone(),
                color: s.to_owned(),
            })
        };
        let levels = self
            .level_colors
            .iter()
            .map(|s| parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        let levels = <[Color; Level::COUNT]>::try_from(levels).map_err(|v| {
            InvalidThemeError::WrongLength {
                theme: self.name.clone(),
                found: v.len(),
            }
        })?;
        Ok(ColorBinding {
            name: self.name.clone(),
            levels,
            background: parse(&self.background)?,
            text: parse(&self.text_color)?,
        })
    }
}

pub(crate) fn builtin_themes() -> Vec<ThemeSpec> {
    vec![
        ThemeSpec::from_static(
            "classic",
            ["#ebedf0", "#9be9a8", "#40c463", "#30a14e", "#216e39"],
            "#ffffff",
            "#24292f",
        ),
        ThemeSpec::from_static(
            "midnight",
            ["#161b22", "#0e4429", "#006d32", "#26a641", "#39d353"],
            "#0d1117",
            "#c9d1d9",
        ),
        ThemeSpec::from_static(
            "halloween",
            ["#ebedf0", "#ffee4a", "#ffc501", "#fe9600", "#03001c"],
            "#ffffff",
            "#24292f",
        ),
        ThemeSpec::from_static(
            "winter",
            ["#ebedf0", "#b6e3ff", "#54aeff", "#0969da", "#0a3069"],
            "#ffffff",
            "#24292f",
        ),
        ThemeSpec::from_static(
            "sunset",
            ["#fff5eb", "#fdd0a2", "#fd8d3c", "#d94801", "#7f2704"],
            "#fffaf5",
            "#3d1f00",
        ),
    ]
}

/// Render-ready colors for one theme.  A binding is computed fresh from a
/// [`ThemeSpec`] and never carries anything over from a previous theme.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ColorBinding {
    pub(crate) name: String,
    pub(crate) levels: [Color; Level::COUNT],
    pub(crate) background: Color,
    pub(crate) text: Color,
}

impl ColorBinding {
    pub(crate) fn level_color(&self, level: Level) -> Color {
        self.levels
            .get(level.index())
            .copied()
            .unwrap_or(self.levels[Level::COUNT - 1])
    }

    pub(crate) fn base_style(&self) -> Style {
        Style::new().fg(self.text).bg(self.background)
    }

    pub(crate) fn title_style(&self) -> Style {
        self.base_style().add_modifier(Modifier::BOLD)
    }

    pub(crate) fn label_style(&self) -> Style {
        self.base_style().add_modifier(Modifier::DIM)
    }

    pub(crate) fn cell_style(&self, level: Level) -> Style {
        self.base_style().fg(self.level_color(level))
    }
}

/// The currently active theme.  A failed `apply()` leaves the previous theme
/// in place.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ThemeSlot {
    binding: ColorBinding,
}

impl ThemeSlot {
    pub(crate) fn new(binding: ColorBinding) -> ThemeSlot {
        ThemeSlot { binding }
    }

    pub(crate) fn apply(&mut self, theme: &ThemeSpec) -> Result<(), InvalidThemeError> {
        self.binding = theme.apply()?;
        tracing::debug!(theme = %self.binding.name, "Applied theme");
        Ok(())
    }

    pub(crate) fn binding(&self) -> &ColorBinding {
        &self.binding
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum InvalidThemeError {
    #[error("theme {theme:?} has {found} level colors; exactly {} are required", Level::COUNT)]
    WrongLength { theme: String, found: usize },
    #[error("theme {theme:?} has an unrecognized color {color:?}")]
    BadColor { theme: String, color: String },
    #[error("no theme named {0:?}")]
    Unknown(String),
}
