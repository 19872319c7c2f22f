use crate::calendar::Wall;
use crate::help::Help;
use crate::model::GraphModel;
use crate::theme::{ThemeSlot, ThemeSpec};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, read};
use ratatui::{Terminal, backend::Backend, buffer::Buffer, layout::Rect, widgets::Widget};
use std::io::{self, Write};
use std::sync::Arc;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct App {
    model: Arc<GraphModel>,
    themes: Vec<ThemeSpec>,
    theme_index: usize,
    theme: ThemeSlot,
    first_year: usize,
    state: AppState,
}

impl App {
    /// `themes` is the list cycled through with `t`/`T`, and `theme_index`
    /// is the position in it of the theme already applied in `theme`
    pub(crate) fn new(
        model: Arc<GraphModel>,
        themes: Vec<ThemeSpec>,
        theme_index: usize,
        theme: ThemeSlot,
    ) -> App {
        App {
            model,
            themes,
            theme_index,
            theme,
            first_year: 0,
            state: AppState::Wall,
        }
    }

    pub(crate) fn run<B: Backend>(mut self, mut terminal: Terminal<B>) -> io::Result<()>
    where
        io::Error: From<B::Error>,
    {
        while !self.quitting() {
            self.draw(&mut terminal)?;
            self.handle_input()?;
        }
        Ok(())
    }

    fn draw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()>
    where
        io::Error: From<B::Error>,
    {
        terminal.draw(|frame| frame.render_widget(&*self, frame.area()))?;
        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<()> {
        let normal_modifiers = KeyModifiers::NONE | KeyModifiers::SHIFT;
        if let Some(KeyEvent {
            code, modifiers, ..
        }) = read()?.as_key_press_event()
        {
            if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
                self.state = AppState::Quitting;
            } else if !normal_modifiers.contains(modifiers) || !self.handle_key(code) {
                self.beep()?;
            }
        }
        // else: Redraw on resize, and we might as well redraw on other stuff
        // too
        Ok(())
    }

    // Returns `false` if the user pressed an invalid key
    fn handle_key(&mut self, key: KeyCode) -> bool {
        match self.state {
            AppState::Wall => match key {
                KeyCode::Char('j') | KeyCode::Down => self.scroll_down(),
                KeyCode::Char('k') | KeyCode::Up => self.scroll_up(),
                KeyCode::Char('t') => self.cycle_theme(true),
                KeyCode::Char('T') => self.cycle_theme(false),
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.state = AppState::Quitting;
                    true
                }
                KeyCode::Char('?') => {
                    self.state = AppState::Helping;
                    true
                }
                _ => false,
            },
            AppState::Helping => {
                self.state = AppState::Wall;
                true
            }
            AppState::Quitting => false,
        }
    }

    fn beep(&self) -> io::Result<()> {
        io::stdout().write_all(b"\x07")
    }

    fn quitting(&self) -> bool {
        self.state == AppState::Quitting
    }

    fn scroll_down(&mut self) -> bool {
        if self.first_year + 1 < self.model.years.len() {
            self.first_year += 1;
            true
        } else {
            false
        }
    }

    fn scroll_up(&mut self) -> bool {
        if let Some(n) = self.first_year.checked_sub(1) {
            self.first_year = n;
            true
        } else {
            false
        }
    }

    fn cycle_theme(&mut self, forwards: bool) -> bool {
        let qty = self.themes.len();
        if qty == 0 {
            return false;
        }
        let next = if forwards {
            (self.theme_index + 1) % qty
        } else {
            (self.theme_index + qty - 1) % qty
        };
        match self.themes.get(next).map(|spec| self.theme.apply(spec)) {
            Some(Ok(())) => {
                self.theme_index = next;
                true
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Keeping current theme");
                false
            }
            None => false,
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let binding = self.theme.binding();
        Wall::new(&self.model, binding)
            .first_year(self.first_year)
            .render(area, buf);
        if self.state == AppState::Helping {
            Help(binding.base_style()).render(area, buf);
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AppState {
    Wall,
    Helping,
    Quitting,
}
