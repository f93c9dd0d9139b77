use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use cities_core::{
    config::AppConfig,
    engine::{Outcome, Side},
    session::{GameEvent, GameReport, Prompt},
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    block_font,
    bridge::{self, GameMessage},
};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_INPUT_LEN: usize = 48;
const BANNER: &str = "ГОРОДА";

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    computer: Color,
    human: Color,
    warning: Color,
    danger: Color,
    success: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            computer: Color::Magenta,
            human: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            success: Color::Green,
        }
    }
}

/// Everything the UI loop reacts to.
#[derive(Debug)]
pub enum AppEvent {
    Input(Event),
    Tick,
    Game(GameMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Loading,
    Play,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Info,
    Echo,
    Computer,
    Human,
    Warning,
    Loss,
}

#[derive(Debug, Clone)]
struct TranscriptEntry {
    kind: EntryKind,
    text: String,
}

impl TranscriptEntry {
    fn new(kind: EntryKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    fn from_event(event: &GameEvent) -> Self {
        let kind = match event {
            GameEvent::DatasetUnavailable { .. } | GameEvent::FirstLetterRejected { .. } => {
                EntryKind::Warning
            }
            GameEvent::GameStarted { .. } => EntryKind::Info,
            GameEvent::CityNamed {
                side: Side::Computer,
                ..
            } => EntryKind::Computer,
            GameEvent::CityNamed {
                side: Side::Human, ..
            } => EntryKind::Human,
            GameEvent::TurnLost { .. } => EntryKind::Loss,
        };
        Self::new(kind, event.to_string())
    }
}

/// Single-line editor for letters and city names. The cursor counts
/// characters, not bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CityInput {
    chars: Vec<char>,
    cursor: usize,
}

impl CityInput {
    fn move_cursor(&mut self, delta: isize) {
        let len = self.chars.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.chars.len();
    }

    fn insert(&mut self, ch: char) {
        if self.chars.len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.chars.remove(self.cursor);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    fn value(&self) -> String {
        self.chars.iter().collect()
    }

    /// Return the current text and clear the editor.
    fn take(&mut self) -> String {
        let value = self.value();
        self.chars.clear();
        self.cursor = 0;
        value
    }
}

/// Counters shown next to the transcript, kept in sync with narration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PlayStats {
    dataset: String,
    total_cities: usize,
    cities_left: usize,
    bad_letters: Vec<char>,
    required_letter: Option<char>,
    moves: u32,
    cities_named: u32,
}

impl PlayStats {
    fn apply(&mut self, event: &GameEvent) {
        match event {
            GameEvent::GameStarted { letter, .. } => self.required_letter = Some(*letter),
            GameEvent::CityNamed { next_letter, .. } => {
                self.moves += 1;
                self.cities_named += 1;
                self.cities_left = self.cities_left.saturating_sub(1);
                self.required_letter = Some(*next_letter);
            }
            GameEvent::TurnLost { .. } => {
                self.moves += 1;
                self.required_letter = None;
            }
            GameEvent::DatasetUnavailable { .. } | GameEvent::FirstLetterRejected { .. } => {}
        }
    }
}

/// Full-screen front-end for one or more games.
pub struct CitiesApp {
    config: AppConfig,
    theme: Theme,
    screen: Screen,
    transcript: Vec<TranscriptEntry>,
    input: CityInput,
    prompt: Option<Prompt>,
    stats: PlayStats,
    report: Option<GameReport>,
    status: String,
    games_played: u32,
    wins: u32,
    should_quit: bool,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    line_tx: Option<mpsc::Sender<String>>,
}

impl CitiesApp {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            theme: Theme::default(),
            screen: Screen::Loading,
            transcript: Vec::new(),
            input: CityInput::default(),
            prompt: None,
            stats: PlayStats::default(),
            report: None,
            status: "Готово".to_string(),
            games_played: 0,
            wins: 0,
            should_quit: false,
            event_tx: None,
            line_tx: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);
        self.start_game();

        let result = self.event_loop(&mut terminal, &mut event_rx).await;

        // dropping the line sender unblocks a session waiting for input
        self.line_tx = None;
        self.event_tx = None;
        restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_rx: &mut mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                return Ok(());
            }
            match event_rx.recv().await {
                Some(AppEvent::Input(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    self.handle_key(key)
                }
                Some(AppEvent::Input(_)) | Some(AppEvent::Tick) => {}
                Some(AppEvent::Game(message)) => self.handle_game_message(message),
                None => return Ok(()),
            }
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    fn start_game(&mut self) {
        let Some(events) = self.event_tx.clone() else {
            return;
        };
        self.line_tx = Some(bridge::spawn_session(self.config.clone(), events));
        self.screen = Screen::Loading;
        self.transcript.clear();
        self.input.take();
        self.prompt = None;
        self.report = None;
        self.stats = PlayStats::default();
        let status = format!("Загружаем города из {}", self.config.dataset);
        self.set_status(status);
        info!(dataset = %self.config.dataset, "Starting new game");
    }

    fn handle_game_message(&mut self, message: GameMessage) {
        match message {
            GameMessage::Ready {
                cities,
                bad_letters,
                dataset,
            } => {
                self.stats.total_cities = cities;
                self.stats.cities_left = cities;
                self.stats.bad_letters = bad_letters;
                self.stats.dataset = dataset;
                self.screen = Screen::Play;
                self.set_status(format!("Загружено городов: {cities}"));
            }
            GameMessage::Event(event) => {
                self.stats.apply(&event);
                if let GameEvent::DatasetUnavailable { reason } = &event {
                    warn!(%reason, "Playing without a dataset");
                }
                self.transcript.push(TranscriptEntry::from_event(&event));
            }
            GameMessage::Prompt(prompt) => {
                self.prompt = Some(prompt);
                self.set_status(prompt.to_string());
            }
            GameMessage::Finished(Ok(report)) => {
                self.games_played += 1;
                if report.outcome == Outcome::ComputerLost {
                    self.wins += 1;
                }
                self.set_status(report.to_string());
                self.report = Some(report);
                self.prompt = None;
                self.screen = Screen::Finished;
            }
            GameMessage::Finished(Err(err)) => {
                self.prompt = None;
                self.screen = Screen::Finished;
                self.set_status(format!("Игра прервана: {err}"));
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl_c || key.code == KeyCode::Esc {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Loading => {}
            Screen::Finished => match key.code {
                KeyCode::Char('n') | KeyCode::Char('т') | KeyCode::Enter => self.start_game(),
                KeyCode::Char('q') | KeyCode::Char('й') => self.should_quit = true,
                _ => {}
            },
            Screen::Play => match key.code {
                KeyCode::Enter => self.submit_input(),
                KeyCode::Left => self.input.move_cursor(-1),
                KeyCode::Right => self.input.move_cursor(1),
                KeyCode::Home => self.input.move_home(),
                KeyCode::End => self.input.move_end(),
                KeyCode::Backspace => self.input.backspace(),
                KeyCode::Delete => self.input.delete(),
                KeyCode::Char(ch) => {
                    if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                        self.input.insert(ch);
                    }
                }
                _ => {}
            },
        }
    }

    fn submit_input(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            self.set_status("Дождитесь своего хода");
            return;
        };
        let Some(line_tx) = self.line_tx.as_ref() else {
            self.set_status("Игра не запущена");
            return;
        };
        let value = self.input.value();
        match line_tx.try_send(value.clone()) {
            Ok(()) => {
                debug!(?prompt, input = %value, "Input submitted");
                self.input.take();
                self.transcript
                    .push(TranscriptEntry::new(EntryKind::Echo, format!("› {value}")));
                self.set_status("…");
            }
            Err(err) => {
                self.prompt = Some(prompt);
                self.set_status(format!("Ввод не доставлен: {err}"));
            }
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        let banner_lines = block_font::render(BANNER);
        let banner_height = banner_lines.len() as u16;
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(banner_height.min(area.height / 3)),
                Constraint::Min(6),
                Constraint::Length(3),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_banner(frame, layout[0], &banner_lines);

        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(layout[1]);
        self.render_transcript(frame, middle[0]);
        self.render_stats(frame, middle[1]);
        self.render_input(frame, layout[2]);
        self.render_status(frame, layout[3]);

        if self.screen == Screen::Finished {
            self.render_result(frame, area);
        }
    }

    fn render_banner(&self, frame: &mut Frame, area: Rect, lines: &[String]) {
        let content: Vec<Line> = lines
            .iter()
            .map(|line| {
                Line::from(Span::styled(
                    line.clone(),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                ))
            })
            .collect();
        frame.render_widget(Paragraph::new(content).alignment(Alignment::Center), area);
    }

    fn render_transcript(&self, frame: &mut Frame, area: Rect) {
        let visible = area.height.saturating_sub(2) as usize;
        let skip = self.transcript.len().saturating_sub(visible);
        let items: Vec<ListItem> = self
            .transcript
            .iter()
            .skip(skip)
            .map(|entry| ListItem::new(Line::from(Span::styled(entry.text.clone(), self.entry_style(entry.kind)))))
            .collect();
        let title = if self.screen == Screen::Loading {
            "Загрузка…"
        } else {
            "Игра"
        };
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(list, area);
    }

    fn entry_style(&self, kind: EntryKind) -> Style {
        match kind {
            EntryKind::Info => Style::default().fg(self.theme.accent),
            EntryKind::Echo => Style::default().fg(self.theme.muted),
            EntryKind::Computer => Style::default().fg(self.theme.computer),
            EntryKind::Human => Style::default().fg(self.theme.human),
            EntryKind::Warning => Style::default().fg(self.theme.warning),
            EntryKind::Loss => Style::default()
                .fg(self.theme.danger)
                .add_modifier(Modifier::BOLD),
        }
    }

    fn render_stats(&self, frame: &mut Frame, area: Rect) {
        let label = Style::default().fg(self.theme.muted);
        let letter = self
            .stats
            .required_letter
            .map(|letter| letter.to_uppercase().collect::<String>())
            .unwrap_or_else(|| "—".to_string());
        let bad_letters = self
            .stats
            .bad_letters
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        let lines = vec![
            Line::from(vec![
                Span::styled("Буква     ", label),
                Span::styled(
                    letter,
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::styled("Ходы      ", label),
                Span::raw(self.stats.moves.to_string()),
            ]),
            Line::from(vec![
                Span::styled("Названо   ", label),
                Span::raw(self.stats.cities_named.to_string()),
            ]),
            Line::from(vec![
                Span::styled("Осталось  ", label),
                Span::raw(format!(
                    "{} / {}",
                    self.stats.cities_left, self.stats.total_cities
                )),
            ]),
            Line::from(vec![
                Span::styled("Побед     ", label),
                Span::raw(format!("{} из {}", self.wins, self.games_played)),
            ]),
            Line::from(vec![
                Span::styled("Источник  ", label),
                Span::raw(self.stats.dataset.clone()),
            ]),
            Line::from(""),
            Line::from(Span::styled("Плохие буквы", label)),
            Line::from(Span::styled(bad_letters, Style::default().fg(self.theme.warning))),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Состояние"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let title = match self.prompt {
            Some(prompt) => prompt.to_string(),
            None if self.screen == Screen::Play => "Компьютер думает…".to_string(),
            None => String::new(),
        };
        let line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::styled(self.input.value(), Style::default().fg(self.theme.primary_fg)),
        ]);
        let paragraph =
            Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);

        if self.screen == Screen::Play && self.prompt.is_some() {
            let cursor_x = (area.x + 3 + self.input.cursor as u16)
                .min(area.x + area.width.saturating_sub(2));
            frame.set_cursor(cursor_x, area.y + 1);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let help = match self.screen {
            Screen::Finished => "n новая игра • q/Esc выход",
            _ => "Enter ответить • ←/→ курсор • Esc выход",
        };
        let paragraph = Paragraph::new(vec![
            Line::from(self.status.clone()),
            Line::from(Span::styled(help, Style::default().fg(self.theme.muted))),
        ])
        .block(Block::default().borders(Borders::ALL).title("Инфо"))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_result(&self, frame: &mut Frame, area: Rect) {
        let won = self
            .report
            .as_ref()
            .map(|report| report.outcome == Outcome::ComputerLost)
            .unwrap_or(false);
        let (headline, color) = if won {
            ("ПОБЕДА", self.theme.success)
        } else {
            ("ПРОВАЛ", self.theme.danger)
        };

        let mut lines: Vec<Line> = block_font::render(headline)
            .into_iter()
            .map(|line| Line::from(Span::styled(line, Style::default().fg(color))))
            .collect();
        lines.push(Line::from(""));
        match &self.report {
            Some(report) => {
                lines.push(Line::from(report.to_string()));
                let seconds = (report.finished_at - report.started_at).num_seconds();
                lines.push(Line::from(Span::styled(
                    format!("Длительность: {seconds} с"),
                    Style::default().fg(self.theme.muted),
                )));
                if let Some((side, city)) = report.history.last() {
                    lines.push(Line::from(format!("Последний город: {city} ({side})")));
                }
            }
            None => lines.push(Line::from(self.status.clone())),
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "n новая игра • q выход",
            Style::default().add_modifier(Modifier::BOLD),
        )));

        let height = (lines.len() as u16).saturating_add(2);
        let popup = centered_rect(78, height, area);
        frame.render_widget(Clear, popup);
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Итог"))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, popup);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cities_core::{dataset::CityRecord, engine::LossReason};

    #[test]
    fn input_edits_by_character() {
        let mut input = CityInput::default();
        for ch in "Омк".chars() {
            input.insert(ch);
        }
        input.move_cursor(-1);
        input.insert('с');
        assert_eq!(input.value(), "Омск");

        input.move_home();
        input.delete();
        input.move_end();
        input.backspace();
        assert_eq!(input.value(), "мс");
        input.move_cursor(-10);
        assert_eq!(input.cursor, 0);

        assert_eq!(input.take(), "мс");
        assert_eq!(input, CityInput::default());
    }

    #[test]
    fn input_ignores_control_characters_and_overflow() {
        let mut input = CityInput::default();
        input.insert('\u{7}');
        assert_eq!(input.value(), "");
        for _ in 0..MAX_INPUT_LEN + 5 {
            input.insert('а');
        }
        assert_eq!(input.chars.len(), MAX_INPUT_LEN);
    }

    #[test]
    fn stats_follow_narration() {
        let mut stats = PlayStats {
            total_cities: 2,
            cities_left: 2,
            ..PlayStats::default()
        };
        stats.apply(&GameEvent::GameStarted {
            letter: 'м',
            cities: 2,
        });
        assert_eq!(stats.required_letter, Some('м'));

        stats.apply(&GameEvent::CityNamed {
            side: Side::Computer,
            city: CityRecord::named("Москва"),
            next_letter: 'а',
        });
        stats.apply(&GameEvent::TurnLost {
            side: Side::Human,
            reason: LossReason::UnknownOrUsed("Атлантида".to_string()),
        });
        assert_eq!(stats.moves, 2);
        assert_eq!(stats.cities_named, 1);
        assert_eq!(stats.cities_left, 1);
        assert_eq!(stats.required_letter, None);
    }

    #[test]
    fn transcript_entries_are_coloured_by_side() {
        let computer = TranscriptEntry::from_event(&GameEvent::CityNamed {
            side: Side::Computer,
            city: CityRecord::named("Москва"),
            next_letter: 'а',
        });
        assert_eq!(computer.kind, EntryKind::Computer);
        assert!(computer.text.contains("Москва"));

        let loss = TranscriptEntry::from_event(&GameEvent::TurnLost {
            side: Side::Computer,
            reason: LossReason::NoCityForLetter('а'),
        });
        assert_eq!(loss.kind, EntryKind::Loss);
    }

    #[test]
    fn centered_rect_is_clamped_to_area() {
        let area = Rect::new(0, 0, 40, 10);
        let rect = centered_rect(78, 20, area);
        assert_eq!(rect, area);
        let rect = centered_rect(20, 4, area);
        assert_eq!(rect, Rect::new(10, 3, 20, 4));
    }
}
