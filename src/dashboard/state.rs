// Display state and key handling. Nothing here touches business state.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PROCESS_LIMIT, MAX_REFRESH_SECS, MIN_REFRESH_SECS};
use crate::models::ProcessInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Overview,
    Processes,
    Alerts,
    Tools,
}

impl View {
    pub const ALL: [View; 4] = [View::Overview, View::Processes, View::Alerts, View::Tools];

    pub fn next(self) -> Self {
        match self {
            Self::Overview => Self::Processes,
            Self::Processes => Self::Alerts,
            Self::Alerts => Self::Tools,
            Self::Tools => Self::Overview,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Overview => Self::Tools,
            Self::Processes => Self::Overview,
            Self::Alerts => Self::Processes,
            Self::Tools => Self::Alerts,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Processes => "Processes",
            Self::Alerts => "Alerts",
            Self::Tools => "Tools",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Cpu,
    Memory,
    Name,
}

impl SortBy {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Name => "name",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardState {
    pub current_view: View,
    /// Seconds between snapshot fetches, within 1..=10.
    pub refresh_rate: u64,
    pub paused: bool,
    pub sort_by: SortBy,
    pub sort_reverse: bool,
    pub selected_process: Option<u32>,
    pub show_help: bool,
    /// Rows kept after sorting.
    pub process_limit: usize,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(View::Overview, 2)
    }
}

/// What the render loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Continue,
    Quit,
    /// Move the process selection by this many rows.
    MoveSelection(i32),
}

impl DashboardState {
    pub fn new(view: View, refresh_rate: u64) -> Self {
        Self {
            current_view: view,
            refresh_rate: refresh_rate.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS),
            paused: false,
            sort_by: SortBy::Cpu,
            sort_reverse: true,
            selected_process: None,
            show_help: false,
            process_limit: DEFAULT_PROCESS_LIMIT,
        }
    }

    pub fn with_process_limit(mut self, limit: usize) -> Self {
        self.process_limit = limit.max(1);
        self
    }

    fn sort(&mut self, field: SortBy) {
        if self.sort_by == field {
            self.sort_reverse = !self.sort_reverse;
        } else {
            self.sort_by = field;
            // Numbers start highest-first, names start A-Z.
            self.sort_reverse = field != SortBy::Name;
        }
    }

    /// Processes ordered by the current sort settings, cut to `process_limit`
    /// rows after ordering.
    pub fn sorted_processes<'a>(&self, processes: &'a [ProcessInfo]) -> Vec<&'a ProcessInfo> {
        let mut out: Vec<&ProcessInfo> = processes.iter().collect();
        out.sort_by(|a, b| {
            let ord = match self.sort_by {
                SortBy::Cpu => a.cpu_percent.total_cmp(&b.cpu_percent),
                SortBy::Memory => a.memory_percent.total_cmp(&b.memory_percent),
                SortBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            }
            .then_with(|| a.pid.cmp(&b.pid));
            if self.sort_reverse { ord.reverse() } else { ord }
        });
        out.truncate(self.process_limit);
        out
    }

    /// Moves the selection `delta` rows within the sorted list. With no
    /// current selection (or a PID that vanished) the first row is selected.
    pub fn move_selection(&mut self, processes: &[ProcessInfo], delta: i32) {
        let sorted = self.sorted_processes(processes);
        if sorted.is_empty() {
            self.selected_process = None;
            return;
        }
        let current = self
            .selected_process
            .and_then(|pid| sorted.iter().position(|p| p.pid == pid));
        let idx = match current {
            Some(i) => (i as i64 + delta as i64).clamp(0, sorted.len() as i64 - 1) as usize,
            None => 0,
        };
        self.selected_process = Some(sorted[idx].pid);
    }
}

/// Pure state transition for one key press. Unknown keys change nothing.
pub fn handle_key(state: &DashboardState, key: KeyEvent) -> (DashboardState, Command) {
    let mut next = state.clone();
    if key.kind == KeyEventKind::Release {
        return (next, Command::Continue);
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        let command = match key.code {
            KeyCode::Char('c') => Command::Quit,
            _ => Command::Continue,
        };
        return (next, command);
    }

    let command = match key.code {
        KeyCode::Char('q') => Command::Quit,
        KeyCode::Esc if next.show_help => {
            next.show_help = false;
            Command::Continue
        }
        KeyCode::Esc => Command::Quit,
        KeyCode::Char('h') | KeyCode::Char('?') => {
            next.show_help = !next.show_help;
            Command::Continue
        }
        KeyCode::Tab => {
            next.current_view = next.current_view.next();
            Command::Continue
        }
        KeyCode::BackTab => {
            next.current_view = next.current_view.prev();
            Command::Continue
        }
        KeyCode::Char(c @ '1'..='4') => {
            next.current_view = View::ALL[(c as u8 - b'1') as usize];
            Command::Continue
        }
        KeyCode::Char(' ') => {
            next.paused = !next.paused;
            Command::Continue
        }
        KeyCode::Char('c') => {
            next.sort(SortBy::Cpu);
            Command::Continue
        }
        KeyCode::Char('m') => {
            next.sort(SortBy::Memory);
            Command::Continue
        }
        KeyCode::Char('n') => {
            next.sort(SortBy::Name);
            Command::Continue
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            next.refresh_rate = (next.refresh_rate + 1).min(MAX_REFRESH_SECS);
            Command::Continue
        }
        KeyCode::Char('-') => {
            next.refresh_rate = next
                .refresh_rate
                .saturating_sub(1)
                .max(MIN_REFRESH_SECS);
            Command::Continue
        }
        KeyCode::Up | KeyCode::Char('k') if next.current_view == View::Processes => {
            Command::MoveSelection(-1)
        }
        KeyCode::Down | KeyCode::Char('j') if next.current_view == View::Processes => {
            Command::MoveSelection(1)
        }
        _ => Command::Continue,
    };
    (next, command)
}
