// Terminal dashboard: crossterm raw mode + ratatui frames over the latest snapshot.

mod render;
mod state;
mod viewer;

pub use render::{MIN_HEIGHT, MIN_WIDTH, render};
pub use state::{Command, DashboardState, SortBy, View, handle_key};
pub use viewer::Viewer;

use std::io::Stdout;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::worker::SnapshotReceiver;

const INPUT_POLL: Duration = Duration::from_millis(100);

/// Restores the terminal when dropped, including on early return.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!(error = %e, "disable raw mode failed");
        }
        if let Err(e) = execute!(std::io::stdout(), LeaveAlternateScreen) {
            warn!(error = %e, "leave alternate screen failed");
        }
    }
}

/// Runs the render/input loop until the user quits or `shutdown` turns true.
/// Blocking; call from `spawn_blocking` or a dedicated thread.
///
/// On quit the loop sets `shutdown_tx` so the sampler stops too.
pub fn run(
    snapshots: SnapshotReceiver,
    state: DashboardState,
    shutdown_tx: watch::Sender<bool>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let _guard = TerminalGuard;
    execute!(std::io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, snapshots, state, &shutdown_tx);
    shutdown_tx.send_replace(true);
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    snapshots: SnapshotReceiver,
    mut state: DashboardState,
    shutdown_tx: &watch::Sender<bool>,
) -> anyhow::Result<()> {
    let shutdown = shutdown_tx.subscribe();
    let mut viewer = Viewer::new(&snapshots, Instant::now());

    loop {
        if *shutdown.borrow() {
            debug!("dashboard stopping on shutdown signal");
            return Ok(());
        }

        viewer.maybe_fetch(&state, &snapshots, Instant::now());
        let shown = viewer.shown().clone();
        if let Err(e) = terminal.draw(|frame| render(frame, &state, &shown)) {
            warn!(error = %e, "frame render failed");
        }

        if !event::poll(INPUT_POLL)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                let (next, command) = handle_key(&state, key);
                state = next;
                match command {
                    Command::Quit => return Ok(()),
                    Command::MoveSelection(delta) => state.move_selection(&shown.processes, delta),
                    Command::Continue => {}
                }
            }
            Event::Resize(_, _) => {
                terminal.autoresize()?;
            }
            _ => {}
        }
    }
}
