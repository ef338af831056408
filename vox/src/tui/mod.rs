//! Terminal console for Vox
//!
//! Four-panel layout: agent roster and tools on the left, the command
//! stream in the center, tasks and the artifact viewer on the right, with
//! a command input along the bottom.

mod events;
mod runner;
pub mod state;
mod views;

pub use events::{Event, EventHandler};
pub use runner::TuiRunner;
pub use state::{AppState, Panel};

use std::io::{self, Stdout};

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use eyre::Result;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::orchestrator::SessionController;
use crate::state::StateManager;

/// Terminal type alias
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to normal mode
pub fn restore() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// Run the console against live state
pub async fn run(
    state: StateManager,
    session: SessionController,
    project_id: &str,
    conversation_id: &str,
) -> Result<()> {
    let terminal = init()?;

    // Restore the terminal even on early return or error
    struct TerminalGuard;
    impl Drop for TerminalGuard {
        fn drop(&mut self) {
            let _ = restore();
        }
    }
    let _guard = TerminalGuard;

    let mut runner = TuiRunner::new(terminal, state, session, project_id, conversation_id);
    runner.run().await
}
