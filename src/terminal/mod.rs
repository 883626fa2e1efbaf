pub mod events;
pub mod state;
pub mod ui;

use anyhow::{Result, anyhow};
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{self, Event};
use std::path::Path;

use crate::store::csv_table::CsvTable;
use crate::store::repo::TableRepository;
use crate::terminal::state::AppState;

/// Browse the table written by the last run. Read-only.
pub fn run_dashboard(path: &Path) -> Result<()> {
    let Some(table) = CsvTable::new(path).load()? else {
        println!(
            "No data yet: {} does not exist. Run `job_mail_tracker run` first.",
            path.display()
        );
        return Ok(());
    };

    color_eyre::install().map_err(|e| anyhow!("{e}"))?;

    let mut state = AppState::new(table);
    let terminal = ratatui::init();
    let result = run(terminal, &mut state);
    ratatui::restore();
    result
}

fn run(mut terminal: DefaultTerminal, state: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, state))?;
        if let Event::Key(key) = event::read()?
            && events::handle_key(key, state)
        {
            return Ok(());
        }
    }
}
