use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::terminal::state::{AppState, ViewMode};

/// Returns true when the dashboard should exit.
pub fn handle_key(key: KeyEvent, state: &mut AppState) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Esc => {
            if state.mode == ViewMode::Detail {
                state.toggle_detail();
                return false;
            }
            return true;
        }
        KeyCode::Enter => state.toggle_detail(),
        KeyCode::Char('f') | KeyCode::Tab => state.cycle_filter(),
        KeyCode::Char('a') => state.clear_filter(),
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(-1),
        KeyCode::PageDown => state.move_selection(10),
        KeyCode::PageUp => state.move_selection(-10),
        KeyCode::Home => state.select_first(),
        KeyCode::End => state.select_last(),
        _ => {}
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::repo::{StoredTable, TableRow};
    use ratatui::crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state() -> AppState {
        let row = |date: &str, stage: &str| TableRow {
            from: "hr@acme.example".into(),
            date: date.into(),
            subject: "s".into(),
            summary: "sum".into(),
            stage: stage.into(),
        };
        AppState::new(StoredTable {
            stage_header: "Classification".into(),
            rows: vec![row("2024-03-01 09:00:00", "Other"), row("2024-03-02 09:00:00", "Offer")],
        })
    }

    #[test]
    fn esc_closes_detail_before_quitting() {
        let mut s = state();
        assert!(!handle_key(press(KeyCode::Enter), &mut s));
        assert_eq!(s.mode, ViewMode::Detail);
        assert!(!handle_key(press(KeyCode::Esc), &mut s));
        assert_eq!(s.mode, ViewMode::Table);
        assert!(handle_key(press(KeyCode::Esc), &mut s));
    }

    #[test]
    fn navigation_and_filter_keys() {
        let mut s = state();
        handle_key(press(KeyCode::End), &mut s);
        assert_eq!(s.table_state.selected(), Some(1));
        handle_key(press(KeyCode::Home), &mut s);
        assert_eq!(s.table_state.selected(), Some(0));

        handle_key(press(KeyCode::Char('f')), &mut s);
        assert_eq!(s.filter_label(), Some("Offer"));
        handle_key(press(KeyCode::Char('a')), &mut s);
        assert_eq!(s.filter_label(), None);
    }

    #[test]
    fn releases_are_ignored() {
        let mut s = state();
        let mut key = press(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        assert!(!handle_key(key, &mut s));
    }
}
