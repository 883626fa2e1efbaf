use chrono::NaiveDateTime;
use ratatui::widgets::TableState;

use crate::domain::email::TABLE_DATE_FORMAT;
use crate::store::repo::{StoredTable, TableRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Table,
    Detail,
}

pub struct AppState {
    pub stage_header: String,
    rows: Vec<TableRow>,
    /// Distinct non-empty values of the stage column, in first-seen order.
    pub stages: Vec<String>,
    /// Index into `stages`; `None` shows every row.
    pub filter: Option<usize>,
    pub table_state: TableState,
    pub mode: ViewMode,
}

fn parsed_date(row: &TableRow) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&row.date, TABLE_DATE_FORMAT).ok()
}

impl AppState {
    pub fn new(table: StoredTable) -> Self {
        let mut rows = table.rows;
        // rows with unreadable dates sink to the bottom
        rows.sort_by(|a, b| parsed_date(b).cmp(&parsed_date(a)));

        let mut stages: Vec<String> = Vec::new();
        for row in &rows {
            if !row.stage.is_empty() && !stages.contains(&row.stage) {
                stages.push(row.stage.clone());
            }
        }

        let mut s = Self {
            stage_header: table.stage_header,
            rows,
            stages,
            filter: None,
            table_state: TableState::default(),
            mode: ViewMode::Table,
        };
        s.reset_selection();
        s
    }

    pub fn filter_label(&self) -> Option<&str> {
        self.filter.and_then(|i| self.stages.get(i)).map(String::as_str)
    }

    pub fn visible_rows(&self) -> Vec<&TableRow> {
        match self.filter_label() {
            Some(stage) => self.rows.iter().filter(|r| r.stage == stage).collect(),
            None => self.rows.iter().collect(),
        }
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn selected_row(&self) -> Option<&TableRow> {
        let idx = self.table_state.selected()?;
        self.visible_rows().get(idx).copied()
    }

    fn reset_selection(&mut self) {
        let any = !self.visible_rows().is_empty();
        self.table_state.select(any.then_some(0));
    }

    /// All rows, then each stage in turn, then back to all rows.
    pub fn cycle_filter(&mut self) {
        self.filter = match self.filter {
            None if !self.stages.is_empty() => Some(0),
            Some(i) if i + 1 < self.stages.len() => Some(i + 1),
            _ => None,
        };
        self.mode = ViewMode::Table;
        self.reset_selection();
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
        self.reset_selection();
    }

    pub fn move_selection(&mut self, delta: i32) {
        let len = self.visible_rows().len() as i32;
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let cur = self.table_state.selected().unwrap_or(0) as i32;
        let next = (cur + delta).clamp(0, len - 1) as usize;
        self.table_state.select(Some(next));
    }

    pub fn select_first(&mut self) {
        self.reset_selection();
    }

    pub fn select_last(&mut self) {
        let len = self.visible_rows().len();
        self.table_state.select(len.checked_sub(1));
    }

    pub fn toggle_detail(&mut self) {
        self.mode = match self.mode {
            ViewMode::Table if self.selected_row().is_some() => ViewMode::Detail,
            _ => ViewMode::Table,
        };
    }
}
