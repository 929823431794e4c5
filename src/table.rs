//! Result table state.
//!
//! A [`ResultTable`] owns one record collection together with its sort state
//! and row selection. Both the generated and the mutated tables are instances
//! of it; rendering reads from it but never changes it.

use crate::model::{Field, Record};
use crate::sort::{sorted_indices, Direction};

/// Sort state of one table.
///
/// Selecting a new field always starts ascending; selecting the active field
/// again flips the direction. Only [`SortState::reset`] returns to
/// `Unsorted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortState {
    #[default]
    Unsorted,
    SortedBy(Field, Direction),
}

impl SortState {
    /// Applies a column selection.
    pub fn select(self, field: Field) -> SortState {
        match self {
            SortState::SortedBy(active, direction) if active == field => {
                SortState::SortedBy(field, direction.toggled())
            }
            _ => SortState::SortedBy(field, Direction::Ascending),
        }
    }

    pub fn reset(&mut self) {
        *self = SortState::Unsorted;
    }

    pub fn field(self) -> Option<Field> {
        match self {
            SortState::Unsorted => None,
            SortState::SortedBy(field, _) => Some(field),
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            SortState::Unsorted => Direction::Ascending,
            SortState::SortedBy(_, direction) => direction,
        }
    }
}

/// A result set shown as one table.
#[derive(Debug, Clone)]
pub struct ResultTable {
    /// Title shown above the table and used as the workbook sheet name
    pub title: String,
    /// Base name for exported files
    pub file_stem: String,
    records: Vec<Record>,
    sort: SortState,
    /// Cached display order, recomputed when records or sort change
    order: Vec<usize>,
    /// Selected row, as a position in display order
    selected: usize,
}

impl ResultTable {
    pub fn new(title: impl Into<String>, file_stem: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file_stem: file_stem.into(),
            records: Vec::new(),
            sort: SortState::Unsorted,
            order: Vec::new(),
            selected: 0,
        }
    }

    fn reorder(&mut self) {
        self.order = sorted_indices(&self.records, self.sort.field(), self.sort.direction());
        self.selected = self.selected.min(self.records.len().saturating_sub(1));
    }

    /// Replaces the whole collection with a fresh service response.
    ///
    /// The sort state is kept so the new rows appear in the chosen order.
    pub fn replace(&mut self, records: Vec<Record>) {
        self.records = records;
        self.selected = 0;
        self.reorder();
    }

    /// Drops all records but keeps the sort state.
    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    /// Drops all records and returns to the unsorted state.
    pub fn reset(&mut self) {
        self.sort.reset();
        self.clear();
    }

    pub fn select_sort(&mut self, field: Field) {
        self.sort = self.sort.select(field);
        self.reorder();
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    /// Records in insertion order, as received.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records in display order.
    pub fn rows(&self) -> impl Iterator<Item = &Record> + '_ {
        self.order.iter().map(move |&i| &self.records[i])
    }

    /// An owned copy of the rows in display order, for export.
    pub fn sorted_records(&self) -> Vec<Record> {
        self.rows().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.order.get(self.selected).map(|&i| &self.records[i])
    }

    /// Moves the selection by `delta` rows, clamped to the table.
    pub fn move_selection(&mut self, delta: isize) {
        if self.records.is_empty() {
            return;
        }
        let max = self.records.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(max);
    }

    /// Selects a row by display position, clamped to the table.
    pub fn select_row(&mut self, index: usize) {
        self.selected = index.min(self.records.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.records.len().saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ResultTable {
        let mut table = ResultTable::new("Generated", "generated");
        table.replace(vec![
            Record::new("CCCC").with(Field::GcContent, 100.0),
            Record::new("AAAA").with(Field::GcContent, 0.0),
            Record::new("GGAA"),
        ]);
        table
    }

    fn sequences(table: &ResultTable) -> Vec<&str> {
        table.rows().map(|r| r.sequence.as_str()).collect()
    }

    #[test]
    fn test_sort_state_transitions() {
        let state = SortState::Unsorted;
        let state = state.select(Field::Kd);
        assert_eq!(state, SortState::SortedBy(Field::Kd, Direction::Ascending));
        let state = state.select(Field::Kd);
        assert_eq!(state, SortState::SortedBy(Field::Kd, Direction::Descending));
        let state = state.select(Field::Kd);
        assert_eq!(state, SortState::SortedBy(Field::Kd, Direction::Ascending));
        let state = state.select(Field::Kd).select(Field::Tm);
        assert_eq!(state, SortState::SortedBy(Field::Tm, Direction::Ascending));
    }

    #[test]
    fn test_rows_follow_sort_state() {
        let mut table = table();
        assert_eq!(sequences(&table), vec!["CCCC", "AAAA", "GGAA"]);

        table.select_sort(Field::GcContent);
        assert_eq!(sequences(&table), vec!["AAAA", "CCCC", "GGAA"]);

        table.select_sort(Field::GcContent);
        assert_eq!(sequences(&table), vec!["CCCC", "AAAA", "GGAA"]);

        // Records themselves stay in arrival order.
        let raw: Vec<&str> = table.records().iter().map(|r| r.sequence.as_str()).collect();
        assert_eq!(raw, vec!["CCCC", "AAAA", "GGAA"]);
    }

    #[test]
    fn test_replace_keeps_sort_and_reset_clears_it() {
        let mut table = table();
        table.select_sort(Field::Sequence);
        table.replace(vec![Record::new("UUU"), Record::new("AAA")]);
        assert_eq!(sequences(&table), vec!["AAA", "UUU"]);
        assert_eq!(table.sort(), SortState::SortedBy(Field::Sequence, Direction::Ascending));

        table.reset();
        assert!(table.is_empty());
        assert_eq!(table.sort(), SortState::Unsorted);
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut table = table();
        table.move_selection(-3);
        assert_eq!(table.selected(), 0);
        table.move_selection(10);
        assert_eq!(table.selected(), 2);
        assert_eq!(table.selected_record().map(|r| r.sequence.as_str()), Some("GGAA"));

        table.clear();
        table.move_selection(1);
        assert_eq!(table.selected(), 0);
        assert!(table.selected_record().is_none());
    }

    #[test]
    fn test_selection_tracks_display_order() {
        let mut table = table();
        table.select_sort(Field::GcContent);
        table.select_first();
        assert_eq!(table.selected_record().map(|r| r.sequence.as_str()), Some("AAAA"));
    }
}
