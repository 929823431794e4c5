//! Data model for the aptamer client.
//!
//! This module contains all data structures for representing:
//! - Candidate records as returned by the design service
//! - The fixed column list shared by tables and exports
//! - Application state
//!
//! Every field of a [`Record`] except the sequence may be absent or carry the
//! `"N/A"` sentinel. [`Record::get`] folds both cases into [`FieldRef::Missing`]
//! so that sorting, rendering and export agree on what "missing" means.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::client::{Completion, Outcome, ServiceRequest, Ticket};
use crate::export::ExportFormat;
use crate::forms::{GenerateForm, MutateForm, MutationKind};
use crate::structure::StructureSurface;
use crate::table::ResultTable;

/// Sentinel the service uses for values it could not compute.
pub const NOT_AVAILABLE: &str = "N/A";

/// A raw field value as sent by the service: JSON number or JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// True for blank text and the `"N/A"` sentinel.
    pub fn is_missing(&self) -> bool {
        match self {
            FieldValue::Number(n) => n.is_nan(),
            FieldValue::Text(t) => {
                let t = t.trim();
                t.is_empty() || t == NOT_AVAILABLE
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(t) => write!(f, "{}", t),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(t: &str) -> Self {
        FieldValue::Text(t.to_string())
    }
}

/// A borrowed view of one field, with absent and sentinel values unified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Missing,
    Number(f64),
    Text(&'a str),
}

impl FieldRef<'_> {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldRef::Missing)
    }
}

/// How a column's values are turned into sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain numbers: length, GC content, melting temperature.
    PlainNumber,
    /// Numbers that may carry a `<` or `>` bound: MFE and Kd.
    BoundedNumber,
    /// Case-insensitive text.
    Text,
}

/// The columns of a result table, in display and export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Sequence,
    Length,
    GcContent,
    Structure,
    Mfe,
    Tm,
    Kd,
}

impl Field {
    /// All fields, in the fixed column order.
    pub const ALL: [Field; 7] = [
        Field::Sequence,
        Field::Length,
        Field::GcContent,
        Field::Structure,
        Field::Mfe,
        Field::Tm,
        Field::Kd,
    ];

    /// The service's JSON key for this field.
    pub fn key(self) -> &'static str {
        match self {
            Field::Sequence => "sequence",
            Field::Length => "length",
            Field::GcContent => "gc_content",
            Field::Structure => "structure",
            Field::Mfe => "mfe",
            Field::Tm => "tm",
            Field::Kd => "kd",
        }
    }

    /// Column header used in tables and exports.
    pub fn label(self) -> &'static str {
        match self {
            Field::Sequence => "Sequence",
            Field::Length => "Length",
            Field::GcContent => "GC %",
            Field::Structure => "Structure",
            Field::Mfe => "MFE (kcal/mol)",
            Field::Tm => "Tm",
            Field::Kd => "Kd (nM)",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Length | Field::GcContent | Field::Tm => FieldKind::PlainNumber,
            Field::Mfe | Field::Kd => FieldKind::BoundedNumber,
            Field::Sequence | Field::Structure => FieldKind::Text,
        }
    }

    /// Field for a 1-based column number, as typed on the keyboard.
    pub fn from_column(column: usize) -> Option<Field> {
        column.checked_sub(1).and_then(|i| Field::ALL.get(i).copied())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequence" | "seq" => Ok(Field::Sequence),
            "length" | "len" => Ok(Field::Length),
            "gc_content" | "gc" | "gc%" => Ok(Field::GcContent),
            "structure" => Ok(Field::Structure),
            "mfe" => Ok(Field::Mfe),
            "tm" => Ok(Field::Tm),
            "kd" => Ok(Field::Kd),
            other => Err(format!(
                "unknown field '{}' (expected one of: sequence, length, gc_content, structure, mfe, tm, kd)",
                other
            )),
        }
    }
}

/// One candidate sequence returned by the design service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub sequence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gc_content: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfe: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tm: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kd: Option<FieldValue>,
}

impl Record {
    /// Creates a record with only a sequence.
    pub fn new(sequence: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
            ..Self::default()
        }
    }

    /// Sets a field, builder style. Setting the sequence stores the text form.
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        match field {
            Field::Sequence => self.sequence = value.to_string(),
            Field::Length => self.length = Some(value),
            Field::GcContent => self.gc_content = Some(value),
            Field::Structure => self.structure = Some(value),
            Field::Mfe => self.mfe = Some(value),
            Field::Tm => self.tm = Some(value),
            Field::Kd => self.kd = Some(value),
        }
        self
    }

    fn slot(&self, field: Field) -> Option<&FieldValue> {
        match field {
            Field::Sequence => None,
            Field::Length => self.length.as_ref(),
            Field::GcContent => self.gc_content.as_ref(),
            Field::Structure => self.structure.as_ref(),
            Field::Mfe => self.mfe.as_ref(),
            Field::Tm => self.tm.as_ref(),
            Field::Kd => self.kd.as_ref(),
        }
    }

    /// Returns a field with absent and `"N/A"` values folded into `Missing`.
    pub fn get(&self, field: Field) -> FieldRef<'_> {
        if field == Field::Sequence {
            return if self.sequence.trim().is_empty() {
                FieldRef::Missing
            } else {
                FieldRef::Text(&self.sequence)
            };
        }
        match self.slot(field) {
            None => FieldRef::Missing,
            Some(v) if v.is_missing() => FieldRef::Missing,
            Some(FieldValue::Number(n)) => FieldRef::Number(*n),
            Some(FieldValue::Text(t)) => FieldRef::Text(t.trim()),
        }
    }

    /// The raw text of a field for export: empty when missing.
    pub fn export_text(&self, field: Field) -> String {
        match self.get(field) {
            FieldRef::Missing => String::new(),
            FieldRef::Number(n) => n.to_string(),
            FieldRef::Text(t) => t.to_string(),
        }
    }

    /// The text shown in a table cell, with units where they apply.
    pub fn display_text(&self, field: Field) -> String {
        let value = self.get(field);
        match field {
            Field::Mfe => match value {
                FieldRef::Missing => NOT_AVAILABLE.to_string(),
                _ => format!("{} kcal/mol", self.export_text(field)),
            },
            Field::Kd => match value {
                FieldRef::Missing => NOT_AVAILABLE.to_string(),
                FieldRef::Text(t) if t.starts_with('<') || t.starts_with('>') => t.to_string(),
                _ => format!("{} nM", self.export_text(field)),
            },
            _ => self.export_text(field),
        }
    }

    /// The dot-bracket structure, if the service computed one.
    pub fn structure_text(&self) -> Option<&str> {
        match self.get(Field::Structure) {
            FieldRef::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Which result table has the focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    Generated,
    Mutated,
}

impl Panel {
    pub fn index(self) -> usize {
        match self {
            Panel::Generated => 0,
            Panel::Mutated => 1,
        }
    }

    pub fn other(self) -> Panel {
        match self {
            Panel::Generated => Panel::Mutated,
            Panel::Mutated => Panel::Generated,
        }
    }
}

/// Application mode for handling different input states.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Command input mode (after pressing ':')
    Command(String),
    /// Waiting for y/n after `:reset`
    ConfirmReset,
}

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message shown in the status bar until the next key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Side effects requested by state transitions, carried out by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a request to the design service.
    Submit(Ticket, ServiceRequest),
    /// Write the given table to a file.
    Export {
        panel: Panel,
        format: ExportFormat,
        path: Option<String>,
    },
    /// Copy the given table to the clipboard.
    Copy(Panel),
    /// Ring the terminal bell so an alert reaches assistive tools.
    Announce,
}

/// Which service actions are in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pending {
    pub generate: bool,
    pub mutate: bool,
    pub plot: bool,
}

/// The complete application state.
#[derive(Debug)]
pub struct AppState {
    /// Generated and mutated result tables, indexed by [`Panel::index`]
    pub tables: [ResultTable; 2],
    /// Table with keyboard focus
    pub panel: Panel,
    /// Generate request inputs
    pub generate_form: GenerateForm,
    /// Mutation request inputs
    pub mutate_form: MutateForm,
    /// Structure diagram for the selected record
    pub surface: StructureSurface,
    /// Current application mode
    pub mode: AppMode,
    /// In-flight service actions
    pub pending: Pending,
    /// Bumped when a reset abandons every outstanding request
    pub generation: u64,
    /// Bumped when leaving a table abandons its structure plot
    pub plot_epoch: u64,
    /// Whether the help overlay is displayed
    pub show_help: bool,
    /// Whether the application should quit
    pub should_quit: bool,
    /// Transient status message
    pub notice: Option<Notice>,
    /// Effects waiting to be carried out by the controller
    pub effects: Vec<Effect>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(GenerateForm::default(), MutateForm::default())
    }
}

impl AppState {
    /// Creates a new application state with the given request inputs.
    pub fn new(generate_form: GenerateForm, mutate_form: MutateForm) -> Self {
        Self {
            tables: [
                ResultTable::new("Generated", "generated"),
                ResultTable::new("Mutated", "mutated"),
            ],
            panel: Panel::Generated,
            generate_form,
            mutate_form,
            surface: StructureSurface::default(),
            mode: AppMode::Normal,
            pending: Pending::default(),
            generation: 0,
            plot_epoch: 0,
            show_help: false,
            should_quit: false,
            notice: None,
            effects: Vec::new(),
        }
    }

    pub fn table(&self, panel: Panel) -> &ResultTable {
        &self.tables[panel.index()]
    }

    pub fn table_mut(&mut self, panel: Panel) -> &mut ResultTable {
        &mut self.tables[panel.index()]
    }

    /// The focused table.
    pub fn active_table(&self) -> &ResultTable {
        self.table(self.panel)
    }

    fn active_table_mut(&mut self) -> &mut ResultTable {
        self.table_mut(self.panel)
    }

    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            NoticeLevel::Error => log::error!("{}", text),
            NoticeLevel::Warning => log::warn!("{}", text),
            _ => log::info!("{}", text),
        }
        self.notice = Some(Notice { level, text });
    }

    /// Drops the transient notice (called on every key press).
    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Takes the queued effects, leaving the queue empty.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
            plot_epoch: self.plot_epoch,
        }
    }

    /// Switches focus to the other table.
    ///
    /// Leaving a table abandons its structure view: the surface is cleared
    /// and any pending structure plot is forgotten.
    pub fn switch_panel(&mut self) {
        self.focus(self.panel.other());
    }

    fn focus(&mut self, panel: Panel) {
        if panel == self.panel {
            return;
        }
        self.panel = panel;
        self.surface.clear();
        if self.pending.plot {
            self.pending.plot = false;
            self.plot_epoch += 1;
        }
    }

    /// Runs a selection change; the surface only describes the selected row.
    fn reselect(&mut self, change: impl FnOnce(&mut ResultTable)) {
        let before = self.active_table().selected_record().cloned();
        change(self.active_table_mut());
        if self.active_table().selected_record() != before.as_ref() {
            self.surface.clear();
        }
    }

    pub fn move_up(&mut self) {
        self.reselect(|t| t.move_selection(-1));
    }

    pub fn move_down(&mut self) {
        self.reselect(|t| t.move_selection(1));
    }

    pub fn move_top(&mut self) {
        self.reselect(ResultTable::select_first);
    }

    pub fn move_bottom(&mut self) {
        self.reselect(ResultTable::select_last);
    }

    pub fn select_row(&mut self, index: usize) {
        self.reselect(|t| t.select_row(index));
    }

    /// Applies a sort selection to the focused table.
    pub fn select_sort(&mut self, field: Field) {
        self.reselect(|t| t.select_sort(field));
    }

    /// Queues a generate request if the form is valid and none is in flight.
    pub fn request_generate(&mut self) {
        if self.pending.generate {
            self.notify(NoticeLevel::Info, "Generation already in progress, please wait.");
            return;
        }
        match self.generate_form.to_request() {
            Ok(request) => {
                self.focus(Panel::Generated);
                self.pending.generate = true;
                let ticket = self.ticket();
                self.effects
                    .push(Effect::Submit(ticket, ServiceRequest::Generate(request)));
                self.notify(NoticeLevel::Info, "Generating aptamers... this can take a while.");
            }
            Err(e) => self.notify(NoticeLevel::Error, e.to_string()),
        }
    }

    /// Queues a mutation request if the form is valid and none is in flight.
    pub fn request_mutate(&mut self, kind: Option<MutationKind>) {
        if let Some(kind) = kind {
            self.mutate_form.kind = kind;
        }
        if self.pending.mutate {
            self.notify(NoticeLevel::Info, "Mutation already in progress, please wait.");
            return;
        }
        match self.mutate_form.to_request() {
            Ok(request) => {
                self.focus(Panel::Mutated);
                self.pending.mutate = true;
                let ticket = self.ticket();
                self.effects
                    .push(Effect::Submit(ticket, ServiceRequest::Mutate(request)));
                self.notify(NoticeLevel::Info, "Mutating aptamer...");
            }
            Err(e) => self.notify(NoticeLevel::Error, e.to_string()),
        }
    }

    /// Validates the selected record's structure and draws it on the surface.
    pub fn show_structure(&mut self) {
        let Some(record) = self.active_table().selected_record().cloned() else {
            self.notify(NoticeLevel::Info, "No aptamer selected.");
            return;
        };
        let structure = record.structure_text().unwrap_or_default().to_string();
        let mut renderer = crate::structure::ArcDiagram::default();
        if let Err(e) = self
            .surface
            .show(&mut renderer, &record.sequence, &structure)
        {
            // Inline alert stays on the surface; the status line is the live region.
            self.notify(NoticeLevel::Error, format!("Structure: {}", e));
            self.effects.push(Effect::Announce);
        }
    }

    /// Queues a request for the service-rendered structure image.
    pub fn request_plot(&mut self) {
        if self.pending.plot {
            self.notify(NoticeLevel::Info, "Structure image already in progress, please wait.");
            return;
        }
        let Some(record) = self.active_table().selected_record() else {
            self.notify(NoticeLevel::Info, "No aptamer selected.");
            return;
        };
        let Some(structure) = record.structure_text() else {
            self.notify(NoticeLevel::Warning, "No structure was computed for this aptamer.");
            return;
        };
        let request = ServiceRequest::Plot {
            sequence: record.sequence.clone(),
            structure: structure.to_string(),
        };
        self.pending.plot = true;
        let ticket = self.ticket();
        self.effects.push(Effect::Submit(ticket, request));
        self.notify(NoticeLevel::Info, "Fetching structure image...");
    }

    pub fn request_export(&mut self, format: ExportFormat, path: Option<String>) {
        let panel = self.panel;
        self.effects.push(Effect::Export { panel, format, path });
    }

    pub fn request_copy(&mut self) {
        let panel = self.panel;
        self.effects.push(Effect::Copy(panel));
    }

    /// Clears every input, table and sort state, and abandons pending requests.
    pub fn reset(&mut self) {
        for table in self.tables.iter_mut() {
            table.reset();
        }
        self.generate_form = GenerateForm::default();
        self.mutate_form = MutateForm::default();
        self.surface.clear();
        self.pending = Pending::default();
        self.generation += 1;
        self.notify(NoticeLevel::Info, "Reset successful.");
    }

    fn replace_records(&mut self, panel: Panel, records: Vec<Record>) {
        self.table_mut(panel).replace(records);
        if panel == self.panel {
            self.surface.clear();
        }
    }

    /// Applies a finished service request to the view.
    ///
    /// Completions from an earlier generation are ignored: the view that
    /// asked for them has since been reset. Plots are also ignored once the
    /// table they were requested from has been left.
    pub fn complete(&mut self, completion: Completion) {
        let ticket = completion.ticket;
        let abandoned_plot = matches!(completion.outcome, Outcome::Plotted(_))
            && ticket.plot_epoch != self.plot_epoch;
        if ticket.generation != self.generation || abandoned_plot {
            log::debug!(
                "dropping stale {} response (ticket {:?}, generation {}, plot epoch {})",
                completion.outcome.action(),
                ticket,
                self.generation,
                self.plot_epoch
            );
            return;
        }
        match completion.outcome {
            Outcome::Generated(result) => {
                self.pending.generate = false;
                match result {
                    Ok(records) => {
                        let n = records.len();
                        self.replace_records(Panel::Generated, records);
                        self.notify(NoticeLevel::Success, format!("{} aptamers generated", n));
                    }
                    Err(e) => {
                        self.replace_records(Panel::Generated, Vec::new());
                        self.notify(NoticeLevel::Error, format!("Failed to generate aptamers: {}", e));
                    }
                }
            }
            Outcome::Mutated { requested, result } => {
                self.pending.mutate = false;
                match result {
                    Ok(records) => {
                        let n = records.len();
                        self.replace_records(Panel::Mutated, records);
                        if n < requested {
                            self.notify(
                                NoticeLevel::Warning,
                                format!(
                                    "{} of {} requested mutations were usable. Mutation is random: try again or adjust the inputs.",
                                    n, requested
                                ),
                            );
                        } else {
                            self.notify(NoticeLevel::Success, format!("{} mutations created", n));
                        }
                    }
                    Err(e) => {
                        self.replace_records(Panel::Mutated, Vec::new());
                        self.notify(NoticeLevel::Error, format!("Failed to mutate aptamer: {}", e));
                    }
                }
            }
            Outcome::Plotted(result) => {
                self.pending.plot = false;
                match result {
                    Ok(path) => self.notify(
                        NoticeLevel::Success,
                        format!("Structure image saved to {}", path.display()),
                    ),
                    Err(e) => self.notify(
                        NoticeLevel::Error,
                        format!("Structure visualization failed: {}", e),
                    ),
                }
            }
        }
    }

    /// Shows the help overlay.
    pub fn show_help(&mut self) {
        self.show_help = true;
    }

    /// Dismisses the help overlay.
    pub fn dismiss_help(&mut self) {
        self.show_help = false;
    }

    /// Enters command mode.
    pub fn enter_command_mode(&mut self) {
        self.mode = AppMode::Command(String::new());
    }

    /// Handles a character input in command mode.
    pub fn command_input(&mut self, c: char) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.push(c);
        }
    }

    /// Handles backspace in command mode.
    pub fn command_backspace(&mut self) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.pop();
            if cmd.is_empty() {
                self.mode = AppMode::Normal;
            }
        }
    }

    /// Cancels command mode and returns to normal mode.
    pub fn cancel_command(&mut self) {
        self.mode = AppMode::Normal;
    }

    /// Executes the current command.
    pub fn execute_command(&mut self) {
        let AppMode::Command(cmd) = std::mem::take(&mut self.mode) else {
            return;
        };
        crate::command::execute(self, cmd.trim());
    }

    /// Answers the reset confirmation prompt.
    pub fn confirm_reset(&mut self, yes: bool) {
        self.mode = AppMode::Normal;
        if yes {
            self.reset();
        } else {
            self.notify(NoticeLevel::Info, "Reset cancelled.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{GenerateRequest, ServiceError};

    fn sample() -> Record {
        Record::new("AUGC")
            .with(Field::Length, 4.0)
            .with(Field::GcContent, 50.0)
            .with(Field::Mfe, "N/A")
            .with(Field::Tm, 60.0)
            .with(Field::Kd, "<2")
    }

    #[test]
    fn test_missing_and_sentinel_fold_together() {
        let record = sample();
        assert_eq!(record.get(Field::Mfe), FieldRef::Missing);
        assert_eq!(record.get(Field::Structure), FieldRef::Missing);
        assert_eq!(record.get(Field::Kd), FieldRef::Text("<2"));
        assert_eq!(record.get(Field::Tm), FieldRef::Number(60.0));
    }

    #[test]
    fn test_export_text() {
        let record = sample();
        assert_eq!(record.export_text(Field::Length), "4");
        assert_eq!(record.export_text(Field::GcContent), "50");
        assert_eq!(record.export_text(Field::Mfe), "");
        assert_eq!(record.export_text(Field::Kd), "<2");
    }

    #[test]
    fn test_display_text_units() {
        let record = sample().with(Field::Mfe, "-12.3");
        assert_eq!(record.display_text(Field::Mfe), "-12.3 kcal/mol");
        assert_eq!(record.display_text(Field::Kd), "<2");
        let record = record.with(Field::Kd, 15.0);
        assert_eq!(record.display_text(Field::Kd), "15 nM");
        let record = Record::new("AUGC");
        assert_eq!(record.display_text(Field::Mfe), "N/A");
        assert_eq!(record.display_text(Field::Tm), "");
    }

    #[test]
    fn test_deserialize_mixed_types() {
        let json = r#"{"sequence":"AUGC","length":4,"gc_content":"50.0","structure":null,"mfe":"N/A","kd":">100","extra":true}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.length, Some(FieldValue::Number(4.0)));
        assert_eq!(record.gc_content, Some(FieldValue::Text("50.0".to_string())));
        assert_eq!(record.structure, None);
        assert!(record.get(Field::Mfe).is_missing());
        assert_eq!(record.get(Field::Kd), FieldRef::Text(">100"));
    }

    #[test]
    fn test_field_parsing() {
        assert_eq!("GC".parse::<Field>(), Ok(Field::GcContent));
        assert_eq!("kd".parse::<Field>(), Ok(Field::Kd));
        assert!("foo".parse::<Field>().is_err());
        assert_eq!(Field::from_column(1), Some(Field::Sequence));
        assert_eq!(Field::from_column(7), Some(Field::Kd));
        assert_eq!(Field::from_column(0), None);
        assert_eq!(Field::from_column(8), None);
    }

    #[test]
    fn test_generate_request_blocked_while_pending() {
        let mut state = AppState::default();
        state.generate_form.reference = ">ref\nACGUACGU".to_string();
        state.request_generate();
        assert!(state.pending.generate);
        assert_eq!(state.take_effects().len(), 1);

        state.request_generate();
        assert!(state.take_effects().is_empty());
    }

    #[test]
    fn test_invalid_form_sends_nothing() {
        let mut state = AppState::default();
        state.request_generate();
        assert!(!state.pending.generate);
        assert!(state.take_effects().is_empty());
        assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut state = AppState::default();
        let ticket = state.ticket();
        state.pending.generate = true;
        state.reset();
        state.complete(Completion {
            ticket,
            outcome: Outcome::Generated(Ok(vec![sample()])),
        });
        assert!(state.table(Panel::Generated).is_empty());
    }

    #[test]
    fn test_leaving_table_only_abandons_the_plot() {
        let mut state = AppState::default();
        state.table_mut(Panel::Generated).replace(vec![Record::new("GGGAAACCC")
            .with(Field::Structure, "(((...)))")]);
        state.generate_form.reference = "ACGU".to_string();
        state.request_generate();
        state.request_plot();
        let tickets: Vec<Ticket> = state
            .take_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Submit(ticket, _) => Some(ticket),
                _ => None,
            })
            .collect();
        assert_eq!(tickets.len(), 2);

        state.switch_panel();
        assert!(!state.pending.plot);
        state.complete(Completion {
            ticket: tickets[1],
            outcome: Outcome::Plotted(Ok("rna_structure.svg".into())),
        });
        assert!(state.notice.as_ref().map_or(true, |n| !n.text.contains("saved")));

        state.complete(Completion {
            ticket: tickets[0],
            outcome: Outcome::Generated(Ok(vec![sample()])),
        });
        assert!(!state.pending.generate);
        assert_eq!(state.table(Panel::Generated).len(), 1);
    }

    #[test]
    fn test_failure_clears_previous_results() {
        let mut state = AppState::default();
        state.table_mut(Panel::Generated).replace(vec![sample()]);
        state.pending.generate = true;
        let ticket = state.ticket();
        state.complete(Completion {
            ticket,
            outcome: Outcome::Generated(Err(ServiceError::Status {
                status: 500,
                body: "boom".to_string(),
            })),
        });
        assert!(!state.pending.generate);
        assert!(state.table(Panel::Generated).is_empty());
        assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn test_short_mutation_response_is_a_warning() {
        let mut state = AppState::default();
        state.pending.mutate = true;
        let ticket = state.ticket();
        state.complete(Completion {
            ticket,
            outcome: Outcome::Mutated {
                requested: 10,
                result: Ok(vec![sample(), sample()]),
            },
        });
        assert_eq!(state.table(Panel::Mutated).len(), 2);
        assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Warning));
    }

    #[test]
    fn test_show_structure_alert_is_announced() {
        let mut state = AppState::default();
        state
            .table_mut(Panel::Generated)
            .replace(vec![Record::new("AUGA").with(Field::Structure, "(())")]);
        state.show_structure();
        assert!(state.surface.alert().is_some());
        assert!(state.take_effects().contains(&Effect::Announce));
    }

    #[test]
    fn test_generate_request_shape() {
        let mut state = AppState::default();
        state.generate_form.reference = "ACGUACGU".to_string();
        state.request_generate();
        match state.take_effects().pop() {
            Some(Effect::Submit(_, ServiceRequest::Generate(GenerateRequest { num_aptamers, .. }))) => {
                assert_eq!(num_aptamers, 10);
            }
            other => panic!("unexpected effect: {:?}", other),
        }
    }
}
