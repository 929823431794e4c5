//! # aptui - Terminal client for RNA aptamer design
//!
//! A terminal front end for an aptamer design service, using ratatui.
//!
//! ## Architecture
//!
//! The application follows an event-driven architecture with clear separation:
//! - `model`: Records, fields and application state
//! - `sort`: Sort key coercion and the undefined-last comparator
//! - `table`: Per-table records, sort state and selection
//! - `export`: TXT, CSV, XLS and XLSX serialization
//! - `clipboard`: Copying tables through the system clipboard
//! - `structure`: Dot-bracket validation and the structure surface
//! - `forms`: Request inputs and their validation
//! - `fasta`: Reference FASTA reading
//! - `client`: Blocking HTTP client for the design service
//! - `command`: `:` command parsing
//! - `event`: Keyboard event handling
//! - `ui`: TUI rendering with ratatui
//! - `controller`: Orchestration of state transitions and side effects

pub mod client;
pub mod clipboard;
pub mod command;
pub mod controller;
pub mod event;
pub mod export;
pub mod fasta;
pub mod forms;
pub mod model;
pub mod sort;
pub mod structure;
pub mod table;
pub mod ui;
