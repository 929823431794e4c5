//! Command line (`:`) parsing and execution.
//!
//! - `:q`, `:quit`: quit
//! - `:h`, `:help`: show help
//! - `:<number>`: select row
//! - `:load <file>`: read the reference from a FASTA file
//! - `:seq <text>`: set the reference (FASTA or bare sequence)
//! - `:gc <min> <max>`, `:len <min> <max>`, `:tm <min> <max>`: constraints,
//!   `-` leaves a side open and no argument clears both
//! - `:count <n>`: number of aptamers to generate
//! - `:generate`: submit a generate request
//! - `:aptamer <seq>`, `:mutations <n>`: mutation inputs
//! - `:mutate [point|random]`: submit a mutation request
//! - `:sort <field>`: sort the focused table (again to reverse)
//! - `:export [txt|csv|xls|xlsx] [path]`: write the focused table
//! - `:copy`: copy the focused table
//! - `:structure`, `:plot`: show or fetch the selected structure
//! - `:reset`: clear everything after confirmation

use std::str::FromStr;

use crate::export::ExportFormat;
use crate::fasta::read_reference_file;
use crate::forms::{Bounds, MutationKind};
use crate::model::{AppMode, AppState, Field, NoticeLevel};

/// Parses one side of a range. `-` and `*` mean unbounded.
fn parse_bound<T: FromStr>(token: Option<&str>) -> Result<Option<T>, String> {
    match token {
        None | Some("-") | Some("*") => Ok(None),
        Some(t) => t
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("Invalid number: {}", t)),
    }
}

fn parse_bounds<T>(args: &[&str]) -> Result<Bounds<T>, String>
where
    T: FromStr + Copy + PartialOrd + Into<f64>,
{
    if args.len() > 2 {
        return Err("Expected at most two values: <min> <max>".to_string());
    }
    Ok(Bounds::new(
        parse_bound(args.first().copied())?,
        parse_bound(args.get(1).copied())?,
    ))
}

fn parse_count(args: &[&str]) -> Result<usize, String> {
    match args {
        [n] => n.parse().map_err(|_| format!("Invalid number: {}", n)),
        _ => Err("Expected one number".to_string()),
    }
}

/// Executes a command typed after `:`.
pub fn execute(state: &mut AppState, cmd: &str) {
    if let Err(message) = dispatch(state, cmd) {
        state.notify(NoticeLevel::Error, message);
    }
}

fn dispatch(state: &mut AppState, cmd: &str) -> Result<(), String> {
    let (name, rest) = match cmd.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (cmd, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    match name {
        "" => {}
        "q" | "quit" => state.should_quit = true,
        "h" | "help" => state.show_help(),
        "load" => {
            if rest.is_empty() {
                return Err("Usage: :load <fasta file>".to_string());
            }
            let content = read_reference_file(rest).map_err(|e| format!("{}: {}", rest, e))?;
            state.generate_form.reference = content;
            state.notify(NoticeLevel::Success, format!("Loaded reference from {}", rest));
        }
        "seq" => {
            state.generate_form.reference = rest.to_string();
        }
        "gc" => state.generate_form.gc = parse_bounds(&args)?,
        "len" | "length" => state.generate_form.length = parse_bounds(&args)?,
        "tm" => state.generate_form.tm = parse_bounds(&args)?,
        "count" | "n" => state.generate_form.count = parse_count(&args)?,
        "generate" | "gen" => state.request_generate(),
        "aptamer" => {
            state.mutate_form.aptamer = rest.to_string();
        }
        "mutations" => state.mutate_form.count = parse_count(&args)?,
        "mutate" => {
            let kind = match args.as_slice() {
                [] => None,
                [kind] => Some(kind.parse::<MutationKind>()?),
                _ => return Err("Usage: :mutate [point|random]".to_string()),
            };
            state.request_mutate(kind);
        }
        "sort" => match args.as_slice() {
            [field] => state.select_sort(field.parse::<Field>()?),
            _ => return Err("Usage: :sort <field>".to_string()),
        },
        "export" | "w" => {
            let (format, path) = match args.as_slice() {
                [] => (ExportFormat::Txt, None),
                [first] => match first.parse::<ExportFormat>() {
                    Ok(format) => (format, None),
                    Err(_) => {
                        let format = ExportFormat::from_path(first)
                            .ok_or_else(|| format!("Cannot tell the export format of {}", first))?;
                        (format, Some(first.to_string()))
                    }
                },
                [format, path] => (format.parse::<ExportFormat>()?, Some(path.to_string())),
                _ => return Err("Usage: :export [txt|csv|xls|xlsx] [path]".to_string()),
            };
            state.request_export(format, path);
        }
        "copy" | "y" => state.request_copy(),
        "structure" | "show" => state.show_structure(),
        "plot" => state.request_plot(),
        "reset" => {
            state.mode = AppMode::ConfirmReset;
            state.notify(NoticeLevel::Warning, "Clear all inputs and results? (y/n)");
        }
        _ => {
            let Ok(row) = cmd.parse::<usize>() else {
                return Err(format!("Unknown command: {}", cmd));
            };
            let len = state.active_table().len();
            if row == 0 || row > len {
                return Err(format!("Invalid row: {}", row));
            }
            state.select_row(row - 1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Effect, Panel, Record};
    use crate::sort::Direction;
    use crate::table::SortState;

    fn run(state: &mut AppState, cmd: &str) {
        state.mode = AppMode::Command(cmd.to_string());
        state.execute_command();
    }

    #[test]
    fn test_quit_and_help() {
        let mut state = AppState::default();
        run(&mut state, "h");
        assert!(state.show_help);
        run(&mut state, "quit");
        assert!(state.should_quit);
    }

    #[test]
    fn test_constraint_commands() {
        let mut state = AppState::default();
        run(&mut state, "gc 40 60");
        assert_eq!(state.generate_form.gc, Bounds::new(Some(40.0), Some(60.0)));
        run(&mut state, "len - 50");
        assert_eq!(state.generate_form.length, Bounds::new(None, Some(50)));
        run(&mut state, "tm");
        assert_eq!(state.generate_form.tm, Bounds::default());
        run(&mut state, "count 25");
        assert_eq!(state.generate_form.count, 25);

        run(&mut state, "gc forty");
        assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
        assert_eq!(state.generate_form.gc, Bounds::new(Some(40.0), Some(60.0)));
    }

    #[test]
    fn test_mutate_command_sets_kind() {
        let mut state = AppState::default();
        run(&mut state, "aptamer GGGAGACAAGAAUAAACGCUCAA");
        run(&mut state, "mutations 5");
        run(&mut state, "mutate random");
        assert!(state.pending.mutate);
        assert_eq!(state.mutate_form.kind, MutationKind::Random);
        assert_eq!(state.panel, Panel::Mutated);
        assert_eq!(state.take_effects().len(), 1);
    }

    #[test]
    fn test_sort_command_toggles() {
        let mut state = AppState::default();
        run(&mut state, "sort kd");
        run(&mut state, "sort kd");
        assert_eq!(
            state.active_table().sort(),
            SortState::SortedBy(Field::Kd, Direction::Descending)
        );
    }

    #[test]
    fn test_export_command_forms() {
        let mut state = AppState::default();
        run(&mut state, "export");
        run(&mut state, "export csv");
        run(&mut state, "export out.xlsx");
        run(&mut state, "export xls results.xls");
        let panel = Panel::Generated;
        assert_eq!(
            state.take_effects(),
            vec![
                Effect::Export { panel, format: ExportFormat::Txt, path: None },
                Effect::Export { panel, format: ExportFormat::Csv, path: None },
                Effect::Export { panel, format: ExportFormat::Xlsx, path: Some("out.xlsx".to_string()) },
                Effect::Export { panel, format: ExportFormat::Xls, path: Some("results.xls".to_string()) },
            ]
        );

        run(&mut state, "export notes");
        assert!(state.take_effects().is_empty());
    }

    #[test]
    fn test_reset_asks_first() {
        let mut state = AppState::default();
        state.generate_form.count = 42;
        run(&mut state, "reset");
        assert_eq!(state.mode, AppMode::ConfirmReset);
        state.confirm_reset(false);
        assert_eq!(state.generate_form.count, 42);

        run(&mut state, "reset");
        state.confirm_reset(true);
        assert_eq!(state.generate_form.count, 10);
        assert_eq!(state.mode, AppMode::Normal);
    }

    #[test]
    fn test_row_number_selects() {
        let mut state = AppState::default();
        state
            .table_mut(Panel::Generated)
            .replace(vec![Record::new("A"), Record::new("C"), Record::new("G")]);
        run(&mut state, "3");
        assert_eq!(state.active_table().selected(), 2);
        run(&mut state, "9");
        assert_eq!(state.active_table().selected(), 2);
        run(&mut state, "bogus");
        assert_eq!(
            state.notice.as_ref().map(|n| n.text.as_str()),
            Some("Unknown command: bogus")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let mut state = AppState::default();
        run(&mut state, "load /nonexistent/reference.fasta");
        assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
        assert!(state.generate_form.reference.is_empty());
    }
}
