//! 📊 progress.rs: "Are we there yet?" Every run, every time, forever.
//!
//! Two jobs:
//! - `FileProgress`: an indicatif bar that ticks once per file, so a directory of 400 dumps
//!   doesn't look like a hung process.
//! - `RunReport`: what happened to each file, rendered as a comfy-table at the end.
//!
//! ⚠️ Watching the bar will not make it go faster. We've tried. Science says no. 🦆

use std::path::{Path, PathBuf};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_BORDERS_ONLY};
use indicatif::{ProgressBar, ProgressStyle};

use crate::ingest::IngestOutcome;

/// 🔢 "1000000" → "1,000,000". For the humans in the audience.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// 🎨 One tick per file. Hidden automatically when stderr is not a terminal.
pub(crate) struct FileProgress {
    progress_bar: ProgressBar,
}

impl std::fmt::Debug for FileProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("FileProgress")
            .field("position", &self.progress_bar.position())
            .finish()
    }
}

impl FileProgress {
    pub(crate) fn new(total_files: u64) -> Self {
        let progress_bar = ProgressBar::new(total_files);
        let style = ProgressStyle::default_bar()
            .template("{msg}\n| [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        progress_bar.set_style(style);
        Self { progress_bar }
    }

    pub(crate) fn start(&self, path: &Path) {
        self.progress_bar
            .set_message(format!("working on: {}", path.display()));
    }

    pub(crate) fn advance(&self) {
        self.progress_bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }
}

/// 🏁 What happened to one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// 🧨 The file never became a batch (parse or io error). Nothing was sent.
    LoadFailed { reason: String },
    /// 🚚 The file loaded, here's how the ingest went.
    Ingested {
        records: usize,
        outcome: IngestOutcome,
    },
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Ingested { outcome, .. } if outcome.is_success())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// 📋 The whole run, file by file, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn record(&mut self, path: impl Into<PathBuf>, outcome: FileOutcome) {
        self.files.push(FileReport {
            path: path.into(),
            outcome,
        });
    }

    pub fn succeeded_files(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_success()).count()
    }

    pub fn failed_files(&self) -> usize {
        self.files.len() - self.succeeded_files()
    }

    /// 📄 Documents the cluster accepted, summed over every file.
    pub fn docs_indexed(&self) -> usize {
        self.files
            .iter()
            .map(|f| match &f.outcome {
                FileOutcome::Ingested {
                    outcome: IngestOutcome::Indexed { summary, .. },
                    ..
                } => summary.succeeded,
                _ => 0,
            })
            .sum()
    }

    /// 🍽️ A table with one row per file. Borders only, because we are minimalists.
    pub fn render(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["file", "index", "records", "indexed", "rejected", "status"]);

        for file in &self.files {
            let (index, records, indexed, rejected, status) = match &file.outcome {
                FileOutcome::LoadFailed { reason } => {
                    (String::new(), 0, 0, 0, format!("load failed: {reason}"))
                }
                FileOutcome::Ingested { records, outcome } => match outcome {
                    IngestOutcome::Indexed { index, summary } => (
                        index.clone(),
                        *records,
                        summary.succeeded,
                        summary.failed(),
                        "ok".to_string(),
                    ),
                    IngestOutcome::GaveUp { attempts } => (
                        String::new(),
                        *records,
                        0,
                        0,
                        format!("gave up after {attempts} attempts"),
                    ),
                    IngestOutcome::Failed { reason } => {
                        (String::new(), *records, 0, 0, format!("failed: {reason}"))
                    }
                },
            };

            table.add_row(vec![
                Cell::new(file.path.display()),
                Cell::new(index),
                Cell::new(format_number(records as u64)).set_alignment(CellAlignment::Right),
                Cell::new(format_number(indexed as u64)).set_alignment(CellAlignment::Right),
                Cell::new(format_number(rejected as u64)).set_alignment(CellAlignment::Right),
                Cell::new(status),
            ]);
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::BulkSummary;

    fn indexed(succeeded: usize) -> FileOutcome {
        FileOutcome::Ingested {
            records: succeeded,
            outcome: IngestOutcome::Indexed {
                index: "base_index".to_string(),
                summary: BulkSummary {
                    attempted: succeeded,
                    succeeded,
                    failures: Vec::new(),
                },
            },
        }
    }

    #[test]
    fn the_one_where_commas_make_big_numbers_readable() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn the_one_where_the_report_adds_it_all_up() {
        let mut report = RunReport::default();
        report.record("data/a.json", indexed(2));
        report.record(
            "data/b.json",
            FileOutcome::LoadFailed {
                reason: "parse error at line 1".to_string(),
            },
        );
        report.record(
            "data/c.json",
            FileOutcome::Ingested {
                records: 3,
                outcome: IngestOutcome::GaveUp { attempts: 6 },
            },
        );

        assert_eq!(report.succeeded_files(), 1);
        assert_eq!(report.failed_files(), 2);
        assert_eq!(report.docs_indexed(), 2);

        let rendered = report.render().to_string();
        assert!(rendered.contains("data/a.json"));
        assert!(rendered.contains("load failed"));
        assert!(rendered.contains("gave up after 6 attempts"));
    }
}
