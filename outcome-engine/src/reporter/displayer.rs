// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable output: a status line per case as it is decided, and a summary at the end.

use crate::{
    classify::Classification,
    reconciler::FinalRecord,
    reporter::SessionReport,
    session::PhaseProgress,
};
use owo_colors::{OwoColorize, Style};
use std::{
    io::{self, Write},
    time::Duration,
};
use swrite::{SWrite, swrite};

/// Writes human-readable status lines and summaries.
#[derive(Clone, Debug, Default)]
pub struct ReportDisplayer {
    styles: Styles,
}

impl ReportDisplayer {
    /// Creates a new displayer, with colors disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables colorized output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Writes a status line for progress reported by a session.
    ///
    /// Nothing is written for buffered phases.
    pub fn write_progress(
        &self,
        progress: &PhaseProgress,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        match progress {
            PhaseProgress::Buffered => Ok(()),
            PhaseProgress::RetryExpected {
                case_id,
                classification,
                next_attempt,
                max_attempts,
            } => {
                let status = format!("{} RETRY", short_status_str(*classification));
                writeln!(
                    writer,
                    "{:>12} [{}/{}] {}",
                    status.style(self.styles.retry),
                    next_attempt - 1,
                    max_attempts,
                    case_id.style(self.styles.case_id),
                )
            }
            PhaseProgress::Finalized(record) => self.write_status_line(record, writer),
        }
    }

    /// Writes the status line for a final record.
    pub fn write_status_line(
        &self,
        record: &FinalRecord,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        let status = if record.attempts_used > 1 {
            format!(
                "TRY {} {}",
                record.attempts_used,
                short_status_str(record.classification)
            )
        } else {
            status_str(record.classification).to_owned()
        };
        write!(writer, "{:>12} ", status.style(self.record_style(record)))?;
        write_duration(record.duration, writer)?;
        writeln!(writer, "{}", record.case_id.style(self.styles.case_id))?;

        if let Some(error) = record.error.as_ref().filter(|_| !record.passing) {
            writeln!(
                writer,
                "{:>12} {}: {}",
                "",
                error.kind.style(self.styles.fail),
                error.message
            )?;
        }
        Ok(())
    }

    /// Writes the end-of-session summary: failing cases, then a line of counts.
    pub fn write_summary(&self, report: &SessionReport, writer: &mut dyn Write) -> io::Result<()> {
        let summary_style = if report.records().is_empty() {
            self.styles.skip
        } else if report.is_success() {
            self.styles.pass
        } else {
            self.styles.fail
        };
        write!(writer, "------------\n{:>12} ", "Summary".style(summary_style))?;
        write_duration(report.total_duration(), writer)?;

        let case_count = report.records().len();
        let cases_str = if case_count == 1 { "case" } else { "cases" };
        writeln!(
            writer,
            "{} {cases_str} ({} attempts): {}",
            case_count.style(self.styles.count),
            report.total_attempts().style(self.styles.count),
            self.summary_str(report),
        )?;

        for record in report.failing_records() {
            self.write_status_line(record, writer)?;
        }
        Ok(())
    }

    fn summary_str(&self, report: &SessionReport) -> String {
        let counts = report.counts();
        let mut out = String::new();
        swrite!(
            out,
            "{} {}",
            counts.passed.style(self.styles.count),
            "passed".style(self.styles.pass)
        );
        if report.flaky_count() > 0 {
            swrite!(
                out,
                " ({} {})",
                report.flaky_count().style(self.styles.count),
                "flaky".style(self.styles.skip)
            );
        }

        let rest = [
            (counts.failed, "failed", self.styles.fail),
            (counts.error, "errors", self.styles.fail),
            (counts.unexpected_pass, "unexpectedly passed", self.styles.fail),
            (counts.incomplete, "incomplete", self.styles.fail),
            (counts.expected_failure, "expected failures", self.styles.skip),
        ];
        for (count, label, style) in rest {
            if count > 0 {
                swrite!(
                    out,
                    ", {} {}",
                    count.style(self.styles.count),
                    label.style(style)
                );
            }
        }
        swrite!(
            out,
            ", {} {}",
            counts.skipped.style(self.styles.count),
            "skipped".style(self.styles.skip)
        );
        out
    }

    fn record_style(&self, record: &FinalRecord) -> Style {
        match record.classification {
            Classification::Passed if record.flaky => self.styles.skip,
            Classification::Passed => self.styles.pass,
            Classification::Skipped | Classification::ExpectedFailure => self.styles.skip,
            Classification::UnexpectedPass { .. } if record.passing => self.styles.skip,
            _ => self.styles.fail,
        }
    }
}

fn write_duration(duration: Duration, writer: &mut dyn Write) -> io::Result<()> {
    // * > means right-align.
    // * 8 is the number of characters to pad to.
    // * .3 means print three digits after the decimal point.
    write!(writer, "[{:>8.3?}s] ", duration.as_secs_f64())
}

fn status_str(classification: Classification) -> &'static str {
    match classification {
        Classification::Passed => "PASS",
        Classification::Failed => "FAIL",
        Classification::Error => "ERROR",
        Classification::Skipped => "SKIP",
        Classification::ExpectedFailure => "XFAIL",
        Classification::UnexpectedPass { strict: false } => "XPASS",
        Classification::UnexpectedPass { strict: true } => "XPASS STRICT",
        Classification::Incomplete => "INCOMPLETE",
    }
}

fn short_status_str(classification: Classification) -> &'static str {
    match classification {
        Classification::Passed => "PASS",
        Classification::Failed => "FAIL",
        Classification::Error => "ERR",
        Classification::Skipped => "SKIP",
        Classification::ExpectedFailure => "XFAIL",
        Classification::UnexpectedPass { .. } => "XPASS",
        Classification::Incomplete => "INCMPL",
    }
}

#[derive(Clone, Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    retry: Style,
    fail: Style,
    skip: Style,
    case_id: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.retry = Style::new().magenta().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.case_id = Style::new().blue().bold();
    }
}
