// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use outcome_engine::{
    config::{DEFAULT_JUNIT_REPORT_NAME, OutcomeConfig, OutcomeProfile},
    errors::WriteReportError,
    reporter::{JunitReporter, ReportDisplayer, SessionReport},
    session::{PhaseProgress, Session},
};
use outcome_metadata::RunnerMessage;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
};
use tracing::{debug, info, warn};

/// Reconciles a test runner's per-phase events into a session report.
///
/// Runner messages are read as JSON lines, one message per line. Each logical case gets exactly
/// one final record, with retries folded in. The report is written as JSON, and optionally as
/// JUnit XML.
#[derive(Debug, Parser)]
#[command(
    name = "outcome-report",
    version,
    max_term_width = 100,
    styles = clap_styles::style(),
)]
pub struct OutcomeApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    /// Runner messages to read, or `-` for standard input
    #[arg(long, value_name = "PATH", default_value = "-")]
    events: Utf8PathBuf,

    /// Where to write the JSON report [default: <store-dir>/<profile>/outcome.json]
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    output_file: Option<Utf8PathBuf>,

    /// Write a JUnit XML report to this path, overriding the profile setting
    #[arg(long, value_name = "PATH")]
    junit: Option<Utf8PathBuf>,

    /// Format for the session report printed to standard output
    #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
    message_format: MessageFormat,
}

#[derive(Debug, clap::Args)]
struct ConfigOpts {
    /// Workspace root [default: current directory]
    #[arg(long, value_name = "DIR")]
    workspace_root: Option<Utf8PathBuf>,

    /// Config file [default: <workspace-root>/.config/outcome.toml]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Configuration profile to use
    #[arg(
        long,
        short = 'P',
        value_name = "PROFILE",
        env = "OUTCOME_PROFILE",
        default_value = OutcomeConfig::DEFAULT_PROFILE
    )]
    profile: String,
}

impl ConfigOpts {
    fn workspace_root(&self) -> Result<Utf8PathBuf> {
        match &self.workspace_root {
            Some(root) => Ok(root.clone()),
            None => {
                let cwd = std::env::current_dir()
                    .map_err(|err| ExpectedError::CurrentDirFailed { err })?;
                Utf8PathBuf::try_from(cwd).map_err(|err| ExpectedError::WorkspaceRootInvalidUtf8 {
                    path: err.into_path_buf(),
                })
            }
        }
    }

    fn make_config(&self) -> Result<OutcomeConfig> {
        let workspace_root = self.workspace_root()?;
        Ok(OutcomeConfig::from_sources(
            workspace_root,
            self.config_file.as_deref(),
        )?)
    }
}

/// The format of the report printed to standard output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MessageFormat {
    /// Status lines and a summary, on standard error
    #[default]
    Human,

    /// The JSON session report, on standard output
    Json,
}

impl OutcomeApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code on success.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let config = self.config_opts.make_config()?;
        let profile = config.profile(&self.config_opts.profile)?;
        debug!(
            profile = profile.name(),
            store_dir = %profile.store_dir(),
            "loaded config",
        );

        let mut displayer = ReportDisplayer::new();
        if output.color.should_colorize(supports_color::Stream::Stderr) {
            displayer.colorize();
        }

        let session = Session::new(profile.session_settings());
        self.replay_events(&session, &displayer, output, output_writer)?;

        for (case_id, attempt) in session.in_flight() {
            warn!("attempt {attempt} of `{case_id}` was still in progress when runner messages ended");
        }
        let (report, incomplete) = match session.finalize() {
            Ok(report) => (report, None),
            Err(incomplete) => (incomplete.report().clone(), Some(incomplete)),
        };

        // The report is written even for incomplete sessions.
        self.write_reports(&report, &profile)?;
        match self.message_format {
            MessageFormat::Human => {
                let mut writer = output_writer.stderr_writer();
                displayer
                    .write_summary(&report, &mut writer)
                    .and_then(|()| writer.flush())
                    .map_err(ExpectedError::write_output)?;
            }
            MessageFormat::Json => {
                let mut writer = output_writer.stdout_writer();
                report.write_json(&mut writer)?;
                writeln!(writer)
                    .and_then(|()| writer.flush())
                    .map_err(ExpectedError::write_output)?;
            }
        }

        if let Some(incomplete) = incomplete {
            return Err(incomplete.into());
        }
        if report.records().is_empty() {
            return Err(ExpectedError::NoCasesRecorded);
        }
        if !report.is_success() {
            return Err(ExpectedError::CasesFailed {
                failing: report.failing_count(),
                total: report.records().len(),
            });
        }
        Ok(0)
    }

    fn open_events(&self) -> Result<Box<dyn BufRead>> {
        if self.events.as_str() == "-" {
            return Ok(Box::new(io::stdin().lock()));
        }
        let file = File::open(&self.events).map_err(|err| ExpectedError::EventsOpenError {
            path: self.events.clone(),
            err,
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn replay_events(
        &self,
        session: &Session,
        displayer: &ReportDisplayer,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<()> {
        let reader = self.open_events()?;
        let mut writer = output_writer.stderr_writer();
        let mut message_count = 0usize;
        for message in RunnerMessage::read_stream(reader) {
            let message = message?;
            message_count += 1;
            let Some(progress) = session.handle_message(&message)? else {
                continue;
            };
            if self.message_format == MessageFormat::Human
                && should_display(&progress, output.verbose)
            {
                displayer
                    .write_progress(&progress, &mut writer)
                    .map_err(ExpectedError::write_output)?;
            }
        }
        writer.flush().map_err(ExpectedError::write_output)?;
        debug!(message_count, "runner messages replayed");
        Ok(())
    }

    fn write_reports(&self, report: &SessionReport, profile: &OutcomeProfile<'_>) -> Result<()> {
        let json_path = match &self.output_file {
            Some(path) => path.clone(),
            None => profile.store_dir().join("outcome.json"),
        };
        create_parent_dir(&json_path)?;
        let file = File::create(&json_path).map_err(|error| WriteReportError::Fs {
            file: json_path.clone(),
            error,
        })?;
        let mut writer = io::BufWriter::new(file);
        report.write_json(&mut writer)?;
        writer.flush().map_err(WriteReportError::Io)?;
        info!("wrote session report to {json_path}");

        let junit_config = profile.junit();
        let junit_path = match (&self.junit, &junit_config) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(junit)) => Some(junit.path(profile.store_dir())),
            (None, None) => None,
        };
        if let Some(junit_path) = junit_path {
            let report_name = junit_config
                .as_ref()
                .map_or(DEFAULT_JUNIT_REPORT_NAME, |junit| {
                    junit.report_name()
                });
            JunitReporter::new(report_name).write_to_path(report, &junit_path)?;
            info!("wrote JUnit report to {junit_path}");
        }
        Ok(())
    }
}

/// Passing cases are only displayed in verbose mode.
fn should_display(progress: &PhaseProgress, verbose: bool) -> bool {
    match progress {
        PhaseProgress::Buffered => false,
        PhaseProgress::RetryExpected { .. } => true,
        PhaseProgress::Finalized(record) => verbose || !record.passing,
    }
}

fn create_parent_dir(path: &Utf8Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|error| WriteReportError::Fs {
            file: dir.to_owned(),
            error,
        })?;
    }
    Ok(())
}
