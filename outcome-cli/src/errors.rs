// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use outcome_engine::errors::{
    ConfigParseError, IncompleteSession, ProfileNotFound, ProtocolError, WriteReportError,
};
use outcome_metadata::{MessageStreamError, OutcomeExitCode};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected error: one with a documented exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("workspace root is not valid UTF-8")]
    WorkspaceRootInvalidUtf8 { path: std::path::PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("failed to open runner messages")]
    EventsOpenError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to read runner messages")]
    MessageStreamError {
        #[from]
        err: MessageStreamError,
    },
    #[error("runner protocol error")]
    ProtocolError {
        #[from]
        err: ProtocolError,
    },
    #[error("failed to write report")]
    WriteReportError {
        #[from]
        err: WriteReportError,
    },
    #[error("failed to write output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
    #[error("session incomplete")]
    IncompleteSession {
        #[from]
        err: IncompleteSession,
    },
    #[error("no cases recorded")]
    NoCasesRecorded,
    #[error("cases failed")]
    CasesFailed { failing: usize, total: usize },
}

impl ExpectedError {
    pub(crate) fn write_output(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::WorkspaceRootInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::ProfileNotFound { .. }
            | Self::EventsOpenError { .. } => OutcomeExitCode::SETUP_ERROR,
            Self::MessageStreamError { .. } | Self::ProtocolError { .. } => {
                OutcomeExitCode::PROTOCOL_ERROR
            }
            Self::WriteReportError { .. } | Self::WriteOutputError { .. } => {
                OutcomeExitCode::WRITE_OUTPUT_ERROR
            }
            Self::IncompleteSession { .. } => OutcomeExitCode::INCOMPLETE_SESSION,
            Self::NoCasesRecorded => OutcomeExitCode::NO_CASES_RECORDED,
            Self::CasesFailed { .. } => OutcomeExitCode::CASES_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::WorkspaceRootInvalidUtf8 { path } => {
                error!(
                    "workspace root `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse outcome config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::ProfileNotFound { err } => {
                error!("{err}");
                None
            }
            Self::EventsOpenError { path, err } => {
                error!(
                    "failed to open runner messages at `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::MessageStreamError { err } => {
                error!("{err}");
                err.source()
            }
            Self::ProtocolError { err } => {
                error!("runner violated the event protocol: {err}");
                None
            }
            Self::WriteReportError { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteOutputError { err } => {
                error!("failed to write output");
                Some(err as &dyn Error)
            }
            Self::IncompleteSession { err } => {
                let cases = err.incomplete_cases();
                error!(
                    "{} {} did not reach a final state (reported as {}):",
                    cases.len().style(styles.bold),
                    if cases.len() == 1 { "case" } else { "cases" },
                    "incomplete".style(styles.warning_text),
                );
                for case_id in cases {
                    error!(target: NO_HEADING_TARGET, "    {}", case_id.style(styles.bold));
                }
                None
            }
            Self::NoCasesRecorded => {
                error!("no runner messages recorded any cases");
                None
            }
            Self::CasesFailed { failing, total } => {
                error!(
                    "{} of {} cases did not pass",
                    failing.style(styles.bold),
                    total.style(styles.bold)
                );
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
