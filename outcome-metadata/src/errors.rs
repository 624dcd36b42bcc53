// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{error, fmt};

/// An error that occurs while reading a stream of runner messages.
#[derive(Debug)]
pub enum MessageStreamError {
    /// Reading from the underlying stream failed.
    Read(std::io::Error),

    /// A line could not be parsed as a [`RunnerMessage`](crate::RunnerMessage).
    Parse {
        /// The 1-based line number within the stream.
        line: usize,

        /// The underlying JSON error.
        err: serde_json::Error,
    },
}

impl fmt::Display for MessageStreamError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Read(_) => write!(f, "reading runner messages failed"),
            Self::Parse { line, .. } => {
                write!(f, "parsing runner message on line {line} failed")
            }
        }
    }
}

impl error::Error for MessageStreamError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Read(err) => Some(err),
            Self::Parse { err, .. } => Some(err),
        }
    }
}

/// An error returned while parsing a [`CaseClassification`](crate::CaseClassification) from a
/// string.
#[derive(Clone, Debug)]
pub struct ClassificationParseError {
    input: String,
}

impl ClassificationParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

impl fmt::Display for ClassificationParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "unrecognized classification: {}\n(known values: {})",
            self.input,
            crate::CaseClassification::variants().join(", ")
        )
    }
}

impl error::Error for ClassificationParseError {}
