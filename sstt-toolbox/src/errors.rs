use std::fmt;
use std::io;
use thiserror::Error as ThisError;

/// Which of the two header sections an error was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Experiment,
    Channel,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Section::Experiment => write!(f, "experiment"),
            Section::Channel => write!(f, "channel"),
        }
    }
}

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("File {0} does not exist.")]
    FileNotAvailable(String),
    #[error("IO error.")]
    IOError(#[from] io::Error),
    #[error("A different field variant was expected.")]
    WrongFieldVariant,
    #[error("{0}")]
    InvalidHeader(String),
    #[error("{section} header, line {line}: {reason}")]
    Format {
        section: Section,
        line: usize,
        reason: String,
    },
    #[error("channel header, line {line}: no ChannelID column")]
    MissingChannelIdColumn { line: usize },
    #[error("channel {channel}: CorrespondingPulsesChannel must name another channel present in the dataset")]
    BadPulsesReference {
        channel: i32,
        reference: Option<i32>,
    },
    #[error("{0}")]
    InvalidInput(String),
}
