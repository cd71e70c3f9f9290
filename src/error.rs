use thiserror::Error;

use crate::pager::MAX_PAGES;

/// Input errors: the statement text itself could not be parsed or validated.
/// The REPL reports these and keeps reading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrepareError {
    #[error("Syntax error. Could not parse statement.")]
    SyntaxError,
    #[error("ID must be positive.")]
    InvalidId,
    #[error("String is too long.")]
    StringTooLong,
    #[error("Unrecognized keyword at start of '{0}'.")]
    UnrecognizedStatement(String),
}

/// Execution errors: the statement was well-formed but failed at the
/// storage layer in a way the REPL can recover from.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecuteError {
    #[error("Error: Duplicate key.")]
    DuplicateKey,
}

/// Fatal conditions: corrupt file, I/O failure, an out-of-bounds page
/// index, or one of the unimplemented multi-level tree paths. None of
/// these are recoverable; the caller is expected to report and exit.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Db file is not a whole number of pages. Corrupt file.")]
    CorruptFile,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tried to fetch page number out of bounds. {0} >= {max}", max = MAX_PAGES)]
    PageOutOfBounds(u32),

    #[error("Tried to flush an unpopulated page: {0}")]
    FlushUnpopulatedPage(u32),

    #[error("Need to implement updating parent after split")]
    UnimplementedParentUpdate,
}

/// Result of executing a prepared statement: either an execution error
/// the REPL can report and continue past, or a fatal storage error.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
