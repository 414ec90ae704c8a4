//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// Return true if the given error was caused by a unique index violation.
///
/// Single inserts report this as a write error, batch inserts as a bulk
/// write failure, and writes inside a transaction may surface it as a
/// plain command error.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
        ErrorKind::BulkWrite(ref failure) => failure
            .write_errors
            .as_ref()
            .map(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY))
            .unwrap_or(false),
        ErrorKind::Command(ref e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// The batch position of the first insert refused by a unique index, when
/// the driver reports it.
pub fn duplicate_key_index(err: &DbError) -> Option<usize> {
    match *err.kind {
        ErrorKind::BulkWrite(ref failure) => failure
            .write_errors
            .as_ref()?
            .iter()
            .find(|e| e.code == DUPLICATE_KEY)
            .map(|e| e.index),
        _ => None,
    }
}
