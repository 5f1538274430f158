// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod entries;
pub mod users;

use rusqlite::Row;
use rusqlite::types::{FromSqlError, ValueRef};

/// Read a byte column that may hold a BLOB or, for legacy rows, TEXT.
pub(crate) fn bytes_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<u8>> {
    match row.get_ref(idx)? {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Ok(bytes.to_vec()),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            other.data_type(),
            Box::new(FromSqlError::InvalidType),
        )),
    }
}
