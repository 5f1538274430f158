// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the storage seam.

pub mod storage;

pub use storage::{HealthStatus, StorageAdapter};
