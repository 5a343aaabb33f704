// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Offline dataset ingestion
//!
//! Reads the two source tables (primary county profile table and the
//! worst-risk-cluster table) and joins them into one ordered record
//! collection. Column names are fixed contract strings.

mod loader;
mod records;

pub use loader::{load_records, load_risk_rows};
pub use records::{apply_risk_join, CountyRecord, RiskAnnotation, RiskRow};
