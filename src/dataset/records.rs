// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashMap;

/// Risk-cluster annotation merged in from the worst-cluster table
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAnnotation {
    pub composite_risk: f64,
    pub cluster: i64,
}

/// One row of the worst-cluster table, keyed by (county, state)
#[derive(Debug, Clone)]
pub struct RiskRow {
    pub county: String,
    pub state: String,
    pub annotation: RiskAnnotation,
}

/// One structured county record, after the join
///
/// Numeric fields are `None` when the source cell is empty; the profile
/// builder renders those as a literal "N/A". The risk annotation is `None`
/// for counties absent from the risk table (left-join semantics).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountyRecord {
    pub county: String,
    pub state: String,
    pub population: Option<f64>,
    pub poverty_rate: Option<f64>,
    pub median_income: Option<f64>,
    pub obesity_rate: Option<f64>,
    pub diabetes_rate: Option<f64>,
    pub grocery_per_1000: Option<f64>,
    pub farmers_markets: Option<f64>,
    pub food_insecurity: Option<f64>,
    pub low_access_pct: Option<f64>,
    pub fast_food_per_1000: Option<f64>,
    pub gyms_per_1000: Option<f64>,
    pub description: Option<String>,
    pub rule_description: Option<String>,
    pub risk: Option<RiskAnnotation>,
}

fn join_key(county: &str, state: &str) -> (String, String) {
    (county.trim().to_string(), state.trim().to_string())
}

/// Left join of the primary records with the risk table on (county, state).
///
/// Primary order is preserved and no rows are added or dropped: records with
/// no risk match keep their position with `risk` left as `None`. If the risk
/// table lists the same key twice, the first row wins so the output length
/// always equals the input length.
pub fn apply_risk_join(records: &mut [CountyRecord], risk_rows: Vec<RiskRow>) {
    let mut by_key: HashMap<(String, String), RiskAnnotation> =
        HashMap::with_capacity(risk_rows.len());
    for row in risk_rows {
        by_key
            .entry(join_key(&row.county, &row.state))
            .or_insert(row.annotation);
    }

    for record in records.iter_mut() {
        record.risk = by_key.get(&join_key(&record.county, &record.state)).cloned();
    }
}
