// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::records::{apply_risk_join, CountyRecord, RiskAnnotation, RiskRow};

/// One row of the primary county profile table.
///
/// Column names are the fixed contract strings of the source dataset; empty
/// cells deserialize to `None`.
#[derive(Debug, Deserialize)]
struct ProfileCsvRow {
    #[serde(rename = "County")]
    county: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Population", default)]
    population: Option<f64>,
    #[serde(rename = "Poverty_Rate", default)]
    poverty_rate: Option<f64>,
    #[serde(rename = "Median_Income", default)]
    median_income: Option<f64>,
    #[serde(rename = "Adult_Obesity_Rate13", default)]
    obesity_rate: Option<f64>,
    #[serde(rename = "Adult_Diabetes_Rate13", default)]
    diabetes_rate: Option<f64>,
    #[serde(rename = "Grocery_Stores_Per1000", default)]
    grocery_per_1000: Option<f64>,
    #[serde(rename = "Farmers_Markets_Count_16", default)]
    farmers_markets: Option<f64>,
    #[serde(rename = "FOODINSEC_13_15", default)]
    food_insecurity: Option<f64>,
    #[serde(rename = "PCT_LACCESS_POP15", default)]
    low_access_pct: Option<f64>,
    #[serde(rename = "FFRPTH14", default)]
    fast_food_per_1000: Option<f64>,
    #[serde(rename = "GYMs_Per_1000_Count_14", default)]
    gyms_per_1000: Option<f64>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Rule_Description", default)]
    rule_description: Option<String>,
}

/// One row of the worst-risk-cluster table
#[derive(Debug, Deserialize)]
struct RiskCsvRow {
    #[serde(rename = "County")]
    county: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "composite_risk")]
    composite_risk: f64,
    #[serde(rename = "Cluster")]
    cluster: i64,
}

impl From<ProfileCsvRow> for CountyRecord {
    fn from(row: ProfileCsvRow) -> Self {
        CountyRecord {
            county: row.county,
            state: row.state,
            population: row.population,
            poverty_rate: row.poverty_rate,
            median_income: row.median_income,
            obesity_rate: row.obesity_rate,
            diabetes_rate: row.diabetes_rate,
            grocery_per_1000: row.grocery_per_1000,
            farmers_markets: row.farmers_markets,
            food_insecurity: row.food_insecurity,
            low_access_pct: row.low_access_pct,
            fast_food_per_1000: row.fast_food_per_1000,
            gyms_per_1000: row.gyms_per_1000,
            description: row.description,
            rule_description: row.rule_description,
            risk: None,
        }
    }
}

/// Load the worst-risk-cluster table
pub fn load_risk_rows(path: &Path) -> Result<Vec<RiskRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open risk table {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<RiskCsvRow>().enumerate() {
        let row = result.with_context(|| {
            format!("Malformed risk row {} in {}", line + 1, path.display())
        })?;
        rows.push(RiskRow {
            county: row.county,
            state: row.state,
            annotation: RiskAnnotation {
                composite_risk: row.composite_risk,
                cluster: row.cluster,
            },
        });
    }
    Ok(rows)
}

/// Load the primary table and, when a risk table is given, left-join its
/// annotations in. Row order follows the primary table exactly.
pub fn load_records(profiles_path: &Path, risk_path: Option<&Path>) -> Result<Vec<CountyRecord>> {
    let mut reader = csv::Reader::from_path(profiles_path)
        .with_context(|| format!("Failed to open profile table {}", profiles_path.display()))?;

    let mut records = Vec::new();
    for (line, result) in reader.deserialize::<ProfileCsvRow>().enumerate() {
        let row = result.with_context(|| {
            format!(
                "Malformed profile row {} in {}",
                line + 1,
                profiles_path.display()
            )
        })?;
        records.push(CountyRecord::from(row));
    }

    if let Some(risk_path) = risk_path {
        let risk_rows = load_risk_rows(risk_path)?;
        apply_risk_join(&mut records, risk_rows);
    }

    Ok(records)
}
