// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! County profile rendering
//!
//! Turns one structured county record into the fixed-template paragraph that
//! gets embedded and retrieved. Pure string building: deterministic, no I/O,
//! byte-identical output for identical input.

use std::fmt::Write;

use crate::dataset::CountyRecord;

/// Render a missing numeric value as the literal placeholder.
///
/// Sections keep their shape even when a county has gaps in the source data,
/// which keeps profile texts structurally comparable for embedding.
fn num(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "N/A".to_string(),
    }
}

/// Build the profile text for one county record.
///
/// The risk alert, when the record carries a risk annotation, is the first
/// content line after the header so high-risk counties surface prominently
/// in retrieval. Optional environmental/policy context sections are appended
/// only when present.
pub fn render_profile(record: &CountyRecord) -> String {
    let mut text = String::new();

    let _ = writeln!(
        text,
        "Comprehensive Profile for {}, {}:",
        record.county, record.state
    );

    if let Some(risk) = &record.risk {
        let _ = writeln!(
            text,
            "!!! ALERT: This county is identified as a Highest Composite Health Risk area (Cluster {}).",
            risk.cluster
        );
        let _ = writeln!(text, "- Composite Health Risk Score: {}.", risk.composite_risk);
    }

    let _ = writeln!(
        text,
        "- Demographics: Population: {}, Poverty Rate: {}%, Median Income: ${}.",
        num(record.population),
        num(record.poverty_rate),
        num(record.median_income)
    );
    let _ = writeln!(
        text,
        "- Health Outcomes: Adult Obesity Rate: {}%, Adult Diabetes Rate: {}%.",
        num(record.obesity_rate),
        num(record.diabetes_rate)
    );
    let _ = writeln!(
        text,
        "- Food Environment: {} grocery stores per 1k residents, {} farmers markets. Fast food density: {}/1k residents.",
        num(record.grocery_per_1000),
        num(record.farmers_markets),
        num(record.fast_food_per_1000)
    );
    let _ = writeln!(
        text,
        "- Food Security: Food insecurity: {}%. {}% of pop. has low food access.",
        num(record.food_insecurity),
        num(record.low_access_pct)
    );
    let _ = writeln!(
        text,
        "- Physical Activity: Gym density: {}/1k residents.",
        num(record.gyms_per_1000)
    );

    if let Some(description) = &record.description {
        let _ = writeln!(text, "- Environmental Context: {}", description);
    }
    if let Some(rule) = &record.rule_description {
        let _ = writeln!(text, "- Policy Context: {}", rule);
    }

    text
}
