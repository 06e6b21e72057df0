//! Batch Module - Table scoring
//!
//! Uploaded table in, same table plus one prediction column out.
//!
//! ## Rules:
//! 1. Required columns are checked before any row is touched; a missing
//!    column rejects the whole table under every policy
//! 2. Output row count always equals input row count
//! 3. `strict` aborts on the first bad row (1-based row number), no output
//! 4. `lenient` leaves the prediction empty for bad rows and explains why
//!    in an `error` column

pub mod table;


use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::ERROR_COLUMN;
use crate::error::ServingResult;
use crate::logic::context::ModelBundle;
use crate::logic::features::FeatureMatrix;

pub use table::{Table, TableRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    #[default]
    Strict,
    Lenient,
}

impl BatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchPolicy::Strict => "strict",
            BatchPolicy::Lenient => "lenient",
        }
    }
}

impl fmt::Display for BatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(BatchPolicy::Strict),
            "lenient" => Ok(BatchPolicy::Lenient),
            other => Err(format!("unknown batch policy '{}' (expected strict or lenient)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub table: Table,
    pub rows_scored: usize,
    pub rows_failed: usize,
}

/// Score every row of `table` and append the formatted prediction column
pub fn score_table(
    bundle: &ModelBundle,
    mut table: Table,
    policy: BatchPolicy,
    locale: &str,
) -> ServingResult<BatchOutcome> {
    let aligner = bundle.aligner();
    aligner.check_columns(table.headers())?;

    let catalog = bundle.catalog();
    let formatter = bundle.formatter();
    let n_rows = table.len();

    let mut predictions = vec![String::new(); n_rows];
    let mut errors: Vec<Option<String>> = vec![None; n_rows];

    {
        let views = table.row_views();
        let (scored_rows, aligned): (Vec<usize>, Vec<Vec<f64>>) = match policy {
            BatchPolicy::Strict => {
                let aligned = views
                    .iter()
                    .enumerate()
                    .map(|(i, row)| aligner.align_row(i + 1, row))
                    .collect::<Result<Vec<_>, _>>()?;
                ((0..n_rows).collect(), aligned)
            }
            BatchPolicy::Lenient => {
                let mut scored_rows = Vec::with_capacity(n_rows);
                let mut aligned = Vec::with_capacity(n_rows);
                for (i, row) in views.iter().enumerate() {
                    match aligner.align_row(i + 1, row) {
                        Ok(values) => {
                            scored_rows.push(i);
                            aligned.push(values);
                        }
                        Err(e) => {
                            log::warn!("[{}] skipping {}", bundle.name(), e);
                            errors[i] = Some(e.root().to_string());
                        }
                    }
                }
                (scored_rows, aligned)
            }
        };

        if !aligned.is_empty() {
            let matrix = FeatureMatrix::from_rows(bundle.layout(), aligned);
            let outputs = bundle.predict_matrix(&matrix)?;

            for (&i, &value) in scored_rows.iter().zip(&outputs) {
                match formatter.cell(value, catalog, locale) {
                    Ok(cell) => predictions[i] = cell,
                    Err(e) if policy == BatchPolicy::Lenient => {
                        log::warn!("[{}] row {}: {}", bundle.name(), i + 1, e);
                        errors[i] = Some(e.to_string());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    let rows_failed = errors.iter().filter(|e| e.is_some()).count();
    let rows_scored = n_rows - rows_failed;

    table.set_column(bundle.output_column(), predictions);
    if policy == BatchPolicy::Lenient {
        table.set_column(ERROR_COLUMN, errors.into_iter().map(Option::unwrap_or_default).collect());
    }

    log::info!(
        "[{}] batch scored {} of {} rows ({} policy)",
        bundle.name(),
        rows_scored,
        n_rows,
        policy
    );

    Ok(BatchOutcome { table, rows_scored, rows_failed })
}
