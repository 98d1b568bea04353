//! Feature-strength matrix
//!
//! Explanations name, for every observation, the features that contributed most to its
//! prediction together with their strength. Clustering needs a fixed set of dimensions instead,
//! so the reason slots are spread into one column per distinct feature name. A feature that is
//! not among the reasons of an observation gets a strength of zero.
use ndarray::{Array2, ArrayView1, ArrayView2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param_guard::{ParamGuard, TransformGuard};
use crate::schema::{ExplanationSchema, TargetType};
use crate::table::{Cell, Table};
use crate::traits::Transformer;

/// Largest number of reasons the platform computes per observation
pub const MAX_REASONS: usize = 10;

/// What to do with reason slots which carry no feature name
///
/// The platform may report fewer reasons than requested for some observations, the remaining
/// slots of those rows are empty.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlankNames {
    /// Ignore the slot
    Skip,
    /// Collect the strength of empty slots in a column with this name
    Bucket(String),
}

impl Default for BlankNames {
    fn default() -> Self {
        BlankNames::Skip
    }
}

/// One row per observation, one column per distinct feature name
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthMatrix {
    feature_names: Vec<String>,
    records: Array2<f64>,
}

impl StrengthMatrix {
    /// Reshaping parameters for explanations of the given target type
    ///
    /// Defaults to five reasons per observation and skipping empty slots.
    pub fn params(target: TargetType) -> StrengthParams {
        StrengthParams(StrengthValidParams {
            schema: target.schema(),
            n_reasons: 5,
            blank_names: BlankNames::Skip,
        })
    }

    /// Feature names in the order they were first seen
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn records(&self) -> ArrayView2<'_, f64> {
        self.records.view()
    }

    pub fn nrows(&self) -> usize {
        self.records.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.records.ncols()
    }

    /// Strength of a single feature across all observations
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.records.column(idx))
    }

    /// Number of cells with a non-zero strength
    pub fn count_nonzero(&self) -> usize {
        self.records.iter().filter(|x| **x != 0.0).count()
    }
}

/// Checked reshaping parameters
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthValidParams {
    schema: ExplanationSchema,
    n_reasons: usize,
    blank_names: BlankNames,
}

impl StrengthValidParams {
    pub fn schema(&self) -> &ExplanationSchema {
        &self.schema
    }

    pub fn n_reasons(&self) -> usize {
        self.n_reasons
    }

    pub fn blank_names(&self) -> &BlankNames {
        &self.blank_names
    }
}

/// Unchecked reshaping parameters
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthParams(StrengthValidParams);

impl StrengthParams {
    /// Set the number of reasons requested from the platform, between 1 and 10
    pub fn n_reasons(mut self, n_reasons: usize) -> Self {
        self.0.n_reasons = n_reasons;
        self
    }

    /// Set the policy for empty reason slots
    pub fn blank_names(mut self, blank_names: BlankNames) -> Self {
        self.0.blank_names = blank_names;
        self
    }
}

impl ParamGuard for StrengthParams {
    type Checked = StrengthValidParams;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.n_reasons == 0 || self.0.n_reasons > MAX_REASONS {
            Err(Error::Parameters(format!(
                "number of reasons must be between 1 and {}, got {}",
                MAX_REASONS, self.0.n_reasons
            )))
        } else if matches!(&self.0.blank_names, BlankNames::Bucket(name) if name.trim().is_empty())
        {
            Err(Error::Parameters(
                "bucket for empty reason slots needs a name".to_string(),
            ))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
impl TransformGuard for StrengthParams {}

impl<'a> Transformer<&'a Table, Result<StrengthMatrix>> for StrengthValidParams {
    /// Spread the reason slots of an explanation table into a feature-strength matrix
    ///
    /// Later reasons of the same feature in the same row overwrite earlier ones.
    fn transform(&self, explanations: &'a Table) -> Result<StrengthMatrix> {
        let slots = self.schema.validate(explanations, self.n_reasons)?;

        // resolve the feature name of every slot once, `None` marks skipped slots
        let mut feature_names: Vec<String> = Vec::new();
        let mut slot_columns = Vec::with_capacity(explanations.nrows());
        for row in explanations.rows() {
            let columns = slots
                .iter()
                .map(|slot| {
                    let name = match (&row[slot.name], &self.blank_names) {
                        (cell, BlankNames::Skip) if cell.is_blank() => return None,
                        (cell, BlankNames::Bucket(bucket)) if cell.is_blank() => bucket.clone(),
                        (cell, _) => cell.to_string(),
                    };
                    let idx = match feature_names.iter().position(|n| *n == name) {
                        Some(idx) => idx,
                        None => {
                            feature_names.push(name);
                            feature_names.len() - 1
                        }
                    };
                    Some(idx)
                })
                .collect::<Vec<_>>();
            slot_columns.push(columns);
        }

        let mut records = Array2::zeros((explanations.nrows(), feature_names.len()));
        for (row_idx, (row, columns)) in explanations.rows().zip(&slot_columns).enumerate() {
            for (slot, column) in slots.iter().zip(columns) {
                let column = match column {
                    Some(column) => *column,
                    None => continue,
                };
                let strength = match &row[slot.strength] {
                    Cell::Number(x) => *x,
                    // an empty slot collected in the bucket has nothing to add
                    Cell::Missing if row[slot.name].is_blank() => continue,
                    other => {
                        return Err(Error::NotNumeric {
                            column: explanations.columns()[slot.strength].clone(),
                            row: row_idx,
                            value: other.to_string(),
                        })
                    }
                };
                records[(row_idx, column)] = strength;
            }
        }

        Ok(StrengthMatrix {
            feature_names,
            records,
        })
    }
}
