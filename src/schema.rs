//! Layout of the explanation table
//!
//! The platform returns explanations as a wide table. A few leading columns describe the
//! prediction itself (`row_id`, `prediction` and, for binary targets, the label and probability
//! of both classes) and are followed by one group of [`SLOT_WIDTH`] columns per reason:
//!
//! | offset | column                                |
//! |--------|---------------------------------------|
//! | 0      | `explanation_{i}_feature`             |
//! | 1      | `explanation_{i}_feature_value`       |
//! | 2      | `explanation_{i}_label`               |
//! | 3      | `explanation_{i}_qualitative_strength`|
//! | 4      | `explanation_{i}_strength`            |
//!
//! [`ExplanationSchema`] names this layout per target type instead of hard-coding column
//! positions, and checks the header names so that a change of the table shape fails loudly.
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::Table;

/// Number of columns describing a single reason
pub const SLOT_WIDTH: usize = 5;

const SLOT_FIELDS: [&str; SLOT_WIDTH] = [
    "feature",
    "feature_value",
    "label",
    "qualitative_strength",
    "strength",
];

/// Target type of the platform project
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    Regression,
    Binary,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Regression => "Regression",
            TargetType::Binary => "Binary",
        }
    }

    /// Explanation table layout produced for this target type
    pub fn schema(self) -> ExplanationSchema {
        ExplanationSchema::for_target(self)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Regression" => Ok(TargetType::Regression),
            "Binary" => Ok(TargetType::Binary),
            other => Err(Error::UnsupportedTarget(other.to_string())),
        }
    }
}

/// Column positions of a single reason
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasonSlot {
    pub name: usize,
    pub strength: usize,
}

/// Descriptor of the explanation table layout for one target type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationSchema {
    target: TargetType,
    leading: Vec<String>,
    name_offset: usize,
    strength_offset: usize,
}

impl ExplanationSchema {
    pub fn for_target(target: TargetType) -> ExplanationSchema {
        let mut leading = vec!["row_id".to_string(), "prediction".to_string()];
        if target == TargetType::Binary {
            for class in 0..2 {
                leading.push(format!("class_{}_label", class));
                leading.push(format!("class_{}_probability", class));
            }
        }

        ExplanationSchema {
            target,
            leading,
            name_offset: 0,
            strength_offset: 4,
        }
    }

    pub fn target(&self) -> TargetType {
        self.target
    }

    /// Names of the columns preceding the first reason
    pub fn leading_columns(&self) -> &[String] {
        &self.leading
    }

    /// Position of the first reason column, 2 for regression and 6 for binary targets
    pub fn offset(&self) -> usize {
        self.leading.len()
    }

    pub fn slot(&self, reason: usize) -> ReasonSlot {
        let start = self.offset() + reason * SLOT_WIDTH;
        ReasonSlot {
            name: start + self.name_offset,
            strength: start + self.strength_offset,
        }
    }

    pub fn slots(&self, n_reasons: usize) -> impl Iterator<Item = ReasonSlot> + '_ {
        (0..n_reasons).map(move |i| self.slot(i))
    }

    /// Minimal number of columns a table with `n_reasons` reasons has
    pub fn required_columns(&self, n_reasons: usize) -> usize {
        self.offset() + n_reasons * SLOT_WIDTH
    }

    /// Full header of a table with `n_reasons` reasons
    pub fn header(&self, n_reasons: usize) -> Vec<String> {
        let mut header = self.leading.clone();
        for i in 0..n_reasons {
            header.extend(
                SLOT_FIELDS
                    .iter()
                    .map(|field| format!("explanation_{}_{}", i, field)),
            );
        }
        header
    }

    /// Check that `table` follows this layout for `n_reasons` reasons and return the slots
    pub fn validate(&self, table: &Table, n_reasons: usize) -> Result<Vec<ReasonSlot>> {
        let required = self.required_columns(n_reasons);
        if table.ncols() < required {
            return Err(Error::MissingColumns {
                target: self.target.to_string(),
                n_reasons,
                required,
                found: table.ncols(),
            });
        }

        let columns = table.columns();
        let expect = |position: usize, expected: String| {
            if columns[position] == expected {
                Ok(())
            } else {
                Err(Error::SchemaMismatch {
                    position,
                    expected,
                    found: columns[position].clone(),
                })
            }
        };

        for (i, slot) in self.slots(n_reasons).enumerate() {
            expect(slot.name, format!("explanation_{}_feature", i))?;
            expect(slot.strength, format!("explanation_{}_strength", i))?;
        }

        Ok(self.slots(n_reasons).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_target_type() {
        assert_eq!(TargetType::Regression.schema().offset(), 2);
        assert_eq!(TargetType::Binary.schema().offset(), 6);

        let schema = TargetType::Binary.schema();
        assert_eq!(schema.slot(0), ReasonSlot { name: 6, strength: 10 });
        assert_eq!(schema.slot(2), ReasonSlot { name: 16, strength: 20 });
        assert_eq!(schema.required_columns(5), 31);
    }

    #[test]
    fn header_matches_slots() {
        let schema = TargetType::Regression.schema();
        let header = schema.header(3);

        assert_eq!(header.len(), schema.required_columns(3));
        for (i, slot) in schema.slots(3).enumerate() {
            assert_eq!(header[slot.name], format!("explanation_{}_feature", i));
            assert_eq!(header[slot.strength], format!("explanation_{}_strength", i));
        }
    }

    #[test]
    fn parse_target_type() {
        assert_eq!("Binary".parse::<TargetType>().unwrap(), TargetType::Binary);
        assert!(matches!(
            "Multiclass".parse::<TargetType>(),
            Err(Error::UnsupportedTarget(_))
        ));
    }

    #[test]
    fn validate_rejects_short_tables() {
        let schema = TargetType::Binary.schema();
        let table = Table::new(schema.header(2));

        assert!(schema.validate(&table, 2).is_ok());
        assert!(matches!(
            schema.validate(&table, 3),
            Err(Error::MissingColumns {
                required: 21,
                found: 16,
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_shifted_layout() {
        // a binary table read with the regression layout
        let table = Table::new(TargetType::Binary.schema().header(1));
        let res = TargetType::Regression.schema().validate(&table, 1);

        assert!(matches!(res, Err(Error::SchemaMismatch { position: 2, .. })));
    }
}
