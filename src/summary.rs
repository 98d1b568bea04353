//! Per-cluster summary
//!
//! Two views of every cluster are put side by side: the mean explanation strength of every
//! feature, which tells why the model scored the cluster the way it did, and the mean raw value of
//! every attribute, which tells what the observations of the cluster look like. Both views carry
//! the mean prediction score as an extra row.
use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, Axis};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::reshape::StrengthMatrix;
use crate::table::{Cell, Table};

/// Suffix of the mean explanation strength columns
pub const EXPLANATION_SUFFIX: &str = "_expl_mean";
/// Suffix of the mean raw value columns
pub const ACTUAL_SUFFIX: &str = "_actual_mean";

/// Row appended to the strength view with the mean prediction score
pub const PREDICTED_SCORE: &str = "predicted_score";
/// Row appended to the raw value view with the mean prediction score
pub const PREDICTED: &str = "predicted";

const CLUSTERS: &str = "clusters";

/// Column name of a cluster, noise (`-1`) is called `Noise` and every other label `cluster_{label}`
///
/// ```
/// use pecluster::summary::cluster_column_name;
///
/// assert_eq!(cluster_column_name(-1, "_expl_mean"), "Noise_expl_mean");
/// assert_eq!(cluster_column_name(3, ""), "cluster_3");
/// ```
pub fn cluster_column_name(label: i32, suffix: &str) -> String {
    if label == -1 {
        format!("Noise{}", suffix)
    } else {
        format!("cluster_{}{}", label, suffix)
    }
}

/// Mean of every attribute per cluster label, labels in ascending order
#[derive(Debug, Clone, PartialEq)]
struct GroupMeans {
    attributes: Vec<String>,
    labels: Vec<i32>,
    // (attributes, labels)
    means: Array2<Option<f64>>,
}

impl GroupMeans {
    /// Group the rows of `columns` by `labels`, missing values are left out of the mean
    fn compute(
        attributes: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
        labels: ArrayView1<i32>,
    ) -> GroupMeans {
        let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (row, label) in labels.iter().enumerate() {
            groups.entry(*label).or_default().push(row);
        }

        let mut means = Array2::from_elem((attributes.len(), groups.len()), None);
        for (attr, column) in columns.iter().enumerate() {
            for (group, rows) in groups.values().enumerate() {
                let (sum, count) = rows
                    .iter()
                    .filter_map(|row| column[*row])
                    .fold((0.0, 0usize), |(sum, count), x| (sum + x, count + 1));
                if count > 0 {
                    means[(attr, group)] = Some(sum / count as f64);
                }
            }
        }

        GroupMeans {
            attributes,
            labels: groups.keys().copied().collect(),
            means,
        }
    }

    fn column_names(&self, suffix: &str) -> impl Iterator<Item = String> + '_ {
        let suffix = suffix.to_string();
        self.labels
            .iter()
            .map(move |label| cluster_column_name(*label, &suffix))
    }
}

/// Mean explanation strength and mean raw value of every attribute per cluster
///
/// Rows are the attributes of the raw dataset followed by the mean prediction score, columns are
/// the `_actual_mean` columns of every cluster followed by the `_expl_mean` columns. Attributes
/// which never appeared among the reasons have no strength.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    attributes: Vec<String>,
    columns: Vec<String>,
    values: Array2<Option<f64>>,
}

impl ClusterSummary {
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<Option<f64>> {
        &self.values
    }

    /// Value at the given attribute and column, `None` if either is unknown or the value is
    /// missing
    pub fn get(&self, attribute: &str, column: &str) -> Option<f64> {
        let row = self.attributes.iter().position(|a| a == attribute)?;
        let col = self.columns.iter().position(|c| c == column)?;
        self.values[(row, col)]
    }

    /// Convert into a table with the attribute names in the first column
    pub fn to_table(&self) -> Table {
        let mut header = vec![String::new()];
        header.extend(self.columns.iter().cloned());

        let mut table = Table::new(header);
        for (attribute, values) in self.attributes.iter().zip(self.values.axis_iter(Axis(0))) {
            let mut row = vec![Cell::Text(attribute.clone())];
            row.extend(values.iter().map(|x| Cell::from(*x)));
            // widths match by construction
            let _ = table.push_row(row);
        }
        table
    }
}

/// Summarize explanation strengths and raw values by cluster
///
/// All inputs are matched by row position, so they need the same number of rows. Only numeric
/// columns of `raw` are averaged, raw columns called `clusters` or `predicted` are replaced by the
/// labels and the predictions.
pub fn summarize(
    strengths: &StrengthMatrix,
    predictions: ArrayView1<f64>,
    raw: &Table,
    labels: ArrayView1<i32>,
) -> Result<ClusterSummary> {
    let nrows = labels.len();
    let check = |name: &'static str, rows: usize| {
        if rows == nrows {
            Ok(())
        } else {
            Err(Error::RowMismatch {
                left: "labels",
                left_rows: nrows,
                right: name,
                right_rows: rows,
            })
        }
    };
    check("strength matrix", strengths.nrows())?;
    check("predictions", predictions.len())?;
    check("raw data", raw.nrows())?;

    // explanation strength view
    let mut attributes = strengths.feature_names().to_vec();
    attributes.push(PREDICTED_SCORE.to_string());
    let mut columns = strengths
        .records()
        .axis_iter(Axis(1))
        .map(|col| col.iter().map(|x| Some(*x)).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    columns.push(predictions.iter().map(|x| Some(*x)).collect());
    let explained = GroupMeans::compute(attributes, columns, labels);

    // raw value view
    let mut attributes = Vec::new();
    let mut columns = Vec::new();
    for (idx, name) in raw.columns().iter().enumerate() {
        if name == CLUSTERS || name == PREDICTED || !raw.is_numeric(idx) {
            continue;
        }
        attributes.push(name.clone());
        columns.push(raw.rows().map(|row| row[idx].as_f64()).collect());
    }
    attributes.push(PREDICTED.to_string());
    columns.push(predictions.iter().map(|x| Some(*x)).collect());
    let actual = GroupMeans::compute(attributes, columns, labels);

    // left join on the attribute, keeping every raw attribute
    let mut header = actual.column_names(ACTUAL_SUFFIX).collect::<Vec<_>>();
    header.extend(explained.column_names(EXPLANATION_SUFFIX));

    let n_actual = actual.labels.len();
    let mut values = Array2::from_elem((actual.attributes.len(), header.len()), None);
    for (row, attribute) in actual.attributes.iter().enumerate() {
        values
            .slice_mut(ndarray::s![row, ..n_actual])
            .assign(&actual.means.row(row));
        if let Some(expl_row) = explained.attributes.iter().position(|a| a == attribute) {
            values
                .slice_mut(ndarray::s![row, n_actual..])
                .assign(&explained.means.row(expl_row));
        }
    }

    Ok(ClusterSummary {
        attributes: actual.attributes,
        columns: header,
        values,
    })
}
