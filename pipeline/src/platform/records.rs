use pecluster::{Cell, Table, TargetType};
use serde::Deserialize;
use serde_json::Value;

/// One page of computed explanations
#[derive(Debug, Clone, Deserialize)]
pub struct ExplanationPage {
    /// Link to the following page, if any
    pub next: Option<String>,
    pub data: Vec<ExplanationRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRecord {
    pub row_id: usize,
    pub prediction: Value,
    #[serde(default)]
    pub prediction_values: Vec<PredictionValue>,
    #[serde(default)]
    pub prediction_explanations: Vec<Reason>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionValue {
    pub label: Value,
    pub value: f64,
}

/// A single ranked reason of a prediction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reason {
    pub label: Value,
    pub feature: String,
    pub feature_value: Value,
    pub strength: f64,
    pub qualitative_strength: String,
}

fn cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Missing,
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Missing),
        Value::String(s) => Cell::parse(s),
        other => Cell::Text(other.to_string()),
    }
}

impl ExplanationRecord {
    /// Flatten into a row of the explanation table, rows with fewer reasons are padded with
    /// missing cells
    pub fn to_row(&self, target: TargetType, max_explanations: usize) -> Vec<Cell> {
        let schema = target.schema();
        let mut row = Vec::with_capacity(schema.required_columns(max_explanations));
        row.push(Cell::Number(self.row_id as f64));
        row.push(cell(&self.prediction));

        if target == TargetType::Binary {
            for class in 0..2 {
                match self.prediction_values.get(class) {
                    Some(value) => {
                        row.push(cell(&value.label));
                        row.push(Cell::Number(value.value));
                    }
                    None => row.extend(vec![Cell::Missing, Cell::Missing]),
                }
            }
        }

        for idx in 0..max_explanations {
            match self.prediction_explanations.get(idx) {
                Some(reason) => row.extend(vec![
                    Cell::Text(reason.feature.clone()),
                    cell(&reason.feature_value),
                    cell(&reason.label),
                    Cell::Text(reason.qualitative_strength.clone()),
                    Cell::Number(reason.strength),
                ]),
                None => row.extend((0..pecluster::schema::SLOT_WIDTH).map(|_| Cell::Missing)),
            }
        }
        row
    }
}

/// Flatten explanation records into the tabular layout of `target`
pub(crate) fn records_to_table(
    records: &[ExplanationRecord],
    target: TargetType,
    max_explanations: usize,
) -> pecluster::Result<Table> {
    let rows = records
        .iter()
        .map(|record| record.to_row(target, max_explanations))
        .collect();
    Table::from_rows(target.schema().header(max_explanations), rows)
}
