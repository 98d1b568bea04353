//! Utility functions for randomly generating explanation tables

use ndarray::{Array1, Array2};
use ndarray_rand::{
    rand::Rng,
    rand_distr::{Distribution, StandardNormal},
};
use pecluster::{Cell, Table, TargetType};

/// Numeric attributes of the generated raw dataset
pub const NUMERIC_FEATURES: [&str; 12] = [
    "age",
    "income",
    "tenure",
    "balance",
    "visits",
    "complaints",
    "discount",
    "products",
    "late_payments",
    "credit_score",
    "web_sessions",
    "calls",
];

/// Text attribute of the generated raw dataset
pub const TEXT_FEATURE: &str = "region";

const REGIONS: [&str; 3] = ["north", "south", "west"];

/// Number of segments the observations are drawn from
pub const N_SEGMENTS: usize = 3;

/// Names of every explained feature, numeric ones first
pub fn feature_names() -> Vec<&'static str> {
    NUMERIC_FEATURES
        .iter()
        .copied()
        .chain(std::iter::once(TEXT_FEATURE))
        .collect()
}

/// Mean strength of every feature per segment
///
/// Each segment is driven by four features, the remaining ones contribute little.
fn segment_profiles() -> Array2<f64> {
    let n_features = feature_names().len();
    let mut profiles = Array2::from_elem((N_SEGMENTS, n_features), 0.05);
    for segment in 0..N_SEGMENTS {
        for k in 0..4 {
            let feature = segment * 4 + k;
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            profiles[(segment, feature)] = sign * (1.0 - 0.25 * k as f64);
        }
    }
    profiles
}

/// Segment of every observation
pub fn segments(n_rows: usize, rng: &mut impl Rng) -> Array1<usize> {
    (0..n_rows).map(|_| rng.gen_range(0..N_SEGMENTS)).collect()
}

/// Generate an explanation table of `n_rows` observations with `n_reasons` reasons each, in the
/// layout of the given target type, together with the raw dataset it explains
///
/// Returns `(explanations, raw)`. `n_reasons` has to be at most the number of features (13).
pub fn explanations(
    target: TargetType,
    n_rows: usize,
    n_reasons: usize,
    rng: &mut impl Rng,
) -> (Table, Table) {
    let segments = segments(n_rows, rng);
    explanations_for_segments(target, &segments, n_reasons, rng)
}

/// Same as [`explanations`] with the segment of every observation given
pub fn explanations_for_segments(
    target: TargetType,
    segments: &Array1<usize>,
    n_reasons: usize,
    rng: &mut impl Rng,
) -> (Table, Table) {
    let names = feature_names();
    assert!(n_reasons <= names.len());

    let profiles = segment_profiles();
    let schema = target.schema();
    let mut explanations = Table::new(schema.header(n_reasons));
    let mut raw = Table::new(names.iter().copied());

    for (row_id, segment) in segments.iter().enumerate() {
        let values = raw_values(*segment, rng);
        let strengths = profiles.row(*segment).mapv(|mean| mean + 0.05 * noise(rng));

        // reasons are ranked by the magnitude of their strength
        let mut ranked = (0..names.len()).collect::<Vec<_>>();
        ranked.sort_by(|a, b| strengths[*b].abs().total_cmp(&strengths[*a].abs()));

        let score = strengths.sum();
        let mut row = vec![Cell::Number(row_id as f64)];
        match target {
            TargetType::Regression => row.push(Cell::Number(100.0 + 10.0 * score)),
            TargetType::Binary => {
                let positive = 1.0 / (1.0 + (-score).exp());
                row.push(Cell::Number(if positive >= 0.5 { 1.0 } else { 0.0 }));
                row.extend(vec![
                    Cell::Number(0.0),
                    Cell::Number(1.0 - positive),
                    Cell::Number(1.0),
                    Cell::Number(positive),
                ]);
            }
        }

        for feature in ranked.into_iter().take(n_reasons) {
            let strength = strengths[feature];
            row.extend(vec![
                Cell::Text(names[feature].to_string()),
                values[feature].clone(),
                Cell::Number(1.0),
                Cell::Text(qualitative(strength).to_string()),
                Cell::Number(strength),
            ]);
        }

        explanations
            .push_row(row)
            .expect("row follows the explanation header");
        raw.push_row(values).expect("row follows the raw header");
    }

    (explanations, raw)
}

fn raw_values(segment: usize, rng: &mut impl Rng) -> Vec<Cell> {
    let mut values = NUMERIC_FEATURES
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let mean = 10.0 * (i + 1) as f64 + 5.0 * segment as f64;
            Cell::Number(mean + noise(rng))
        })
        .collect::<Vec<_>>();
    values.push(Cell::Text(REGIONS[segment].to_string()));
    values
}

fn noise(rng: &mut impl Rng) -> f64 {
    StandardNormal.sample(rng)
}

fn qualitative(strength: f64) -> &'static str {
    match strength {
        x if x >= 0.5 => "+++",
        x if x >= 0.2 => "++",
        x if x >= 0.0 => "+",
        x if x > -0.2 => "-",
        x if x > -0.5 => "--",
        _ => "---",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_rand::rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn layout_follows_schema() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        for target in [TargetType::Regression, TargetType::Binary].iter() {
            let (explanations, raw) = explanations(*target, 20, 4, &mut rng);
            let schema = target.schema();

            assert_eq!(explanations.ncols(), schema.required_columns(4));
            assert!(schema.validate(&explanations, 4).is_ok());
            assert_eq!(raw.ncols(), feature_names().len());
            assert_eq!(raw.nrows(), 20);
        }
    }

    #[test]
    fn reasons_are_ranked() {
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let (explanations, _) = explanations(TargetType::Regression, 10, 5, &mut rng);
        let schema = TargetType::Regression.schema();

        for row in explanations.rows() {
            let strengths = schema
                .slots(5)
                .map(|slot| row[slot.strength].as_f64().unwrap().abs())
                .collect::<Vec<_>>();
            assert!(strengths.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn segments_are_driven_by_their_features() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let segments = Array1::from(vec![0, 1, 2]);
        let (explanations, _) =
            explanations_for_segments(TargetType::Binary, &segments, 1, &mut rng);
        let slot = TargetType::Binary.schema().slot(0);

        assert_eq!(explanations.cell(0, slot.name), &Cell::Text("age".into()));
        assert_eq!(explanations.cell(1, slot.name), &Cell::Text("visits".into()));
        assert_eq!(
            explanations.cell(2, slot.name),
            &Cell::Text("late_payments".into())
        );
    }
}
