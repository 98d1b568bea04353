//! Provide traits for the different steps of the segmentation pipeline
//!

/// Transformation step
///
/// A transformer takes its input by value or reference and returns a new representation of the
/// same observations. Both the projection and the clustering step are transformers: they keep
/// the number and the order of the rows they receive.
pub trait Transformer<R, T> {
    fn transform(&self, x: R) -> T;
}
