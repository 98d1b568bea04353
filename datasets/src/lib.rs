//! `pecluster-datasets` provides synthetic data ready to be used in tests, benches and examples.
//!
//! ## The Big Picture
//!
//! Real explanations come from a remote platform, which is neither available nor reproducible in
//! a test. The [`generate`] module produces explanation tables in the platform's layout together
//! with the raw dataset they explain. Observations are drawn from a few segments, each driven by
//! its own set of features, so that a clustering of the explanations has something to find.
//!
//! ## Using a dataset
//!
//! ```
//! use pecluster::TargetType;
//! use pecluster_datasets::generate;
//! use rand::SeedableRng;
//! use rand_xoshiro::Xoshiro256Plus;
//!
//! let mut rng = Xoshiro256Plus::seed_from_u64(42);
//! let (explanations, raw) = generate::explanations(TargetType::Binary, 100, 5, &mut rng);
//!
//! assert_eq!(explanations.nrows(), 100);
//! assert_eq!(explanations.ncols(), 31);
//! assert_eq!(raw.nrows(), 100);
//! ```

pub mod generate;
