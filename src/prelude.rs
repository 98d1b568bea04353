//! pecluster prelude.
//!
//! This module contains the most used types, type aliases, traits and
//! functions that you can import easily as a group.
//!

#[doc(no_inline)]
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use crate::traits::*;

#[doc(no_inline)]
pub use crate::param_guard::{ParamGuard, TransformGuard};

#[doc(no_inline)]
pub use crate::float::Float;

#[doc(no_inline)]
pub use crate::reshape::{BlankNames, StrengthMatrix};

#[doc(no_inline)]
pub use crate::schema::{ExplanationSchema, TargetType};

#[doc(no_inline)]
pub use crate::summary::{cluster_column_name, summarize, ClusterSummary};

#[doc(no_inline)]
pub use crate::table::{Cell, Table};
