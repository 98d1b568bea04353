use std::error::Error;

use crate::traits::Transformer;

/// A set of hyperparameters whose values have not been checked for validity. A reference to the
/// checked hyperparameters can only be obtained after checking has completed. If the
/// `Transformer` trait has been implemented on the checked hyperparameters, it will also be
/// implemented on the unchecked hyperparameters with the checking step done automatically.
///
/// The hyperparameter validation done in `check_ref()` and `check()` should be identical.
pub trait ParamGuard {
    /// The checked hyperparameters
    type Checked;
    /// Error type resulting from failed hyperparameter checking
    type Error: Error;

    /// Checks the hyperparameters and returns a reference to the checked hyperparameters if
    /// successful
    fn check_ref(&self) -> Result<&Self::Checked, Self::Error>;

    /// Checks the hyperparameters and returns the checked hyperparameters if successful
    fn check(self) -> Result<Self::Checked, Self::Error>;

    /// Calls `check()` and unwraps the result
    fn check_unwrap(self) -> Self::Checked
    where
        Self: Sized,
    {
        self.check().unwrap()
    }
}

/// Performs the checking step and calls `transform` on the checked hyperparameters. The checking
/// error is converted into the error type of the checked transformer and returned.
pub trait TransformGuard: ParamGuard {}

impl<R, T, E, P> Transformer<R, Result<T, E>> for P
where
    P: TransformGuard,
    P::Checked: Transformer<R, Result<T, E>>,
    E: Error + From<P::Error>,
{
    fn transform(&self, x: R) -> Result<T, E> {
        self.check_ref()?.transform(x)
    }
}
