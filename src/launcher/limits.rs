use std::num::NonZeroUsize;

/// Gate capacity used when no explicit limit is configured.
pub const DEFAULT_MAX_CONCURRENT_UNITS: usize = 200;

/// Concurrency limits applied by the launcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    /// The maximum number of unit bodies running at once.
    pub max_concurrent_units: Limit,
}

/// Defines the type of limit to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Limit {
    /// There is no limit.
    None,

    /// There is an upper limit.
    Max(NonZeroUsize),

    /// Use [`DEFAULT_MAX_CONCURRENT_UNITS`].
    #[default]
    Default,
}

impl From<usize> for Limit {
    fn from(value: usize) -> Self {
        NonZeroUsize::new(value).map(Limit::Max).unwrap_or(Limit::None)
    }
}

impl Limit {
    /// Gate capacity, or `None` when unbounded.
    pub fn resolve(self) -> Option<usize> {
        match self {
            Limit::None => None,
            Limit::Max(max) => Some(max.get()),
            Limit::Default => Some(DEFAULT_MAX_CONCURRENT_UNITS),
        }
    }
}

impl From<usize> for Limits {
    fn from(value: usize) -> Self {
        Limits {
            max_concurrent_units: value.into(),
        }
    }
}
