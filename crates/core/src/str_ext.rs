//! Extension traits for `str` conversions.
//!
//! Configuration values and JSON request fields both arrive as strings where
//! "empty" means "not set", and several settings are comma-separated lists.

/// Extension trait for `str` to handle empty-as-none and list semantics.
pub trait StrExt {
    /// Returns `Some(String)` if non-empty, `None` if empty.
    #[must_use]
    fn to_opt(&self) -> Option<String>;

    /// Splits a comma-separated list, trimming entries and dropping empty ones.
    #[must_use]
    fn split_list(&self) -> Vec<String>;
}

impl StrExt for str {
    #[inline]
    fn to_opt(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }

    fn split_list(&self) -> Vec<String> {
        self.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Extension trait for optional string settings.
pub trait OptionStrExt {
    /// Drops the value when it is an empty string.
    #[must_use]
    fn non_empty(self) -> Option<String>;
}

impl OptionStrExt for Option<String> {
    #[inline]
    fn non_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}
