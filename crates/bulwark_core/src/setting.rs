//! Tri-state configuration values.
//!
//! Every per-client or per-endpoint knob is a [`Setting`]: it either defers to
//! the enclosing layer, explicitly turns the feature off, or supplies a value.
//! Merging always lets a non-`Inherit` override win.

use serde::{Deserialize, Deserializer};

/// A configuration value that may be inherited, disabled, or set.
///
/// # Examples
///
/// ```
/// use bulwark_core::Setting;
///
/// let client = Setting::Value(3);
/// assert_eq!(Setting::merge(&client, &Setting::Inherit), Setting::Value(3));
/// assert_eq!(Setting::merge(&client, &Setting::Disabled), Setting::Disabled);
/// assert_eq!(Setting::merge(&client, &Setting::Value(5)), Setting::Value(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting<T> {
    /// Defer to the enclosing layer
    Inherit,
    /// Explicitly turned off
    Disabled,
    /// Explicitly set
    Value(T),
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Setting::Inherit
    }
}

impl<T: Clone> Setting<T> {
    /// Combines a base layer with an override layer.
    pub fn merge(base: &Setting<T>, over: &Setting<T>) -> Setting<T> {
        match over {
            Setting::Inherit => base.clone(),
            other => other.clone(),
        }
    }

    /// Returns `self` unless it is `Inherit`, in which case `fallback` applies.
    pub fn or(&self, fallback: &Setting<T>) -> Setting<T> {
        Setting::merge(fallback, self)
    }
}

impl<T> Setting<T> {
    /// The value, if one is set.
    pub fn value(&self) -> Option<&T> {
        match self {
            Setting::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes the setting, yielding the value if one is set.
    pub fn into_value(self) -> Option<T> {
        match self {
            Setting::Value(value) => Some(value),
            _ => None,
        }
    }

    /// True for `Inherit`.
    pub fn is_inherit(&self) -> bool {
        matches!(self, Setting::Inherit)
    }

    /// True for `Disabled`.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Setting::Disabled)
    }

    /// Maps the contained value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Setting<U> {
        match self {
            Setting::Inherit => Setting::Inherit,
            Setting::Disabled => Setting::Disabled,
            Setting::Value(value) => Setting::Value(f(value)),
        }
    }
}

impl<T> From<T> for Setting<T> {
    fn from(value: T) -> Self {
        Setting::Value(value)
    }
}

/// Reads `"disabled"` / `"inherit"` keywords, otherwise a plain value.
///
/// Fields absent from a file should carry `#[serde(default)]` so they land on
/// `Inherit`.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "lowercase")]
        enum Keyword {
            Disabled,
            Inherit,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw<V> {
            Keyword(Keyword),
            Value(V),
        }

        Ok(match Raw::<T>::deserialize(deserializer)? {
            Raw::Keyword(Keyword::Disabled) => Setting::Disabled,
            Raw::Keyword(Keyword::Inherit) => Setting::Inherit,
            Raw::Value(value) => Setting::Value(value),
        })
    }
}
