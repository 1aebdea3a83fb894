//! Engine-wide null handling semantics.
//!
//! The mode is consulted every time a count is derived, never captured when an
//! accumulator is created. Switching the mode between aggregation and reading
//! changes the result of the read.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use dcount_error::{DcountError, Result};
use tracing::warn;

/// Environment variable used to initialize the process-wide mode.
///
/// Accepts `true`/`false` (use default value for null) or a mode name.
pub const USE_DEFAULT_VALUE_FOR_NULL_ENV: &str = "DCOUNT_USE_DEFAULT_VALUE_FOR_NULL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NullHandling {
    /// Nulls are replaced with default values, a null dictionary entry counts
    /// as a distinct value like any other.
    #[default]
    DefaultValue,
    /// Nulls are real nulls and are never counted.
    ExplicitNull,
}

impl NullHandling {
    pub const fn from_use_default_value(use_default: bool) -> Self {
        if use_default {
            Self::DefaultValue
        } else {
            Self::ExplicitNull
        }
    }

    pub const fn uses_default_value(&self) -> bool {
        matches!(self, Self::DefaultValue)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultValue => "default_value",
            Self::ExplicitNull => "explicit_null",
        }
    }

    /// Parse the mode from an optional environment value, falling back to the
    /// default mode if unset or invalid.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(value) => match value.parse() {
                Ok(mode) => mode,
                Err(e) => {
                    warn!(
                        %e,
                        env = USE_DEFAULT_VALUE_FOR_NULL_ENV,
                        "ignoring invalid null handling"
                    );
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }
}

impl fmt::Display for NullHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NullHandling {
    type Err = DcountError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default_value" | "default" | "true" => Ok(Self::DefaultValue),
            "explicit_null" | "sql" | "false" => Ok(Self::ExplicitNull),
            _ => Err(DcountError::new("Invalid null handling mode").with_field("value", s)),
        }
    }
}

/// Capability for reading the current null handling mode.
pub trait NullHandlingSource {
    fn current_mode(&self) -> NullHandling;
}

impl NullHandlingSource for NullHandling {
    fn current_mode(&self) -> NullHandling {
        *self
    }
}

impl<S: NullHandlingSource + ?Sized> NullHandlingSource for &S {
    fn current_mode(&self) -> NullHandling {
        (**self).current_mode()
    }
}

/// A null handling mode that can be switched at runtime.
#[derive(Debug)]
pub struct AtomicNullHandling {
    explicit_null: AtomicBool,
}

impl AtomicNullHandling {
    pub const fn new(mode: NullHandling) -> Self {
        AtomicNullHandling {
            explicit_null: AtomicBool::new(!mode.uses_default_value()),
        }
    }

    pub fn set(&self, mode: NullHandling) {
        self.explicit_null
            .store(!mode.uses_default_value(), Ordering::Relaxed);
    }
}

impl NullHandlingSource for AtomicNullHandling {
    fn current_mode(&self) -> NullHandling {
        NullHandling::from_use_default_value(!self.explicit_null.load(Ordering::Relaxed))
    }
}

/// Process-wide null handling mode.
pub static GLOBAL_NULL_HANDLING: LazyLock<AtomicNullHandling> = LazyLock::new(|| {
    let value = std::env::var(USE_DEFAULT_VALUE_FOR_NULL_ENV).ok();
    AtomicNullHandling::new(NullHandling::from_env_value(value.as_deref()))
});
