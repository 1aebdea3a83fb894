//! Error type shared across the workspace.
//!
//! Errors only surface at setup boundaries (parsing settings, building
//! dictionaries, validating bucket ranges, reading input). The aggregation hot
//! path never produces them.

use std::error::Error;
use std::fmt;

pub type Result<T, E = DcountError> = std::result::Result<T, E>;

#[derive(Debug)]
pub struct DcountError {
    inner: Box<DcountErrorInner>,
}

#[derive(Debug)]
struct DcountErrorInner {
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
    /// Extra context, rendered in insertion order.
    fields: Vec<(&'static str, String)>,
}

impl DcountError {
    pub fn new(msg: impl Into<String>) -> Self {
        DcountError {
            inner: Box::new(DcountErrorInner {
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let mut err = Self::new(msg);
        err.inner.source = Some(source);
        err
    }

    /// Attach a key/value pair to the error.
    pub fn with_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.inner.fields.push((key, value.to_string()));
        self
    }

    pub fn get_msg(&self) -> &str {
        &self.inner.msg
    }

    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.inner
            .fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for DcountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;

        if !self.inner.fields.is_empty() {
            write!(f, " (")?;
            for (idx, (key, value)) in self.inner.fields.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}: {value}")?;
            }
            write!(f, ")")?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, ": {source}")?;
        }

        Ok(())
    }
}

impl Error for DcountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<std::io::Error> for DcountError {
    fn from(value: std::io::Error) -> Self {
        DcountError::with_source("IO error", Box::new(value))
    }
}

/// Add context to an error result.
pub trait ResultExt<T> {
    fn context(self, msg: &'static str) -> Result<T>;
    fn context_fn<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| DcountError::with_source(msg, Box::new(e)))
    }

    fn context_fn<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| DcountError::with_source(f(), Box::new(e)))
    }
}
