//! Error types for bitcorder

use thiserror::Error;

/// Result type alias using BitcorderError
pub type Result<T> = std::result::Result<T, BitcorderError>;

/// Main error type for bitcorder operations
#[derive(Debug, Error)]
pub enum BitcorderError {
    /// Invalid command line or config file value
    #[error("Configuration error: {0}")]
    Config(String),

    /// GStreamer runtime error (init, state change, bus error)
    #[error("GStreamer error: {0}")]
    Gstreamer(String),

    /// Element factory not installed
    #[error("Element not available: {0}")]
    ElementMissing(String),

    /// Two elements could not be linked
    #[error("Link error: {0}")]
    Link(String),

    /// Property missing or value rejected by an element
    #[error("Property error: {0}")]
    Property(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BitcorderError>,
    },
}

impl BitcorderError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a GStreamer error
    pub fn gstreamer(msg: impl Into<String>) -> Self {
        Self::Gstreamer(msg.into())
    }

    /// Create a link error
    pub fn link(msg: impl Into<String>) -> Self {
        Self::Link(msg.into())
    }

    /// Create a property error
    pub fn property(msg: impl Into<String>) -> Self {
        Self::Property(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Hint shown to the user alongside the error, if there is one
    pub fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Run `bitcorder --help` for the sub-option syntax, or check config.toml"),
            Self::ElementMissing(_) => {
                Some("Install the GStreamer plugin sets (base, good, bad, ugly, libav, vaapi)")
            }
            Self::Link(_) => Some("Run with GST_DEBUG=3 to see the caps negotiation failure"),
            Self::WithContext { source, .. } => source.user_hint(),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

// Conversions from external error types

impl From<gstreamer::glib::Error> for BitcorderError {
    fn from(err: gstreamer::glib::Error) -> Self {
        Self::Gstreamer(err.to_string())
    }
}

impl From<gstreamer::glib::BoolError> for BitcorderError {
    fn from(err: gstreamer::glib::BoolError) -> Self {
        Self::Gstreamer(err.to_string())
    }
}

impl From<gstreamer::StateChangeError> for BitcorderError {
    fn from(err: gstreamer::StateChangeError) -> Self {
        Self::Gstreamer(format!("state change failed: {}", err))
    }
}
