/// Convenience result type used across splitcap.
pub type SplitcapResult<T> = Result<T, SplitcapError>;

/// Top-level error taxonomy used by capture and compositing APIs.
#[derive(thiserror::Error, Debug)]
pub enum SplitcapError {
    /// Invalid user-provided geometry or options.
    #[error("validation error: {0}")]
    Validation(String),

    /// The capture configuration cannot be honored (unknown display, bad option text).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Program creation failed, or a required attribute/uniform could not be resolved.
    #[error("graphics init error: {0}")]
    GraphicsInit(String),

    /// A transform with a zero-scale axis was about to be inverted or built.
    #[error("non-invertible transform: {0}")]
    NonInvertibleTransform(String),

    /// A GPU command failed while drawing. Fatal for the session.
    #[error("gpu error: {0}")]
    Gpu(String),

    /// The platform could not provide a display or destination surface.
    #[error("display error: {0}")]
    Display(String),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SplitcapError {
    /// Build a [`SplitcapError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SplitcapError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`SplitcapError::GraphicsInit`] value.
    pub fn graphics_init(msg: impl Into<String>) -> Self {
        Self::GraphicsInit(msg.into())
    }

    /// Build a [`SplitcapError::NonInvertibleTransform`] value.
    pub fn non_invertible(msg: impl Into<String>) -> Self {
        Self::NonInvertibleTransform(msg.into())
    }

    /// Build a [`SplitcapError::Gpu`] value.
    pub fn gpu(msg: impl Into<String>) -> Self {
        Self::Gpu(msg.into())
    }

    /// Build a [`SplitcapError::Display`] value.
    pub fn display(msg: impl Into<String>) -> Self {
        Self::Display(msg.into())
    }

    /// Build a [`SplitcapError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
