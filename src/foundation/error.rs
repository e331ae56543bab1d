/// Convenience result type used across storyreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by compositor APIs.
///
/// Per-scene image failures (`ImageLoad`) are absorbed by the sequencer and
/// never abort a compose pass; every other variant is fatal to the pass that
/// produced it.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// No scenes were supplied; nothing was rendered.
    #[error("no scenes supplied")]
    EmptyInput,

    /// A scene image could not be resolved or decoded (non-fatal per scene).
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// No candidate codec/container pair is supported by the runtime.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// The encoder process or its capture pipes could not be acquired.
    #[error("capture acquisition error: {0}")]
    CaptureAcquisition(String),

    /// The encoder failed after startup; in-progress output is discarded.
    #[error("encoder error: {0}")]
    Encoder(String),

    /// A failure inside the frame loop not covered by another class.
    #[error("render error: {0}")]
    Render(String),

    /// Invalid user-provided configuration or scene data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::ImageLoad`] value.
    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    /// Build a [`ReelError::UnsupportedEncoding`] value.
    pub fn unsupported_encoding(msg: impl Into<String>) -> Self {
        Self::UnsupportedEncoding(msg.into())
    }

    /// Build a [`ReelError::CaptureAcquisition`] value.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::CaptureAcquisition(msg.into())
    }

    /// Build a [`ReelError::Encoder`] value.
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Build a [`ReelError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_class_prefix() {
        assert_eq!(
            ReelError::encoder("pipe closed").to_string(),
            "encoder error: pipe closed"
        );
        assert_eq!(ReelError::EmptyInput.to_string(), "no scenes supplied");
    }

    #[test]
    fn anyhow_errors_wrap_transparently() {
        let e: ReelError = anyhow::anyhow!("disk gone").into();
        assert_eq!(e.to_string(), "disk gone");
    }
}
