/// Result alias that carries the custom [`EqError`] type.
pub type Result<T> = std::result::Result<T, EqError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum EqError {
    /// The engine, a partition or a resampling request was configured in a way
    /// that can never produce meaningful output. Raised at construction time or
    /// at the very start of a call and never recovered internally.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// A caller supplied buffer is too short (or, for the spectrum, not exactly
    /// the configured length). No partial computation takes place.
    #[error("{what} must hold {expected} values but was {actual}")]
    InputSize {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Failure reported by the FFT backend.
    #[error("fft failed: {0}")]
    Fft(#[from] realfft::FftError),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// WAV decoding failures.
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    /// Malformed JSON configuration or recording output.
    #[error("config file: {0}")]
    ConfigFile(#[from] serde_json::Error),
    /// A renderer refused a frame.
    #[error("render: {0}")]
    Render(String),
}

impl EqError {
    /// Creates a configuration error that wraps the provided message.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a render error that wraps the provided message.
    pub fn render<T: Into<String>>(msg: T) -> Self {
        Self::Render(msg.into())
    }

    pub(crate) fn input_size(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::InputSize {
            what,
            expected,
            actual,
        }
    }
}
