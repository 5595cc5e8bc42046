#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    MissingFrame,
    DisplayUnavailable,
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    CellCount {
        expected: usize,
        found: usize,
    },
    WorkerSpawn(String),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFrame => f.write_str("no depth frame available for this notification"),
            Self::DisplayUnavailable => f.write_str("display is not accepting frames"),
            Self::DimensionMismatch { expected, found } => write!(
                f,
                "grid dimension mismatch (expected={}x{}, found={}x{})",
                expected.0, expected.1, found.0, found.1
            ),
            Self::CellCount { expected, found } => {
                write!(f, "grid cell count mismatch (expected={expected}, found={found})")
            }
            Self::WorkerSpawn(msg) => write!(f, "failed to start pipeline worker: {msg}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl FrameError {
    /// Recoverable errors only cost the current frame; the next notification
    /// starts over.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingFrame | Self::DisplayUnavailable)
    }
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        Self::WorkerSpawn(err.to_string())
    }
}
