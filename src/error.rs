use std::fmt;

/// An error that stops the score compiler on a specific source line.
///
/// Mirrors `error_check`/`trigger_error` from the original engine: every
/// compile-time failure is reported with a line number (or none, for
/// failures that are not tied to a single line) and is fatal.
#[derive(Debug)]
pub struct ScoreError {
    pub line_no: Option<usize>,
    pub message: String,
}

impl ScoreError {
    pub fn new(line_no: usize, message: impl Into<String>) -> Self {
        ScoreError {
            line_no: Some(line_no),
            message: message.into(),
        }
    }

    pub fn without_line(message: impl Into<String>) -> Self {
        ScoreError {
            line_no: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_no {
            Some(n) => write!(f, "line {}: {}", n, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ScoreError {}

/// Logs a non-fatal condition the way `warning()` did: a message, optionally
/// tied to a source line. Does not stop the caller.
pub fn warn(line_no: Option<usize>, message: impl fmt::Display) {
    match line_no {
        Some(n) => log::warn!("line {}: {}", n, message),
        None => log::warn!("{}", message),
    }
}

/// An error that prevents the player from starting at all: a missing MIDI
/// port, an unreadable voice table, a malformed config file.
#[derive(Debug)]
pub enum StartupError {
    Io { context: String, source: std::io::Error },
    Config { context: String, source: toml::de::Error },
    Midi { context: String, message: String },
    Score(ScoreError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Io { context, source } => write!(f, "{}: {}", context, source),
            StartupError::Config { context, source } => write!(f, "{}: {}", context, source),
            StartupError::Midi { context, message } => write!(f, "{}: {}", context, message),
            StartupError::Score(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::Io { source, .. } => Some(source),
            StartupError::Config { source, .. } => Some(source),
            StartupError::Midi { .. } => None,
            StartupError::Score(e) => Some(e),
        }
    }
}

impl From<ScoreError> for StartupError {
    fn from(e: ScoreError) -> Self {
        StartupError::Score(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_line_number_when_present() {
        let e = ScoreError::new(12, "unknown pitch name 'qx'");
        assert_eq!(e.to_string(), "line 12: unknown pitch name 'qx'");
    }

    #[test]
    fn displays_without_line_number() {
        let e = ScoreError::without_line("empty score");
        assert_eq!(e.to_string(), "empty score");
    }
}
