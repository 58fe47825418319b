//! Application-level error type.
//!
//! Every failure in the binary funnels into [`AppError`], which pairs a short
//! human-readable message with the process exit code. Exit code conventions:
//!
//! - `2` — bad input or configuration (files, schemas, CLI values, unknown record ids)
//! - `3` — data that cannot be fitted (empty or degenerate observation sets)
//! - `4` — numerical failure inside the solver or plotting math

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Bad input or configuration (exit code 2).
    pub fn input(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Unusable data (exit code 3).
    pub fn data(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Numerical failure (exit code 4).
    pub fn numeric(message: impl Into<String>) -> Self {
        Self::new(4, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
