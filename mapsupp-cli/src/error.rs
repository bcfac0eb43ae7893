//! CLI error handling with user-friendly messages.
//!
//! Centralizes error reporting: the message, the causal trace underneath it,
//! an extra hint for setup problems, and the nonzero exit.

use std::error::Error;
use std::fmt;
use std::process;

use mapsupp::pipeline::PipelineError;
use mapsupp::tool::ToolError;

/// CLI-level errors.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    Logging(String),
    /// The pipeline (or its setup) failed
    Pipeline(PipelineError),
}

impl CliError {
    /// Print the error with its causal trace and exit nonzero.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        let mut cause = self.source();
        while let Some(error) = cause {
            eprintln!("  caused by: {}", error);
            cause = error.source();
        }

        if let CliError::Pipeline(PipelineError::Tool(ToolError::MissingCompatibilityLayer {
            command,
            ..
        })) = self
        {
            eprintln!();
            eprintln!(
                "Install {command} through your package manager and run mapsupp again."
            );
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Logging(message) => write!(f, "failed to initialize logging: {message}"),
            CliError::Pipeline(error) => write!(f, "{error}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            // The pipeline message is already the displayed one; start the
            // trace at its cause to avoid printing it twice.
            CliError::Pipeline(error) => error.source(),
            CliError::Logging(_) => None,
        }
    }
}
