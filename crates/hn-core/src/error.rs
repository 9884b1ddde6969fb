use thiserror::Error;

pub type HnResult<T> = Result<T, HnError>;

#[derive(Error, Debug)]
pub enum HnError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown handle: {handle}")]
    UnknownHandle { handle: u64 },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}

impl HnError {
    /// Shorthand for invariant-check failures.
    pub fn invariant(what: impl Into<String>) -> Self {
        HnError::Invariant { what: what.into() }
    }
}
