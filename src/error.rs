use std::fmt;

/// Errors specific to the external sort core that callers may want to
/// distinguish from a generic I/O failure wrapped in [`anyhow::Error`].
#[derive(Debug)]
pub enum SortError {
    /// A single line did not fit inside the window buffer and no newline
    /// was found before the buffer filled up.
    LineTooLong { capacity: usize },
    /// The buffered reader could not estimate a line length because the
    /// input has no body past the header - including the case where the
    /// input has fewer physical lines than the configured header count.
    /// Carries whatever header lines were captured before this was
    /// discovered, so the driver can still emit them (§8's "empty body"
    /// and "fewer than H lines" boundary behaviours are a successful
    /// zero-run sort, not a fatal error - see §4.6.3's zero-run fast
    /// path).
    EmptyBody { header_lines: Vec<Vec<u8>> },
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortError::LineTooLong { capacity } => {
                write!(f, "line exceeds window buffer capacity of {capacity} bytes")
            }
            SortError::EmptyBody { .. } => {
                write!(f, "can't estimate line length: input has no body")
            }
        }
    }
}

impl std::error::Error for SortError {}
