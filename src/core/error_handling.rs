//! Generic error handling utilities
//!
//! Provides unified error reporting that works across the error types of the
//! different modules while keeping user-facing output short.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// # Implementation Consistency
/// When `is_user_actionable()` returns `true`, `user_message()` should return
/// `Some(message)` with a helpful, actionable message. When it returns `false`,
/// `user_message()` should return `None`.
pub trait ContextualError: std::error::Error {
    /// True if this error carries a specific message that should be shown
    /// directly to the user
    ///
    /// Examples of user-actionable errors:
    /// - Duplicate or unknown queue names in a topology
    /// - Invalid values in a topology file
    ///
    /// Examples of system errors:
    /// - IO failures
    /// - Poisoned locks
    /// - The OS refusing to spawn a worker thread
    fn is_user_actionable(&self) -> bool;

    /// The user message if this is a user-actionable error
    fn user_message(&self) -> Option<String>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// - User-actionable errors show their specific message
/// - System errors show the operation context, with details at debug level
///
/// # Examples
/// ```rust,no_run
/// # use handoff::core::error_handling::log_error_with_context;
/// # use handoff::system::SystemError;
/// let err = SystemError::configuration("queue 'main' already exists");
/// log_error_with_context(&err, "Building topology");
/// // Logs: "FATAL: queue 'main' already exists"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => {
            log::error!("FATAL: {}", user_msg);
        }
        _ => {
            log::error!("FATAL: {}", operation_context);
        }
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
