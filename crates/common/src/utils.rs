//! Utility functions for EnviroLLM
//!
//! Small helpers shared across the workspace: display rounding and response
//! preview truncation.

/// Rounds a value to one decimal place
///
/// # Examples
///
/// ```
/// use common::utils::round1;
///
/// assert_eq!(round1(90.04), 90.0);
/// assert_eq!(round1(12.35), 12.3);
/// ```
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rounds a value to two decimal places
///
/// # Examples
///
/// ```
/// use common::utils::round2;
///
/// assert_eq!(round2(0.025), 0.03);
/// ```
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Truncates text to a character budget, appending an ellipsis when cut
///
/// Operates on characters rather than bytes so multi-byte text never splits
/// mid-codepoint.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut preview: String = text.chars().take(max_chars).collect();
        preview.push_str("...");
        preview
    }
}
