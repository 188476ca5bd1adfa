//! Task prefixes prepended to source examples before tokenization.

/// Prepend `prefix` to every example of a chunk.
pub fn apply_prefix<S: AsRef<str>>(prefix: &str, examples: &[S]) -> Vec<String> {
    examples
        .iter()
        .map(|example| format!("{prefix}{}", example.as_ref()))
        .collect()
}

/// Pick the prefix for a run.
///
/// An explicit override wins, even when empty. Otherwise the model's task
/// default is used, and an absent default means no prefix.
pub fn resolve_prefix(explicit: Option<&str>, task_default: Option<String>) -> String {
    match explicit {
        Some(prefix) => prefix.to_string(),
        None => task_default.unwrap_or_default(),
    }
}
