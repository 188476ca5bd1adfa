use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Read one example per line, right-trimmed.
///
/// T5 tokenizers expect a leading space on every example, so
/// `leading_space` prepends one.
pub fn read_lines(path: &Path, leading_space: bool) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(text
        .lines()
        .map(|line| {
            let line = line.trim_end();
            if leading_space { format!(" {line}") } else { line.to_string() }
        })
        .collect())
}

/// Read examples and references, keeping the first `n_obs` of each when set.
pub fn read_pairs(
    input_path: &Path,
    reference_path: &Path,
    model_name: &str,
    n_obs: Option<usize>,
) -> Result<(Vec<String>, Vec<String>)> {
    let leading_space = model_name.contains("t5");
    let mut examples = read_lines(input_path, leading_space)?;
    let mut targets = read_lines(reference_path, leading_space)?;
    if let Some(n) = n_obs.filter(|&n| n > 0) {
        examples.truncate(n);
        targets.truncate(n);
    }
    Ok((examples, targets))
}
