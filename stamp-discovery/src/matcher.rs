//! Template filename classification.
//!
//! A filename matches matcher `m` when it contains the exact segment `.m.`
//! (middle form, `config.m.toml` → `config.toml`) or ends with `.m` (end
//! form, `Dockerfile.m` → `Dockerfile`). Partial segments never match:
//! `test.stamping.txt` is not a template for matcher `stamp`.

/// A successful classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The matcher that fired.
    pub matcher: String,
    /// Output filename, in the same directory as the template.
    pub output_name: String,
}

/// Classify a bare filename against `matchers`, first hit wins.
pub fn classify(file_name: &str, matchers: &[String]) -> Option<Match> {
    matchers.iter().find_map(|m| {
        classify_one(file_name, m).map(|output_name| Match {
            matcher: m.clone(),
            output_name,
        })
    })
}

/// Filename with its `old` matcher segment swapped for `new`, or `None` when
/// `file_name` is not a template for `old`.
pub fn rename_matcher(file_name: &str, old: &str, new: &str) -> Option<String> {
    classify_one(file_name, old)?;
    let middle = format!(".{old}.");
    if let Some(idx) = file_name.rfind(&middle) {
        let (prefix, rest) = file_name.split_at(idx);
        Some(format!("{prefix}.{new}.{}", &rest[middle.len()..]))
    } else {
        let stem = file_name.strip_suffix(&format!(".{old}"))?;
        Some(format!("{stem}.{new}"))
    }
}

fn classify_one(file_name: &str, matcher: &str) -> Option<String> {
    let middle = format!(".{matcher}.");
    let output = if let Some(idx) = file_name.rfind(&middle) {
        let (prefix, rest) = file_name.split_at(idx);
        format!("{prefix}.{}", &rest[middle.len()..])
    } else {
        file_name.strip_suffix(&format!(".{matcher}"))?.to_string()
    };

    if output.is_empty() || output == "." {
        None
    } else {
        Some(output)
    }
}
