use crate::error::Error;
use crate::Result;

/// Turns a display name into a Kubernetes-safe resource name
/// (lowercase alphanumerics and single dashes).
pub(crate) fn slugify_name(value: &str, field_name: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation_invalid_argument(
            field_name,
            format!("{} cannot be empty", field_name),
            None,
        ));
    }

    let mut out = String::new();
    let mut prev_was_dash = false;

    for ch in trimmed.chars() {
        let normalized = match ch {
            'a'..='z' | '0'..='9' => Some(ch),
            'A'..='Z' => Some(ch.to_ascii_lowercase()),
            _ if ch.is_whitespace() || ch == '_' || ch == '-' || ch == '.' => Some('-'),
            _ => None,
        };

        if let Some(c) = normalized {
            if c == '-' {
                if out.is_empty() || prev_was_dash {
                    continue;
                }
                out.push('-');
                prev_was_dash = true;
            } else {
                out.push(c);
                prev_was_dash = false;
            }
        }
    }

    while out.ends_with('-') {
        out.pop();
    }

    if out.is_empty() {
        return Err(Error::validation_invalid_argument(
            field_name,
            format!("{} must contain at least one letter or number", field_name),
            Some(value.to_string()),
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_collapses_separators() {
        assert_eq!(
            slugify_name("Sample  pipeline_v2", "name").unwrap(),
            "sample-pipeline-v2"
        );
    }

    #[test]
    fn slugify_trims_edge_dashes() {
        assert_eq!(slugify_name("--demo--", "name").unwrap(), "demo");
    }

    #[test]
    fn slugify_rejects_symbol_only_names() {
        let err = slugify_name("***", "name").unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }
}
