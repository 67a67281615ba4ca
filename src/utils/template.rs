//! String template rendering utilities.

use regex::Regex;

pub struct TemplateVars;

impl TemplateVars {
    pub const VERSION: &'static str = "version";
}

pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

/// Placeholders that look like `{{key}}` but will not be substituted by
/// [`render`]: differently cased or padded with whitespace.
pub fn near_misses(template: &str, key: &str) -> Vec<String> {
    let re = Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid");
    let exact = format!("{{{{{}}}}}", key);
    let mut found: Vec<String> = Vec::new();
    for cap in re.captures_iter(template) {
        let token = cap[0].to_string();
        if cap[1].eq_ignore_ascii_case(key) && token != exact && !found.contains(&token) {
            found.push(token);
        }
    }
    found
}
