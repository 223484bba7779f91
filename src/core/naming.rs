//! Identifier derivation shared by the parser and the renderers.
//!
//! Every generated artifact cross-references the others by name, so these
//! functions must be deterministic and total: same input, same output, for
//! any printable string.

/// Upper bound on generated method-name length.
const MAX_METHOD_NAME_LEN: usize = 36;

/// Convert free text to kebab-case: camelCase boundaries become hyphens,
/// whitespace/underscores/punctuation collapse to single hyphens, output is
/// lowercased. Idempotent.
pub fn to_kebab_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev_lower = false;
    let mut pending_sep = false;

    for ch in input.chars() {
        if !ch.is_alphanumeric() {
            // Separators and stray punctuation both act as word breaks.
            pending_sep = !out.is_empty();
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            pending_sep = true;
        }
        if pending_sep {
            out.push('-');
            pending_sep = false;
        }
        for lower in ch.to_lowercase() {
            out.push(lower);
        }
        prev_lower = ch.is_lowercase() || ch.is_numeric();
    }

    out
}

/// Convert free text to PascalCase by splitting on hyphen/underscore/space
/// and capitalizing the first character of each segment. Idempotent.
pub fn to_pascal_case(input: &str) -> String {
    segments(input)
        .iter()
        .map(|seg| capitalize(seg))
        .collect::<Vec<_>>()
        .join("")
}

/// Like [`to_pascal_case`] but the very first character is lowercased.
pub fn to_camel_case(input: &str) -> String {
    let pascal = to_pascal_case(input);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => pascal,
    }
}

/// Derive a method name from step text: non-alphanumerics stripped,
/// whitespace collapsed, first token lowercased, subsequent tokens
/// capitalized, bounded to [`MAX_METHOD_NAME_LEN`] characters.
pub fn to_method_name(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut out = String::new();
    for (i, token) in cleaned.split_whitespace().enumerate() {
        if i == 0 {
            out.extend(token.chars().flat_map(|c| c.to_lowercase()));
        } else {
            out.push_str(&capitalize(token));
        }
    }

    out.chars().take(MAX_METHOD_NAME_LEN).collect()
}

fn segments(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_handles_camel_boundaries_and_separators() {
        assert_eq!(to_kebab_case("LoginPage"), "login-page");
        assert_eq!(to_kebab_case("employee  profile_view"), "employee-profile-view");
        assert_eq!(to_kebab_case("Add New Employee!"), "add-new-employee");
        assert_eq!(to_kebab_case(""), "");
    }

    #[test]
    fn kebab_is_idempotent() {
        for input in ["LoginPage", "add-new-employee", "Payroll (CFC) Run", "  spaced  out "] {
            let once = to_kebab_case(input);
            assert_eq!(to_kebab_case(&once), once);
        }
    }

    #[test]
    fn pascal_and_camel_split_on_separators() {
        assert_eq!(to_pascal_case("login-page"), "LoginPage");
        assert_eq!(to_pascal_case("employee_profile view"), "EmployeeProfileView");
        assert_eq!(to_camel_case("login-page"), "loginPage");
        assert_eq!(to_camel_case("Verify Dashboard"), "verifyDashboard");
    }

    #[test]
    fn pascal_and_camel_are_idempotent() {
        for input in ["login-page", "LoginPage", "verify dashboard totals"] {
            let pascal = to_pascal_case(input);
            assert_eq!(to_pascal_case(&pascal), pascal);
            let camel = to_camel_case(input);
            assert_eq!(to_camel_case(&camel), camel);
        }
    }

    #[test]
    fn method_name_lowercases_first_token_and_caps_rest() {
        assert_eq!(
            to_method_name("clicks \"Submit\" button"),
            "clicksSubmitButton"
        );
        assert_eq!(to_method_name("Verify totals match"), "verifyTotalsMatch");
    }

    #[test]
    fn method_name_is_bounded() {
        let long = "verifies the quarterly payroll reconciliation summary totals match expectations";
        let name = to_method_name(long);
        assert!(name.len() <= 36);
        assert!(name.starts_with("verifies"));
    }

    #[test]
    fn method_name_of_empty_input_is_empty() {
        assert_eq!(to_method_name(""), "");
        assert_eq!(to_method_name("!!!"), "");
    }
}
