/// Deterministic branch name for retiring `flag_id`.
///
/// `branch_name_for_flag("chore/remove-flag-", "legacyInbox")` →
/// `chore/remove-flag-legacy-inbox`.
pub fn branch_name_for_flag(prefix: &str, flag_id: &str) -> String {
    format!("{prefix}{}", kebab_case(flag_id))
}

/// Fill `{flag}` in the commit template.
pub fn commit_message(template: &str, flag_id: &str) -> String {
    template.replace("{flag}", flag_id)
}

/// camelCase / snake_case → kebab-case, dropping characters git refuses in
/// ref names.
pub fn kebab_case(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in id.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_lower_or_digit = true;
        } else {
            if !out.ends_with('-') && !out.is_empty() {
                out.push('-');
            }
            prev_lower_or_digit = false;
        }
    }
    out.trim_end_matches('-').to_string()
}
