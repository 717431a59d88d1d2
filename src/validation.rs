//! Field normalization and format checks shared by the record schemas.

/// Normalize a resource noun to its classified form: singular, capitalized,
/// compound words camel-cased (`parties` -> `Party`, `focal_people` stays
/// regular: `focal_persons` -> `FocalPerson`).
pub fn classify(value: &str) -> String {
    let mut words: Vec<String> = value
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect();

    // only the last word carries the plural
    if let Some(last) = words.last_mut() {
        *last = singularize(last);
    }

    words.iter().map(|word| capitalize(word)).collect()
}

/// Reduce a plural English noun to singular form. Handles the regular
/// suffixes used by resource names; irregular nouns pass through unchanged.
fn singularize(word: &str) -> String {
    if word.len() > 3 && word.ends_with("ies") {
        format!("{}y", &word[..word.len() - 3])
    } else if word.len() > 2
        && (word.ends_with("ches")
            || word.ends_with("shes")
            || word.ends_with("xes")
            || word.ends_with("zes")
            || word.ends_with("sses"))
    {
        word[..word.len() - 2].to_string()
    } else if word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Check that a value looks like an email address: one `@`, non-empty local
/// part, dotted domain, no whitespace.
pub fn is_valid_email(value: &str) -> bool {
    let mut parts = value.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return false,
    };

    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if value.chars().any(|c| c.is_whitespace()) {
        return false;
    }

    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Check that a value looks like a mobile phone number: an optional leading
/// `+`, then 7 to 15 digits with the usual separators.
pub fn is_valid_mobile(value: &str) -> bool {
    let value = value.trim();
    let value = value.strip_prefix('+').unwrap_or(value);

    let mut digits = 0usize;
    for c in value.chars() {
        if c.is_ascii_digit() {
            digits += 1;
        } else if !matches!(c, ' ' | '(' | ')' | '-' | '.' | 'x') {
            return false;
        }
    }

    (7..=15).contains(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_plurals() {
        assert_eq!(classify("parties"), "Party");
        assert_eq!(classify("party"), "Party");
        assert_eq!(classify("roles"), "Role");
        assert_eq!(classify("Permission"), "Permission");
        assert_eq!(classify("addresses"), "Address");
        assert_eq!(classify("boxes"), "Box");
    }

    #[test]
    fn test_classify_compound() {
        assert_eq!(classify("focal_persons"), "FocalPerson");
        assert_eq!(classify("incident commands"), "IncidentCommand");
    }

    #[test]
    fn test_classify_edge_cases() {
        assert_eq!(classify(""), "");
        assert_eq!(classify("class"), "Class");
        assert_eq!(classify("TASKS"), "Task");
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("arely.kuvalis@gmail.com"));
        assert!(is_valid_email("john.juma@acme.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@gmail.com"));
        assert!(!is_valid_email("@gmail.com"));
        assert!(!is_valid_email("juma@localhost"));
        assert!(!is_valid_email("ju ma@gmail.com"));
    }

    #[test]
    fn test_mobile() {
        assert!(is_valid_mobile("255765222333"));
        assert!(is_valid_mobile("(943) 902-6124"));
        assert!(is_valid_mobile("+255 715 222 333"));
        assert!(is_valid_mobile("945.952.6154 x857"));
        assert!(!is_valid_mobile("12345"));
        assert!(!is_valid_mobile("call me maybe"));
        assert!(!is_valid_mobile(""));
    }
}
