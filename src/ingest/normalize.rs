/// Legacy and misspelled state names, keyed by their title-cased form
const STATE_ALIASES: &[(&str, &str)] = &[
    ("Westbengal", "West Bengal"),
    ("Uttaranchal", "Uttarakhand"),
    ("Orissa", "Odisha"),
    (
        "The Dadra And Nagar Haveli And Daman And Diu",
        "Dadra and Nagar Haveli",
    ),
];

/// Trim and collapse internal runs of whitespace to one space
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;

    for c in raw.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }

    out
}

/// Canonical state name
pub fn normalize_state(raw: &str) -> String {
    let titled = title_case(&collapse_whitespace(raw));

    STATE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == titled)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(titled)
}

pub fn normalize_district(raw: &str) -> String {
    collapse_whitespace(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("uttar pradesh"), "Uttar Pradesh");
        assert_eq!(title_case("JAMMU & KASHMIR"), "Jammu & Kashmir");
        assert_eq!(title_case("andaman-nicobar"), "Andaman-Nicobar");
    }

    #[test]
    fn test_aliases() {
        assert_eq!(normalize_state("WESTBENGAL"), "West Bengal");
        assert_eq!(normalize_state("  west   bengal "), "West Bengal");
        assert_eq!(normalize_state("orissa"), "Odisha");
        assert_eq!(normalize_state("Uttaranchal"), "Uttarakhand");
        assert_eq!(
            normalize_state("The Dadra and Nagar Haveli and Daman and Diu"),
            "Dadra and Nagar Haveli"
        );
    }

    #[test]
    fn test_unknown_state_passes_through() {
        assert_eq!(normalize_state("kerala"), "Kerala");
    }

    #[test]
    fn test_district_keeps_case() {
        assert_eq!(normalize_district("  North  24 Parganas "), "North 24 Parganas");
    }
}
