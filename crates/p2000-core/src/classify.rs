// ── Alert text classification ──
//
// Postal-code extraction, message cleanup, and priority flagging over the
// free text of an alert. All patterns compile once.

use std::sync::LazyLock;

use regex::Regex;

static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[1-9][0-9]{3}[A-Z]{2}").expect("postal code pattern"));

/// Letter pairs that never follow the digits of a Dutch postal code.
const EXCLUDED_POSTAL_SUFFIXES: [&str; 3] = ["SA", "SD", "SS"];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s)\s+").expect("whitespace pattern"));

static MAJOR_INCIDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:grip|vos|opschaling)\b").expect("major incident pattern")
});

static INCIDENT_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:middel|grote|groot|peleton|zeer grote)\b").expect("incident size pattern")
});

static INCIDENT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:brand|waterongeval|duik)\b").expect("incident type pattern")
});

/// First Dutch postal code (`1234AB`) in `text`.
///
/// Candidates whose letters are `SA`, `SD`, or `SS` are skipped and the
/// scan continues after them.
pub fn find_postal_code(text: &str) -> Option<&str> {
    let mut start = 0;
    while let Some(found) = POSTAL_CODE.find_at(text, start) {
        let code = found.as_str();
        if !EXCLUDED_POSTAL_SUFFIXES.iter().any(|s| code.ends_with(s)) {
            return Some(code);
        }
        // Candidates start with an ASCII digit, so +1 stays on a char boundary.
        start = found.start() + 1;
    }
    None
}

/// Remove every verbatim occurrence of `parts` from `message` and
/// normalize whitespace. Running it twice changes nothing.
pub fn clean_message(message: &str, parts: &[&str]) -> String {
    let mut cleaned = message.to_owned();
    for part in parts.iter().filter(|p| !p.is_empty()) {
        if cleaned.contains(part) {
            cleaned = cleaned.replace(part, "");
        }
    }
    WHITESPACE_RUN.replace_all(&cleaned, "$1").trim().to_owned()
}

/// Whether an alert message describes a priority incident.
///
/// Priority means a major-incident keyword (GRIP, VOS, opschaling), or a
/// size keyword together with an incident type that scales (fire, water
/// accident, dive team). All keywords match as whole words only.
pub fn is_priority(message: &str) -> bool {
    if message.trim().is_empty() {
        return false;
    }
    MAJOR_INCIDENT.is_match(message)
        || (INCIDENT_SIZE.is_match(message) && INCIDENT_TYPE.is_match(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postal_code_is_extracted() {
        assert_eq!(find_postal_code("Dam 1 1012AB Amsterdam"), Some("1012AB"));
        assert_eq!(find_postal_code("1234AB"), Some("1234AB"));
    }

    #[test]
    fn excluded_suffixes_are_skipped() {
        assert_eq!(find_postal_code("1234SA"), None);
        assert_eq!(find_postal_code("1234SD 1234SS"), None);
        assert_eq!(find_postal_code("1234SA then 5678CD"), Some("5678CD"));
    }

    #[test]
    fn postal_code_needs_leading_nonzero_and_uppercase() {
        assert_eq!(find_postal_code("0123AB"), None);
        assert_eq!(find_postal_code("1234ab"), None);
        assert_eq!(find_postal_code("geen postcode"), None);
    }

    #[test]
    fn clean_message_removes_parts_and_collapses_whitespace() {
        let cleaned = clean_message(
            "A1 Kalverstraat  Amsterdam 1012AB Rit 12345",
            &["Amsterdam", "Kalverstraat", "1012AB"],
        );
        assert_eq!(cleaned, "A1 Rit 12345");
    }

    #[test]
    fn clean_message_is_idempotent() {
        let parts = ["Amsterdam", "Kalverstraat", "1012AB"];
        let once = clean_message("P 1 BR woning  Kalverstraat Amsterdam", &parts);
        let twice = clean_message(&once, &parts);
        assert_eq!(once, twice);
    }

    #[test]
    fn clean_message_ignores_empty_parts() {
        assert_eq!(clean_message("Ambu 17", &[""]), "Ambu 17");
    }

    #[test]
    fn size_and_type_keywords_make_priority() {
        assert!(is_priority("grote brand bij pand"));
        assert!(is_priority("P 1 Middel Brand Industrie"));
        assert!(is_priority("ZEER GROTE BRAND"));
        assert!(is_priority("Groot waterongeval"));
    }

    #[test]
    fn size_or_type_alone_is_not_priority() {
        assert!(!is_priority("kleine brand"));
        assert!(!is_priority("grote parkeerplaats"));
        assert!(!is_priority(""));
        assert!(!is_priority("   "));
    }

    #[test]
    fn major_incident_keywords_are_whole_words() {
        assert!(is_priority("GRIP 1 Amsterdam"));
        assert!(is_priority("inzet vos"));
        assert!(is_priority("Opschaling naar middel"));
        assert!(!is_priority("griphouder"));
        assert!(!is_priority("vossenjacht"));
    }

    #[test]
    fn size_and_type_keywords_are_whole_words() {
        assert!(!is_priority("Brandmelding automatisch Grotestraat Groningen"));
        assert!(!is_priority("Middelburg duikschool"));
        assert!(!is_priority("grote brandweerkazerne"));
        assert!(is_priority("Grote brand Grotestraat"));
    }
}
