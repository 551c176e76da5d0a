//! Detection of the site's daily application limit banner.

/// Phrases the banner is known to use, lowercased, both languages.
const DAILY_LIMIT_PHRASES: &[&str] = &[
    "you've reached the easy apply application limit",
    "you have reached the daily application limit",
    "daily application limit",
    "application limit for today",
    "vous avez atteint la limite",
    "limite quotidienne de candidatures",
    "limite de candidatures simplifiées",
];

/// Whether the given page text carries the daily-limit banner. The run
/// stops at this signal; continuing would only burn the session.
pub fn is_daily_limit_text(page_text: &str) -> bool {
    let lowered = page_text.to_lowercase();
    DAILY_LIMIT_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_banner_phrases_are_detected() {
        assert!(is_daily_limit_text(
            "You've reached the Easy Apply application limit for today. \
             Come back tomorrow to continue applying."
        ));
        assert!(is_daily_limit_text(
            "Vous avez atteint la limite quotidienne de candidatures."
        ));
    }

    #[test]
    fn ordinary_listing_text_is_not_a_limit() {
        assert!(!is_daily_limit_text(
            "Apply now. 200 applicants. Backend Engineer at Example Corp."
        ));
        assert!(!is_daily_limit_text(""));
    }
}
