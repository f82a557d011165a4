//! Voice content pre-processing.
//!
//! Text-to-speech engines read symbols and dense punctuation poorly, so
//! voice content is flattened to speakable words before the transport call.

use regex::Regex;

/// Rewrite message content for text-to-speech delivery.
#[must_use]
pub fn format_for_voice(content: &str) -> String {
    let mut out = content
        .replace('&', " and ")
        .replace('$', " dollars ")
        .replace('@', " at ");

    // Date and time separators become pauses: 1/5/2026 -> "1 5 2026", 2:30 -> "2 30".
    if let Ok(re) = Regex::new(r"(\d+)/(\d+)/(\d+)") {
        out = re.replace_all(&out, "$1 $2 $3").into_owned();
    }
    if let Ok(re) = Regex::new(r"(\d+):(\d+)") {
        out = re.replace_all(&out, "$1 $2").into_owned();
    }

    if let Ok(re) = Regex::new(r"[^\w\s.,!?-]") {
        out = re.replace_all(&out, "").into_owned();
    }

    match Regex::new(r"\s+") {
        Ok(re) => re.replace_all(&out, " ").trim().to_string(),
        Err(_) => out.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_become_words() {
        assert_eq!(
            format_for_voice("Co-pay $25 & forms @ front desk"),
            "Co-pay dollars 25 and forms at front desk"
        );
    }

    #[test]
    fn date_separators_become_spaces() {
        assert_eq!(format_for_voice("See you 1/5/2026"), "See you 1 5 2026");
    }

    #[test]
    fn time_separators_become_spaces() {
        assert_eq!(format_for_voice("Arrive at 2:30 PM"), "Arrive at 2 30 PM");
    }

    #[test]
    fn stray_punctuation_is_stripped() {
        assert_eq!(
            format_for_voice("Bring #insurance* card (please)"),
            "Bring insurance card please"
        );
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(format_for_voice("Hello    there\n\tJane"), "Hello there Jane");
    }

    #[test]
    fn speakable_punctuation_survives() {
        assert_eq!(
            format_for_voice("Hi Jane, see you soon!"),
            "Hi Jane, see you soon!"
        );
    }
}
