//! Location and day extraction from free-form transcript text.
//!
//! Location rules are tried in order and the first match wins. When none
//! match, the last run of capitalized words is used instead; that fallback is
//! a low-confidence guess and is reported as such.

use chrono::{Datelike, Utc, Weekday};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Offset used when the text names no day.
pub const DEFAULT_DAY_OFFSET: u32 = 1;

/// Which rule produced a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    Rule(&'static str),
    /// Last capitalized phrase in the utterance.
    CapitalizedFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationMatch {
    pub location: String,
    pub source: LocationSource,
}

impl LocationMatch {
    pub fn is_low_confidence(&self) -> bool {
        self.source == LocationSource::CapitalizedFallback
    }
}

struct LocationRule {
    name: &'static str,
    pattern: Regex,
    extract: fn(&Captures<'_>) -> Option<String>,
}

fn first_group(caps: &Captures<'_>) -> Option<String> {
    caps.get(1).map(|m| clean_location(m.as_str()))
}

fn rule(name: &'static str, pattern: &str) -> LocationRule {
    LocationRule {
        name,
        pattern: Regex::new(pattern).expect("location rule pattern is valid"),
        extract: first_group,
    }
}

static LOCATION_RULES: LazyLock<Vec<LocationRule>> = LazyLock::new(|| {
    vec![
        rule("weather-in", r"(?i)weather\s+(?:in|for|at)\s+([A-Za-z\s,]+)"),
        rule("whats-the-weather-in", r"(?i)what(?:'s| is) the weather in\s+([A-Za-z\s,]+)"),
        rule("will-it-rain-in", r"(?i)will it rain (?:in|at)\s+([A-Za-z\s,]+)"),
        rule("rain-in", r"(?i)rain in\s+([A-Za-z\s,]+)"),
        rule("in-place-when", r"(?i)in\s+([A-Za-z\s,]+)\s+(?:tomorrow|today|on)"),
    ]
});

static CAPITALIZED_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\b").expect("capitalized pattern is valid")
});

/// A trailing time expression swallowed by the greedy location capture.
static TRAILING_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        concat!(
            r"(?i)\s+(?:today|tomorrow|tonight|this\s+[a-z]+|next\s+[a-z]+",
            r"|on\s+(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)",
            r"|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b.*$",
        ),
    )
    .expect("trailing time pattern is valid")
});

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

fn clean_location(raw: &str) -> String {
    let cut = TRAILING_TIME.replace(raw, "");
    cut.trim().trim_matches(|c| matches!(c, '.' | ',' | '?' | '!')).to_string()
}

pub fn extract_location_match(text: &str) -> Option<LocationMatch> {
    for rule in LOCATION_RULES.iter() {
        if let Some(caps) = rule.pattern.captures(text) {
            // First matching rule decides, even if its capture cleans to nothing.
            return (rule.extract)(&caps)
                .filter(|loc| !loc.is_empty())
                .map(|location| LocationMatch {
                    location,
                    source: LocationSource::Rule(rule.name),
                });
        }
    }

    CAPITALIZED_PHRASE.captures_iter(text).last().and_then(|caps| {
        caps.get(1).map(|m| LocationMatch {
            location: m.as_str().to_string(),
            source: LocationSource::CapitalizedFallback,
        })
    })
}

pub fn extract_location(text: &str) -> Option<String> {
    extract_location_match(text).map(|m| m.location)
}

/// Day offset named in `text`, relative to the current UTC weekday.
pub fn extract_day_offset(text: &str) -> u32 {
    extract_day_offset_from(text, Utc::now().weekday())
}

/// Same as [`extract_day_offset`] with an explicit "today".
///
/// A weekday name always means its next occurrence, so naming today's
/// weekday yields 7.
pub fn extract_day_offset_from(text: &str, today: Weekday) -> u32 {
    let lower = text.to_lowercase();
    if lower.contains("today") {
        return 0;
    }
    if lower.contains("tomorrow") {
        return 1;
    }

    for (name, weekday) in WEEKDAYS {
        if lower.contains(name) {
            let target = weekday.num_days_from_monday();
            let current = today.num_days_from_monday();
            let delta = (target + 7 - current) % 7;
            return if delta == 0 { 7 } else { delta };
        }
    }

    DEFAULT_DAY_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_in_rule_keeps_comma_and_strips_punctuation() {
        assert_eq!(
            extract_location("what's the weather in Paris, France").as_deref(),
            Some("Paris, France")
        );
        assert_eq!(extract_location("weather for Lisbon,").as_deref(), Some("Lisbon"));
    }

    #[test]
    fn rain_rule_drops_trailing_day() {
        let m = extract_location_match("will it rain in Boston tomorrow").expect("matches");
        assert_eq!(m.location, "Boston");
        assert_eq!(m.source, LocationSource::Rule("will-it-rain-in"));

        assert_eq!(
            extract_location("Will it rain in San Francisco on Friday?").as_deref(),
            Some("San Francisco")
        );
        assert_eq!(extract_location("any rain in Leeds this weekend").as_deref(), Some("Leeds"));
    }

    #[test]
    fn place_before_day_rule() {
        let m = extract_location_match("Is it going to be cold in Denver tomorrow")
            .expect("matches");
        assert_eq!(m.location, "Denver");
        assert_eq!(m.source, LocationSource::Rule("in-place-when"));
    }

    #[test]
    fn capitalized_fallback_takes_last_phrase() {
        let m = extract_location_match("I love New York").expect("fallback");
        assert_eq!(m.location, "New York");
        assert!(m.is_low_confidence());

        assert_eq!(
            extract_location("Tell me about Berlin and then Rome").as_deref(),
            Some("Rome")
        );
    }

    #[test]
    fn nothing_to_extract() {
        assert_eq!(extract_location("is it sunny"), None);
        assert_eq!(extract_location(""), None);
    }

    #[test]
    fn day_words() {
        assert_eq!(extract_day_offset("today"), 0);
        assert_eq!(extract_day_offset("Tomorrow please"), 1);
        assert_eq!(extract_day_offset(""), 1);
        assert_eq!(extract_day_offset("whenever"), DEFAULT_DAY_OFFSET);
    }

    #[test]
    fn weekday_is_next_occurrence() {
        assert_eq!(extract_day_offset_from("wednesday", Weekday::Wed), 7);
        assert_eq!(extract_day_offset_from("on Friday", Weekday::Wed), 2);
        assert_eq!(extract_day_offset_from("Monday", Weekday::Sun), 1);
        assert_eq!(extract_day_offset_from("tuesday", Weekday::Wed), 6);
    }

    #[test]
    fn today_beats_weekday() {
        assert_eq!(extract_day_offset_from("today or friday", Weekday::Mon), 0);
    }
}
