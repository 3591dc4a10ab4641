//! Local keyword matcher
//!
//! Maps a transcript to an [`Intent`] with an ordered list of rules. The first
//! rule whose predicate matches builds the intent; later rules are never
//! consulted. Rule order is significant: "search ... youtube" is checked before
//! "search ... google/for", so a transcript naming both platforms searches
//! YouTube, and any "search" + "for" transcript goes to Google.

use chrono::{Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Intent, Platform, SideEffect, extract_query};

/// Joke pool for the joke rule
pub const JOKES: [&str; 5] = [
    "Why did the programmer quit his job? Because he didn't get arrays!",
    "Why do programmers prefer dark mode? Because light attracts bugs!",
    "What's a computer's favorite snack? Microchips!",
    "Why did the developer go broke? Because he used up all his cache!",
    "How many programmers does it take to change a light bulb? None, that's a hardware problem!",
];

const GREETING_REPLY: &str = "Hello! How can I help you today?";
const IDENTITY_REPLY: &str = "I am Vyra, your web assistant!";
const FALLBACK_REPLY: &str = "I'm not sure how to help with that. Try saying hello, asking for the time, or requesting to open a website.";

/// Source of the current local time
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Inputs a rule builder may draw on besides the transcript
struct RuleContext<'a> {
    now: NaiveDateTime,
    rng: &'a mut StdRng,
}

/// One `(predicate, builder)` pair
struct Rule {
    name: &'static str,
    matches: fn(&str) -> bool,
    build: fn(&str, &mut RuleContext<'_>) -> Intent,
}

/// Evaluated top to bottom, first match wins
const RULES: &[Rule] = &[
    Rule {
        name: "greeting",
        matches: |t| contains_any(t, &["hello", "hi", "hey"]),
        build: |_, _| Intent::reply(GREETING_REPLY),
    },
    Rule {
        name: "identity",
        matches: |t| contains_any(t, &["your name", "who are you"]),
        build: |_, _| Intent::reply(IDENTITY_REPLY),
    },
    Rule {
        name: "time",
        matches: |t| t.contains("time"),
        build: |_, ctx| {
            Intent::reply(format!("The current time is {}", ctx.now.format("%-I:%M %p")))
        },
    },
    Rule {
        name: "date",
        matches: |t| contains_any(t, &["date", "today"]),
        build: |_, ctx| Intent::reply(format!("Today is {}", ctx.now.format("%A, %B %-d, %Y"))),
    },
    Rule {
        name: "joke",
        matches: |t| contains_any(t, &["joke", "funny"]),
        build: |_, ctx| Intent::reply(JOKES[ctx.rng.gen_range(0..JOKES.len())]),
    },
    Rule {
        name: "open_youtube",
        matches: |t| t.contains("open youtube"),
        build: |_, _| {
            Intent::acting("Opening YouTube for you!", SideEffect::open_url("https://www.youtube.com"))
        },
    },
    Rule {
        name: "open_google",
        matches: |t| t.contains("open google"),
        build: |_, _| Intent::acting("Opening Google!", SideEffect::open_url("https://www.google.com")),
    },
    Rule {
        name: "open_instagram",
        matches: |t| t.contains("open instagram"),
        build: |_, _| {
            Intent::acting("Opening Instagram!", SideEffect::open_url("https://www.instagram.com"))
        },
    },
    Rule {
        name: "search_youtube",
        matches: |t| t.contains("search") && t.contains("youtube"),
        build: |t, _| search_intent(t, Platform::YouTube),
    },
    Rule {
        name: "search_google",
        matches: |t| t.contains("search") && (t.contains("google") || t.contains("for")),
        build: |t, _| search_intent(t, Platform::Google),
    },
];

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn search_intent(transcript: &str, platform: Platform) -> Intent {
    let query = extract_query(transcript, platform);
    Intent::acting(
        format!("Searching {platform} for {query}"),
        SideEffect::search(platform, &query),
    )
}

/// Keyword-based intent resolver
pub struct TranscriptMatcher {
    clock: Box<dyn Clock>,
    rng: StdRng,
}

impl TranscriptMatcher {
    /// Matcher using the system clock and an entropy-seeded RNG
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Box::new(SystemClock),
            rng: StdRng::from_entropy(),
        }
    }

    /// Matcher with a deterministic joke selection
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: Box::new(SystemClock),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Replace the clock used for time and date replies
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Resolve a transcript into an intent
    ///
    /// The transcript is lowercased before matching. Always yields an intent;
    /// unmatched input gets a generic help reply with no side effect.
    pub fn resolve(&mut self, transcript: &str) -> Intent {
        let lower = transcript.to_lowercase();
        let mut ctx = RuleContext {
            now: self.clock.now(),
            rng: &mut self.rng,
        };

        for rule in RULES {
            if (rule.matches)(&lower) {
                tracing::debug!(rule = rule.name, transcript = %lower, "matched local rule");
                return (rule.build)(&lower, &mut ctx);
            }
        }

        tracing::debug!(transcript = %lower, "no local rule matched");
        Intent::reply(FALLBACK_REPLY)
    }
}

impl Default for TranscriptMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TranscriptMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptMatcher")
            .field("rules", &RULES.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn matcher() -> TranscriptMatcher {
        let now = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(15, 7, 0))
            .unwrap();
        TranscriptMatcher::with_seed(7).with_clock(FixedClock(now))
    }

    #[test]
    fn test_greeting() {
        let intent = matcher().resolve("Hello there");
        assert_eq!(intent.reply_text(), GREETING_REPLY);
        assert!(intent.side_effect().is_none());
    }

    #[test]
    fn test_greeting_matches_substrings() {
        // "this" contains "hi"
        let intent = matcher().resolve("what is this");
        assert_eq!(intent.reply_text(), GREETING_REPLY);
    }

    #[test]
    fn test_identity() {
        assert_eq!(matcher().resolve("what is your name").reply_text(), IDENTITY_REPLY);
        assert_eq!(matcher().resolve("who are you").reply_text(), IDENTITY_REPLY);
    }

    #[test]
    fn test_time_uses_twelve_hour_clock() {
        let intent = matcher().resolve("what time is it");
        assert_eq!(intent.reply_text(), "The current time is 3:07 PM");
    }

    #[test]
    fn test_date_is_spelled_out() {
        let intent = matcher().resolve("what's the date");
        assert_eq!(intent.reply_text(), "Today is Tuesday, March 5, 2024");
    }

    #[test]
    fn test_joke_comes_from_pool() {
        let mut m = matcher();
        for _ in 0..20 {
            let intent = m.resolve("tell me a joke");
            assert!(JOKES.contains(&intent.reply_text()));
        }
    }

    #[test]
    fn test_joke_selection_is_seedable() {
        let picks = |seed| {
            let mut m = TranscriptMatcher::with_seed(seed);
            (0..10)
                .map(|_| m.resolve("tell me a funny one").reply_text().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(42), picks(42));
    }

    #[test]
    fn test_open_sites() {
        let cases = [
            ("open youtube", "https://www.youtube.com"),
            ("please open google", "https://www.google.com"),
            ("open instagram now", "https://www.instagram.com"),
        ];
        for (transcript, url) in cases {
            let intent = matcher().resolve(transcript);
            assert_eq!(intent.side_effect(), Some(&SideEffect::open_url(url)));
        }
    }

    #[test]
    fn test_search_youtube_wins_over_google() {
        let intent = matcher().resolve("search youtube and google for cats");
        assert!(matches!(
            intent.side_effect(),
            Some(SideEffect::SearchOn { platform: Platform::YouTube, .. })
        ));
    }

    #[test]
    fn test_search_for_on_youtube() {
        let intent = matcher().resolve("search for cats on youtube");
        assert_eq!(intent.reply_text(), "Searching YouTube for cats");
        assert_eq!(
            intent.side_effect(),
            Some(&SideEffect::search(Platform::YouTube, "cats"))
        );
    }

    #[test]
    fn test_open_youtube_beats_search_rules() {
        for transcript in [
            "open youtube and search google for cats",
            "search for open youtube",
            "Open YouTube then search YouTube for music",
        ] {
            let intent = matcher().resolve(transcript);
            assert_eq!(intent.reply_text(), "Opening YouTube for you!", "{transcript}");
            assert_eq!(
                intent.side_effect(),
                Some(&SideEffect::open_url("https://www.youtube.com")),
                "{transcript}"
            );
        }
    }

    #[test]
    fn test_search_for_routes_to_google() {
        let intent = matcher().resolve("search for cats");
        assert_eq!(intent.reply_text(), "Searching Google for cats");
        assert_eq!(intent.side_effect(), Some(&SideEffect::search(Platform::Google, "cats")));
    }

    #[test]
    fn test_search_without_platform_falls_through() {
        let intent = matcher().resolve("search");
        assert_eq!(intent.reply_text(), FALLBACK_REPLY);
        assert!(intent.side_effect().is_none());
    }

    #[test]
    fn test_default_reply() {
        let intent = matcher().resolve("make me a sandwich");
        assert_eq!(intent.reply_text(), FALLBACK_REPLY);
    }
}
