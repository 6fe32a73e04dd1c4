//! Intent detection: fast pattern matching on raw user messages.
//!
//! Two signals drive the turn controller:
//! - **start**: the user wants to begin the scripted interview. Substring
//!   match against a list of trigger phrases.
//! - **recommendation ask**: the user wants the recommendations now.
//!   Whole-word match against a keyword vocabulary, so "job" does not fire
//!   inside "jobless".
//!
//! Both checks lower-case the message first and are total: empty input
//! simply yields `false`.

use regex::Regex;

/// Default phrases that start the scripted interview.
pub const DEFAULT_START_PHRASES: &[&str] = &[
    "ask me some questions",
    "generate job recommendations for me",
    "start questions",
    "begin recommendations",
    "start the process",
    "begin the process",
    "career questions",
    "start career questions",
    "let's begin",
];

/// Default vocabulary that signals a request for recommendations.
pub const DEFAULT_RECOMMENDATION_KEYWORDS: &[&str] = &[
    "recommend",
    "career",
    "careers",
    "job",
    "jobs",
    "path",
    "paths",
    "suggest",
    "find me",
    "what should i do",
    "what are good jobs",
];

/// Maps a raw message to boolean intent signals.
pub trait IntentClassifier: Send + Sync {
    /// Whether the message asks to begin the scripted interview.
    fn detect_start(&self, message: &str) -> bool;

    /// Whether the message asks for recommendations.
    fn detect_recommendation_ask(&self, message: &str) -> bool;
}

/// Keyword/phrase classifier.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    start_phrases: Vec<String>,
    recommendation: Option<Regex>,
}

impl KeywordClassifier {
    /// Build a classifier from custom vocabularies.
    ///
    /// Phrases and keywords are lower-cased; keywords are regex-escaped so
    /// punctuation in them matches literally.
    pub fn new<S, K>(start_phrases: S, keywords: K) -> Result<Self, regex::Error>
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let start_phrases = start_phrases
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        let escaped: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(&k))
            .collect();

        let recommendation = if escaped.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"\b(?:{})\b", escaped.join("|")))?)
        };

        Ok(Self {
            start_phrases,
            recommendation,
        })
    }

    /// The built-in career-interview vocabularies.
    pub fn career() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_START_PHRASES, DEFAULT_RECOMMENDATION_KEYWORDS)
    }
}

impl IntentClassifier for KeywordClassifier {
    fn detect_start(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.start_phrases.iter().any(|p| lower.contains(p.as_str()))
    }

    fn detect_recommendation_ask(&self, message: &str) -> bool {
        match &self.recommendation {
            Some(re) => re.is_match(&message.to_lowercase()),
            None => false,
        }
    }
}
