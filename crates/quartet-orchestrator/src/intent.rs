//! Finalize-vs-plan intent detection for the inquiry mode.

/// Which branch of the inquiry conversation a message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Design or redesign the inquiry plan
    Plan,
    /// Write up the report from the stored plan
    Finalize,
}

/// Decides the inquiry branch from the student's free text.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Intent;
}

/// Built-in phrases that request the write-up.
pub const FINALIZE_KEYWORDS: [&str; 11] = [
    "write it up",
    "write up",
    "writeup",
    "write-up",
    "finalize the report",
    "finalise the report",
    "finalize it",
    "finalise it",
    "write the report",
    "write my report",
    "write the inquiry report",
];

/// Case-sensitive substring match against [`FINALIZE_KEYWORDS`] plus any
/// configured extras.
///
/// Matching is plain `str::contains`: "overwrite upstream" contains
/// "write up" and therefore finalizes.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            keywords: FINALIZE_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    /// Append keywords after the built-in list. Blank entries are ignored.
    #[must_use]
    pub fn with_extra_keywords<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(
            extra
                .into_iter()
                .map(Into::into)
                .filter(|k| !k.is_empty()),
        );
        self
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Intent {
        if self.keywords.iter().any(|k| text.contains(k.as_str())) {
            Intent::Finalize
        } else {
            Intent::Plan
        }
    }
}
