use serde::Serialize;

/// Coarse reading of a classifier score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Positive,
    Uncertain,
    Negative,
}

impl Verdict {
    pub fn from_score(score: f32) -> Self {
        if score > 0.7 {
            Verdict::Positive
        } else if score > 0.3 {
            Verdict::Uncertain
        } else {
            Verdict::Negative
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Positive => "positive",
            Verdict::Uncertain => "uncertain",
            Verdict::Negative => "negative",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Verdict::Positive => "🍆",
            Verdict::Uncertain => "🤔",
            Verdict::Negative => "😇",
        }
    }
}
