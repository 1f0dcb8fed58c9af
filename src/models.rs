use serde::{Deserialize, Serialize};

/// One respondent's answers, in questionnaire order. `None` marks an absent
/// or unusable cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub respondent_id: String,
    pub answers: Vec<Option<f64>>,
}

impl RawResponse {
    pub fn new(respondent_id: impl Into<String>, answers: Vec<Option<f64>>) -> Self {
        Self {
            respondent_id: respondent_id.into(),
            answers,
        }
    }

    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    HigherIsBetter,
    LowerIsBetter,
}

/// Cutpoints on the normalized scale. `growth < strong` is enforced when the
/// configuration is validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub growth: f64,
    pub strong: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            growth: 5.0,
            strong: 7.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Strong,
    Moderate,
    NeedsAttention,
    Unknown,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::Strong => "strength",
            Tier::Moderate => "moderate",
            Tier::NeedsAttention => "needs attention",
            Tier::Unknown => "not available",
        }
    }
}

/// Mean of the usable answers in one domain. `value` is `None` when the
/// domain had nothing to average, which is not the same as a score of 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainScore {
    pub domain: String,
    pub value: Option<f64>,
    pub answered: usize,
    pub items: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainTier {
    pub domain: String,
    pub tier: Tier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMode {
    /// Advice for the domains that need attention.
    Corrective,
    /// No domain needs attention; a short slice from every domain.
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub domain: String,
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub mode: RecommendationMode,
    pub entries: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub strengths: Vec<String>,
    pub needs_attention: Vec<String>,
    pub unknown: Vec<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainResult {
    pub domain: String,
    pub label: String,
    pub score: Option<f64>,
    pub answered: usize,
    pub items: usize,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RespondentReport {
    pub respondent_id: String,
    pub answered: usize,
    pub domains: Vec<DomainResult>,
    pub summary: Summary,
    pub recommendations: Recommendations,
}
