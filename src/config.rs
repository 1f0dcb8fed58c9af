use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Direction, Thresholds};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("config defines no domains")]
    NoDomains,

    #[error("domain `{0}` is defined more than once")]
    DuplicateDomain(String),

    #[error("domain `{0}` has no items")]
    EmptyDomain(String),

    #[error("domain `{domain}` lists item {index} more than once")]
    DuplicateItem { domain: String, index: usize },

    #[error("thresholds for {scope} must be finite with growth < strong (got growth={growth}, strong={strong})")]
    Thresholds {
        scope: String,
        growth: f64,
        strong: f64,
    },

    #[error("scale_max must be a positive finite number (got {0})")]
    ScaleMax(f64),

    #[error("recommendations need max_per_domain >= 1 and maintenance_per_domain <= max_per_domain (got {max_per_domain} / {maintenance_per_domain})")]
    Recommendations {
        max_per_domain: usize,
        maintenance_per_domain: usize,
    },
}

/// How many catalog entries are shown per domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationPolicy {
    pub max_per_domain: usize,
    pub maintenance_per_domain: usize,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            max_per_domain: 2,
            maintenance_per_domain: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainDefinition {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Zero-based answer indices.
    pub items: Vec<usize>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
    /// Advice catalog, most broadly applicable first.
    #[serde(default)]
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_scale_max")]
    pub scale_max: f64,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub recommendations: RecommendationPolicy,
    pub domains: Vec<DomainDefinition>,
}

fn default_scale_max() -> f64 {
    10.0
}

impl ScoringConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ScoringConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            domains = config.domains.len(),
            "loaded scoring config"
        );
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scale_max.is_finite() || self.scale_max <= 0.0 {
            return Err(ConfigError::ScaleMax(self.scale_max));
        }
        check_thresholds("the global scale", &self.thresholds)?;

        let policy = self.recommendations;
        if policy.max_per_domain == 0 || policy.maintenance_per_domain > policy.max_per_domain {
            return Err(ConfigError::Recommendations {
                max_per_domain: policy.max_per_domain,
                maintenance_per_domain: policy.maintenance_per_domain,
            });
        }

        if self.domains.is_empty() {
            return Err(ConfigError::NoDomains);
        }

        let mut keys = HashSet::new();
        for domain in &self.domains {
            if !keys.insert(domain.key.as_str()) {
                return Err(ConfigError::DuplicateDomain(domain.key.clone()));
            }
            if domain.items.is_empty() {
                return Err(ConfigError::EmptyDomain(domain.key.clone()));
            }
            let mut seen = HashSet::new();
            for &index in &domain.items {
                if !seen.insert(index) {
                    return Err(ConfigError::DuplicateItem {
                        domain: domain.key.clone(),
                        index,
                    });
                }
            }
            if let Some(thresholds) = &domain.thresholds {
                check_thresholds(&format!("domain `{}`", domain.key), thresholds)?;
            }
        }

        Ok(())
    }

    /// Number of answer columns the domains reach into.
    pub fn item_count(&self) -> usize {
        self.domains
            .iter()
            .flat_map(|domain| domain.items.iter())
            .max()
            .map_or(0, |max| max + 1)
    }

    pub fn thresholds_for(&self, domain: &DomainDefinition) -> Thresholds {
        domain.thresholds.unwrap_or(self.thresholds)
    }

    pub fn domain(&self, key: &str) -> Option<&DomainDefinition> {
        self.domains.iter().find(|domain| domain.key == key)
    }

    pub fn index_groups(&self) -> Vec<(String, Vec<usize>)> {
        self.domains
            .iter()
            .map(|domain| (domain.key.clone(), domain.items.clone()))
            .collect()
    }

    pub fn catalog(&self) -> HashMap<String, Vec<String>> {
        self.domains
            .iter()
            .map(|domain| (domain.key.clone(), domain.tips.clone()))
            .collect()
    }
}

fn check_thresholds(scope: &str, thresholds: &Thresholds) -> Result<(), ConfigError> {
    let Thresholds { growth, strong } = *thresholds;
    if growth.is_finite() && strong.is_finite() && growth < strong {
        Ok(())
    } else {
        Err(ConfigError::Thresholds {
            scope: scope.to_string(),
            growth,
            strong,
        })
    }
}

fn domain(
    key: &str,
    label: &str,
    description: &str,
    items: &[usize],
    direction: Direction,
    tips: &[&str],
) -> DomainDefinition {
    DomainDefinition {
        key: key.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        items: items.to_vec(),
        direction,
        thresholds: None,
        tips: tips.iter().map(|tip| tip.to_string()).collect(),
    }
}

/// The 23-item PERMA-Profiler layout.
impl Default for ScoringConfig {
    fn default() -> Self {
        use Direction::{HigherIsBetter, LowerIsBetter};

        Self {
            scale_max: default_scale_max(),
            thresholds: Thresholds::default(),
            recommendations: RecommendationPolicy::default(),
            domains: vec![
                domain(
                    "P",
                    "Positive Emotion",
                    "How often everyday life brings joy, contentment and a positive mood.",
                    &[2, 12, 21],
                    HigherIsBetter,
                    &[
                        "Note one good thing that happened each evening.",
                        "Listen to favourite songs or look through old photographs.",
                        "Spend a few minutes in the garden or by a sunny window.",
                    ],
                ),
                domain(
                    "E",
                    "Engagement",
                    "How often you become absorbed and interested in what you are doing.",
                    &[1, 9, 16],
                    HigherIsBetter,
                    &[
                        "Take up a hands-on hobby such as drawing, calligraphy or knitting.",
                        "Join a short group activity like singing or light exercise.",
                        "Try a puzzle or board game that takes some focus.",
                    ],
                ),
                domain(
                    "R",
                    "Relationships",
                    "How supported, loved and satisfied with your relationships you feel.",
                    &[7, 18, 20],
                    HigherIsBetter,
                    &[
                        "Share tea and a chat with a neighbour or another resident.",
                        "Make a short phone call to family or an old friend.",
                        "Join a club or recreation session held at the facility.",
                    ],
                ),
                domain(
                    "M",
                    "Meaning",
                    "How much your life feels purposeful, worthwhile and directed.",
                    &[6, 8, 19],
                    HigherIsBetter,
                    &[
                        "Take on a small role, such as watering the plants.",
                        "Share memories or skills with younger people.",
                        "Set one small goal for each week.",
                    ],
                ),
                domain(
                    "A",
                    "Accomplishment",
                    "How often you make progress towards goals and handle your responsibilities.",
                    &[0, 4, 14],
                    HigherIsBetter,
                    &[
                        "Break tasks into small steps and tick each one off.",
                        "Keep a simple record of daily walks or exercise.",
                        "Finish a small craft or piece of work and display it.",
                    ],
                ),
                domain(
                    "N",
                    "Negative Emotion",
                    "How often you feel anxious, angry or sad.",
                    &[3, 13, 15],
                    LowerIsBetter,
                    &[
                        "Tell a trusted staff member when something is worrying you.",
                        "Practise slow breathing for a few minutes each day.",
                        "Keep a regular daily rhythm of sleep and meals.",
                    ],
                ),
                domain(
                    "H",
                    "Health",
                    "How you rate your physical health, now and compared to others your age.",
                    &[5, 11, 17],
                    HigherIsBetter,
                    &[
                        "Take a gentle five-minute walk each day.",
                        "Try seated stretching or light exercise with others.",
                        "Keep up with meals and fluids at regular times.",
                    ],
                ),
                domain(
                    "Lon",
                    "Loneliness",
                    "How lonely you feel in daily life.",
                    &[10],
                    LowerIsBetter,
                    &[
                        "Sit with others during meals or tea time.",
                        "Ask staff about group activities you could join.",
                    ],
                ),
                domain(
                    "Hap",
                    "Happiness",
                    "Overall, how happy you would say you are.",
                    &[22],
                    HigherIsBetter,
                    &[
                        "Plan something small to look forward to each week.",
                        "Spend time on whatever has made you happiest lately.",
                    ],
                ),
            ],
        }
    }
}
