use std::collections::HashMap;

use rayon::prelude::*;

use crate::config::{RecommendationPolicy, ScoringConfig};
use crate::models::{
    Direction, DomainResult, DomainScore, DomainTier, RawResponse, Recommendation,
    RecommendationMode, Recommendations, RespondentReport, Summary, Thresholds, Tier,
};

/// Averages the present, in-range answers of each group. Groups with nothing
/// usable come back with `value: None`.
pub fn aggregate(responses: &[Option<f64>], groups: &[(String, Vec<usize>)]) -> Vec<DomainScore> {
    groups
        .iter()
        .map(|(domain, indices)| {
            let values: Vec<f64> = indices
                .iter()
                .filter_map(|&index| responses.get(index).copied().flatten())
                .filter(|value| value.is_finite())
                .collect();

            let value = if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            };

            DomainScore {
                domain: domain.clone(),
                value,
                answered: values.len(),
                items: indices.len(),
            }
        })
        .collect()
}

pub fn classify(
    score: Option<f64>,
    direction: Direction,
    thresholds: Thresholds,
    scale_max: f64,
) -> Tier {
    let Some(score) = score else {
        return Tier::Unknown;
    };

    let effective = match direction {
        Direction::HigherIsBetter => score,
        Direction::LowerIsBetter => scale_max - score,
    };

    if effective >= thresholds.strong {
        Tier::Strong
    } else if effective < thresholds.growth {
        Tier::NeedsAttention
    } else {
        Tier::Moderate
    }
}

/// Picks advice for every domain that needs attention, or a maintenance
/// slice from every domain when none does. Catalog order is kept.
pub fn select_recommendations(
    tiers: &[DomainTier],
    catalog: &HashMap<String, Vec<String>>,
    policy: RecommendationPolicy,
) -> Recommendations {
    let flagged: Vec<&DomainTier> = tiers
        .iter()
        .filter(|entry| entry.tier == Tier::NeedsAttention)
        .collect();

    let (mode, domains, take) = if flagged.is_empty() {
        (
            RecommendationMode::Maintenance,
            tiers.iter().collect::<Vec<_>>(),
            policy.maintenance_per_domain,
        )
    } else {
        (RecommendationMode::Corrective, flagged, policy.max_per_domain)
    };

    let entries = domains
        .into_iter()
        .filter_map(|entry| {
            catalog.get(&entry.domain).map(|tips| Recommendation {
                domain: entry.domain.clone(),
                tips: tips.iter().take(take).cloned().collect(),
            })
        })
        .collect();

    Recommendations { mode, entries }
}

pub fn summarize(config: &ScoringConfig, tiers: &[DomainTier]) -> Summary {
    let labels_for = |wanted: Tier| -> Vec<String> {
        tiers
            .iter()
            .filter(|entry| entry.tier == wanted)
            .map(|entry| {
                config
                    .domain(&entry.domain)
                    .map_or_else(|| entry.domain.clone(), |domain| domain.label.clone())
            })
            .collect()
    };

    let strengths = labels_for(Tier::Strong);
    let needs_attention = labels_for(Tier::NeedsAttention);
    let unknown = labels_for(Tier::Unknown);

    let mut sentences = Vec::new();
    if !strengths.is_empty() {
        sentences.push(format!(
            "Your strengths are {}.",
            strengths.join(", ")
        ));
    }
    if !needs_attention.is_empty() {
        sentences.push(format!(
            "There is room to grow in {}.",
            needs_attention.join(", ")
        ));
    }
    if strengths.is_empty() && needs_attention.is_empty() {
        sentences.push("Your results are well balanced across all elements.".to_string());
    }
    if !unknown.is_empty() {
        sentences.push(format!(
            "Not enough answers to score {}.",
            unknown.join(", ")
        ));
    }

    Summary {
        strengths,
        needs_attention,
        unknown,
        text: sentences.join(" "),
    }
}

/// Runs one respondent through aggregation, classification and selection.
pub fn score_respondent(config: &ScoringConfig, response: &RawResponse) -> RespondentReport {
    let scores = aggregate(&response.answers, &config.index_groups());

    let mut domains = Vec::with_capacity(scores.len());
    let mut tiers = Vec::with_capacity(scores.len());
    for (definition, score) in config.domains.iter().zip(scores) {
        let tier = classify(
            score.value,
            definition.direction,
            config.thresholds_for(definition),
            config.scale_max,
        );
        if tier == Tier::Unknown {
            tracing::warn!(
                respondent = %response.respondent_id,
                domain = %definition.key,
                "no usable answers, domain left unscored"
            );
        }
        tiers.push(DomainTier {
            domain: definition.key.clone(),
            tier,
        });
        domains.push(DomainResult {
            domain: definition.key.clone(),
            label: definition.label.clone(),
            score: score.value,
            answered: score.answered,
            items: score.items,
            tier,
        });
    }

    let summary = summarize(config, &tiers);
    let recommendations =
        select_recommendations(&tiers, &config.catalog(), config.recommendations);

    RespondentReport {
        respondent_id: response.respondent_id.clone(),
        answered: response.answered(),
        domains,
        summary,
        recommendations,
    }
}

pub fn score_all(config: &ScoringConfig, responses: &[RawResponse]) -> Vec<RespondentReport> {
    responses
        .par_iter()
        .map(|response| score_respondent(config, response))
        .collect()
}
