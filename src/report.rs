use std::fmt::Write;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::ScoringConfig;
use crate::models::{DomainResult, RecommendationMode, RespondentReport, Tier};
use crate::scoring::classify;

const CLOSING_NOTES: [&str; 3] = [
    "These results reflect preferences and circumstances, not a judgement of good or bad.",
    "Start new activities with a small step, such as a five-minute walk each day.",
    "This tool is a screening aid, not a diagnosis. If difficulties continue, please talk to a professional.",
];

/// Renders a score with one decimal, adding precision when rounding would
/// land the shown value in a different tier than the real one.
pub fn format_score(score: Option<f64>, tier_of: impl Fn(f64) -> Tier) -> String {
    let Some(value) = score else {
        return "not available".to_string();
    };
    let tier = tier_of(value);
    (1..=4)
        .map(|precision| format!("{value:.precision$}"))
        .find(|text| text.parse::<f64>().is_ok_and(|shown| tier_of(shown) == tier))
        .unwrap_or_else(|| value.to_string())
}

pub fn domain_score(config: &ScoringConfig, domain: &DomainResult) -> String {
    match config.domain(&domain.domain) {
        Some(definition) => {
            let thresholds = config.thresholds_for(definition);
            format_score(domain.score, |value| {
                classify(Some(value), definition.direction, thresholds, config.scale_max)
            })
        }
        None => format_score(domain.score, |_| domain.tier),
    }
}

pub fn build_report(
    report: &RespondentReport,
    config: &ScoringConfig,
    generated_at: DateTime<Local>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Wellbeing Profile");
    let _ = writeln!(
        output,
        "Respondent {} (generated {})",
        report.respondent_id,
        generated_at.format("%Y-%m-%d %H:%M")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Scores");
    let _ = writeln!(output, "| Element | Score | Result | Answered |");
    let _ = writeln!(output, "|---|---|---|---|");
    for domain in &report.domains {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {}/{} |",
            domain.label,
            domain_score(config, domain),
            domain.tier.label(),
            domain.answered,
            domain.items
        );
    }
    if report.domains.iter().any(|d| d.tier == Tier::Unknown) {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "Elements marked \"not available\" had no usable answers and were not scored."
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## About Each Element");
    for domain in &config.domains {
        if domain.description.is_empty() {
            continue;
        }
        let _ = writeln!(output, "- {}: {}", domain.label, domain.description);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "{}", report.summary.text);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Activities");
    if report.recommendations.mode == RecommendationMode::Maintenance {
        let _ = writeln!(
            output,
            "No element stands out as needing attention. These activities help keep things that way."
        );
    }
    for entry in &report.recommendations.entries {
        if entry.tips.is_empty() {
            continue;
        }
        let label = config
            .domain(&entry.domain)
            .map_or(entry.domain.as_str(), |domain| domain.label.as_str());
        let _ = writeln!(output);
        let _ = writeln!(output, "**{label}**");
        for tip in &entry.tips {
            let _ = writeln!(output, "- {tip}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Keep In Mind");
    for note in CLOSING_NOTES {
        let _ = writeln!(output, "- {note}");
    }

    output
}

#[derive(Serialize)]
struct JsonExport<'a> {
    generated_at: DateTime<Local>,
    reports: &'a [RespondentReport],
}

pub fn to_json(reports: &[RespondentReport], generated_at: DateTime<Local>) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&JsonExport {
        generated_at,
        reports,
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, RawResponse, Thresholds};
    use crate::scoring::score_respondent;

    const CUTPOINTS: Thresholds = Thresholds {
        growth: 5.0,
        strong: 7.0,
    };

    fn shown(value: f64, direction: Direction) -> String {
        format_score(Some(value), |v| classify(Some(v), direction, CUTPOINTS, 10.0))
    }

    fn respondent(values: Vec<Option<f64>>) -> RespondentReport {
        score_respondent(&ScoringConfig::default(), &RawResponse::new("R-7", values))
    }

    #[test]
    fn formats_missing_scores_explicitly() {
        assert_eq!(shown(5.666, Direction::HigherIsBetter), "5.7");
        assert_eq!(shown(0.0, Direction::HigherIsBetter), "0.0");
        assert_eq!(format_score(None, |_| Tier::Strong), "not available");
    }

    #[test]
    fn rounding_never_crosses_a_cutpoint() {
        let up = Direction::HigherIsBetter;
        assert_eq!(classify(Some(4.96), up, CUTPOINTS, 10.0), Tier::NeedsAttention);
        assert_eq!(shown(4.96, up), "4.96");
        assert_eq!(shown(6.96, up), "6.96");
        assert_eq!(shown(7.0, up), "7.0");
        assert_eq!(shown(4.9999, up), "4.9999");
        assert_eq!(shown(4.99999999, up), "4.99999999");

        // 10 - 5.04 = 4.96, so a lower-is-better 5.04 needs attention.
        let down = Direction::LowerIsBetter;
        assert_eq!(shown(5.04, down), "5.04");
        assert_eq!(shown(2.0, down), "2.0");
    }

    #[test]
    fn shown_score_always_classifies_like_the_real_one() {
        for direction in [Direction::HigherIsBetter, Direction::LowerIsBetter] {
            for step in 0..=10_000 {
                let value = f64::from(step) / 1000.0;
                let text = shown(value, direction);
                let parsed: f64 = text.parse().unwrap();
                assert_eq!(
                    classify(Some(parsed), direction, CUTPOINTS, 10.0),
                    classify(Some(value), direction, CUTPOINTS, 10.0),
                    "{value} shown as {text}"
                );
            }
        }
    }

    #[test]
    fn report_row_for_score_just_below_growth() {
        let mut values = vec![Some(6.0); 23];
        values[2] = Some(5.0);
        values[12] = Some(5.0);
        values[21] = Some(4.88);
        let report = respondent(values);
        let text = build_report(&report, &ScoringConfig::default(), Local::now());

        assert!(text.contains("| Positive Emotion | 4.96 | needs attention | 3/3 |"));
    }

    #[test]
    fn report_shows_unknown_domains_as_not_available() {
        let mut values = vec![Some(6.0); 23];
        values[10] = None;
        let report = respondent(values);
        let text = build_report(&report, &ScoringConfig::default(), Local::now());

        assert!(text.contains("Respondent R-7"));
        assert!(text.contains("| Loneliness | not available | not available | 0/1 |"));
        assert!(text.contains("| Positive Emotion | 6.0 | moderate | 3/3 |"));
        assert!(text.contains("Not enough answers to score Loneliness"));
    }

    #[test]
    fn maintenance_framing_when_nothing_needs_attention() {
        let mut values = vec![Some(8.0); 23];
        for index in [3, 10, 13, 15] {
            values[index] = Some(2.0);
        }
        let report = respondent(values);
        let text = build_report(&report, &ScoringConfig::default(), Local::now());

        assert!(text.contains("No element stands out as needing attention."));
        assert!(text.contains("**Happiness**"));
        assert!(text.contains("## Keep In Mind"));
    }

    #[test]
    fn corrective_framing_lists_only_flagged_elements() {
        let mut values = vec![Some(6.0); 23];
        for index in [1, 9, 16] {
            values[index] = Some(2.0);
        }
        let report = respondent(values);
        let text = build_report(&report, &ScoringConfig::default(), Local::now());

        assert!(!text.contains("No element stands out"));
        assert!(text.contains("**Engagement**"));
        assert!(!text.contains("**Happiness**"));
    }

    #[test]
    fn json_export_keeps_unknown_as_null() {
        let mut values = vec![Some(6.0); 23];
        values[22] = None;
        let json = to_json(&[respondent(values)], Local::now()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        let domains = parsed["reports"][0]["domains"].as_array().unwrap();
        let happiness = domains.iter().find(|d| d["domain"] == "Hap").unwrap();
        assert!(happiness["score"].is_null());
        assert_eq!(happiness["tier"], "unknown");
    }
}
