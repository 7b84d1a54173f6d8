//! Heuristic quality scoring over the aggregated content
//!
//! Scores are heuristics, not measurements: cheap text statistics with
//! documented bands, meant to flag obvious problems before a human review.

use serde::{Deserialize, Serialize};

use crate::model::{BrandGuidelines, FinalContent};

const WEIGHT_READABILITY: f64 = 0.25;
const WEIGHT_SEO: f64 = 0.30;
const WEIGHT_BRAND: f64 = 0.25;
const WEIGHT_ORIGINALITY: f64 = 0.20;

/// Stubbed originality heuristic; a real plagiarism/similarity check is a
/// separate service
const ORIGINALITY_CONSTANT: f64 = 0.8;

/// Casual vocabulary penalized when the brand supplies no disallowed list
const DEFAULT_CASUAL_TERMS: [&str; 5] = ["gonna", "wanna", "stuff", "kinda", "basically"];

/// Quality sub-scores in [0, 1] plus threshold-driven recommendations.
/// Computed once after workflow completion, never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub overall: f64,
    pub readability: f64,
    pub seo: f64,
    pub brand_alignment: f64,
    pub originality: f64,
    pub recommendations: Vec<String>,
}

impl QualityReport {
    /// Sub-scores scaled x100 for display
    pub fn as_percentages(&self) -> [(&'static str, f64); 5] {
        [
            ("overall", self.overall * 100.0),
            ("readability", self.readability * 100.0),
            ("seo", self.seo * 100.0),
            ("brand_alignment", self.brand_alignment * 100.0),
            ("originality", self.originality * 100.0),
        ]
    }
}

/// Score the aggregated content against the brief's keywords and brand
/// guidelines
pub fn score_content(content: &FinalContent, guidelines: Option<&BrandGuidelines>) -> QualityReport {
    let readability = readability_score(&content.body);
    let seo = seo_score(content);
    let brand_alignment = brand_score(&content.body, guidelines);
    let originality = ORIGINALITY_CONSTANT;

    let overall = WEIGHT_READABILITY * readability
        + WEIGHT_SEO * seo
        + WEIGHT_BRAND * brand_alignment
        + WEIGHT_ORIGINALITY * originality;

    let mut recommendations = Vec::new();
    if readability < 0.7 {
        recommendations.push(
            "Readability is low: prefer sentences of 10-20 words and plainer wording".to_string(),
        );
    }
    if seo < 0.7 {
        recommendations.push(
            "SEO is weak: work target keywords into the body and tune title/summary lengths"
                .to_string(),
        );
    }
    if brand_alignment < 0.8 {
        recommendations
            .push("Brand alignment is off: match the approved vocabulary and drop casual terms"
                .to_string());
    }
    recommendations.push(overall_band(overall).to_string());

    QualityReport {
        overall,
        readability,
        seo,
        brand_alignment,
        originality,
        recommendations,
    }
}

fn overall_band(overall: f64) -> &'static str {
    if overall >= 0.9 {
        "Overall: excellent, ready for human review"
    } else if overall >= 0.75 {
        "Overall: good, minor polish recommended"
    } else if overall >= 0.6 {
        "Overall: fair, revise the flagged areas before publishing"
    } else {
        "Overall: below the quality bar, plan a substantial revision pass"
    }
}

/// Readability from average sentence length (ideal 10-20 words) and average
/// word length (ideal 4-6 characters); deviations penalize linearly.
/// Empty input scores 0; any non-empty input lands in [0.3, 1.0].
pub fn readability_score(text: &str) -> f64 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }

    let sentence_count = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);
    let avg_sentence_len = words.len() as f64 / sentence_count as f64;
    let avg_word_len =
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64;

    let mut score = 1.0;
    if avg_sentence_len < 10.0 {
        score -= (10.0 - avg_sentence_len) * 0.03;
    } else if avg_sentence_len > 20.0 {
        score -= (avg_sentence_len - 20.0) * 0.03;
    }
    if avg_word_len < 4.0 {
        score -= (4.0 - avg_word_len) * 0.1;
    } else if avg_word_len > 6.0 {
        score -= (avg_word_len - 6.0) * 0.1;
    }

    score.clamp(0.3, 1.0)
}

/// SEO heuristic: 0.7 base, +0.2 when keywords were supplied, up to +0.1
/// proportional to keyword coverage in the body, +0.1 each for a title of
/// 30-60 chars and a summary of 120-160 chars. Clamped to [0.3, 1.0].
pub fn seo_score(content: &FinalContent) -> f64 {
    let mut score = 0.7;

    if !content.keywords.is_empty() {
        score += 0.2;
        let body = content.body.to_lowercase();
        let covered = content
            .keywords
            .iter()
            .filter(|k| body.contains(&k.to_lowercase()))
            .count();
        score += 0.1 * covered as f64 / content.keywords.len() as f64;
    }

    let title_len = content.title.chars().count();
    if (30..=60).contains(&title_len) {
        score += 0.1;
    }
    let summary_len = content.summary.chars().count();
    if (120..=160).contains(&summary_len) {
        score += 0.1;
    }

    score.clamp(0.3, 1.0)
}

/// Brand alignment: 0.85 base, up to +0.1 proportional to approved-term
/// hits, -0.05 per distinct disallowed casual term found. Clamped to
/// [0.3, 1.0].
pub fn brand_score(body: &str, guidelines: Option<&BrandGuidelines>) -> f64 {
    let lower = body.to_lowercase();
    let mut score = 0.85;

    if let Some(guidelines) = guidelines {
        if !guidelines.approved_terms.is_empty() {
            let hits = guidelines
                .approved_terms
                .iter()
                .filter(|t| lower.contains(&t.to_lowercase()))
                .count();
            score += 0.1 * hits as f64 / guidelines.approved_terms.len() as f64;
        }
    }

    let disallowed: Vec<String> = match guidelines {
        Some(g) if !g.disallowed_terms.is_empty() => {
            g.disallowed_terms.iter().map(|t| t.to_lowercase()).collect()
        }
        _ => DEFAULT_CASUAL_TERMS.iter().map(|t| t.to_string()).collect(),
    };
    let violations = disallowed.iter().filter(|t| lower.contains(*t)).count();
    score -= 0.05 * violations as f64;

    score.clamp(0.3, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(title: &str, body: &str, summary: &str, keywords: &[&str]) -> FinalContent {
        FinalContent {
            title: title.to_string(),
            body: body.to_string(),
            summary: summary.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            social_posts: Vec::new(),
            landing_page: None,
        }
    }

    #[test]
    fn empty_text_scores_zero_readability() {
        assert_eq!(readability_score(""), 0.0);
        assert_eq!(readability_score("   \n  "), 0.0);
    }

    #[test]
    fn nonempty_text_stays_in_band() {
        for text in [
            "Hi.",
            "One two three four five six seven eight nine ten eleven twelve. Another sentence follows here nicely.",
            &"extraordinarily sesquipedalian ".repeat(40),
        ] {
            let score = readability_score(text);
            assert!((0.3..=1.0).contains(&score), "score {} for {:?}", score, text);
        }
    }

    #[test]
    fn ideal_prose_scores_high() {
        let text = "Modern marketing teams adopt automation tools to scale their reach quickly. \
                    These platforms handle routine work while people focus on creative strategy. \
                    Careful measurement shows which channels actually drive returns over time.";
        assert!(readability_score(text) > 0.9);
    }

    #[test]
    fn seo_rewards_keywords_and_lengths() {
        let with = content(
            "A Practical Guide to AI Marketing Tools",           // 39 chars
            "AI marketing helps teams automate campaigns and personalize outreach.",
            &"s".repeat(130),
            &["AI marketing", "automation"],
        );
        let without = content("t", "body text", "short", &[]);
        assert!(seo_score(&with) > seo_score(&without));
        assert!((0.3..=1.0).contains(&seo_score(&with)));
    }

    #[test]
    fn brand_penalizes_casual_terms() {
        let clean = brand_score("We deliver measurable outcomes for enterprise teams.", None);
        let casual = brand_score("We're gonna do stuff that basically works.", None);
        assert!(casual < clean);
    }

    #[test]
    fn brand_rewards_approved_terms() {
        let guidelines = BrandGuidelines {
            voice: None,
            approved_terms: vec!["Acme Cloud".to_string(), "secure by design".to_string()],
            disallowed_terms: vec![],
        };
        let aligned = brand_score("Acme Cloud is secure by design.", Some(&guidelines));
        let neutral = brand_score("A product description.", Some(&guidelines));
        assert!(aligned > neutral);
    }

    #[test]
    fn overall_is_the_documented_weighted_sum() {
        let content = content(
            "A Practical Guide to AI Marketing Tools",
            "AI marketing helps teams automate campaigns and personalize outreach at scale today.",
            &"m".repeat(140),
            &["AI marketing"],
        );
        let report = score_content(&content, None);
        let expected = 0.25 * report.readability
            + 0.30 * report.seo
            + 0.25 * report.brand_alignment
            + 0.20 * report.originality;
        assert!((report.overall - expected).abs() < 1e-9);
        assert_eq!(report.originality, 0.8);
    }

    #[test]
    fn recommendations_end_with_a_summary_band() {
        let report = score_content(&content("t", "short body.", "s", &[]), None);
        assert!(!report.recommendations.is_empty());
        assert!(report
            .recommendations
            .last()
            .unwrap()
            .starts_with("Overall:"));
    }

    #[test]
    fn percentages_scale_by_one_hundred() {
        let report = QualityReport {
            overall: 0.8,
            readability: 0.9,
            seo: 0.7,
            brand_alignment: 0.85,
            originality: 0.8,
            recommendations: vec![],
        };
        assert_eq!(report.as_percentages()[0], ("overall", 80.0));
    }
}
