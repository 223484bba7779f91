use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;

use super::registry::{PatternRegistry, StepRecord};
use super::requirement::{ParsedRequirement, StepKeyword};

/// Per-step reuse recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    CreateNew,
    UseExistingExact,
    UseExistingSimilar,
    AdaptExisting,
}

/// One candidate record with its similarity to the analyzed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepMatch {
    pub record: StepRecord,
    pub similarity: f64,
}

/// Outcome of analyzing one step against the registry.
#[derive(Debug, Clone, Serialize)]
pub struct ReuseDecision {
    pub recommendation: Recommendation,

    /// Best candidate similarity, 0.0 when nothing cleared the floor.
    pub similarity: f64,

    /// Candidates above the relevance floor, best-first, capped.
    pub matches: Vec<StepMatch>,
}

impl ReuseDecision {
    fn create_new() -> Self {
        Self {
            recommendation: Recommendation::CreateNew,
            similarity: 0.0,
            matches: Vec::new(),
        }
    }

    pub fn best_match(&self) -> Option<&StepMatch> {
        self.matches.first()
    }
}

/// Ordered per-step summary for reports.
#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub keyword: StepKeyword,
    pub text: String,
    pub recommendation: Recommendation,
    pub similarity: f64,
}

/// Whole-requirement analysis: per-step decisions plus the aggregate score
/// that gates registry-informed adaptation.
#[derive(Debug, Clone, Serialize)]
pub struct RequirementAnalysis {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub steps: Vec<StepSummary>,

    /// Decision per distinct step text.
    pub decisions: HashMap<String, ReuseDecision>,

    /// Percentage (0-100) of steps with a non-create-new decision.
    pub reusability_score: f64,

    /// Whether the renderer should use registry-informed adaptation at all.
    pub adaptive: bool,
}

impl RequirementAnalysis {
    pub fn decision_for(&self, step_text: &str) -> Option<&ReuseDecision> {
        self.decisions.get(step_text)
    }
}

/// Computes reuse recommendations by ranking registry candidates with
/// normalized Levenshtein similarity against configured thresholds.
pub struct ReusabilityAnalyzer {
    config: AnalysisConfig,
}

impl ReusabilityAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Analyze a single step text against the registry.
    pub fn analyze_step(&self, step_text: &str, registry: &PatternRegistry) -> ReuseDecision {
        let query = step_text.to_lowercase();

        let mut matches: Vec<StepMatch> = registry
            .lookup(step_text)
            .into_iter()
            .filter(|record| !record.is_background)
            .filter_map(|record| {
                let score = similarity(&query, &record.text.to_lowercase());
                if score > self.config.candidate_floor {
                    Some(StepMatch {
                        record: record.clone(),
                        similarity: score,
                    })
                } else {
                    None
                }
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(self.config.max_candidates);

        let Some(best) = matches.first() else {
            return ReuseDecision::create_new();
        };

        let recommendation = if best.similarity > self.config.exact_threshold {
            Recommendation::UseExistingExact
        } else if best.similarity > self.config.similar_threshold {
            Recommendation::UseExistingSimilar
        } else {
            Recommendation::AdaptExisting
        };

        ReuseDecision {
            recommendation,
            similarity: best.similarity,
            matches,
        }
    }

    /// Analyze every step of a requirement and compute the aggregate score.
    pub fn analyze_requirement(
        &self,
        req: &ParsedRequirement,
        registry: &PatternRegistry,
    ) -> RequirementAnalysis {
        let mut decisions: HashMap<String, ReuseDecision> = HashMap::new();
        let mut steps: Vec<StepSummary> = Vec::new();
        let mut reusable = 0usize;
        let mut total = 0usize;

        for step in req.steps() {
            total += 1;
            let decision = decisions
                .entry(step.text.clone())
                .or_insert_with(|| self.analyze_step(&step.text, registry));

            if decision.recommendation != Recommendation::CreateNew {
                reusable += 1;
            }
            steps.push(StepSummary {
                keyword: step.keyword,
                text: step.text.clone(),
                recommendation: decision.recommendation,
                similarity: decision.similarity,
            });
        }

        let reusability_score = if total == 0 {
            0.0
        } else {
            (reusable as f64 / total as f64) * 100.0
        };
        let adaptive = reusability_score >= self.config.adaptive_floor;

        debug!(
            "Reusability score {:.1}% over {} steps (adaptive: {})",
            reusability_score, total, adaptive
        );

        RequirementAnalysis {
            title: req.title.clone(),
            generated_at: Utc::now(),
            steps,
            decisions,
            reusability_score,
            adaptive,
        }
    }
}

/// Normalized Levenshtein similarity: `(max_len - distance) / max_len`.
/// Defined as exactly 1.0 when either string is empty, so empty inputs never
/// divide by zero.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 1.0;
    }
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let max_len = a_len.max(b_len);
    let distance = levenshtein_distance(a, b);
    (max_len - distance) as f64 / max_len as f64
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b_len {
        matrix[0][j] = j;
    }

    for i in 1..=a_len {
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a_len][b_len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::parser::RequirementParser;
    use crate::core::registry::PatternRegistry;
    use std::path::Path;

    const STEP_FILE: &str = r#"
Given('Alex is logged into the application', async function () {
  await new LoginPage(this.page).performLogin();
});

When('Alex clicks "Submit" button', async function () {
  await new LoginPage(this.page).clickSubmit();
});
"#;

    fn fixture_registry(dir: &Path) -> PatternRegistry {
        std::fs::write(dir.join("login-steps.js"), STEP_FILE).unwrap();
        PatternRegistry::build(dir, &Config::default().registry).unwrap()
    }

    fn analyzer() -> ReusabilityAnalyzer {
        ReusabilityAnalyzer::new(&Config::default().analysis)
    }

    #[test]
    fn similarity_is_bounded_and_reflexive() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 1.0);

        let s = similarity("alex clicks submit", "alex uploads timesheet");
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn levenshtein_matches_known_distances() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
    }

    #[test]
    fn identical_text_is_exact_reuse() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = fixture_registry(tmp.path());

        let decision = analyzer().analyze_step("Alex clicks \"Submit\" button", &registry);
        assert_eq!(decision.recommendation, Recommendation::UseExistingExact);
        assert!(decision.similarity > 0.95);
        assert!(!decision.matches.is_empty());
    }

    #[test]
    fn near_text_is_similar_reuse() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = fixture_registry(tmp.path());

        // Two trailing chars off a 28-char text: similarity ~0.93.
        let decision = analyzer().analyze_step("Alex clicks \"Submit\" butt", &registry);
        assert_eq!(decision.recommendation, Recommendation::UseExistingSimilar);
        assert!(decision.similarity > 0.8 && decision.similarity <= 0.95);
    }

    #[test]
    fn loose_match_above_floor_is_adapt() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = fixture_registry(tmp.path());

        // "Cancel" vs "Submit" is six substitutions: similarity ~0.79.
        let decision = analyzer().analyze_step("Alex clicks \"Cancel\" button", &registry);
        assert_eq!(decision.recommendation, Recommendation::AdaptExisting);
        assert!(decision.similarity > 0.7 && decision.similarity <= 0.8);
    }

    #[test]
    fn nothing_above_floor_is_create_new() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = fixture_registry(tmp.path());

        let decision = analyzer().analyze_step("Alex downloads the annual report", &registry);
        assert_eq!(decision.recommendation, Recommendation::CreateNew);
        assert_eq!(decision.similarity, 0.0);
        assert!(decision.matches.is_empty());
    }

    #[test]
    fn background_records_never_compete() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = fixture_registry(tmp.path());

        // Identical to the background Given, which is excluded from
        // per-scenario candidates.
        let decision =
            analyzer().analyze_step("Alex is logged into the application", &registry);
        assert_eq!(decision.recommendation, Recommendation::CreateNew);
    }

    #[test]
    fn requirement_score_counts_reusable_steps() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = fixture_registry(tmp.path());

        let config = Config::default();
        let parser = RequirementParser::new(&config.generation).unwrap();
        let req = parser.parse(
            "# Login\nBDD Steps:\nWhen Alex clicks \"Submit\" button\nThen Alex downloads the annual report\n",
            "login.md",
        );

        let analysis = analyzer().analyze_requirement(&req, &registry);
        assert_eq!(analysis.steps.len(), 2);
        assert!((analysis.reusability_score - 50.0).abs() < f64::EPSILON);
        assert!(analysis.adaptive);
        assert_eq!(
            analysis.steps[0].recommendation,
            Recommendation::UseExistingExact
        );
        assert_eq!(analysis.steps[1].recommendation, Recommendation::CreateNew);
    }

    #[test]
    fn empty_registry_scores_zero_and_not_adaptive() {
        let config = Config::default();
        let registry =
            PatternRegistry::build(Path::new("/nonexistent"), &config.registry).unwrap();
        let parser = RequirementParser::new(&config.generation).unwrap();
        let req = parser.parse("# T\nGiven a brand new workflow\n", "t.md");

        let analysis = analyzer().analyze_requirement(&req, &registry);
        assert_eq!(analysis.reusability_score, 0.0);
        assert!(!analysis.adaptive);
    }
}
