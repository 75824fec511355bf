//! Promotion detection: filter, score, and rank classified operations.

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DetectorConfig, PromotionCandidate};
use crate::domain::ports::RecordStore;

use super::determinism::{DeterminismAnalyzer, OperationGroup};

/// Relative weight of determinism in the composite score.
const WEIGHT_DETERMINISM: f64 = 0.5;
/// Relative weight of log-scaled frequency.
const WEIGHT_FREQUENCY: f64 = 0.3;
/// Relative weight of normalized token savings.
const WEIGHT_SAVINGS: f64 = 0.2;

/// Detects promotable operations in the stored execution corpus.
pub struct PromotionDetector {
    analyzer: DeterminismAnalyzer,
    config: DetectorConfig,
}

impl PromotionDetector {
    /// Creates a detector over a store.
    pub fn new(store: Arc<dyn RecordStore>, config: DetectorConfig) -> Self {
        Self {
            analyzer: DeterminismAnalyzer::new(store),
            config,
        }
    }

    /// Analyzes the corpus and returns ranked promotion candidates.
    ///
    /// Only allow-listed tool names are eligible (unknown tool kinds are
    /// never auto-promotable), and only groups meeting the minimum
    /// determinism bar survive. Results are sorted by composite score
    /// descending, ties broken by frequency descending.
    pub async fn detect(&self) -> DomainResult<Vec<PromotionCandidate>> {
        let groups = self.analyzer.analyze_groups().await?;

        let mut candidates: Vec<PromotionCandidate> = groups
            .into_iter()
            .filter(|(_, op)| {
                self.config
                    .promotable_tools
                    .iter()
                    .any(|t| t == &op.tool_name)
            })
            .filter(|(_, op)| op.determinism >= self.config.min_determinism)
            .map(|(group, operation)| {
                let frequency = operation.observation_count;
                let savings = self.estimate_token_savings(&group);
                let composite_score = self.composite_score(operation.determinism, frequency, savings);

                PromotionCandidate {
                    tool_name: operation.tool_name.clone(),
                    frequency,
                    estimated_token_savings: savings,
                    composite_score,
                    meets_confidence: composite_score >= self.config.confidence_threshold,
                    operation,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.frequency.cmp(&a.frequency))
        });
        Ok(candidates)
    }

    /// Mean serialized input+output character length divided by the
    /// configured chars-per-token constant.
    fn estimate_token_savings(&self, group: &OperationGroup) -> f64 {
        if group.pairs.is_empty() {
            return 0.0;
        }
        let total_chars: usize = group
            .pairs
            .iter()
            .map(|pair| {
                let input_len = pair.input.to_string().len();
                let output_len = pair
                    .output
                    .as_ref()
                    .map(|o| o.to_string().len())
                    .unwrap_or(0);
                input_len + output_len
            })
            .sum();
        let mean_chars = total_chars as f64 / group.pairs.len() as f64;
        mean_chars / self.config.chars_per_token
    }

    /// Weighted combination of independently bounded factors. Each factor
    /// is clamped to [0, 1] before weighting, so the aggregate never
    /// exceeds 1 regardless of how large any single input grows.
    fn composite_score(&self, determinism: f64, frequency: u64, savings: f64) -> f64 {
        let determinism = determinism.clamp(0.0, 1.0);

        let freq_ceiling = (1.0 + self.config.frequency_cap as f64).ln();
        let norm_frequency = if freq_ceiling > 0.0 {
            ((1.0 + frequency as f64).ln() / freq_ceiling).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let norm_savings = (savings / self.config.savings_cap).clamp(0.0, 1.0);

        WEIGHT_DETERMINISM * determinism
            + WEIGHT_FREQUENCY * norm_frequency
            + WEIGHT_SAVINGS * norm_savings
    }
}
