//! Thresholded probability scoring on top of the gradient-boosted model.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use polypharm_gbdt::Booster;

use crate::{PredictError, Result};

/// Decision threshold used when a call does not override it.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Outcome of scoring one hyperedge descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scored {
    pub probability: f64,
    pub interaction: bool,
}

/// Wraps the trained booster with the interaction decision rule.
pub struct InteractionScorer {
    booster: Booster,
    threshold: f64,
}

impl InteractionScorer {
    /// The default threshold must lie in `[0, 1]`; probabilities are
    /// compared against the effective threshold with `>=`.
    pub fn new(booster: Booster, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PredictError::Config(format!(
                "decision threshold must be within [0, 1], got {threshold}"
            )));
        }
        Ok(InteractionScorer { booster, threshold })
    }

    pub fn from_file(path: impl AsRef<Path>, threshold: f64) -> Result<Self> {
        let path = path.as_ref();
        let booster = Booster::from_file(path)
            .map_err(|e| PredictError::Config(format!("cannot load model {path:?}: {e}")))?;
        info!(path = %path.display(), threshold, "loaded interaction model");
        Self::new(booster, threshold)
    }

    /// Scores one descriptor. A `threshold` of `None` applies the
    /// configured default.
    pub fn score(&self, features: &[f32], threshold: Option<f64>) -> Result<Scored> {
        let probability = self.booster.predict(features)?;
        let threshold = threshold.unwrap_or(self.threshold);
        Ok(Scored {
            probability,
            interaction: probability >= threshold,
        })
    }

    /// Feature width the model expects.
    pub fn num_features(&self) -> usize {
        self.booster.num_features()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A single constant tree: raw score 2.0 regardless of input.
    const CONSTANT_MODEL: &str = "\
tree
num_class=1
max_feature_idx=3
objective=binary sigmoid:1

Tree=0
num_leaves=1
num_cat=0
split_feature=
threshold=
decision_type=
left_child=
right_child=
leaf_value=2.0

end of trees
";

    fn constant_booster() -> Booster {
        Booster::from_text(CONSTANT_MODEL).unwrap()
    }

    #[test]
    fn score_applies_sigmoid_and_default_threshold() {
        let scorer = InteractionScorer::new(constant_booster(), 0.5).unwrap();
        let scored = scorer.score(&[0.0; 4], None).unwrap();
        let expected = 1.0 / (1.0 + (-2.0f64).exp());
        assert!((scored.probability - expected).abs() < 1e-12);
        assert!(scored.interaction);
    }

    #[test]
    fn threshold_is_inclusive() {
        let scorer = InteractionScorer::new(constant_booster(), 0.5).unwrap();
        let p = scorer.score(&[0.0; 4], None).unwrap().probability;
        assert!(scorer.score(&[0.0; 4], Some(p)).unwrap().interaction);
        let above = (p + 1e-9).min(1.0);
        assert!(!scorer.score(&[0.0; 4], Some(above)).unwrap().interaction);
    }

    #[test]
    fn per_call_threshold_overrides_the_default() {
        let scorer = InteractionScorer::new(constant_booster(), 0.5).unwrap();
        // p is about 0.88, so a threshold of 1.0 flips the decision.
        assert!(!scorer.score(&[0.0; 4], Some(1.0)).unwrap().interaction);
        assert!(scorer.score(&[0.0; 4], Some(0.0)).unwrap().interaction);
        assert_eq!(scorer.threshold(), 0.5);
    }

    #[test]
    fn extreme_default_thresholds_are_allowed() {
        assert!(InteractionScorer::new(constant_booster(), 0.0).is_ok());
        assert!(InteractionScorer::new(constant_booster(), 1.0).is_ok());
    }

    fn constant_booster_at(leaf: f64) -> Booster {
        let text = CONSTANT_MODEL.replace("leaf_value=2.0", &format!("leaf_value={leaf}"));
        Booster::from_text(&text).unwrap()
    }

    #[test]
    fn zero_threshold_flags_vanishing_probabilities() {
        let scorer = InteractionScorer::new(constant_booster_at(-40.0), 0.0).unwrap();
        let scored = scorer.score(&[0.0; 4], None).unwrap();
        assert!(scored.probability > 0.0 && scored.probability < 1e-12);
        assert!(scored.interaction);
    }

    #[test]
    fn unit_threshold_needs_a_saturated_sigmoid() {
        // A raw score of 40 rounds the sigmoid to exactly 1.0 in f64.
        let scorer = InteractionScorer::new(constant_booster_at(40.0), 1.0).unwrap();
        let scored = scorer.score(&[0.0; 4], None).unwrap();
        assert_eq!(scored.probability, 1.0);
        assert!(scored.interaction);

        // Anything short of saturation stays below the unit threshold.
        let scorer = InteractionScorer::new(constant_booster_at(2.0), 1.0).unwrap();
        assert!(!scorer.score(&[0.0; 4], None).unwrap().interaction);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!(matches!(
            InteractionScorer::new(constant_booster(), 1.5),
            Err(PredictError::Config(_))
        ));
        assert!(matches!(
            InteractionScorer::new(constant_booster(), -0.1),
            Err(PredictError::Config(_))
        ));
    }

    #[test]
    fn num_features_comes_from_the_model() {
        let scorer = InteractionScorer::new(constant_booster(), 0.5).unwrap();
        assert_eq!(scorer.num_features(), 4);
    }
}
