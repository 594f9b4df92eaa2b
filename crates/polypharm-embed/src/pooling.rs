//! Pooling from token-level hidden states to one vector per sequence.

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// How the per-token hidden states collapse into a sequence embedding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub enum PoolingStrategy {
    /// Mean over all attended tokens, special tokens included. This is
    /// the recipe the interaction model's features were built with.
    #[default]
    Mean,

    /// First token (`<s>`) only.
    Cls,

    /// Elementwise max over attended tokens.
    Max,
}

impl PoolingStrategy {
    /// Collapses `hidden` of shape `(batch, seq_len, dim)` under an
    /// attention mask of shape `(batch, seq_len)` into `(batch, dim)`.
    pub fn apply(&self, hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            PoolingStrategy::Mean => masked_mean(hidden, attention_mask),
            PoolingStrategy::Cls => first_token(hidden),
            PoolingStrategy::Max => masked_max(hidden, attention_mask),
        }
    }
}

/// Mean over positions with a nonzero mask. The token count is clamped
/// away from zero so an all-padding row cannot divide by zero.
fn masked_mean(hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask_expanded = attention_mask.unsqueeze(2)?.expand(hidden.shape())?;
    let summed = (hidden * &mask_expanded)?.sum(1)?;
    let counts = attention_mask.sum_keepdim(1)?.clamp(1e-9f32, f32::MAX)?;
    summed.broadcast_div(&counts)
}

fn first_token(hidden: &Tensor) -> candle_core::Result<Tensor> {
    hidden.narrow(1, 0, 1)?.squeeze(1)
}

/// Max over attended positions. Padded positions are pushed far negative
/// before the reduction so they can never win.
fn masked_max(hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask_expanded = attention_mask.unsqueeze(2)?.expand(hidden.shape())?;
    let padding_penalty = ((mask_expanded.ones_like()? - &mask_expanded)? * (-1e9f64))?;
    let masked = (hidden + &padding_penalty)?;
    masked.max(1)
}

/// Scales each row to unit L2 norm; zero rows pass through unchanged
/// thanks to the clamped denominator.
pub fn l2_normalize(embeddings: &Tensor) -> candle_core::Result<Tensor> {
    let norms = embeddings.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-9f32, f32::MAX)?;
    embeddings.broadcast_div(&norms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn hidden_2x3x2() -> Tensor {
        // Two sequences of three tokens with 2-dim states. The final
        // token of the second sequence is padding.
        Tensor::from_vec(
            vec![
                1.0f32, 10.0, // seq 0, token 0
                2.0, 20.0, // seq 0, token 1
                3.0, 30.0, // seq 0, token 2
                4.0, -4.0, // seq 1, token 0
                8.0, -8.0, // seq 1, token 1
                999.0, 999.0, // seq 1, padding
            ],
            (2, 3, 2),
            &Device::Cpu,
        )
        .unwrap()
    }

    fn mask_2x3() -> Tensor {
        Tensor::from_vec(
            vec![1.0f32, 1.0, 1.0, 1.0, 1.0, 0.0],
            (2, 3),
            &Device::Cpu,
        )
        .unwrap()
    }

    #[test]
    fn mean_ignores_padding() {
        let pooled = masked_mean(&hidden_2x3x2(), &mask_2x3()).unwrap();
        let rows = pooled.to_vec2::<f32>().unwrap();
        assert!((rows[0][0] - 2.0).abs() < 1e-5);
        assert!((rows[0][1] - 20.0).abs() < 1e-5);
        assert!((rows[1][0] - 6.0).abs() < 1e-5);
        assert!((rows[1][1] - -6.0).abs() < 1e-5);
    }

    #[test]
    fn cls_takes_the_first_token() {
        let pooled = first_token(&hidden_2x3x2()).unwrap();
        let rows = pooled.to_vec2::<f32>().unwrap();
        assert_eq!(rows[0], vec![1.0, 10.0]);
        assert_eq!(rows[1], vec![4.0, -4.0]);
    }

    #[test]
    fn max_never_picks_padded_positions() {
        let pooled = masked_max(&hidden_2x3x2(), &mask_2x3()).unwrap();
        let rows = pooled.to_vec2::<f32>().unwrap();
        assert!((rows[0][0] - 3.0).abs() < 1e-5);
        assert!((rows[0][1] - 30.0).abs() < 1e-5);
        // The 999.0 padding state must lose to the real tokens.
        assert!((rows[1][0] - 8.0).abs() < 1e-5);
        assert!((rows[1][1] - -4.0).abs() < 1e-5);
    }

    #[test]
    fn l2_normalize_produces_unit_rows() {
        let embeddings = Tensor::from_vec(
            vec![0.0f32, 5.0, 12.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            (2, 4),
            &Device::Cpu,
        )
        .unwrap();
        let normalized = l2_normalize(&embeddings).unwrap();
        let rows = normalized.to_vec2::<f32>().unwrap();
        assert!((rows[0][1] - 5.0 / 13.0).abs() < 1e-5);
        assert!((rows[0][2] - 12.0 / 13.0).abs() < 1e-5);
        // The zero row stays finite.
        assert!(rows[1].iter().all(|v| v.is_finite()));
    }
}
