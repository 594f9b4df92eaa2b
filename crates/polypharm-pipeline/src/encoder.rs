//! The embedding seam: anything that can turn a SMILES string into a
//! fixed-width vector can back the featurizer.

use polypharm_embed::ChemBertaEncoder;

use crate::Result;

/// Embedding backend used by [`crate::DrugFeaturizer`].
///
/// Implementations must be deterministic: the same SMILES string yields
/// the same vector for the lifetime of the process.
pub trait SmilesEncoder: Send + Sync {
    /// Width of every vector this encoder produces.
    fn dimension(&self) -> usize;

    /// Embeds one SMILES string.
    fn encode(&self, smiles: &str) -> Result<Vec<f32>>;
}

impl SmilesEncoder for ChemBertaEncoder {
    fn dimension(&self) -> usize {
        ChemBertaEncoder::dimension(self)
    }

    fn encode(&self, smiles: &str) -> Result<Vec<f32>> {
        Ok(ChemBertaEncoder::encode(self, smiles)?)
    }
}

/// Deterministic stand-in encoder for tests and offline runs.
///
/// Seeds a small generator from the SMILES bytes and expands it to the
/// requested width, so distinct structures get distinct vectors without
/// any model download.
pub struct MockSmilesEncoder {
    dimension: usize,
}

impl MockSmilesEncoder {
    pub fn new(dimension: usize) -> Self {
        MockSmilesEncoder { dimension }
    }
}

impl SmilesEncoder for MockSmilesEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, smiles: &str) -> Result<Vec<f32>> {
        let mut state = 0xcbf2_9ce4_8422_2325u64;
        for byte in smiles.bytes() {
            state = (state ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3);
        }
        let mut values = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
            values.push(unit * 2.0 - 1.0);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_is_deterministic_and_sized() {
        let encoder = MockSmilesEncoder::new(16);
        let a = encoder.encode("CCO").unwrap();
        let b = encoder.encode("CCO").unwrap();
        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
    }

    #[test]
    fn mock_separates_structures() {
        let encoder = MockSmilesEncoder::new(16);
        let a = encoder.encode("CCO").unwrap();
        let b = encoder.encode("CCC").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn mock_values_are_bounded() {
        let encoder = MockSmilesEncoder::new(64);
        let values = encoder.encode("c1ccccc1").unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }
}
