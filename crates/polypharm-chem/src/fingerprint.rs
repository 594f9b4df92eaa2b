//! Morgan-style circular fingerprints.
//!
//! Implements the ECFP scheme: every atom starts from a local invariant,
//! then each round folds in the sorted identifiers of its neighbors, and
//! all identifiers seen at any radius are hashed into a fixed-width bit
//! vector.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::molecule::Molecule;

/// Fingerprint parameters. The defaults, radius 2 over 2048 bits, are the
/// ECFP4-equivalent setting the interaction model was trained against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FingerprintConfig {
    pub radius: usize,
    pub n_bits: usize,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        FingerprintConfig {
            radius: 2,
            n_bits: 2048,
        }
    }
}

/// Stateless fingerprint generator. Cheap to construct and safe to share.
#[derive(Debug, Clone)]
pub struct MorganFingerprinter {
    config: FingerprintConfig,
}

impl MorganFingerprinter {
    pub fn new(config: FingerprintConfig) -> Self {
        MorganFingerprinter { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FingerprintConfig::default())
    }

    /// Output vector width in bits.
    pub fn len(&self) -> usize {
        self.config.n_bits
    }

    pub fn is_empty(&self) -> bool {
        self.config.n_bits == 0
    }

    /// Computes the binary fingerprint as a dense `f32` vector of 0.0/1.0
    /// values, ready to concatenate with learned embeddings.
    pub fn fingerprint(&self, mol: &Molecule) -> Vec<f32> {
        if self.config.n_bits == 0 {
            return Vec::new();
        }

        let mut identifiers: Vec<u64> = (0..mol.atom_count())
            .map(|idx| initial_invariant(mol, idx))
            .collect();
        let mut features: HashSet<u64> = identifiers.iter().copied().collect();

        for _ in 0..self.config.radius {
            let mut next = Vec::with_capacity(identifiers.len());
            for idx in 0..mol.atom_count() {
                let mut env: Vec<(u8, u64)> = mol
                    .neighbors(idx)
                    .map(|(nbr, bond)| (bond.order.code(), identifiers[nbr]))
                    .collect();
                env.sort_unstable();
                let mut hasher = Fnv1a::new();
                hasher.write_u64(identifiers[idx]);
                for (code, id) in env {
                    hasher.write_u8(code);
                    hasher.write_u64(id);
                }
                next.push(hasher.finish());
            }
            identifiers = next;
            features.extend(identifiers.iter().copied());
        }

        let mut bits = vec![0.0f32; self.config.n_bits];
        for feature in &features {
            bits[(feature % self.config.n_bits as u64) as usize] = 1.0;
        }
        debug!(
            atoms = mol.atom_count(),
            bits_set = bits.iter().filter(|&&b| b > 0.0).count(),
            "fingerprinted molecule"
        );
        bits
    }
}

/// Radius-zero identifier: element, connectivity, hydrogen count, charge,
/// isotope, aromaticity and ring membership.
fn initial_invariant(mol: &Molecule, idx: usize) -> u64 {
    let atom = mol.atom(idx);
    let mut hasher = Fnv1a::new();
    hasher.write_u8(atom.atomic_number);
    hasher.write_u8(mol.degree(idx) as u8);
    hasher.write_u8(atom.total_hydrogens());
    hasher.write_u8((atom.formal_charge as i16 + 128) as u8);
    hasher.write_u16(atom.isotope.unwrap_or(0));
    hasher.write_u8(atom.aromatic as u8);
    hasher.write_u8(mol.in_ring(idx) as u8);
    hasher.finish()
}

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// 64-bit FNV-1a. `std`'s default hasher is free to change between
/// releases, and fingerprints must stay bit-identical across builds and
/// platforms, so the hash is pinned here.
struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Fnv1a(FNV_OFFSET)
    }

    fn write_u8(&mut self, byte: u8) {
        self.0 ^= byte as u64;
        self.0 = self.0.wrapping_mul(FNV_PRIME);
    }

    fn write_u16(&mut self, value: u16) {
        for byte in value.to_le_bytes() {
            self.write_u8(byte);
        }
    }

    fn write_u64(&mut self, value: u64) {
        for byte in value.to_le_bytes() {
            self.write_u8(byte);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    #[test]
    fn output_is_binary_and_sized() {
        let mol = parse_smiles("CC(=O)Oc1ccccc1C(=O)O").unwrap();
        let fp = MorganFingerprinter::with_defaults().fingerprint(&mol);
        assert_eq!(fp.len(), 2048);
        assert!(fp.iter().all(|&b| b == 0.0 || b == 1.0));
        assert!(fp.iter().any(|&b| b == 1.0));
    }

    #[test]
    fn same_structure_same_bits() {
        let fper = MorganFingerprinter::with_defaults();
        let a = fper.fingerprint(&parse_smiles("CCO").unwrap());
        let b = fper.fingerprint(&parse_smiles("CCO").unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn different_structures_differ() {
        let fper = MorganFingerprinter::with_defaults();
        let ethanol = fper.fingerprint(&parse_smiles("CCO").unwrap());
        let propane = fper.fingerprint(&parse_smiles("CCC").unwrap());
        assert_ne!(ethanol, propane);
    }

    #[test]
    fn ring_membership_separates_cyclohexane_from_hexane() {
        let fper = MorganFingerprinter::with_defaults();
        let ring = fper.fingerprint(&parse_smiles("C1CCCCC1").unwrap());
        let chain = fper.fingerprint(&parse_smiles("CCCCCC").unwrap());
        assert_ne!(ring, chain);
    }

    #[test]
    fn radius_widens_the_environment() {
        let mol = parse_smiles("CCCO").unwrap();
        let narrow = MorganFingerprinter::new(FingerprintConfig { radius: 0, n_bits: 2048 })
            .fingerprint(&mol);
        let wide = MorganFingerprinter::with_defaults().fingerprint(&mol);
        assert_ne!(narrow, wide);
    }

    #[test]
    fn benzene_symmetry_collapses_to_few_features() {
        // All six atoms are equivalent, so each radius contributes exactly
        // one identifier: at most three bits for radius 2.
        let mol = parse_smiles("c1ccccc1").unwrap();
        let fp = MorganFingerprinter::with_defaults().fingerprint(&mol);
        let set = fp.iter().filter(|&&b| b > 0.0).count();
        assert!(set >= 1 && set <= 3, "expected 1..=3 bits, got {set}");
    }

    #[test]
    fn zero_width_config_yields_empty_vector() {
        let mol = parse_smiles("CCO").unwrap();
        let fp = MorganFingerprinter::new(FingerprintConfig { radius: 2, n_bits: 0 })
            .fingerprint(&mol);
        assert!(fp.is_empty());
    }
}
