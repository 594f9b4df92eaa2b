//! SMILES parser.
//!
//! Covers the organic subset with aromatic lowercase forms, bracket atoms
//! (isotope, chirality, hydrogen count, charge, atom class), branches, ring
//! closures including `%nn`, explicit bond symbols and dot-separated
//! fragments. Chirality and directional bond marks are accepted and
//! discarded: downstream fingerprints are constitution-only.

use std::collections::HashMap;

use crate::molecule::{
    atomic_number_of, default_valences, symbol_of, Atom, Bond, BondOrder, Molecule,
};
use crate::{ChemError, Result};

/// Parses a single SMILES string into a [`Molecule`].
pub fn parse_smiles(input: &str) -> Result<Molecule> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ChemError::Empty);
    }
    Parser::new(trimmed).run()
}

/// Atom fields gathered during the scan, before implicit hydrogens are
/// assigned.
struct PendingAtom {
    atomic_number: u8,
    aromatic: bool,
    formal_charge: i8,
    isotope: Option<u16>,
    bracket: bool,
    explicit_h: u8,
}

struct RingOpen {
    atom: usize,
    bond: Option<BondOrder>,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    atoms: Vec<PendingAtom>,
    bonds: Vec<Bond>,
    prev: Option<usize>,
    branch_stack: Vec<Option<usize>>,
    pending_bond: Option<(BondOrder, usize)>,
    ring: HashMap<u16, RingOpen>,
}

impl Parser {
    fn new(input: &str) -> Self {
        Parser {
            chars: input.chars().collect(),
            pos: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
            prev: None,
            branch_stack: Vec::new(),
            pending_bond: None,
            ring: HashMap::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn run(mut self) -> Result<Molecule> {
        while let Some(ch) = self.peek() {
            match ch {
                '(' => {
                    if let Some((_, pos)) = self.pending_bond {
                        return Err(ChemError::DanglingBond { pos });
                    }
                    if self.prev.is_none() {
                        return Err(ChemError::UnexpectedChar { ch, pos: self.pos });
                    }
                    self.branch_stack.push(self.prev);
                    self.pos += 1;
                }
                ')' => {
                    if let Some((_, pos)) = self.pending_bond {
                        return Err(ChemError::DanglingBond { pos });
                    }
                    match self.branch_stack.pop() {
                        Some(restore) => self.prev = restore,
                        None => {
                            return Err(ChemError::UnmatchedBranchClose { pos: self.pos });
                        }
                    }
                    self.pos += 1;
                }
                '-' | '=' | '#' | ':' | '/' | '\\' => {
                    if self.pending_bond.is_some() {
                        return Err(ChemError::UnexpectedChar { ch, pos: self.pos });
                    }
                    if self.prev.is_none() {
                        return Err(ChemError::BondWithoutAtom { pos: self.pos });
                    }
                    let order = match ch {
                        '=' => BondOrder::Double,
                        '#' => BondOrder::Triple,
                        ':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    };
                    self.pending_bond = Some((order, self.pos));
                    self.pos += 1;
                }
                '.' => {
                    if let Some((_, pos)) = self.pending_bond {
                        return Err(ChemError::DanglingBond { pos });
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                '0'..='9' => {
                    let digit = (ch as u8 - b'0') as u16;
                    self.pos += 1;
                    self.close_or_open_ring(digit)?;
                }
                '%' => {
                    self.pos += 1;
                    let digit = self.two_digit_ring_number()?;
                    self.close_or_open_ring(digit)?;
                }
                '[' => {
                    let atom = self.bracket_atom()?;
                    self.add_atom(atom)?;
                }
                '*' => {
                    self.pos += 1;
                    self.add_atom(PendingAtom {
                        atomic_number: 0,
                        aromatic: false,
                        formal_charge: 0,
                        isotope: None,
                        bracket: false,
                        explicit_h: 0,
                    })?;
                }
                'A'..='Z' | 'a'..='z' => {
                    let atom = self.organic_subset_atom()?;
                    self.add_atom(atom)?;
                }
                _ => {
                    return Err(ChemError::UnexpectedChar { ch, pos: self.pos });
                }
            }
        }
        self.finish()
    }

    fn two_digit_ring_number(&mut self) -> Result<u16> {
        let mut value = 0u16;
        for _ in 0..2 {
            match self.peek() {
                Some(ch @ '0'..='9') => {
                    value = value * 10 + (ch as u8 - b'0') as u16;
                    self.pos += 1;
                }
                other => {
                    return Err(ChemError::UnexpectedChar {
                        ch: other.unwrap_or('%'),
                        pos: self.pos,
                    });
                }
            }
        }
        Ok(value)
    }

    /// A ring-closure digit bonds the previous atom to whichever atom
    /// opened the same number, or records a new opening. The chain head
    /// does not advance.
    fn close_or_open_ring(&mut self, digit: u16) -> Result<()> {
        let current = match self.prev {
            Some(idx) => idx,
            None => return Err(ChemError::BondWithoutAtom { pos: self.pos - 1 }),
        };
        let pending = self.pending_bond.take().map(|(order, _)| order);
        match self.ring.remove(&digit) {
            Some(open) => {
                if open.atom == current {
                    return Err(ChemError::RingBondToSelf { digit });
                }
                let order = match (open.bond, pending) {
                    (None, None) => self.default_bond_order(open.atom, current),
                    (Some(order), None) | (None, Some(order)) => order,
                    (Some(a), Some(b)) if a == b => a,
                    (Some(_), Some(_)) => {
                        return Err(ChemError::ConflictingRingBond { digit });
                    }
                };
                if self.has_bond(open.atom, current) {
                    return Err(ChemError::ConflictingRingBond { digit });
                }
                self.bonds.push(Bond {
                    atom1: open.atom,
                    atom2: current,
                    order,
                });
            }
            None => {
                self.ring.insert(
                    digit,
                    RingOpen {
                        atom: current,
                        bond: pending,
                    },
                );
            }
        }
        Ok(())
    }

    fn has_bond(&self, a: usize, b: usize) -> bool {
        self.bonds
            .iter()
            .any(|bond| (bond.atom1 == a && bond.atom2 == b) || (bond.atom1 == b && bond.atom2 == a))
    }

    /// A bare bond between two aromatic atoms is aromatic; everything else
    /// defaults to single.
    fn default_bond_order(&self, a: usize, b: usize) -> BondOrder {
        if self.atoms[a].aromatic && self.atoms[b].aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn add_atom(&mut self, atom: PendingAtom) -> Result<()> {
        let idx = self.atoms.len();
        self.atoms.push(atom);
        if let Some(prev) = self.prev {
            let order = match self.pending_bond.take() {
                Some((order, _)) => order,
                None => self.default_bond_order(prev, idx),
            };
            self.bonds.push(Bond {
                atom1: prev,
                atom2: idx,
                order,
            });
        }
        self.prev = Some(idx);
        Ok(())
    }

    /// Parses one atom written without brackets. Only the organic subset
    /// may appear bare; a recognized element outside it gets a pointed
    /// error instead of a generic one.
    fn organic_subset_atom(&mut self) -> Result<PendingAtom> {
        let start = self.pos;
        let first = match self.bump() {
            Some(ch) => ch,
            None => return Err(ChemError::Empty),
        };
        // Two-letter halogens take priority over single-letter matches.
        if first == 'C' && self.peek() == Some('l') {
            self.pos += 1;
            return Ok(plain_atom(17, false));
        }
        if first == 'B' && self.peek() == Some('r') {
            self.pos += 1;
            return Ok(plain_atom(35, false));
        }
        let atomic_number = match first {
            'B' => Some((5, false)),
            'C' => Some((6, false)),
            'N' => Some((7, false)),
            'O' => Some((8, false)),
            'P' => Some((15, false)),
            'S' => Some((16, false)),
            'F' => Some((9, false)),
            'I' => Some((53, false)),
            'b' => Some((5, true)),
            'c' => Some((6, true)),
            'n' => Some((7, true)),
            'o' => Some((8, true)),
            'p' => Some((15, true)),
            's' => Some((16, true)),
            _ => None,
        };
        if let Some((number, aromatic)) = atomic_number {
            return Ok(plain_atom(number, aromatic));
        }
        // Not organic subset: report whether brackets would fix it.
        let mut symbol = first.to_string();
        if let Some(next @ 'a'..='z') = self.peek() {
            symbol.push(next);
        }
        if atomic_number_of(&symbol).is_some() || atomic_number_of(&first.to_string()).is_some() {
            Err(ChemError::ElementRequiresBrackets { symbol, pos: start })
        } else {
            Err(ChemError::UnknownElement { symbol, pos: start })
        }
    }

    /// Parses `[isotope? symbol chiral? hcount? charge? class?]`.
    fn bracket_atom(&mut self) -> Result<PendingAtom> {
        let open = self.pos;
        self.pos += 1;

        let isotope = self.digits_u16();

        let (atomic_number, aromatic) = self.bracket_symbol(open)?;

        // Chirality marks are parsed and dropped.
        while self.peek() == Some('@') {
            self.pos += 1;
        }

        let mut explicit_h = 0u8;
        if self.peek() == Some('H') {
            self.pos += 1;
            explicit_h = self.digits_u16().map(|n| n.min(9) as u8).unwrap_or(1);
        }

        let formal_charge = self.bracket_charge();

        // Atom class, e.g. [CH4:2]; the label carries no chemistry.
        if self.peek() == Some(':') {
            self.pos += 1;
            let _ = self.digits_u16();
        }

        match self.bump() {
            Some(']') => Ok(PendingAtom {
                atomic_number,
                aromatic,
                formal_charge,
                isotope,
                bracket: true,
                explicit_h,
            }),
            _ => Err(ChemError::UnclosedBracket { pos: open }),
        }
    }

    fn bracket_symbol(&mut self, open: usize) -> Result<(u8, bool)> {
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                Ok((0, false))
            }
            Some(first @ 'A'..='Z') => {
                self.pos += 1;
                let mut symbol = first.to_string();
                if let Some(next @ 'a'..='z') = self.peek() {
                    let two: String = [first, next].iter().collect();
                    if atomic_number_of(&two).is_some() {
                        symbol = two;
                        self.pos += 1;
                    }
                }
                match atomic_number_of(&symbol) {
                    Some(number) => Ok((number, false)),
                    None => Err(ChemError::UnknownElement {
                        symbol,
                        pos: self.pos - 1,
                    }),
                }
            }
            Some(first @ 'a'..='z') => {
                self.pos += 1;
                // Aromatic selenium and arsenic are the only two-letter forms.
                if let Some(next @ 'a'..='z') = self.peek() {
                    let two: String = [first, next].iter().collect();
                    if two == "se" {
                        self.pos += 1;
                        return Ok((34, true));
                    }
                    if two == "as" {
                        self.pos += 1;
                        return Ok((33, true));
                    }
                }
                match first {
                    'b' => Ok((5, true)),
                    'c' => Ok((6, true)),
                    'n' => Ok((7, true)),
                    'o' => Ok((8, true)),
                    'p' => Ok((15, true)),
                    's' => Ok((16, true)),
                    _ => Err(ChemError::UnknownElement {
                        symbol: first.to_string(),
                        pos: self.pos - 1,
                    }),
                }
            }
            _ => Err(ChemError::UnclosedBracket { pos: open }),
        }
    }

    fn digits_u16(&mut self) -> Option<u16> {
        let mut seen = false;
        let mut value = 0u16;
        while let Some(ch @ '0'..='9') = self.peek() {
            seen = true;
            value = value.saturating_mul(10).saturating_add((ch as u8 - b'0') as u16);
            self.pos += 1;
        }
        seen.then_some(value)
    }

    fn bracket_charge(&mut self) -> i8 {
        let sign = match self.peek() {
            Some('+') => 1i8,
            Some('-') => -1i8,
            _ => return 0,
        };
        let symbol = if sign > 0 { '+' } else { '-' };
        self.pos += 1;
        if let Some(mag) = self.digits_u16() {
            return sign.saturating_mul(mag.min(15) as i8);
        }
        let mut magnitude = 1i8;
        while self.peek() == Some(symbol) {
            magnitude = magnitude.saturating_add(1).min(15);
            self.pos += 1;
        }
        sign * magnitude
    }

    fn finish(self) -> Result<Molecule> {
        if let Some((_, pos)) = self.pending_bond {
            return Err(ChemError::DanglingBond { pos });
        }
        if !self.branch_stack.is_empty() {
            return Err(ChemError::UnclosedBranch);
        }
        if let Some(&digit) = self.ring.keys().min() {
            return Err(ChemError::UnclosedRingBond { digit });
        }

        // Per-atom valence totals: half-units keep aromatic (1.5) bonds in
        // integer arithmetic; the plain sum counts aromatic bonds as one.
        let mut half_units = vec![0u32; self.atoms.len()];
        let mut plain_sum = vec![0u32; self.atoms.len()];
        for bond in &self.bonds {
            for idx in [bond.atom1, bond.atom2] {
                half_units[idx] += bond.order.valence_half_units();
                plain_sum[idx] += match bond.order {
                    BondOrder::Single | BondOrder::Aromatic => 1,
                    BondOrder::Double => 2,
                    BondOrder::Triple => 3,
                };
            }
        }

        let mut atoms = Vec::with_capacity(self.atoms.len());
        for (idx, pending) in self.atoms.into_iter().enumerate() {
            let implicit = implicit_hydrogens(&pending, half_units[idx], plain_sum[idx])?;
            atoms.push(Atom {
                atomic_number: pending.atomic_number,
                formal_charge: pending.formal_charge,
                isotope: pending.isotope,
                aromatic: pending.aromatic,
                implicit_hydrogens: implicit,
                explicit_hydrogens: pending.explicit_h,
            });
        }
        Ok(Molecule::new(atoms, self.bonds))
    }
}

fn plain_atom(atomic_number: u8, aromatic: bool) -> PendingAtom {
    PendingAtom {
        atomic_number,
        aromatic,
        formal_charge: 0,
        isotope: None,
        bracket: false,
        explicit_h: 0,
    }
}

/// Implicit hydrogen count under default valence rules, plus the valence
/// sanity check.
///
/// Bracket atoms carry exactly the hydrogens they declare; their check is
/// lenient by the magnitude of the formal charge, and elements without
/// default valences (metals, wildcards) are taken at face value. Aromatic
/// atoms count ring bonds as one each plus one pi bond for C, N and P,
/// which reproduces the usual readings of benzene, pyridine, furan and
/// thiophene without kekulization.
fn implicit_hydrogens(pending: &PendingAtom, half_units: u32, plain_sum: u32) -> Result<u8> {
    let valences = match default_valences(pending.atomic_number) {
        Some(v) => v,
        None => return Ok(0),
    };

    if pending.bracket {
        let total = plain_sum + pending.explicit_h as u32;
        let allowed = valences.last().copied().unwrap_or(0) + pending.formal_charge.unsigned_abs() as u32;
        if total > allowed {
            return Err(ChemError::ValenceExceeded {
                symbol: symbol_of(pending.atomic_number).to_string(),
                total,
            });
        }
        return Ok(0);
    }

    if pending.aromatic {
        let pi_bonus = match pending.atomic_number {
            6 | 7 | 15 => 1,
            _ => 0,
        };
        let effective = plain_sum + pi_bonus;
        let lowest = valences.first().copied().unwrap_or(0);
        return Ok(lowest.saturating_sub(effective) as u8);
    }

    let effective = half_units.div_ceil(2);
    for &valence in valences {
        if valence >= effective {
            return Ok((valence - effective) as u8);
        }
    }
    Err(ChemError::ValenceExceeded {
        symbol: symbol_of(pending.atomic_number).to_string(),
        total: effective,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ethanol_atoms_and_hydrogens() {
        let mol = parse_smiles("CCO").unwrap();
        assert_eq!(mol.atom_count(), 3);
        assert_eq!(mol.bond_count(), 2);
        assert_eq!(mol.atom(0).implicit_hydrogens, 3);
        assert_eq!(mol.atom(1).implicit_hydrogens, 2);
        assert_eq!(mol.atom(2).implicit_hydrogens, 1);
    }

    #[test]
    fn benzene_is_aromatic_ring() {
        let mol = parse_smiles("c1ccccc1").unwrap();
        assert_eq!(mol.atom_count(), 6);
        assert_eq!(mol.bond_count(), 6);
        for idx in 0..6 {
            let atom = mol.atom(idx);
            assert!(atom.aromatic);
            assert_eq!(atom.implicit_hydrogens, 1);
            assert!(mol.in_ring(idx));
        }
        assert!(mol.bonds().iter().all(|b| b.order == BondOrder::Aromatic));
    }

    #[test]
    fn aspirin_graph_shape() {
        let mol = parse_smiles("CC(=O)Oc1ccccc1C(=O)O").unwrap();
        assert_eq!(mol.atom_count(), 13);
        assert_eq!(mol.bond_count(), 13);
        let ring_atoms = (0..13).filter(|&i| mol.in_ring(i)).count();
        assert_eq!(ring_atoms, 6);
    }

    #[test]
    fn bracket_atom_fields() {
        let mol = parse_smiles("[NH4+]").unwrap();
        let atom = mol.atom(0);
        assert_eq!(atom.atomic_number, 7);
        assert_eq!(atom.formal_charge, 1);
        assert_eq!(atom.explicit_hydrogens, 4);
        assert_eq!(atom.implicit_hydrogens, 0);
    }

    #[test]
    fn isotope_label() {
        let mol = parse_smiles("[13CH4]").unwrap();
        assert_eq!(mol.atom(0).isotope, Some(13));
        assert_eq!(mol.atom(0).explicit_hydrogens, 4);
    }

    #[test]
    fn repeated_charge_signs_cap_like_digits() {
        let piled = format!("[C{}]", "-".repeat(130));
        assert_eq!(parse_smiles(&piled).unwrap().atom(0).formal_charge, -15);
        assert_eq!(parse_smiles("[C+99]").unwrap().atom(0).formal_charge, 15);
    }

    #[test]
    fn salt_fragments_stay_disconnected() {
        let mol = parse_smiles("[Na+].[Cl-]").unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 0);
        assert_eq!(mol.atom(0).formal_charge, 1);
        assert_eq!(mol.atom(1).formal_charge, -1);
    }

    #[test]
    fn pyridine_nitrogen_has_no_hydrogen() {
        let mol = parse_smiles("c1ccncc1").unwrap();
        let n = mol.atoms().iter().find(|a| a.atomic_number == 7).unwrap();
        assert_eq!(n.total_hydrogens(), 0);
    }

    #[test]
    fn pyrrole_nitrogen_keeps_declared_hydrogen() {
        let mol = parse_smiles("c1cc[nH]c1").unwrap();
        let n = mol.atoms().iter().find(|a| a.atomic_number == 7).unwrap();
        assert_eq!(n.total_hydrogens(), 1);
    }

    #[test]
    fn furan_oxygen_has_no_hydrogen() {
        let mol = parse_smiles("c1ccoc1").unwrap();
        let o = mol.atoms().iter().find(|a| a.atomic_number == 8).unwrap();
        assert_eq!(o.total_hydrogens(), 0);
    }

    #[test]
    fn hypervalent_nitro_parses() {
        let mol = parse_smiles("CN(=O)=O").unwrap();
        let n = mol.atoms().iter().find(|a| a.atomic_number == 7).unwrap();
        assert_eq!(n.total_hydrogens(), 0);
    }

    #[test]
    fn chirality_marks_are_ignored() {
        let mol = parse_smiles("C[C@H](N)C(=O)O").unwrap();
        assert_eq!(mol.atom_count(), 6);
        assert_eq!(mol.atom(1).explicit_hydrogens, 1);
    }

    #[test]
    fn ring_closure_bond_order_can_sit_on_either_side() {
        let mol = parse_smiles("C=1CCCCC=1").unwrap();
        assert_eq!(mol.bond_count(), 6);
        let closure = mol
            .bonds()
            .iter()
            .find(|b| b.atom1 == 0 && b.atom2 == 5)
            .unwrap();
        assert_eq!(closure.order, BondOrder::Double);
    }

    #[test]
    fn percent_ring_closure() {
        let mol = parse_smiles("C%10CCCCC%10").unwrap();
        assert_eq!(mol.atom_count(), 6);
        assert!(mol.in_ring(0));
    }

    #[test]
    fn directional_bonds_read_as_single() {
        let mol = parse_smiles("F/C=C/F").unwrap();
        assert_eq!(mol.atom_count(), 4);
        assert_eq!(mol.bond_count(), 3);
    }

    #[test]
    fn identical_inputs_parse_to_equal_molecules() {
        assert_eq!(parse_smiles("c1ccccc1O"), parse_smiles("c1ccccc1O"));
        assert_ne!(parse_smiles("CCO"), parse_smiles("CCN"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(parse_smiles(""), Err(ChemError::Empty));
        assert_eq!(parse_smiles("   "), Err(ChemError::Empty));
    }

    #[test]
    fn unclosed_ring_is_rejected() {
        assert_eq!(
            parse_smiles("C1CC"),
            Err(ChemError::UnclosedRingBond { digit: 1 })
        );
    }

    #[test]
    fn branch_errors_are_rejected() {
        assert_eq!(parse_smiles("C(C"), Err(ChemError::UnclosedBranch));
        assert!(matches!(
            parse_smiles("CC)"),
            Err(ChemError::UnmatchedBranchClose { .. })
        ));
    }

    #[test]
    fn unknown_and_bare_metal_symbols() {
        assert!(matches!(
            parse_smiles("Xx"),
            Err(ChemError::UnknownElement { .. })
        ));
        assert!(matches!(
            parse_smiles("K"),
            Err(ChemError::ElementRequiresBrackets { .. })
        ));
    }

    #[test]
    fn valence_overflow_is_rejected() {
        assert!(matches!(
            parse_smiles("CC(C)(C)(C)C"),
            Err(ChemError::ValenceExceeded { .. })
        ));
        assert!(matches!(
            parse_smiles("[CH5]"),
            Err(ChemError::ValenceExceeded { .. })
        ));
    }

    #[test]
    fn dangling_and_leading_bonds_are_rejected() {
        assert!(matches!(
            parse_smiles("CC="),
            Err(ChemError::DanglingBond { .. })
        ));
        assert!(matches!(
            parse_smiles("=C"),
            Err(ChemError::BondWithoutAtom { .. })
        ));
        assert!(matches!(
            parse_smiles("C.=C"),
            Err(ChemError::BondWithoutAtom { .. })
        ));
    }

    #[test]
    fn conflicting_ring_closures_are_rejected() {
        assert_eq!(
            parse_smiles("C=1CCCCC#1"),
            Err(ChemError::ConflictingRingBond { digit: 1 })
        );
        assert_eq!(
            parse_smiles("C1C1"),
            Err(ChemError::ConflictingRingBond { digit: 1 })
        );
        assert_eq!(
            parse_smiles("C11"),
            Err(ChemError::RingBondToSelf { digit: 1 })
        );
    }
}
