//! Molecular graph types shared by the parser and the fingerprinter.

/// Bond order between two atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Integer code used when hashing bond environments.
    pub(crate) fn code(self) -> u8 {
        match self {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Aromatic => 4,
        }
    }

    /// Contribution to an atom's valence, in half-units so that an
    /// aromatic bond (1.5) stays in integer arithmetic.
    pub(crate) fn valence_half_units(self) -> u32 {
        match self {
            BondOrder::Single => 2,
            BondOrder::Double => 4,
            BondOrder::Triple => 6,
            BondOrder::Aromatic => 3,
        }
    }
}

/// A single atom node. Hydrogens are almost always implicit; explicit
/// `[H]` atoms from bracket notation become regular nodes with
/// `atomic_number == 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub atomic_number: u8,
    pub formal_charge: i8,
    pub isotope: Option<u16>,
    pub aromatic: bool,
    /// Hydrogens inferred from default valence rules (organic-subset atoms).
    pub implicit_hydrogens: u8,
    /// Hydrogens declared inside a bracket atom, e.g. the 1 in `[nH]`.
    pub explicit_hydrogens: u8,
}

impl Atom {
    pub fn total_hydrogens(&self) -> u8 {
        self.implicit_hydrogens + self.explicit_hydrogens
    }
}

/// An edge between two atoms, indexed into [`Molecule::atoms`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bond {
    pub atom1: usize,
    pub atom2: usize,
    pub order: BondOrder,
}

/// An immutable molecular graph with precomputed adjacency and ring
/// membership. Constructed by the SMILES parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    /// Per atom: list of `(neighbor atom index, bond index)`.
    adjacency: Vec<Vec<(usize, usize)>>,
    ring_atom: Vec<bool>,
}

impl Molecule {
    pub(crate) fn new(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Self {
        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (idx, bond) in bonds.iter().enumerate() {
            adjacency[bond.atom1].push((bond.atom2, idx));
            adjacency[bond.atom2].push((bond.atom1, idx));
        }
        let ring_atom = ring_membership(atoms.len(), bonds.len(), &adjacency);
        Molecule {
            atoms,
            bonds,
            adjacency,
            ring_atom,
        }
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    /// Number of explicit neighbors (heavy atoms plus any explicit `[H]`).
    pub fn degree(&self, idx: usize) -> usize {
        self.adjacency[idx].len()
    }

    /// Iterates `(neighbor atom index, bond)` pairs for one atom.
    pub fn neighbors(&self, idx: usize) -> impl Iterator<Item = (usize, &Bond)> {
        self.adjacency[idx]
            .iter()
            .map(move |&(nbr, bond_idx)| (nbr, &self.bonds[bond_idx]))
    }

    /// Whether the atom lies on at least one cycle.
    pub fn in_ring(&self, idx: usize) -> bool {
        self.ring_atom[idx]
    }
}

/// Marks every atom that lies on a cycle. An edge is part of a cycle
/// exactly when it is not a bridge, so one bridge-finding DFS over each
/// connected component settles membership for all atoms at once.
fn ring_membership(
    atom_count: usize,
    bond_count: usize,
    adjacency: &[Vec<(usize, usize)>],
) -> Vec<bool> {
    let mut disc = vec![usize::MAX; atom_count];
    let mut low = vec![0usize; atom_count];
    let mut cyclic_bond = vec![true; bond_count];
    let mut timer = 0usize;

    for root in 0..atom_count {
        if disc[root] != usize::MAX {
            continue;
        }
        disc[root] = timer;
        low[root] = timer;
        timer += 1;
        // Frames hold (atom, bond used to enter it, next adjacency slot).
        let mut stack: Vec<(usize, usize, usize)> = vec![(root, usize::MAX, 0)];
        while let Some(&(node, entry_bond, slot)) = stack.last() {
            if slot < adjacency[node].len() {
                if let Some(frame) = stack.last_mut() {
                    frame.2 += 1;
                }
                let (next, via) = adjacency[node][slot];
                if via == entry_bond {
                    continue;
                }
                if disc[next] == usize::MAX {
                    disc[next] = timer;
                    low[next] = timer;
                    timer += 1;
                    stack.push((next, via, 0));
                } else {
                    low[node] = low[node].min(disc[next]);
                }
            } else {
                stack.pop();
                if let Some(&(parent, _, _)) = stack.last() {
                    low[parent] = low[parent].min(low[node]);
                    if low[node] > disc[parent] {
                        cyclic_bond[entry_bond] = false;
                    }
                }
            }
        }
    }

    (0..atom_count)
        .map(|atom| adjacency[atom].iter().any(|&(_, bond)| cyclic_bond[bond]))
        .collect()
}

/// Symbol table for the elements that show up in drug structures,
/// including the counterions and metals common in salt forms.
const ELEMENTS: &[(&str, u8)] = &[
    ("H", 1),
    ("He", 2),
    ("Li", 3),
    ("Be", 4),
    ("B", 5),
    ("C", 6),
    ("N", 7),
    ("O", 8),
    ("F", 9),
    ("Ne", 10),
    ("Na", 11),
    ("Mg", 12),
    ("Al", 13),
    ("Si", 14),
    ("P", 15),
    ("S", 16),
    ("Cl", 17),
    ("Ar", 18),
    ("K", 19),
    ("Ca", 20),
    ("Ti", 22),
    ("Cr", 24),
    ("Mn", 25),
    ("Fe", 26),
    ("Co", 27),
    ("Ni", 28),
    ("Cu", 29),
    ("Zn", 30),
    ("Ga", 31),
    ("Ge", 32),
    ("As", 33),
    ("Se", 34),
    ("Br", 35),
    ("Kr", 36),
    ("Rb", 37),
    ("Sr", 38),
    ("Zr", 40),
    ("Mo", 42),
    ("Tc", 43),
    ("Ru", 44),
    ("Rh", 45),
    ("Pd", 46),
    ("Ag", 47),
    ("Cd", 48),
    ("In", 49),
    ("Sn", 50),
    ("Sb", 51),
    ("Te", 52),
    ("I", 53),
    ("Xe", 54),
    ("Cs", 55),
    ("Ba", 56),
    ("La", 57),
    ("Sm", 62),
    ("Gd", 64),
    ("W", 74),
    ("Pt", 78),
    ("Au", 79),
    ("Hg", 80),
    ("Tl", 81),
    ("Pb", 82),
    ("Bi", 83),
    ("Ra", 88),
];

pub(crate) fn atomic_number_of(symbol: &str) -> Option<u8> {
    ELEMENTS
        .iter()
        .find(|(sym, _)| *sym == symbol)
        .map(|&(_, num)| num)
}

pub(crate) fn symbol_of(atomic_number: u8) -> &'static str {
    ELEMENTS
        .iter()
        .find(|&&(_, num)| num == atomic_number)
        .map(|&(sym, _)| sym)
        .unwrap_or("?")
}

/// Default valences used for implicit hydrogen assignment, smallest
/// first. Only elements of the SMILES organic subset (plus hydrogen)
/// carry defaults; everything else must be written in brackets and gets
/// no implicit hydrogens.
pub(crate) fn default_valences(atomic_number: u8) -> Option<&'static [u32]> {
    match atomic_number {
        1 => Some(&[1]),
        5 => Some(&[3]),
        6 => Some(&[4]),
        7 => Some(&[3, 5]),
        8 => Some(&[2]),
        15 => Some(&[3, 5]),
        16 => Some(&[2, 4, 6]),
        9 | 17 | 35 | 53 => Some(&[1]),
        _ => None,
    }
}
