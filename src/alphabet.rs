//! Amino-acid alphabet and the per-residue properties used to colour letters.

use std::fmt;

/// The 20 canonical amino acids in one-letter code, alphabetical.
pub const AMINO_ACIDS: [char; 20] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V',
    'W', 'Y',
];

/// Symbol used for stop codons.
pub const STOP: char = '*';

pub fn is_amino_acid(c: char) -> bool {
    AMINO_ACIDS.contains(&c)
}

/// Amino acid or stop.
pub fn is_symbol(c: char) -> bool {
    c == STOP || is_amino_acid(c)
}

/// Parse a table cell holding exactly one symbol, e.g. `"K"` or `"*"`.
pub fn parse_symbol(s: &str) -> Option<char> {
    let mut chars = s.trim().chars();
    let c = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !is_symbol(c) {
        return None;
    }
    Some(c)
}

/// Kyte-Doolittle hydrophobicity.
pub fn kyte_doolittle(aa: char) -> Option<f64> {
    let v = match aa {
        'A' => 1.8,
        'C' => 2.5,
        'D' => -3.5,
        'E' => -3.5,
        'F' => 2.8,
        'G' => -0.4,
        'H' => -3.2,
        'I' => 4.5,
        'K' => -3.9,
        'L' => 3.8,
        'M' => 1.9,
        'N' => -3.5,
        'P' => -1.6,
        'Q' => -3.5,
        'R' => -4.5,
        'S' => -0.8,
        'T' => -0.7,
        'V' => 4.2,
        'W' => -0.9,
        'Y' => -1.3,
        _ => return None,
    };
    Some(v)
}

/// Molecular weight of the free amino acid in daltons.
pub fn molecular_weight(aa: char) -> Option<f64> {
    let v = match aa {
        'A' => 89.1,
        'C' => 121.2,
        'D' => 133.1,
        'E' => 147.1,
        'F' => 165.2,
        'G' => 75.1,
        'H' => 155.2,
        'I' => 131.2,
        'K' => 146.2,
        'L' => 131.2,
        'M' => 149.2,
        'N' => 132.1,
        'P' => 115.1,
        'Q' => 146.2,
        'R' => 174.2,
        'S' => 105.1,
        'T' => 119.1,
        'V' => 117.1,
        'W' => 204.2,
        'Y' => 181.2,
        _ => return None,
    };
    Some(v)
}

/// Side-chain charge at neutral pH.
pub fn charge(aa: char) -> Option<f64> {
    match aa {
        'D' | 'E' => Some(-1.0),
        'K' | 'R' => Some(1.0),
        c if is_amino_acid(c) => Some(0.0),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FunctionalGroup {
    Small,
    Nucleophilic,
    Hydrophobic,
    Aromatic,
    Acidic,
    Amide,
    Basic,
}

impl FunctionalGroup {
    pub const ALL: [FunctionalGroup; 7] = [
        FunctionalGroup::Small,
        FunctionalGroup::Nucleophilic,
        FunctionalGroup::Hydrophobic,
        FunctionalGroup::Aromatic,
        FunctionalGroup::Acidic,
        FunctionalGroup::Amide,
        FunctionalGroup::Basic,
    ];

    pub fn of(aa: char) -> Option<Self> {
        use FunctionalGroup::*;
        let group = match aa {
            'A' | 'G' => Small,
            'C' | 'S' | 'T' => Nucleophilic,
            'I' | 'L' | 'M' | 'P' | 'V' => Hydrophobic,
            'F' | 'W' | 'Y' => Aromatic,
            'D' | 'E' => Acidic,
            'N' | 'Q' => Amide,
            'H' | 'K' | 'R' => Basic,
            _ => return None,
        };
        Some(group)
    }
}

impl fmt::Display for FunctionalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FunctionalGroup::Small => "small",
            FunctionalGroup::Nucleophilic => "nucleophilic",
            FunctionalGroup::Hydrophobic => "hydrophobic",
            FunctionalGroup::Aromatic => "aromatic",
            FunctionalGroup::Acidic => "acidic",
            FunctionalGroup::Amide => "amide",
            FunctionalGroup::Basic => "basic",
        };
        write!(f, "{name}")
    }
}
