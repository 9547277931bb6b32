//! Weight encoding strategies.
//!
//! The file stores a fixed number of (bone, weight) slots per vertex and does
//! not record which scheme produced them, so the decoder must be told the
//! scheme the file was authored with.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::{WeightBinding, WeightList};

/// How logical weight lists map onto stored slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightScheme {
    /// Same-bone entries summed; non-positive totals dropped.
    #[default]
    Group,
    /// Same-bone entries summed; the sign of the total is kept.
    Signed,
    /// One slot per entry, heaviest first.
    Split,
    /// One slot per entry, authoring order kept.
    Slash,
}

impl WeightScheme {
    pub const ALL: [WeightScheme; 4] = [
        WeightScheme::Group,
        WeightScheme::Signed,
        WeightScheme::Split,
        WeightScheme::Slash,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WeightScheme::Group => "Group",
            WeightScheme::Signed => "Signed",
            WeightScheme::Split => "Split",
            WeightScheme::Slash => "Slash",
        }
    }

    /// Logical weight list to slot order.
    pub fn encode(self, weights: &[WeightBinding]) -> WeightList {
        match self {
            WeightScheme::Group => {
                let mut slots = merge_by_bone(weights);
                slots.retain(|b| b.weight > 0.0);
                sort_by_magnitude(&mut slots);
                slots
            }
            WeightScheme::Signed => {
                let mut slots = merge_by_bone(weights);
                slots.retain(|b| b.weight != 0.0);
                sort_by_magnitude(&mut slots);
                slots
            }
            WeightScheme::Split => {
                let mut slots = non_zero(weights);
                sort_by_magnitude(&mut slots);
                slots
            }
            WeightScheme::Slash => non_zero(weights),
        }
    }

    /// Stored slots back to the logical weight list.
    pub fn decode(self, slots: &[WeightBinding]) -> WeightList {
        match self {
            WeightScheme::Group => {
                let mut weights = merge_by_bone(slots);
                weights.retain(|b| b.weight > 0.0);
                weights
            }
            WeightScheme::Signed => {
                let mut weights = merge_by_bone(slots);
                weights.retain(|b| b.weight != 0.0);
                weights
            }
            WeightScheme::Split | WeightScheme::Slash => non_zero(slots),
        }
    }
}

/// Sum entries per bone, keeping first-appearance order.
fn merge_by_bone(weights: &[WeightBinding]) -> WeightList {
    let mut merged: WeightList = SmallVec::new();
    for b in weights {
        match merged.iter_mut().find(|m| m.bone == b.bone) {
            Some(m) => m.weight += b.weight,
            None => merged.push(*b),
        }
    }
    merged
}

fn non_zero(weights: &[WeightBinding]) -> WeightList {
    weights.iter().copied().filter(|b| b.weight != 0.0).collect()
}

/// Stable sort by descending absolute weight.
fn sort_by_magnitude(slots: &mut WeightList) {
    slots.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));
}
