//! Weighted-game aggregation
//!
//! Turns a raw slot configuration into what a player sees: one bucket per distinct
//! net multiplier, the plinko bucket ordering, and per-slot probabilities.

use crate::errors::ConfigurationError;
use crate::games::WeightedGameConfiguration;
use crate::math::{format_multiplier, net_multiplier, round_to};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// Fallback colors for buckets without a configured one
pub const COLOR_PALETTE: [&str; 10] = [
    "#29384C", "#55DC36", "#15A2D8", "#7340FF", "#FFC000", "#FF7A00", "#E83A59", "#00C2A8",
    "#A259FF", "#F5F5F5",
];

/// Slots that share one net multiplier
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeightedOutput {
    /// Net multiplier in basis points
    pub multiplier: u32,
    pub gross_multiplier: u32,
    pub label: String,
    pub weight: u128,
    /// Percent, two decimals
    pub chance_to_win: f64,
    pub color: String,
    pub positions: Vec<usize>,
}

/// Buckets grouped by net multiplier, ascending
pub fn unique_outputs(
    config: &WeightedGameConfiguration,
    house_edge: u16,
) -> Result<Vec<WeightedOutput>, ConfigurationError> {
    unique_outputs_with_rng(config, house_edge, &mut rand::thread_rng())
}

pub fn unique_outputs_with_rng<R: Rng + ?Sized>(
    config: &WeightedGameConfiguration,
    house_edge: u16,
    rng: &mut R,
) -> Result<Vec<WeightedOutput>, ConfigurationError> {
    config.validate()?;
    let total = config.total_weight();

    let mut buckets: BTreeMap<u32, WeightedOutput> = BTreeMap::new();
    for (position, (&weight, &gross)) in config.weights.iter().zip(&config.multipliers).enumerate() {
        let net = net_multiplier(gross, house_edge);
        let bucket = buckets.entry(net).or_insert_with(|| WeightedOutput {
            multiplier: net,
            gross_multiplier: gross,
            label: format_multiplier(net),
            weight: 0,
            chance_to_win: 0.0,
            color: config
                .color_at(position)
                .map(str::to_string)
                .unwrap_or_else(|| random_color(rng)),
            positions: Vec::new(),
        });
        bucket.weight += u128::from(weight);
        bucket.positions.push(position);
    }

    Ok(buckets
        .into_values()
        .map(|mut bucket| {
            bucket.chance_to_win = round_to(bucket.weight as f64 / total as f64 * 100.0, 2);
            bucket
        })
        .collect())
}

fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    COLOR_PALETTE
        .choose(rng)
        .copied()
        .unwrap_or(COLOR_PALETTE[0])
        .to_string()
}

/// Plinko layout: heaviest slot in the center, the rest alternating right then left
pub fn bell_shaped_order(config: &WeightedGameConfiguration) -> Vec<usize> {
    let mut by_weight: Vec<usize> = (0..config.slot_count()).collect();
    // Stable sort keeps equal weights in configuration order
    by_weight.sort_by(|a, b| config.weights[*b].cmp(&config.weights[*a]));

    let mut layout = VecDeque::with_capacity(by_weight.len());
    for (rank, position) in by_weight.into_iter().enumerate() {
        if rank % 2 == 1 {
            layout.push_back(position);
        } else {
            layout.push_front(position);
        }
    }
    layout.into_iter().collect()
}

/// `weight_i / Σweights` for every slot
pub fn slot_probabilities(
    config: &WeightedGameConfiguration,
) -> Result<Vec<f64>, ConfigurationError> {
    config.validate()?;
    let total = config.total_weight() as f64;
    Ok(config
        .weights
        .iter()
        .map(|weight| *weight as f64 / total)
        .collect())
}
