// SPDX-FileCopyrightText: 2026 Mesh Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offer scoring and deterministic best-offer selection.
//!
//! Ranking is a pure function of the candidate multiset plus a prefetched
//! live-reputation map; the coordinator resolves all lookups before calling
//! in, so the same inputs always produce the same winner.

use std::collections::HashMap;

use bigdecimal::ToPrimitive;
use mesh_core::types::Offer;
use mesh_proto::parse_eta_seconds;

/// Scoring weights and the tie window.
#[derive(Debug, Clone, Copy)]
pub struct RankWeights {
    pub reputation: f64,
    pub fee: f64,
    pub speed: f64,
    /// Offers scoring within this distance of the best re-rank by stake age.
    pub tie_window: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            reputation: 0.5,
            fee: 0.3,
            speed: 0.2,
            tie_window: 0.05,
        }
    }
}

/// An offer with its resolved reputation and composite score.
#[derive(Debug, Clone)]
pub struct RankedOffer {
    pub offer: Offer,
    /// Live value when the lookup produced one, else the submission
    /// snapshot, else 0.
    pub effective_reputation: i64,
    pub score: f64,
}

/// Min-max normalize; a degenerate range maps everything to 1.0.
fn min_max_norm(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max - min).is_normal() {
        return vec![1.0; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Score all offers and return them ordered by score descending, with
/// reputation and offer id as stable secondary keys.
pub fn rank_offers(
    offers: &[Offer],
    live_reputation: &HashMap<String, i64>,
    weights: &RankWeights,
) -> Vec<RankedOffer> {
    if offers.is_empty() {
        return Vec::new();
    }

    let reps: Vec<f64> = offers
        .iter()
        .map(|o| {
            live_reputation
                .get(&o.from_address)
                .copied()
                .or(o.reputation)
                .unwrap_or(0) as f64
        })
        .collect();
    let fees: Vec<f64> = offers
        .iter()
        .map(|o| o.fee.to_f64().unwrap_or(0.0))
        .collect();

    // eta 0 means "unknown"; such offers get the best observed speed.
    let raw_speeds: Vec<Option<f64>> = offers
        .iter()
        .map(|o| {
            let eta = parse_eta_seconds(&o.eta);
            (eta > 0.0).then(|| 1.0 / eta)
        })
        .collect();
    let max_speed = raw_speeds
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let speeds: Vec<f64> = raw_speeds
        .iter()
        .map(|s| s.unwrap_or(if max_speed.is_finite() { max_speed } else { 1.0 }))
        .collect();

    let rep_norm = min_max_norm(&reps);
    let fee_norm = min_max_norm(&fees);
    let speed_norm = min_max_norm(&speeds);

    let mut ranked: Vec<RankedOffer> = offers
        .iter()
        .enumerate()
        .map(|(i, offer)| RankedOffer {
            offer: offer.clone(),
            effective_reputation: reps[i] as i64,
            score: weights.reputation * rep_norm[i]
                + weights.fee * (1.0 - fee_norm[i])
                + weights.speed * speed_norm[i],
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.effective_reputation.cmp(&a.effective_reputation))
            .then_with(|| a.offer.id.cmp(&b.offer.id))
    });
    ranked
}

/// Pick the winner: the top scorer, except that anything within the tie
/// window is re-ranked by stake age descending, then submission time
/// ascending, then offer id.
pub fn select_best<'a>(ranked: &'a [RankedOffer], tie_window: f64) -> Option<&'a RankedOffer> {
    let best = ranked.first()?;
    ranked
        .iter()
        .filter(|r| best.score - r.score <= tie_window)
        .min_by(|a, b| {
            b.offer
                .stake_age_seconds
                .cmp(&a.offer.stake_age_seconds)
                .then_with(|| a.offer.created_at.cmp(&b.offer.created_at))
                .then_with(|| a.offer.id.cmp(&b.offer.id))
        })
}
