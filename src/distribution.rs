//! # Distribution Engine
//!
//! Samples concrete reward sets from resolved distributions. Sampling is
//! fully deterministic under a seeded random source:
//!
//! 1. Draw a group count uniformly from the declared group range.
//! 2. Fill each slot by weighted selection among the entries whose cap is
//!    not yet exhausted, renormalizing the remaining weights after each
//!    exhaustion. Capped entries carry their effective weight computed at
//!    resolution time. A slot that lands on a group entry draws one of the
//!    group's leaf types uniformly.
//! 3. Draw a total amount uniformly from the declared amount range and
//!    allocate it across the sampled slots: every slot counts as at least 1,
//!    the remainder is spread evenly over the amount-bearing slots with
//!    declaration order breaking the remainder ties.
//!
//! Configuration errors (inverted ranges, all-zero weights) are rejected at
//! resolution time, never here.

use rand::Rng;
use tracing::debug;

use crate::resolver::{Distribution, EntryTarget, ResolvedProgram};

/// One line of a sampled reward set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledItem {
    pub collectable: String,
    pub amount: i64,
}

/// Samples reward sets against a resolved program's namespace.
#[derive(Debug, Copy, Clone)]
pub struct DistributionSampler<'a> {
    program: &'a ResolvedProgram,
}

impl<'a> DistributionSampler<'a> {
    pub fn new(program: &'a ResolvedProgram) -> Self {
        Self { program }
    }

    /// Draws one concrete multiset of `(collectable, amount)` pairs.
    #[tracing::instrument(level = "debug", skip(self, rng), fields(distribution = %distribution.name))]
    pub fn sample<R: Rng + ?Sized>(
        &self,
        distribution: &Distribution,
        rng: &mut R,
    ) -> Vec<SampledItem> {
        let (gmin, gmax) = distribution.group_range;
        let slots = rng.gen_range(gmin..=gmax);
        if slots == 0 {
            return Vec::new();
        }

        // per-entry remaining caps; None is unlimited
        let mut remaining: Vec<Option<u32>> =
            distribution.entries.iter().map(|e| e.cap).collect();
        let mut drawn: Vec<usize> = Vec::with_capacity(slots as usize);
        for _ in 0..slots {
            match pick_weighted(distribution, &remaining, rng) {
                Some(index) => {
                    if let Some(cap) = remaining[index].as_mut() {
                        *cap -= 1;
                    }
                    drawn.push(index);
                }
                // every entry exhausted; the sample is shorter than the
                // drawn group count
                None => break,
            }
        }

        // map each slot to a concrete collectable type
        let mut slot_types: Vec<String> = Vec::with_capacity(drawn.len());
        for index in &drawn {
            match &distribution.entries[*index].target {
                EntryTarget::Type(name) => slot_types.push(name.clone()),
                EntryTarget::Group(name) => {
                    let leaves = self
                        .program
                        .group(name)
                        .map(|g| g.leaf_types.as_slice())
                        .unwrap_or_default();
                    if leaves.is_empty() {
                        continue;
                    }
                    let pick = rng.gen_range(0..leaves.len());
                    slot_types.push(leaves[pick].clone());
                }
            }
        }
        if slot_types.is_empty() {
            return Vec::new();
        }

        let (amin, amax) = distribution.amount_range;
        let mut total = rng.gen_range(amin..=amax);
        // every sampled item counts as at least 1 of the total
        if total < slot_types.len() as i64 {
            total = slot_types.len() as i64;
        }

        let amounts = allocate(&slot_types, total, self.program);
        let items = merge(slot_types, amounts);
        debug!(?items, "sampled");
        items
    }
}

fn pick_weighted<R: Rng + ?Sized>(
    distribution: &Distribution,
    remaining: &[Option<u32>],
    rng: &mut R,
) -> Option<usize> {
    let live: Vec<usize> = (0..distribution.entries.len())
        .filter(|&i| remaining[i].map(|c| c > 0).unwrap_or(true))
        .filter(|&i| distribution.entries[i].weight > 0.0)
        .collect();
    let total: f64 = live.iter().map(|&i| distribution.entries[i].weight).sum();
    if live.is_empty() || total <= 0.0 {
        return None;
    }
    let mut roll = rng.gen_range(0.0..total);
    for &index in &live {
        let weight = distribution.entries[index].weight;
        if roll < weight {
            return Some(index);
        }
        roll -= weight;
    }
    // floating point edge: fall back to the last live entry
    live.last().copied()
}

/// Splits `total` over the slots: 1 each, then the remainder spread evenly
/// over amount-bearing slots, leftovers to the earliest slots.
fn allocate(slot_types: &[String], total: i64, program: &ResolvedProgram) -> Vec<i64> {
    let mut amounts = vec![1i64; slot_types.len()];
    let bearing: Vec<usize> = slot_types
        .iter()
        .enumerate()
        .filter(|(_, name)| {
            program
                .collectable(name)
                .map(|t| t.amount_bearing)
                .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .collect();
    let mut remainder = total - slot_types.len() as i64;
    if remainder <= 0 || bearing.is_empty() {
        return amounts;
    }
    let share = remainder / bearing.len() as i64;
    for &index in &bearing {
        amounts[index] += share;
        remainder -= share;
    }
    for &index in &bearing {
        if remainder == 0 {
            break;
        }
        amounts[index] += 1;
        remainder -= 1;
    }
    amounts
}

/// Aggregates duplicate collectables, preserving first-draw order.
fn merge(slot_types: Vec<String>, amounts: Vec<i64>) -> Vec<SampledItem> {
    let mut items: Vec<SampledItem> = Vec::new();
    for (name, amount) in slot_types.into_iter().zip(amounts) {
        match items.iter_mut().find(|item| item.collectable == name) {
            Some(item) => item.amount += amount,
            None => items.push(SampledItem {
                collectable: name,
                amount,
            }),
        }
    }
    items
}
