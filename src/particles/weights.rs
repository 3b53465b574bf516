use std::collections::btree_map::{self, BTreeMap, Entry};

use ndarray::{array, Array1};
use tracing::{debug, info};

use crate::error::{CollateError, Result};
use crate::particles::ParticleCounts;
use crate::utils::log_sum_exp;

/// An `(identifier, value)` pair. Orders by identifier, then value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeightKey {
    pub identifier: String,
    pub value: String,
}

impl WeightKey {
    pub fn new(identifier: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            value: value.into(),
        }
    }
}

/// One unnormalized log-weight per `(identifier, value)`.
#[derive(Clone, Debug, Default)]
pub struct CombinedLogWeights {
    weights: BTreeMap<WeightKey, f64>,
}

impl CombinedLogWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds every counted particle into its `(identifier, value)` weight.
    ///
    /// A particle seen `c` times contributes `log_weight + ln(c)`. All
    /// contributions to a key are reduced together, smallest first, so the
    /// result does not depend on the order the input arrived in.
    pub fn from_counts(counts: &ParticleCounts) -> Result<Self> {
        let mut grouped: BTreeMap<WeightKey, Vec<f64>> = BTreeMap::new();
        for (particle, &count) in counts {
            let key = WeightKey::new(particle.identifier.as_str(), particle.value.as_str());
            grouped
                .entry(key)
                .or_default()
                .push(particle.log_weight + (count as f64).ln());
        }

        let mut weights = BTreeMap::new();
        for (key, mut contributions) in grouped {
            contributions.sort_by(f64::total_cmp);
            let combined = log_sum_exp(&Array1::from(contributions))?;
            weights.insert(key, combined);
        }

        debug!(
            particles = counts.len(),
            pairs = weights.len(),
            "combined particle log-weights"
        );
        Ok(Self { weights })
    }

    /// Adds one more log-weight contribution to `key`, combining it with any
    /// existing weight as `log(exp(existing) + exp(log_weight))`.
    pub fn absorb(&mut self, key: WeightKey, log_weight: f64) -> Result<()> {
        match self.weights.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(log_weight);
            }
            Entry::Occupied(mut slot) => {
                let combined = log_sum_exp(&array![*slot.get(), log_weight])?;
                slot.insert(combined);
            }
        }
        Ok(())
    }

    /// Log of the total unnormalized mass across every pair.
    pub fn log_evidence(&self) -> Result<f64> {
        log_sum_exp(&self.weights.values().copied().collect::<Array1<f64>>())
    }

    /// Subtracts the global normalizing constant from every weight, giving
    /// the joint log-probability of each pair.
    pub fn normalize(self) -> Result<JointLogWeights> {
        let log_norm = self.log_evidence()?;
        if !log_norm.is_finite() {
            return Err(CollateError::Domain(format!(
                "total particle mass is not normalizable (log normalizing constant {})",
                log_norm
            )));
        }
        info!(log_norm, pairs = self.weights.len(), "normalized joint weights");

        let weights = self
            .weights
            .into_iter()
            .map(|(key, w)| (key, w - log_norm))
            .collect();
        Ok(JointLogWeights { weights, log_norm })
    }

    pub fn get(&self, key: &WeightKey) -> Option<f64> {
        self.weights.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, WeightKey, f64> {
        self.weights.iter()
    }
}

/// Globally normalized log-weights: their exponentials sum to one over all
/// pairs.
#[derive(Clone, Debug)]
pub struct JointLogWeights {
    weights: BTreeMap<WeightKey, f64>,
    log_norm: f64,
}

impl JointLogWeights {
    /// The constant that was subtracted from every combined weight.
    pub fn log_norm(&self) -> f64 {
        self.log_norm
    }

    pub fn get(&self, key: &WeightKey) -> Option<f64> {
        self.weights.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, WeightKey, f64> {
        self.weights.iter()
    }
}
