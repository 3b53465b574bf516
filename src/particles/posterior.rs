use std::collections::BTreeMap;

use ndarray::Array1;
use tracing::debug;

use crate::error::{CollateError, Result};
use crate::particles::JointLogWeights;
use crate::utils::normalize_log_probs;

/// Probability of `value` given `identifier`.
#[derive(Clone, Debug, PartialEq)]
pub struct Posterior {
    pub identifier: String,
    pub value: String,
    /// Globally normalized log-probability of the pair.
    pub joint_log_prob: f64,
    pub probability: f64,
}

/// Joint log-weights partitioned by identifier, values kept in sorted order.
#[derive(Debug, Default)]
pub struct GroupIndex<'a> {
    groups: BTreeMap<&'a str, Vec<(&'a str, f64)>>,
}

impl<'a> GroupIndex<'a> {
    pub fn new(joint: &'a JointLogWeights) -> Self {
        let mut groups: BTreeMap<&'a str, Vec<(&'a str, f64)>> = BTreeMap::new();
        for (key, &log_prob) in joint.iter() {
            groups
                .entry(key.identifier.as_str())
                .or_default()
                .push((key.value.as_str(), log_prob));
        }
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn values(&self, identifier: &str) -> Option<&[(&'a str, f64)]> {
        self.groups.get(identifier).map(Vec::as_slice)
    }

    /// Renormalizes each identifier's joint weights into a conditional
    /// distribution over its values. Output is ordered by identifier, then
    /// value.
    pub fn renormalize(&self) -> Result<Vec<Posterior>> {
        let mut posteriors = Vec::new();
        for (&identifier, members) in &self.groups {
            let log_probs: Array1<f64> = members.iter().map(|&(_, w)| w).collect();
            let probs = normalize_log_probs(&log_probs).map_err(|e| match e {
                CollateError::Domain(reason) => {
                    CollateError::Domain(format!("identifier '{}': {}", identifier, reason))
                }
                other => other,
            })?;

            for (&(value, joint_log_prob), &probability) in members.iter().zip(probs.iter()) {
                posteriors.push(Posterior {
                    identifier: identifier.to_string(),
                    value: value.to_string(),
                    joint_log_prob,
                    probability,
                });
            }
        }
        debug!(
            identifiers = self.groups.len(),
            rows = posteriors.len(),
            "renormalized per identifier"
        );
        Ok(posteriors)
    }
}

/// Conditional distribution of values for every identifier in `joint`.
pub fn renormalize(joint: &JointLogWeights) -> Result<Vec<Posterior>> {
    GroupIndex::new(joint).renormalize()
}
