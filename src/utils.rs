use ndarray::Array1;

use crate::error::{CollateError, Result};

/// `log(Σ exp(l_i))` computed as `A + log(Σ exp(l_i - A))` with `A = max(l)`,
/// so every exponentiated term stays in `(0, 1]`.
///
/// Terms are summed in the order given. An all `-inf` input has zero mass and
/// reduces to `-inf`.
pub fn log_sum_exp(log_probs: &Array1<f64>) -> Result<f64> {
    if log_probs.is_empty() {
        return Err(CollateError::Domain(
            "log-sum-exp of an empty sequence".to_string(),
        ));
    }
    let max = log_probs.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if max.is_infinite() {
        return Ok(max);
    }
    let sum_exp = log_probs.mapv(|x| (x - max).exp()).sum();
    Ok(max + sum_exp.ln())
}

/// Exponentiates `log_probs` after subtracting their log-sum-exp, giving
/// probabilities that sum to one.
pub fn normalize_log_probs(log_probs: &Array1<f64>) -> Result<Array1<f64>> {
    let log_norm = log_sum_exp(log_probs)?;
    if !log_norm.is_finite() {
        return Err(CollateError::Domain(format!(
            "cannot normalize weights with log normalizing constant {}",
            log_norm
        )));
    }
    Ok(log_probs.mapv(|x| (x - log_norm).exp()))
}
