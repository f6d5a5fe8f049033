//! Firing-time functions and their mean-delay summarization.
//!
//! Every timed transition carries one of seven time functions. For the bound
//! computation only a scalar mean firing delay is needed; this module maps each
//! function to that scalar. For `interval` the earliest firing time (`min`) is
//! used rather than the midpoint: the bound computation wants the earliest
//! possible firing, unlike `uniform` where the distribution mean applies.

use std::collections::HashMap;
use std::fmt;

use crate::PtpnError;
use crate::net::Symbol;

/// Firing-time function of a transition, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeFunction {
    /// Exponential distribution with rate `lambda`.
    Exponential { lambda: f64 },
    /// Gamma distribution with shape `k` and scale `theta`.
    Gamma { k: f64, theta: f64 },
    /// Normal distribution with mean `mu` and standard deviation `sigma`.
    Normal { mu: f64, sigma: f64 },
    /// Lognormal distribution parameterized by `mu` and `sigma`.
    Lognormal { mu: f64, sigma: f64 },
    /// Uniform distribution over `[min, max]`.
    Uniform { min: f64, max: f64 },
    /// Firing interval `[min, max]`, summarized by its earliest firing time.
    Interval { min: f64, max: f64 },
    /// Deterministic firing time `k`.
    Constant { k: f64 },
}

impl TimeFunction {
    /// Build a time function from its PNML type tag and parameter mapping.
    ///
    /// Fails with [`PtpnError::InvalidParameters`] when the type is unknown, a
    /// required parameter is missing, or the parameters yield a delay that is
    /// not finite and non-negative.
    pub fn from_params(
        transition: &Symbol,
        kind: &str,
        params: &HashMap<String, f64>,
    ) -> Result<Self, PtpnError> {
        let get = |name: &str| -> Result<f64, PtpnError> {
            params.get(name).copied().ok_or_else(|| PtpnError::InvalidParameters {
                transition: transition.clone(),
                reason: format!("time function '{}' is missing parameter '{}'", kind, name),
            })
        };

        let function = match kind {
            "exponential" => TimeFunction::Exponential { lambda: get("lambda")? },
            "gamma" => TimeFunction::Gamma {
                k: get("k")?,
                theta: get("theta")?,
            },
            "normal" => TimeFunction::Normal {
                mu: get("mu")?,
                sigma: get("sigma")?,
            },
            "lognormal" => TimeFunction::Lognormal {
                mu: get("mu")?,
                sigma: get("sigma")?,
            },
            "uniform" => TimeFunction::Uniform {
                min: get("min")?,
                max: get("max")?,
            },
            "interval" => TimeFunction::Interval {
                min: get("min")?,
                max: get("max")?,
            },
            "constant" => TimeFunction::Constant { k: get("k")? },
            other => {
                return Err(PtpnError::InvalidParameters {
                    transition: transition.clone(),
                    reason: format!("unknown time function '{}'", other),
                });
            }
        };

        function.validate(transition)?;
        Ok(function)
    }

    /// Check that the parameters yield a finite, non-negative mean delay.
    pub fn validate(&self, transition: &Symbol) -> Result<(), PtpnError> {
        let invalid = |reason: String| PtpnError::InvalidParameters {
            transition: transition.clone(),
            reason,
        };

        match self {
            TimeFunction::Exponential { lambda } => {
                if !(*lambda > 0.0) || !lambda.is_finite() {
                    return Err(invalid(format!("exponential rate lambda={} must be positive", lambda)));
                }
            }
            TimeFunction::Gamma { k, theta } => {
                if !(*k >= 0.0 && *theta >= 0.0) || !k.is_finite() || !theta.is_finite() {
                    return Err(invalid(format!(
                        "gamma parameters k={}, theta={} must be non-negative",
                        k, theta
                    )));
                }
            }
            TimeFunction::Normal { mu, sigma } => {
                if !(*mu >= 0.0 && *sigma >= 0.0) || !mu.is_finite() || !sigma.is_finite() {
                    return Err(invalid(format!(
                        "normal parameters mu={}, sigma={} must be non-negative",
                        mu, sigma
                    )));
                }
            }
            TimeFunction::Lognormal { mu, sigma } => {
                if !mu.is_finite() || !sigma.is_finite() {
                    return Err(invalid(format!(
                        "lognormal parameters mu={}, sigma={} must be finite",
                        mu, sigma
                    )));
                }
            }
            TimeFunction::Uniform { min, max } | TimeFunction::Interval { min, max } => {
                if !(*min >= 0.0) || !min.is_finite() || !max.is_finite() || max < min {
                    return Err(invalid(format!(
                        "interval bounds min={}, max={} must satisfy 0 <= min <= max",
                        min, max
                    )));
                }
            }
            TimeFunction::Constant { k } => {
                if !(*k >= 0.0) || !k.is_finite() {
                    return Err(invalid(format!("constant delay k={} must be non-negative", k)));
                }
            }
        }

        let delay = self.mean_delay();
        if !delay.is_finite() || delay < 0.0 {
            return Err(invalid(format!(
                "time function '{}' yields invalid mean delay {}",
                self.kind(),
                delay
            )));
        }
        Ok(())
    }

    /// Mean firing delay of the function; `interval` yields its earliest firing
    /// time instead of the midpoint.
    pub fn mean_delay(&self) -> f64 {
        match self {
            TimeFunction::Exponential { lambda } => 1.0 / lambda,
            TimeFunction::Gamma { k, theta } => k * theta,
            TimeFunction::Normal { mu, .. } => *mu,
            TimeFunction::Lognormal { mu, sigma } => (mu + sigma * sigma / 2.0).exp(),
            TimeFunction::Uniform { min, max } => (min + max) / 2.0,
            TimeFunction::Interval { min, .. } => *min,
            TimeFunction::Constant { k } => *k,
        }
    }

    /// PNML type tag of this function.
    pub fn kind(&self) -> &'static str {
        match self {
            TimeFunction::Exponential { .. } => "exponential",
            TimeFunction::Gamma { .. } => "gamma",
            TimeFunction::Normal { .. } => "normal",
            TimeFunction::Lognormal { .. } => "lognormal",
            TimeFunction::Uniform { .. } => "uniform",
            TimeFunction::Interval { .. } => "interval",
            TimeFunction::Constant { .. } => "constant",
        }
    }

    /// Parameter names and values, in PNML declaration order.
    pub fn params(&self) -> Vec<(&'static str, f64)> {
        match self {
            TimeFunction::Exponential { lambda } => vec![("lambda", *lambda)],
            TimeFunction::Gamma { k, theta } => vec![("k", *k), ("theta", *theta)],
            TimeFunction::Normal { mu, sigma } => vec![("mu", *mu), ("sigma", *sigma)],
            TimeFunction::Lognormal { mu, sigma } => vec![("mu", *mu), ("sigma", *sigma)],
            TimeFunction::Uniform { min, max } => vec![("min", *min), ("max", *max)],
            TimeFunction::Interval { min, max } => vec![("min", *min), ("max", *max)],
            TimeFunction::Constant { k } => vec![("k", *k)],
        }
    }
}

impl fmt::Display for TimeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind())?;
        for (i, (name, value)) in self.params().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sym(s: &str) -> Symbol {
        Symbol::from(s)
    }

    #[test]
    fn test_mean_delays() {
        assert_relative_eq!(TimeFunction::Exponential { lambda: 2.0 }.mean_delay(), 0.5);
        assert_relative_eq!(TimeFunction::Gamma { k: 3.0, theta: 2.0 }.mean_delay(), 6.0);
        assert_relative_eq!(TimeFunction::Normal { mu: 1.5, sigma: 0.3 }.mean_delay(), 1.5);
        assert_relative_eq!(
            TimeFunction::Lognormal { mu: 0.0, sigma: 1.0 }.mean_delay(),
            (0.5f64).exp()
        );
        assert_relative_eq!(TimeFunction::Uniform { min: 1.0, max: 3.0 }.mean_delay(), 2.0);
        assert_relative_eq!(TimeFunction::Constant { k: 4.0 }.mean_delay(), 4.0);
    }

    #[test]
    fn test_interval_uses_earliest_firing_time() {
        // Deliberately min, not the midpoint
        let tf = TimeFunction::Interval { min: 1.0, max: 3.0 };
        assert_relative_eq!(tf.mean_delay(), 1.0);
    }

    #[test]
    fn test_from_params_roundtrip() {
        let t = sym("t0");
        let params: HashMap<String, f64> =
            [("lambda".to_string(), 2.0)].into_iter().collect();
        let tf = TimeFunction::from_params(&t, "exponential", &params).unwrap();
        assert_eq!(tf, TimeFunction::Exponential { lambda: 2.0 });
    }

    #[test]
    fn test_missing_parameter() {
        let t = sym("t0");
        let params = HashMap::new();
        let err = TimeFunction::from_params(&t, "constant", &params).unwrap_err();
        assert!(matches!(err, PtpnError::InvalidParameters { .. }));
    }

    #[test]
    fn test_unknown_time_function() {
        let t = sym("t0");
        let params = HashMap::new();
        let err = TimeFunction::from_params(&t, "weibull", &params).unwrap_err();
        assert!(matches!(err, PtpnError::InvalidParameters { .. }));
    }

    #[test]
    fn test_non_positive_rate_rejected() {
        let t = sym("t0");
        let params: HashMap<String, f64> =
            [("lambda".to_string(), 0.0)].into_iter().collect();
        assert!(TimeFunction::from_params(&t, "exponential", &params).is_err());
    }

    #[test]
    fn test_inverted_interval_rejected() {
        let t = sym("t0");
        let tf = TimeFunction::Interval { min: 3.0, max: 1.0 };
        assert!(tf.validate(&t).is_err());
    }
}
