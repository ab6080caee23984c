//! Calibration components: observed data, conform policies, and the
//! closed-form likelihoods.

use std::path::Path;

use epi_core::time::date_to_year;
use epi_core::{EpiError, EpiResult, Results};

use crate::special::{ln_beta, ln_gamma};

// ── Observed data ─────────────────────────────────────────────────────────────

/// A time-indexed observed series: `x` values (counts or proportions
/// numerators) and optional `n` denominators (totals/exposure).
#[derive(Clone, Debug)]
pub struct ObservedSeries {
    pub times: Vec<f64>,
    pub x: Vec<f64>,
    pub n: Option<Vec<f64>>,
}

impl ObservedSeries {
    pub fn new(times: Vec<f64>, x: Vec<f64>) -> EpiResult<Self> {
        if times.len() != x.len() {
            return Err(EpiError::DataAlignment(format!(
                "observed series has {} timepoints but {} values",
                times.len(),
                x.len()
            )));
        }
        if times.is_empty() {
            return Err(EpiError::DataAlignment("observed series is empty".into()));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(EpiError::DataAlignment(
                "observed timepoints must be strictly increasing".into(),
            ));
        }
        Ok(Self { times, x, n: None })
    }

    pub fn with_n(mut self, n: Vec<f64>) -> EpiResult<Self> {
        if n.len() != self.times.len() {
            return Err(EpiError::DataAlignment(format!(
                "observed series has {} timepoints but {} denominators",
                self.times.len(),
                n.len()
            )));
        }
        self.n = Some(n);
        Ok(self)
    }

    /// Load from CSV with columns `t`, `x`, and optionally `n`.  The `t`
    /// column accepts float years or ISO `YYYY-MM-DD` dates.
    pub fn from_csv(path: impl AsRef<Path>) -> EpiResult<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())
            .map_err(|e| EpiError::Parse(format!("cannot open observed data: {e}")))?;
        let headers = reader
            .headers()
            .map_err(|e| EpiError::Parse(format!("bad CSV header: {e}")))?
            .clone();
        let col = |name: &str| headers.iter().position(|h| h == name);
        let t_col = col("t").ok_or_else(|| {
            EpiError::DataAlignment("observed data is missing required column 't'".into())
        })?;
        let x_col = col("x").ok_or_else(|| {
            EpiError::DataAlignment("observed data is missing required column 'x'".into())
        })?;
        let n_col = col("n");

        let mut times = Vec::new();
        let mut x = Vec::new();
        let mut n = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| EpiError::Parse(format!("bad CSV row: {e}")))?;
            let t_raw = row.get(t_col).unwrap_or("");
            let t = match t_raw.parse::<f64>() {
                Ok(v) => v,
                Err(_) => date_to_year(t_raw)?,
            };
            times.push(t);
            x.push(parse_cell(&row, x_col, "x")?);
            if let Some(c) = n_col {
                n.push(parse_cell(&row, c, "n")?);
            }
        }
        let series = Self::new(times, x)?;
        if n_col.is_some() {
            series.with_n(n)
        } else {
            Ok(series)
        }
    }

    /// Spacing between timepoints, if uniform.
    fn uniform_spacing(&self) -> Option<f64> {
        if self.times.len() < 2 {
            return Some(1.0);
        }
        let dt = self.times[1] - self.times[0];
        let uniform = self
            .times
            .windows(2)
            .all(|w| ((w[1] - w[0]) - dt).abs() < 1e-9 * dt.abs().max(1.0));
        uniform.then_some(dt)
    }
}

fn parse_cell(row: &csv::StringRecord, col: usize, name: &str) -> EpiResult<f64> {
    row.get(col)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| EpiError::Parse(format!("bad value in observed column {name:?}")))
}

// ── Conform ───────────────────────────────────────────────────────────────────

/// How a simulated series is aligned onto the observed timepoints.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConformPolicy {
    /// Point-in-time quantity: linear interpolation at observed times.
    Prevalent,
    /// Per-interval quantity: cumulative-sum, interpolate at the observed
    /// knots plus one trailing step, re-difference.  Requires uniformly
    /// spaced observed timepoints.
    Incident,
}

/// Linear interpolation of `(xs, ys)` at `x`, clamping outside the range.
fn interp(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    // xs is sorted; find the bracketing pair.
    let hi = xs.partition_point(|&v| v < x).max(1);
    let (x0, x1) = (xs[hi - 1], xs[hi]);
    let (y0, y1) = (ys[hi - 1], ys[hi]);
    if x1 == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Align a simulated series (`sim_t`, `sim_x`) onto the observed
/// timepoints.
pub fn conform(
    policy: ConformPolicy,
    observed: &ObservedSeries,
    sim_t: &[f64],
    sim_x: &[f64],
) -> EpiResult<Vec<f64>> {
    if sim_t.len() != sim_x.len() || sim_t.is_empty() {
        return Err(EpiError::DataAlignment(
            "simulated series and timepoints are misaligned".into(),
        ));
    }
    match policy {
        ConformPolicy::Prevalent => Ok(observed
            .times
            .iter()
            .map(|&t| interp(sim_t, sim_x, t))
            .collect()),
        ConformPolicy::Incident => {
            let dt = observed.uniform_spacing().ok_or_else(|| {
                EpiError::DataAlignment(
                    "incident conform requires uniformly spaced observed timepoints".into(),
                )
            })?;
            let mut cum = Vec::with_capacity(sim_x.len());
            let mut acc = 0.0;
            for &v in sim_x {
                acc += v;
                cum.push(acc);
            }
            Ok(observed
                .times
                .iter()
                .map(|&t| interp(sim_t, &cum, t + dt) - interp(sim_t, &cum, t))
                .collect())
        }
    }
}

// ── Likelihoods ───────────────────────────────────────────────────────────────

/// Closed-form discrete likelihood families.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Likelihood {
    /// For proportion / count-out-of-total data: a Beta(1, 1) prior updated
    /// by the simulated `(x, n)`, evaluated against the observed `(x, n)`.
    BetaBinomial,
    /// For rate data (counts over exposure): a Gamma(1, ~0) prior updated
    /// by the simulated counts, evaluated as a negative binomial.
    GammaPoisson,
}

/// Per-point beta-binomial negative log-likelihood.
pub fn beta_binomial_nll(x_obs: f64, n_obs: f64, x_sim: f64, n_sim: f64) -> f64 {
    let log_l = ln_beta(x_sim + x_obs + 1.0, n_sim - x_sim + n_obs - x_obs + 1.0)
        - ln_beta(x_sim + 1.0, n_sim - x_sim + 1.0);
    -log_l
}

/// Per-point gamma-Poisson (negative binomial) negative log-likelihood.
/// Zero or negative exposure is a domain error, not a bad fit.
pub fn gamma_poisson_nll(x_obs: f64, n_obs: f64, x_sim: f64, n_sim: f64) -> EpiResult<f64> {
    if n_obs <= 0.0 || n_sim <= 0.0 {
        return Err(EpiError::Sim(format!(
            "gamma-Poisson likelihood needs positive exposure, got n_obs={n_obs}, n_sim={n_sim}"
        )));
    }
    let shape = x_sim + 1.0;
    let log_l = ln_gamma(x_obs + shape) - ln_gamma(shape) - ln_gamma(x_obs + 1.0)
        + shape * (n_sim / (n_sim + n_obs)).ln()
        + x_obs * (n_obs / (n_sim + n_obs)).ln();
    Ok(-log_l)
}

// ── CalibComponent ────────────────────────────────────────────────────────────

/// Pairs one observed series with the simulation channel it constrains.
pub struct CalibComponent {
    pub name: String,
    /// Results channel holding the simulated numerator.
    pub channel: String,
    /// Results channel holding the simulated denominator.
    pub n_channel: String,
    pub observed: ObservedSeries,
    pub conform: ConformPolicy,
    pub likelihood: Likelihood,
    pub weight: f64,
}

impl CalibComponent {
    /// Construct, validating data alignment up front (an incident conform
    /// with irregular observed spacing must fail here, not mid-run).
    pub fn new(
        name: impl Into<String>,
        channel: impl Into<String>,
        observed: ObservedSeries,
        conform: ConformPolicy,
        likelihood: Likelihood,
    ) -> EpiResult<Self> {
        if conform == ConformPolicy::Incident && observed.uniform_spacing().is_none() {
            return Err(EpiError::DataAlignment(
                "incident conform requires uniformly spaced observed timepoints".into(),
            ));
        }
        if likelihood == Likelihood::BetaBinomial && observed.n.is_none() {
            return Err(EpiError::DataAlignment(
                "beta-binomial likelihood requires observed denominators ('n')".into(),
            ));
        }
        let channel = channel.into();
        Ok(Self {
            name: name.into(),
            channel,
            n_channel: "n_alive".to_owned(),
            observed,
            conform,
            likelihood,
            weight: 1.0,
        })
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Use a different denominator channel than the default `n_alive`.
    pub fn with_n_channel(mut self, channel: impl Into<String>) -> Self {
        self.n_channel = channel.into();
        self
    }

    /// Weight-scaled negative log-likelihood of this component against one
    /// finished run.
    pub fn eval(&self, results: &Results) -> EpiResult<f64> {
        let sim_t = results.get("year").ok_or_else(|| {
            EpiError::Config("results are missing the driver 'year' channel".into())
        })?;
        let sim_x = results.get(&self.channel).ok_or_else(|| {
            EpiError::Config(format!(
                "component {:?}: results have no channel {:?}",
                self.name, self.channel
            ))
        })?;
        let sim_n = results.get(&self.n_channel).ok_or_else(|| {
            EpiError::Config(format!(
                "component {:?}: results have no channel {:?}",
                self.name, self.n_channel
            ))
        })?;

        let x_sim = conform(self.conform, &self.observed, sim_t, sim_x)?;
        // Denominators are point-in-time by nature.
        let n_sim = conform(ConformPolicy::Prevalent, &self.observed, sim_t, sim_n)?;

        let ones = vec![1.0; self.observed.times.len()];
        let n_obs = self.observed.n.as_deref().unwrap_or(&ones);

        let mut nll = 0.0;
        for i in 0..self.observed.times.len() {
            nll += match self.likelihood {
                Likelihood::BetaBinomial => {
                    beta_binomial_nll(self.observed.x[i], n_obs[i], x_sim[i], n_sim[i])
                }
                Likelihood::GammaPoisson => {
                    gamma_poisson_nll(self.observed.x[i], n_obs[i], x_sim[i], n_sim[i])?
                }
            };
        }
        Ok(self.weight * nll)
    }
}
