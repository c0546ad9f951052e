//! Lifecycle calculation over the combined foreground + background system.
//!
//! ```text
//! A = | A_ff          0    |    F = [ F_f | F_b ]    y = | y_f |
//!     | A_bf + A_hyb  A_bb |                             | y_b |
//! ```
//!
//! `(I - A) x = y` is solved by LU decomposition with partial pivoting.

use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use lcaio_types::{LabelIndex, LabeledMatrix, LabeledVector, LcaioError, Result};

use crate::background::BackgroundModel;
use crate::config::HybridizerConfig;
use crate::foreground::ForegroundModel;

/// Which lifecycle quantity to report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    Production,
    Emissions,
    Impacts,
}

impl FromStr for Quantity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" => Ok(Quantity::Production),
            "emissions" => Ok(Quantity::Emissions),
            "impacts" => Ok(Quantity::Impacts),
            other => Err(format!(
                "unknown lifecycle quantity {} (expected production, emissions or impacts)",
                other
            )),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::Production => "production",
            Quantity::Emissions => "emissions",
            Quantity::Impacts => "impacts",
        };
        f.write_str(name)
    }
}

/// All three quantities from one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleResults {
    pub production: LabeledVector,
    pub emissions: LabeledVector,
    /// `None` when the background has no characterization matrix.
    pub impacts: Option<LabeledVector>,
}

/// The assembled `A`, `F`, `C` and `y` over foreground then background labels.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedSystem {
    technology: LabeledMatrix,
    stressors: LabeledMatrix,
    characterization: Option<LabeledMatrix>,
    final_demand: LabeledVector,
}

impl CombinedSystem {
    pub fn assemble(
        foreground: &ForegroundModel,
        background: &BackgroundModel,
        tolerance: f64,
    ) -> Result<Self> {
        let bg_index = background.process_index();
        let fg_index = foreground.process_index();
        let processes = fg_index
            .concat(&bg_index)
            .map_err(|e| match e {
                LcaioError::IdentifierCollision { labels, .. } => LcaioError::IdentifierCollision {
                    context: "foreground processes vs background processes".to_string(),
                    labels,
                },
                other => other,
            })?;

        let a_bf = foreground
            .a_bf()
            .reindex_rows(&bg_index, tolerance)
            .map_err(|e| e.in_matrix("A_bf"))?;
        let a_hyb = foreground
            .a_hyb()
            .reindex_rows(&bg_index, tolerance)
            .map_err(|e| e.in_matrix("A_hyb"))?;
        let lower_left = a_bf.add(&a_hyb)?;
        let a_ff = foreground.a_ff().data();
        let a_bb = background.technology()?;
        let nf = fg_index.len();
        let data = DMatrix::from_fn(processes.len(), processes.len(), |i, j| {
            match (i < nf, j < nf) {
                (true, true) => a_ff[(i, j)],
                (true, false) => 0.0,
                (false, true) => lower_left.data()[(i - nf, j)],
                (false, false) => a_bb.data()[(i - nf, j - nf)],
            }
        });
        let technology = LabeledMatrix::new(processes.clone(), processes, data)?;

        let stressor_index = background.stressor_index();
        let f_f = foreground
            .f_f()
            .reindex_rows(&stressor_index, tolerance)
            .map_err(|e| e.in_matrix("F_f"))?;
        let stressors = f_f.hconcat(&background.stressors()?)?;

        let final_demand = foreground.y_f().concat(&background.final_demand()?)?;
        let characterization = background.characterization()?;

        debug!(
            foreground = nf,
            background = bg_index.len(),
            stressors = stressor_index.len(),
            "assembled combined system"
        );
        Ok(Self {
            technology,
            stressors,
            characterization,
            final_demand,
        })
    }

    pub fn process_index(&self) -> &LabelIndex {
        self.technology.row_index()
    }

    pub fn technology(&self) -> &LabeledMatrix {
        &self.technology
    }

    pub fn stressors(&self) -> &LabeledMatrix {
        &self.stressors
    }

    pub fn characterization(&self) -> Option<&LabeledMatrix> {
        self.characterization.as_ref()
    }

    pub fn final_demand(&self) -> &LabeledVector {
        &self.final_demand
    }

    /// Solve `(I - A) x = y`.
    ///
    /// The system is reported singular when the smallest LU pivot is at or
    /// below `singularity_tolerance` times the largest entry of `I - A`.
    pub fn solve_production(&self, singularity_tolerance: f64) -> Result<LabeledVector> {
        let n = self.technology.nrows();
        if n == 0 {
            return Ok(LabeledVector::zeros(self.process_index().clone()));
        }
        let system = DMatrix::<f64>::identity(n, n) - self.technology.data();
        let scale = system.amax().max(f64::MIN_POSITIVE);
        let lu = system.lu();
        let pivot = lu
            .u()
            .diagonal()
            .iter()
            .fold(f64::INFINITY, |acc, v| acc.min(v.abs()));
        trace!(size = n, pivot, scale, "LU factorization");
        if pivot.is_nan() || pivot <= singularity_tolerance * scale {
            return Err(LcaioError::SingularSystem { size: n, pivot });
        }
        let x = lu
            .solve(self.final_demand.data())
            .ok_or(LcaioError::SingularSystem { size: n, pivot })?;
        if x.iter().any(|v| !v.is_finite()) {
            return Err(LcaioError::SingularSystem { size: n, pivot });
        }
        LabeledVector::new(self.process_index().clone(), x)
    }

    /// `F · x`.
    pub fn emissions(&self, production: &LabeledVector) -> Result<LabeledVector> {
        let e = self.stressors.data() * production.data();
        LabeledVector::new(self.stressors.row_index().clone(), e)
    }

    /// `C · e`.
    pub fn impacts(&self, emissions: &LabeledVector) -> Result<LabeledVector> {
        let c = self
            .characterization
            .as_ref()
            .ok_or_else(|| LcaioError::missing("characterization matrix C"))?;
        LabeledVector::new(c.row_index().clone(), c.data() * emissions.data())
    }
}

/// Solve the combined system and report one quantity.
pub fn calc_lifecycle(
    foreground: &ForegroundModel,
    background: &BackgroundModel,
    quantity: Quantity,
    config: &HybridizerConfig,
) -> Result<LabeledVector> {
    let system = CombinedSystem::assemble(foreground, background, config.zero_tolerance)?;
    let x = system.solve_production(config.singularity_tolerance)?;
    match quantity {
        Quantity::Production => Ok(x),
        Quantity::Emissions => system.emissions(&x),
        Quantity::Impacts => system.impacts(&system.emissions(&x)?),
    }
}

/// Solve once and report every quantity.
pub fn calc_all(
    foreground: &ForegroundModel,
    background: &BackgroundModel,
    config: &HybridizerConfig,
) -> Result<LifecycleResults> {
    let system = CombinedSystem::assemble(foreground, background, config.zero_tolerance)?;
    let production = system.solve_production(config.singularity_tolerance)?;
    let emissions = system.emissions(&production)?;
    let impacts = match system.characterization() {
        Some(_) => Some(system.impacts(&emissions)?),
        None => None,
    };
    Ok(LifecycleResults {
        production,
        emissions,
        impacts,
    })
}
