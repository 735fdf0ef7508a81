//! Multigrid cycling: standalone stationary solver and preconditioner.

use crate::{
  error::MultigridError,
  hierarchy::Hierarchy,
  linalg::{self, Vector},
  smoother,
};

/// Cycle configuration. `nu` is the number of pre- and post-smoothing steps,
/// `cycle` the number of coarse-level visits per descent (1 = V-cycle,
/// 2 = W-cycle).
#[derive(Debug, Clone, Copy)]
pub struct MultigridConfig {
  pub nu: usize,
  pub cycle: usize,
}

impl Default for MultigridConfig {
  fn default() -> Self {
    Self { nu: 1, cycle: 1 }
  }
}

/// Outcome of a standalone [`Multigrid::iterate`] run.
///
/// Hitting the iteration cap is reported through `converged`, not as an
/// error; the best iterate is always returned, since callers routinely use
/// a partially converged solution as a warm start.
pub struct SolveReport {
  pub solution: Vector,
  pub iterations: usize,
  pub converged: bool,
  /// Residual norms, starting with the initial residual.
  pub residual_history: Vec<f64>,
}

impl SolveReport {
  /// Mean residual contraction factor per iteration.
  pub fn contraction(&self) -> Option<f64> {
    let first = *self.residual_history.first()?;
    let last = *self.residual_history.last()?;
    let steps = self.residual_history.len() - 1;
    (steps > 0 && first > 0.0).then(|| (last / first).powf(1.0 / steps as f64))
  }
}

/// Multigrid solver over an exclusively owned [`Hierarchy`].
pub struct Multigrid {
  hierarchy: Hierarchy,
  config: MultigridConfig,
}

impl Multigrid {
  pub fn new(hierarchy: Hierarchy, config: MultigridConfig) -> Self {
    Self { hierarchy, config }
  }

  pub fn hierarchy(&self) -> &Hierarchy {
    &self.hierarchy
  }
  pub(crate) fn hierarchy_mut(&mut self) -> &mut Hierarchy {
    &mut self.hierarchy
  }
  pub fn config(&self) -> MultigridConfig {
    self.config
  }
  pub fn into_hierarchy(self) -> Hierarchy {
    self.hierarchy
  }

  /// One cycle from a zero initial guess: the preconditioner contract
  /// `x = M⁻¹ rhs` for an external Krylov host. No convergence check.
  pub fn apply(&self, rhs: &Vector) -> Result<Vector, MultigridError> {
    let finest = self.hierarchy.nlevels() - 1;
    if rhs.nrows() != self.hierarchy.finest().ndofs() {
      return Err(MultigridError::InconsistentDimension {
        context: "rhs vs finest level",
        expected: self.hierarchy.finest().ndofs(),
        found: rhs.nrows(),
      });
    }
    self.cycle(finest, rhs)
  }

  /// Stationary Richardson iteration with one cycle as the preconditioner.
  ///
  /// Halts when the relative residual drops below `tolerance` or after
  /// `max_iterations` cycles, whichever comes first.
  pub fn iterate(
    &self,
    rhs: &Vector,
    x0: &Vector,
    tolerance: f64,
    max_iterations: usize,
  ) -> Result<SolveReport, MultigridError> {
    let finest = self.hierarchy.nlevels() - 1;
    let a = self.hierarchy.finest().matrix();
    if rhs.nrows() != a.nrows() || x0.nrows() != a.nrows() {
      return Err(MultigridError::InconsistentDimension {
        context: "rhs/initial guess vs finest level",
        expected: a.nrows(),
        found: rhs.nrows().max(x0.nrows()),
      });
    }

    let rhs_norm = rhs.norm();
    let denom = if rhs_norm > 0.0 { rhs_norm } else { 1.0 };

    let mut x = x0.clone();
    let mut r = linalg::residual(a, rhs, &x);
    let mut residual_history = vec![r.norm()];
    let mut converged = residual_history[0] / denom < tolerance;
    let mut iterations = 0;

    while !converged && iterations < max_iterations {
      let correction = self.cycle(finest, &r)?;
      x += correction;
      r = linalg::residual(a, rhs, &x);
      iterations += 1;

      let res_norm = r.norm();
      residual_history.push(res_norm);
      tracing::debug!("iteration {iterations}: relative residual {:.3e}", res_norm / denom);
      converged = res_norm / denom < tolerance;
    }

    if !converged {
      tracing::warn!(
        "stopped after {iterations} iterations at relative residual {:.3e}",
        residual_history.last().unwrap() / denom
      );
    }

    Ok(SolveReport {
      solution: x,
      iterations,
      converged,
      residual_history,
    })
  }

  /// One coarse-grid correction cycle on level `ilevel`, from a zero guess.
  fn cycle(&self, ilevel: usize, f: &Vector) -> Result<Vector, MultigridError> {
    let level = self.hierarchy.level(ilevel);

    // Terminal state: exact solve on the coarsest grid.
    if ilevel == 0 {
      return Ok(level.direct_lu()?.solve(f));
    }

    let mut v = Vector::zeros(level.ndofs());
    for _ in 0..self.config.nu {
      smoother::smooth(level, f, &mut v)?;
    }

    let restriction = level
      .restriction()
      .ok_or(MultigridError::MissingProlongation { level: ilevel })?;
    let r = linalg::residual(level.matrix(), f, &v);
    let f_coarse = restriction * &r;

    let coarse = self.hierarchy.level(ilevel - 1);
    let mut v_coarse = Vector::zeros(coarse.ndofs());
    for icycle in 0..self.config.cycle.max(1) {
      let r_coarse = if icycle == 0 {
        f_coarse.clone()
      } else {
        linalg::residual(coarse.matrix(), &f_coarse, &v_coarse)
      };
      v_coarse += self.cycle(ilevel - 1, &r_coarse)?;
    }

    let prolongation = level
      .prolongation()
      .ok_or(MultigridError::MissingProlongation { level: ilevel })?;
    v += prolongation * &v_coarse;

    for _ in 0..self.config.nu {
      smoother::smooth(level, f, &mut v)?;
    }
    Ok(v)
  }
}
