//! Two-stage smoother: subdomain relaxation plus exact interface correction.
//!
//! Away from the interface the cut discretization behaves like a fitted one,
//! so a symmetric Gauss-Seidel sweep is enough there. The dofs in the
//! interface band see the coefficient jump and the Nitsche/ghost-penalty
//! coupling; those are corrected by an exact solve of the reduced band
//! system, which leaves the band projection of the residual at zero.

use crate::{
  error::MultigridError,
  hierarchy::Level,
  linalg::{self, CsrMatrix, Vector},
};

/// One Gauss-Seidel sweep, in place. `reverse` runs the backward ordering.
pub fn gauss_seidel_sweep(a: &CsrMatrix, rhs: &Vector, x: &mut Vector, reverse: bool) {
  let n = a.nrows();
  let offsets = a.row_offsets();
  let cols = a.col_indices();
  let vals = a.values();

  let mut relax = |i: usize| {
    let mut diag = 0.0;
    let mut sum = rhs[i];
    for k in offsets[i]..offsets[i + 1] {
      let j = cols[k];
      if j == i {
        diag += vals[k];
      } else {
        sum -= vals[k] * x[j];
      }
    }
    assert!(diag != 0.0, "missing or zero diagonal in relaxation");
    x[i] = sum / diag;
  };

  if reverse {
    (0..n).rev().for_each(&mut relax);
  } else {
    (0..n).for_each(&mut relax);
  }
}

/// One smoothing step on a level: a symmetric Gauss-Seidel sweep over the
/// full active system, followed by the interface-band correction.
pub fn smooth(level: &Level, rhs: &Vector, x: &mut Vector) -> Result<(), MultigridError> {
  check_dims(level, rhs, x)?;
  gauss_seidel_sweep(level.matrix(), rhs, x, false);
  gauss_seidel_sweep(level.matrix(), rhs, x, true);
  band_correction(level, rhs, x)
}

/// Solves the reduced band system exactly and applies the correction.
///
/// Afterwards the restriction of `rhs - A x` onto the band subspace is zero
/// up to the accuracy of the direct solve. An empty band is a no-op; a
/// singular band system propagates [`MultigridError::SingularBandSystem`]
/// and the caller may skip the correction for that sweep.
pub fn band_correction(level: &Level, rhs: &Vector, x: &mut Vector) -> Result<(), MultigridError> {
  check_dims(level, rhs, x)?;
  let Some(lu) = level.band_lu()? else {
    return Ok(());
  };

  let r = linalg::residual(level.matrix(), rhs, x);
  let r_band = level.band().restrict(&r);
  let delta = lu.solve(&r_band);
  level.band().extend_add(&delta, x);
  Ok(())
}

fn check_dims(level: &Level, rhs: &Vector, x: &Vector) -> Result<(), MultigridError> {
  if rhs.nrows() != level.ndofs() {
    return Err(MultigridError::InconsistentDimension {
      context: "smoother rhs vs level",
      expected: level.ndofs(),
      found: rhs.nrows(),
    });
  }
  if x.nrows() != level.ndofs() {
    return Err(MultigridError::InconsistentDimension {
      context: "smoother iterate vs level",
      expected: level.ndofs(),
      found: x.nrows(),
    });
  }
  Ok(())
}
