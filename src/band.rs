//! Interface band selection and the restriction onto the band subspace.

use crate::{
  dof::ActiveDofSet,
  error::MultigridError,
  geometry::CutClassification,
  linalg::Vector,
};

/// Selects the interface band of a level: the active dofs whose basis
/// function is supported on a cut cell, optionally widened by rings of
/// neighboring cells so the band covers the ghost-penalty stencil.
///
/// The band width is a modelling choice, not a constant; one layer matches
/// the usual first-order ghost-penalty stencil.
#[derive(Debug, Clone, Copy)]
pub struct BandSelector {
  pub layers: usize,
}

impl Default for BandSelector {
  fn default() -> Self {
    Self { layers: 1 }
  }
}

impl BandSelector {
  pub fn new(layers: usize) -> Self {
    Self { layers }
  }

  /// Local indices of the band dofs, sorted ascending.
  ///
  /// Membership is a set property of the classification, so the result does
  /// not depend on cell enumeration order. An interface that no cell
  /// resolves yields an empty band.
  pub fn select(
    &self,
    active: &ActiveDofSet,
    classification: &CutClassification,
  ) -> Result<Vec<usize>, MultigridError> {
    let ncells = classification.ncells();

    let mut in_band = vec![false; ncells];
    let mut front: Vec<usize> = classification.cut_cells().collect();
    for &cell in &front {
      in_band[cell] = true;
    }

    // Widen by facet neighbors, staying on cells the space covers.
    for _ in 0..self.layers {
      let mut next = Vec::new();
      for &cell in &front {
        for &neighbor in classification.neighbors(cell) {
          if !in_band[neighbor] && classification.class(neighbor).is_covered() {
            in_band[neighbor] = true;
            next.push(neighbor);
          }
        }
      }
      front = next;
    }

    let mut locals = Vec::new();
    for (cell, &flag) in in_band.iter().enumerate() {
      if !flag {
        continue;
      }
      for &dof in classification.cell_dofs(cell) {
        let local = active
          .local_of(dof)
          .ok_or(MultigridError::InvalidBandSelection { cell, dof })?;
        locals.push(local);
      }
    }
    locals.sort_unstable();
    locals.dedup();
    Ok(locals)
  }
}

/// Rectangular operator between a level's full compressed dof space and its
/// interface-band subspace: `restrict` gathers (R), `extend_add` scatters
/// the transpose back (Rᵗ).
///
/// R Rᵗ is the identity on the band subspace and zero outside of it.
#[derive(Debug, Clone, Default)]
pub struct BandRestriction {
  locals: Vec<usize>,
  full_dim: usize,
}

impl BandRestriction {
  pub fn new(locals: Vec<usize>, full_dim: usize) -> Self {
    debug_assert!(locals.windows(2).all(|w| w[0] < w[1]));
    assert!(locals.last().map_or(true, |&last| last < full_dim));
    Self { locals, full_dim }
  }

  pub fn nband(&self) -> usize {
    self.locals.len()
  }
  pub fn is_empty(&self) -> bool {
    self.locals.is_empty()
  }
  pub fn full_dim(&self) -> usize {
    self.full_dim
  }
  pub fn locals(&self) -> &[usize] {
    &self.locals
  }

  /// R: band components of a full vector.
  pub fn restrict(&self, full: &Vector) -> Vector {
    assert_eq!(full.nrows(), self.full_dim);
    Vector::from_iterator(self.locals.len(), self.locals.iter().map(|&l| full[l]))
  }

  /// Rᵗ applied additively: scatter a band vector into the full space.
  pub fn extend_add(&self, band: &Vector, full: &mut Vector) {
    assert_eq!(band.nrows(), self.locals.len());
    assert_eq!(full.nrows(), self.full_dim);
    for (i, &l) in self.locals.iter().enumerate() {
      full[l] += band[i];
    }
  }
}
