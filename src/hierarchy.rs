//! Per-level storage for the multigrid hierarchy.
//!
//! The hierarchy owns, per refinement depth, the compressed system matrix,
//! the active dof set, the interface band and the transfer operator from the
//! next-coarser level. It is pure storage: re-assembly after geometry
//! changes is driven from the outside (see [`crate::refine`]).

use once_cell::unsync::OnceCell;

use crate::{
  band::BandRestriction,
  dof::ActiveDofSet,
  error::MultigridError,
  geometry::GeometryVersion,
  linalg::{self, CsrMatrix, SparseLu},
};

/// One refinement depth, 0 = coarsest.
#[derive(Debug)]
pub struct Level {
  index: usize,
  matrix: CsrMatrix,
  active: ActiveDofSet,
  band: BandRestriction,
  /// Transfer from the next-coarser level into this one. `None` on level 0,
  /// and on rebuilt levels until the transfer is restored.
  prolongation: Option<CsrMatrix>,
  restriction: Option<CsrMatrix>,
  geometry: GeometryVersion,
  band_lu: OnceCell<SparseLu>,
  direct_lu: OnceCell<SparseLu>,
}

impl Level {
  fn new(
    index: usize,
    matrix: CsrMatrix,
    active: ActiveDofSet,
    band: Vec<usize>,
    geometry: GeometryVersion,
  ) -> Result<Self, MultigridError> {
    if matrix.nrows() != matrix.ncols() {
      return Err(MultigridError::InconsistentDimension {
        context: "level matrix must be square",
        expected: matrix.nrows(),
        found: matrix.ncols(),
      });
    }
    if matrix.nrows() != active.len() {
      return Err(MultigridError::InconsistentDimension {
        context: "level matrix vs active dof count",
        expected: active.len(),
        found: matrix.nrows(),
      });
    }
    if let Some(&last) = band.last() {
      if last >= active.len() {
        return Err(MultigridError::InconsistentDimension {
          context: "band dof index vs active dof count",
          expected: active.len(),
          found: last,
        });
      }
    }
    let band = BandRestriction::new(band, active.len());
    Ok(Self {
      index,
      matrix,
      active,
      band,
      prolongation: None,
      restriction: None,
      geometry,
      band_lu: OnceCell::new(),
      direct_lu: OnceCell::new(),
    })
  }

  pub fn index(&self) -> usize {
    self.index
  }
  pub fn ndofs(&self) -> usize {
    self.active.len()
  }
  pub fn matrix(&self) -> &CsrMatrix {
    &self.matrix
  }
  pub fn active(&self) -> &ActiveDofSet {
    &self.active
  }
  pub fn band(&self) -> &BandRestriction {
    &self.band
  }
  pub fn prolongation(&self) -> Option<&CsrMatrix> {
    self.prolongation.as_ref()
  }
  pub fn restriction(&self) -> Option<&CsrMatrix> {
    self.restriction.as_ref()
  }
  pub fn geometry(&self) -> GeometryVersion {
    self.geometry
  }

  /// Factorization of the reduced band system, built on first use and cached
  /// until the level is rebuilt. `None` for an empty band.
  pub fn band_lu(&self) -> Result<Option<&SparseLu>, MultigridError> {
    if self.band.is_empty() {
      return Ok(None);
    }
    let lu = self.band_lu.get_or_try_init(|| {
      let reduced = linalg::submatrix(&self.matrix, self.band.locals());
      SparseLu::try_new(&reduced).ok_or(MultigridError::SingularBandSystem { level: self.index })
    })?;
    Ok(Some(lu))
  }

  /// Factorization of the full level system, for the coarsest-level solve.
  pub fn direct_lu(&self) -> Result<&SparseLu, MultigridError> {
    self.direct_lu.get_or_try_init(|| {
      SparseLu::try_new(&self.matrix)
        .ok_or(MultigridError::SingularCoarseSystem { level: self.index })
    })
  }

  fn set_prolongation(&mut self, prolongation: CsrMatrix) {
    self.restriction = Some(prolongation.transpose());
    self.prolongation = Some(prolongation);
  }
}

/// Ordered sequence of levels, coarsest first. Created with one level and
/// extended as refinement proceeds; never empty.
#[derive(Debug)]
pub struct Hierarchy {
  levels: Vec<Level>,
}

impl Hierarchy {
  /// Creates the hierarchy at the coarsest mesh.
  pub fn initialize(
    matrix: CsrMatrix,
    active: ActiveDofSet,
    band: Vec<usize>,
    geometry: GeometryVersion,
  ) -> Result<Self, MultigridError> {
    let level = Level::new(0, matrix, active, band, geometry)?;
    Ok(Self {
      levels: vec![level],
    })
  }

  pub fn nlevels(&self) -> usize {
    self.levels.len()
  }
  pub fn level(&self, index: usize) -> &Level {
    &self.levels[index]
  }
  pub fn levels(&self) -> &[Level] {
    &self.levels
  }
  pub fn finest(&self) -> &Level {
    self.levels.last().expect("hierarchy is never empty")
  }

  /// Appends one finer level. The prolongation must map the previous finest
  /// level's compressed space into the new one.
  pub fn append_level(
    &mut self,
    prolongation: CsrMatrix,
    matrix: CsrMatrix,
    active: ActiveDofSet,
    band: Vec<usize>,
    geometry: GeometryVersion,
  ) -> Result<(), MultigridError> {
    let index = self.levels.len();
    let mut level = Level::new(index, matrix, active, band, geometry)?;

    let coarse_ndofs = self.finest().ndofs();
    if prolongation.ncols() != coarse_ndofs {
      return Err(MultigridError::InconsistentDimension {
        context: "prolongation domain vs coarser level",
        expected: coarse_ndofs,
        found: prolongation.ncols(),
      });
    }
    if prolongation.nrows() != level.ndofs() {
      return Err(MultigridError::InconsistentDimension {
        context: "prolongation range vs finer level",
        expected: level.ndofs(),
        found: prolongation.nrows(),
      });
    }

    level.set_prolongation(prolongation);
    self.levels.push(level);
    Ok(())
  }

  /// Replaces a level's matrix and dof data in place after the geometry
  /// changed. Cached factorizations are dropped. Transfer operators whose
  /// dimensions no longer match are dropped as well and must be restored
  /// with [`Hierarchy::set_prolongation`] before the next cycle.
  pub fn rebuild_level(
    &mut self,
    index: usize,
    matrix: CsrMatrix,
    active: ActiveDofSet,
    band: Vec<usize>,
    geometry: GeometryVersion,
  ) -> Result<(), MultigridError> {
    let rebuilt = Level::new(index, matrix, active, band, geometry)?;
    let ndofs = rebuilt.ndofs();

    let old = &mut self.levels[index];
    let kept_incoming = old
      .prolongation
      .take()
      .filter(|p| p.nrows() == ndofs);
    *old = rebuilt;
    if let Some(p) = kept_incoming {
      old.set_prolongation(p);
    }

    if let Some(finer) = self.levels.get_mut(index + 1) {
      let outgoing_stale = finer
        .prolongation
        .as_ref()
        .is_some_and(|p| p.ncols() != ndofs);
      if outgoing_stale {
        finer.prolongation = None;
        finer.restriction = None;
      }
    }
    Ok(())
  }

  /// Restores the transfer from level `index - 1` into level `index`, e.g.
  /// after a rebuild changed active dof counts.
  pub fn set_prolongation(
    &mut self,
    index: usize,
    prolongation: CsrMatrix,
  ) -> Result<(), MultigridError> {
    assert!(index > 0, "level 0 has no incoming transfer");

    let coarse_ndofs = self.levels[index - 1].ndofs();
    let fine_ndofs = self.levels[index].ndofs();
    if prolongation.ncols() != coarse_ndofs {
      return Err(MultigridError::InconsistentDimension {
        context: "prolongation domain vs coarser level",
        expected: coarse_ndofs,
        found: prolongation.ncols(),
      });
    }
    if prolongation.nrows() != fine_ndofs {
      return Err(MultigridError::InconsistentDimension {
        context: "prolongation range vs finer level",
        expected: fine_ndofs,
        found: prolongation.nrows(),
      });
    }
    self.levels[index].set_prolongation(prolongation);
    Ok(())
  }
}
