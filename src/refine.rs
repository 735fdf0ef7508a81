//! Hierarchy maintenance across mesh refinement and interface movement.
//!
//! The mesh, finite element space and assembly all live outside this crate;
//! they are reached through the collaborator traits below. The controller
//! here only decides *when* each level is (re)built and keeps the hierarchy
//! invariants intact while doing so.

use crate::{
  band::BandSelector,
  dof::ActiveDofSet,
  error::MultigridError,
  geometry::{CutClassification, Formulation},
  linalg::CsrMatrix,
  solver::Multigrid,
};

/// Assembly collaborator: recovers the active dof set and the compressed
/// system matrix for one geometry snapshot. Serves both fresh assembly of a
/// new finest level and the re-assembly callback after the interface moved.
pub trait LevelAssembly {
  fn active_dofs(&self, classification: &CutClassification) -> ActiveDofSet;
  fn system_matrix(
    &self,
    classification: &CutClassification,
    active: &ActiveDofSet,
    formulation: &Formulation,
  ) -> CsrMatrix;
}

/// FE-space collaborator: transfer operator between the compressed dof
/// spaces of two consecutive levels.
pub trait ProlongationProvider {
  fn prolongation(&self, coarse: &ActiveDofSet, fine: &ActiveDofSet) -> CsrMatrix;
}

/// What to do with coarse operators whose geometry version went stale.
///
/// Coarse matrices assembled by direct discretization stay usable when the
/// interface moves only slightly; `Frozen` keeps them and accepts the
/// approximation, `Refresh` re-assembles every stale level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoarsePolicy {
  Frozen,
  Refresh,
}

impl Multigrid {
  /// Extends the hierarchy after the external mesh subsystem refined.
  ///
  /// Builds the new finest level from `classification`, re-selects its
  /// interface band and links it to the previous finest level. Coarser
  /// levels are left untouched.
  pub fn on_refine(
    &mut self,
    classification: &CutClassification,
    assembly: &impl LevelAssembly,
    transfer: &impl ProlongationProvider,
    formulation: &Formulation,
    selector: &BandSelector,
  ) -> Result<(), MultigridError> {
    let active = assembly.active_dofs(classification);
    let matrix = assembly.system_matrix(classification, &active, formulation);
    let band = selector.select(&active, classification)?;
    let prolongation = transfer.prolongation(self.hierarchy().finest().active(), &active);

    tracing::debug!(
      "appending level {} with {} active dofs, band size {}",
      self.hierarchy().nlevels(),
      active.len(),
      band.len()
    );
    self
      .hierarchy_mut()
      .append_level(prolongation, matrix, active, band, classification.version())
  }

  /// Refreshes levels after the interface moved without a refinement.
  ///
  /// `classifications` holds one snapshot per level, coarsest first. Levels
  /// whose stored geometry version matches are skipped. Under
  /// [`CoarsePolicy::Frozen`] only the finest level is rebuilt and stale
  /// coarse operators are kept; under [`CoarsePolicy::Refresh`] every stale
  /// level is rebuilt. Transfers adjacent to a rebuilt level are re-derived
  /// from the FE-space collaborator.
  pub fn on_geometry_change(
    &mut self,
    classifications: &[CutClassification],
    policy: CoarsePolicy,
    assembly: &impl LevelAssembly,
    transfer: &impl ProlongationProvider,
    formulation: &Formulation,
    selector: &BandSelector,
  ) -> Result<(), MultigridError> {
    let nlevels = self.hierarchy().nlevels();
    if classifications.len() != nlevels {
      return Err(MultigridError::InconsistentDimension {
        context: "classification snapshots vs level count",
        expected: nlevels,
        found: classifications.len(),
      });
    }

    let mut rebuilt = vec![false; nlevels];
    for (ilevel, classification) in classifications.iter().enumerate() {
      if self.hierarchy().level(ilevel).geometry() == classification.version() {
        continue;
      }
      let is_finest = ilevel + 1 == nlevels;
      if policy == CoarsePolicy::Frozen && !is_finest {
        tracing::warn!("keeping stale coarse operator on level {ilevel}");
        continue;
      }

      let active = assembly.active_dofs(classification);
      let matrix = assembly.system_matrix(classification, &active, formulation);
      let band = selector.select(&active, classification)?;
      self.hierarchy_mut().rebuild_level(
        ilevel,
        matrix,
        active,
        band,
        classification.version(),
      )?;
      rebuilt[ilevel] = true;
    }

    // A rebuilt level invalidates the transfers on both of its sides: the
    // active set may have changed membership even at equal cardinality.
    for ilevel in 1..nlevels {
      if !(rebuilt[ilevel - 1] || rebuilt[ilevel]) {
        continue;
      }
      let prolongation = transfer.prolongation(
        self.hierarchy().level(ilevel - 1).active(),
        self.hierarchy().level(ilevel).active(),
      );
      self.hierarchy_mut().set_prolongation(ilevel, prolongation)?;
    }
    Ok(())
  }
}
