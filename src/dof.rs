//! Active degree-of-freedom tracking for unfitted discretizations.
//!
//! On a cut mesh only the dofs whose basis functions touch the physical
//! domain carry equations. Each level compresses its active dofs into a
//! dense local numbering so that level matrices and vectors are contiguous.

use indexmap::IndexSet;
use itertools::Itertools;

pub type DofIdx = usize;

/// Globally active dofs of one level, with dense local numbering.
///
/// The local index of a dof is its position in the set. Global indices are
/// kept sorted, so the local numbering is reproducible for a given input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveDofSet {
  globals: IndexSet<DofIdx>,
}

impl ActiveDofSet {
  pub fn new(globals: impl IntoIterator<Item = DofIdx>) -> Self {
    let globals = globals.into_iter().sorted_unstable().dedup().collect();
    Self { globals }
  }

  pub fn len(&self) -> usize {
    self.globals.len()
  }
  pub fn is_empty(&self) -> bool {
    self.globals.is_empty()
  }

  pub fn contains(&self, global: DofIdx) -> bool {
    self.globals.contains(&global)
  }

  /// Dense local index of a global dof, if it is active.
  pub fn local_of(&self, global: DofIdx) -> Option<usize> {
    self.globals.get_index_of(&global)
  }

  pub fn global_of(&self, local: usize) -> DofIdx {
    *self
      .globals
      .get_index(local)
      .expect("local dof index out of range")
  }

  pub fn iter(&self) -> impl ExactSizeIterator<Item = DofIdx> + '_ {
    self.globals.iter().copied()
  }
}
