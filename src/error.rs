use crate::dof::DofIdx;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MultigridError {
  #[error("{context}: expected dimension {expected}, found {found}")]
  InconsistentDimension {
    context: &'static str,
    expected: usize,
    found: usize,
  },
  #[error("interface band system on level {level} is singular")]
  SingularBandSystem { level: usize },
  #[error("coarsest system on level {level} is singular")]
  SingularCoarseSystem { level: usize },
  #[error("cell {cell} supports dof {dof}, which is not active on this level")]
  InvalidBandSelection { cell: usize, dof: DofIdx },
  #[error("level {level} has no prolongation from its coarser neighbor")]
  MissingProlongation { level: usize },
}
