extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod band;
pub mod dof;
pub mod error;
pub mod geometry;
pub mod hierarchy;
pub mod linalg;
pub mod refine;
pub mod smoother;
pub mod solver;

pub use error::MultigridError;
