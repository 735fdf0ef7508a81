//! Sparse linear algebra helpers and faer interop for the direct solves.

use faer::linalg::solvers::Solve;

pub type Vector = na::DVector<f64>;
pub type CooMatrix = nas::CooMatrix<f64>;
pub type CsrMatrix = nas::CsrMatrix<f64>;

type SparseMatrixFaer = faer::sparse::SparseRowMat<usize, f64>;

pub fn nalgebra2faer(m: &CsrMatrix) -> SparseMatrixFaer {
  let nrows = m.nrows();
  let ncols = m.ncols();
  let (row_ptrs, col_indices, values) = m.clone().disassemble();

  let symbolic =
    faer::sparse::SymbolicSparseRowMat::new_checked(nrows, ncols, row_ptrs, None, col_indices);
  faer::sparse::SparseRowMat::new(symbolic, values)
}

/// Sparse LU factorization for the interface-band and coarsest-level solves.
///
/// Factorization failure is reported to the caller instead of panicking,
/// since a degenerate band can legitimately produce a singular system.
pub struct SparseLu {
  raw: faer::sparse::linalg::solvers::Lu<usize, f64>,
}

impl std::fmt::Debug for SparseLu {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SparseLu").finish_non_exhaustive()
  }
}

impl SparseLu {
  pub fn try_new(a: &CsrMatrix) -> Option<Self> {
    let raw = nalgebra2faer(a).sp_lu().ok()?;
    let lu = Self { raw };
    // a zero pivot can pass the symbolic factorization; it surfaces as a
    // non-finite solve
    let probe = lu.solve(&Vector::from_element(a.nrows(), 1.0));
    probe.iter().all(|v| v.is_finite()).then_some(lu)
  }

  pub fn solve(&self, b: &Vector) -> Vector {
    let b = faer::Col::from_fn(b.nrows(), |i| b[i]);
    let x = self.raw.solve(b);
    Vector::from_iterator(x.nrows(), x.iter().copied())
  }
}

/// `b - A x`.
pub fn residual(a: &CsrMatrix, b: &Vector, x: &Vector) -> Vector {
  b - a * x
}

/// Square submatrix of `a` on the given sorted index subset.
pub fn submatrix(a: &CsrMatrix, subset: &[usize]) -> CsrMatrix {
  debug_assert!(subset.windows(2).all(|w| w[0] < w[1]));

  let mut pos = vec![usize::MAX; a.ncols()];
  for (inew, &iold) in subset.iter().enumerate() {
    pos[iold] = inew;
  }

  let offsets = a.row_offsets();
  let cols = a.col_indices();
  let vals = a.values();

  let mut coo = CooMatrix::new(subset.len(), subset.len());
  for (inew, &iold) in subset.iter().enumerate() {
    for k in offsets[iold]..offsets[iold + 1] {
      let jnew = pos[cols[k]];
      if jnew != usize::MAX {
        coo.push(inew, jnew, vals[k]);
      }
    }
  }
  CsrMatrix::from(&coo)
}

#[cfg(test)]
mod test {
  use super::*;

  fn tridiag(n: usize) -> CsrMatrix {
    let mut coo = CooMatrix::new(n, n);
    for i in 0..n {
      coo.push(i, i, 2.0);
      if i > 0 {
        coo.push(i, i - 1, -1.0);
      }
      if i + 1 < n {
        coo.push(i, i + 1, -1.0);
      }
    }
    CsrMatrix::from(&coo)
  }

  #[test]
  fn submatrix_of_tridiag() {
    let a = tridiag(6);
    let sub = submatrix(&a, &[2, 3]);
    assert_eq!(sub.nrows(), 2);
    let dense = na::DMatrix::from(&sub);
    assert_eq!(dense, na::dmatrix![2.0, -1.0; -1.0, 2.0]);
  }

  #[test]
  fn sparse_lu_solves_tridiag() {
    let a = tridiag(5);
    let lu = SparseLu::try_new(&a).unwrap();
    let x = Vector::from_fn(5, |i, _| (i + 1) as f64);
    let b = &a * &x;
    let solved = lu.solve(&b);
    assert!((solved - x).norm() < 1e-12);
  }
}
