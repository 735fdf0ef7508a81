extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

use approx::assert_abs_diff_eq;
use cutmg::{
  dof::ActiveDofSet,
  geometry::GeometryVersion,
  hierarchy::Hierarchy,
  solver::{Multigrid, MultigridConfig},
};

type Vector = na::DVector<f64>;
type CsrMatrix = nas::CsrMatrix<f64>;

fn init_logging() {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn tridiag(n: usize) -> CsrMatrix {
  let mut coo = nas::CooMatrix::new(n, n);
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

fn diagonal(entries: &[f64]) -> CsrMatrix {
  let mut coo = nas::CooMatrix::new(entries.len(), entries.len());
  for (i, &v) in entries.iter().enumerate() {
    coo.push(i, i, v);
  }
  CsrMatrix::from(&coo)
}

/// Linear interpolation from `ncoarse` dofs onto `2 ncoarse + 1` fine dofs:
/// coarse node `c` coincides with fine node `2c + 1`, in-between fine nodes
/// average their neighbors.
fn linear_interpolation(ncoarse: usize) -> CsrMatrix {
  let nfine = 2 * ncoarse + 1;
  let mut coo = nas::CooMatrix::new(nfine, ncoarse);
  for c in 0..ncoarse {
    let f = 2 * c + 1;
    coo.push(f, c, 1.0);
    coo.push(f - 1, c, 0.5);
    coo.push(f + 1, c, 0.5);
  }
  CsrMatrix::from(&coo)
}

/// Two-level 1d Laplace hierarchy: 3 coarse dofs, 7 fine dofs, interface
/// band on fine dofs {2, 3}.
fn two_level_laplace(config: MultigridConfig) -> Multigrid {
  let mut hierarchy = Hierarchy::initialize(
    tridiag(3),
    ActiveDofSet::new(0..3),
    vec![],
    GeometryVersion(0),
  )
  .unwrap();
  hierarchy
    .append_level(
      linear_interpolation(3),
      tridiag(7),
      ActiveDofSet::new(0..7),
      vec![2, 3],
      GeometryVersion(0),
    )
    .unwrap();
  Multigrid::new(hierarchy, config)
}

#[test]
fn prolongation_reproduces_constants_at_shared_nodes() {
  let p = linear_interpolation(3);
  assert_eq!(p.nrows(), 7);
  assert_eq!(p.ncols(), 3);

  let fine = &p * &Vector::from_element(3, 1.0);
  // shared nodes and interior averages carry the constant; only the two
  // boundary rows see the homogeneous Dirichlet boundary
  for node in [1, 2, 3, 4, 5] {
    assert_abs_diff_eq!(fine[node], 1.0);
  }
  assert_abs_diff_eq!(fine[0], 0.5);
  assert_abs_diff_eq!(fine[6], 0.5);
}

#[test]
fn exact_solution_yields_zero_correction() {
  let mg = two_level_laplace(MultigridConfig::default());

  let x_exact = Vector::from_fn(7, |i, _| 1.0 + i as f64);
  let rhs = mg.hierarchy().finest().matrix() * &x_exact;
  let report = mg.iterate(&rhs, &x_exact, 1e-12, 5).unwrap();
  assert!(report.converged);
  assert_eq!(report.iterations, 0);

  // the preconditioner maps a zero residual to a zero correction
  let correction = mg.apply(&Vector::zeros(7)).unwrap();
  assert!(correction.norm() <= f64::EPSILON);
}

#[test]
fn residual_decreases_monotonically() {
  init_logging();
  let mg = two_level_laplace(MultigridConfig { nu: 2, cycle: 1 });

  let rhs = Vector::from_element(7, 1.0);
  let report = mg.iterate(&rhs, &Vector::zeros(7), 1e-10, 100).unwrap();
  assert!(report.converged);
  for w in report.residual_history.windows(2) {
    assert!(w[1] <= w[0] * (1.0 + 1e-6));
  }
  assert!(report.contraction().unwrap() < 1.0);
}

#[test]
fn w_cycle_converges() {
  let mg = two_level_laplace(MultigridConfig { nu: 1, cycle: 2 });

  let rhs = Vector::from_element(7, 1.0);
  let report = mg.iterate(&rhs, &Vector::zeros(7), 1e-10, 100).unwrap();
  assert!(report.converged);

  let r = &rhs - mg.hierarchy().finest().matrix() * &report.solution;
  assert!(r.norm() <= 1e-10 * rhs.norm() * 10.0);
}

/// Two-level regression with hand-computed outcome: diagonal systems make
/// every stage of the cycle exact, so the result is known in closed form.
#[test]
fn hand_computed_two_level_cycle() {
  let mut hierarchy = Hierarchy::initialize(
    diagonal(&[1.0, 1.0, 1.0, 1.0]),
    ActiveDofSet::new(0..4),
    vec![],
    GeometryVersion(0),
  )
  .unwrap();

  // nodal injection/averaging onto 8 fine dofs
  let mut coo = nas::CooMatrix::new(8, 4);
  for c in 0..4 {
    coo.push(2 * c, c, 1.0);
  }
  for c in 0..3 {
    coo.push(2 * c + 1, c, 0.5);
    coo.push(2 * c + 1, c + 1, 0.5);
  }
  coo.push(7, 3, 0.5);
  let prolongation = CsrMatrix::from(&coo);

  hierarchy
    .append_level(
      prolongation,
      diagonal(&[1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0]),
      ActiveDofSet::new(0..8),
      vec![2, 3],
      GeometryVersion(0),
    )
    .unwrap();
  let mg = Multigrid::new(hierarchy, MultigridConfig::default());

  // unit load on band dof 2; the relaxation solves the diagonal system
  // exactly, so one cycle returns x = A⁻¹ rhs = 0.5 e₂
  let mut rhs = Vector::zeros(8);
  rhs[2] = 1.0;
  let x = mg.apply(&rhs).unwrap();

  let mut expected = Vector::zeros(8);
  expected[2] = 0.5;
  for i in 0..8 {
    assert_abs_diff_eq!(x[i], expected[i], epsilon = 1e-14);
  }

  let r = &rhs - mg.hierarchy().finest().matrix() * &x;
  assert_abs_diff_eq!(r[2], 0.0, epsilon = 1e-14);
  assert_abs_diff_eq!(r[3], 0.0, epsilon = 1e-14);
  assert!(r.norm() < 1e-14); // down from the unit initial residual
}
