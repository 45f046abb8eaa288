use log::debug;

use crate::expr::{LinearExpr, Sign};
use crate::tableau::{EPS, Tableau};

/// Simplex driver for a [`Tableau`]: primal iterations, dual iterations,
/// and the Gomory cutting-plane loop on top of them.
///
/// Infeasible and unbounded runs both come back as `None`; the engine does
/// not distinguish them.
pub struct Simplex {
    /// Tolerance for zero tests in pivot selection.
    tolerance: f64,
    /// Bound on pivots per solve before giving up.
    max_iterations: usize,
    /// Bound on Gomory cut rounds per integer solve.
    max_cuts: usize,
    /// Start from artificial penalty columns instead of direct pivoting
    /// when a row has no natural basis column.
    artificial_start: bool,
}

impl Default for Simplex {
    fn default() -> Self {
        Self {
            tolerance: EPS,
            max_iterations: 1000,
            max_cuts: 100,
            artificial_start: false,
        }
    }
}

enum CutSearch {
    /// Every row value is integral within tolerance.
    Integral,
    /// Fractional values remain but no row can source a cut.
    NoEligibleRow,
    Cut(usize),
}

impl Simplex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_cuts(mut self, max: usize) -> Self {
        self.max_cuts = max;
        self
    }

    /// Establish the initial basis through artificial penalty columns
    /// (the Big-M scheme) rather than direct pivoting.
    pub fn with_artificial_start(mut self, on: bool) -> Self {
        self.artificial_start = on;
        self
    }

    /// Runs the primal simplex to optimality and returns the dense solution
    /// vector, or `None` when no optimum exists (no feasible basis, or the
    /// objective is unbounded).
    pub fn solve_primal(&self, tableau: &mut Tableau, maximize: bool) -> Option<Vec<f64>> {
        tableau.orient(maximize);
        if !tableau.establish_basis(self.artificial_start) {
            debug!("no feasible basis");
            tableau.clear_result();
            return None;
        }
        tableau.seed_basis_costs();

        for iteration in 0..self.max_iterations {
            let zc = tableau.reduced_costs();
            let Some(col) = self.entering_column(&zc) else {
                return Some(tableau.extract_result());
            };
            let Some(row) = self.leaving_row(tableau, col) else {
                debug!("column {col} has no leaving row, objective is unbounded");
                tableau.clear_result();
                return None;
            };
            debug!("primal pivot {iteration}: row {row}, column {col}");
            self.replace_basis(tableau, row, col);
        }
        tableau.clear_result();
        None
    }

    /// Runs the dual simplex: restores feasibility of a cost-optimal basis
    /// by driving negative right-hand sides out. On a fresh tableau a unit
    /// basis is seeded first; the method expects that basis to be dual
    /// feasible, which is the caller's contract.
    pub fn solve_dual_simplex(&self, tableau: &mut Tableau, maximize: bool) -> Option<Vec<f64>> {
        tableau.orient(maximize);
        if tableau.basis.is_empty() && !tableau.seed_dual_basis() {
            debug!("no unit basis for the dual method");
            tableau.clear_result();
            return None;
        }
        tableau.seed_basis_costs();
        self.dual_iterations(tableau)
    }

    /// Primal solve followed by Gomory fractional cuts until every basic
    /// value is integral, the cut re-optimization fails (integer
    /// infeasible), or `max_cuts` rounds pass without converging.
    pub fn solve_integer(&self, tableau: &mut Tableau, maximize: bool) -> Option<Vec<f64>> {
        self.solve_primal(tableau, maximize)?;

        for round in 0..self.max_cuts {
            let row = match self.cut_row(tableau) {
                CutSearch::Integral => return tableau.result().map(|r| r.to_vec()),
                CutSearch::NoEligibleRow => {
                    debug!("fractional values remain but no row can be cut");
                    tableau.clear_result();
                    return None;
                }
                CutSearch::Cut(row) => row,
            };
            let cut = self.gomory_cut(tableau, row);
            debug!("gomory round {round}: cut from row {row}: {cut}");
            tableau.insert_row(cut);
            let slack = tableau.cols - 1;
            tableau.basis.push(Some(slack));
            tableau.basis_cost.push(0.0);
            self.dual_iterations(tableau)?;
        }
        tableau.clear_result();
        None
    }

    fn dual_iterations(&self, tableau: &mut Tableau) -> Option<Vec<f64>> {
        for iteration in 0..self.max_iterations {
            let Some(row) = self.infeasible_row(tableau) else {
                return Some(tableau.extract_result());
            };
            let zc = tableau.reduced_costs();
            let Some(col) = self.dual_entering_column(tableau, row, &zc) else {
                debug!("row {row} has no entering column, no feasible point remains");
                tableau.clear_result();
                return None;
            };
            debug!("dual pivot {iteration}: row {row}, column {col}");
            self.replace_basis(tableau, row, col);
        }
        tableau.clear_result();
        None
    }

    /// Most negative reduced cost, first occurrence on ties.
    fn entering_column(&self, zc: &[f64]) -> Option<usize> {
        let mut pick: Option<usize> = None;
        for (j, &v) in zc.iter().enumerate() {
            if v < -self.tolerance && pick.map_or(true, |p| v.abs() > zc[p].abs()) {
                pick = Some(j);
            }
        }
        pick
    }

    /// Minimum ratio of row value to a strictly positive column coefficient,
    /// first occurrence on ties.
    fn leaving_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let mut pick = None;
        let mut best = f64::INFINITY;
        for (i, row) in tableau.rows.iter().enumerate() {
            let c = row.coefficients[col];
            if c > self.tolerance {
                let ratio = row.value / c;
                if ratio < best {
                    pick = Some(i);
                    best = ratio;
                }
            }
        }
        pick
    }

    /// Most negative row value, first occurrence on ties.
    fn infeasible_row(&self, tableau: &Tableau) -> Option<usize> {
        let mut pick: Option<usize> = None;
        for (i, row) in tableau.rows.iter().enumerate() {
            if row.value < -self.tolerance
                && pick.map_or(true, |p: usize| row.value < tableau.rows[p].value)
            {
                pick = Some(i);
            }
        }
        pick
    }

    /// Among columns with a negative coefficient in the leaving row, the one
    /// minimizing reduced cost over the coefficient's magnitude.
    fn dual_entering_column(&self, tableau: &Tableau, row: usize, zc: &[f64]) -> Option<usize> {
        let mut pick = None;
        let mut best = f64::INFINITY;
        for j in 0..tableau.cols {
            let c = tableau.rows[row].coefficients[j];
            if c < -self.tolerance {
                let ratio = -zc[j] / c;
                if ratio < best {
                    pick = Some(j);
                    best = ratio;
                }
            }
        }
        pick
    }

    fn replace_basis(&self, tableau: &mut Tableau, row: usize, col: usize) {
        tableau.pivot(row, col);
        tableau.basis[row] = Some(col);
        tableau.basis_cost[row] = tableau.objective.coefficients[col];
    }

    /// Picks the cut source: the largest fractional row value among rows
    /// that still carry a fractional coefficient. Rows that are already
    /// all-integer are never cut, even when their value carries noise-level
    /// fractional parts.
    fn cut_row(&self, tableau: &Tableau) -> CutSearch {
        let mut pick: Option<usize> = None;
        let mut best = 0.0;
        let mut any_fractional = false;
        for (i, row) in tableau.rows.iter().enumerate() {
            let frac = fractional(row.value);
            if !is_fractional(frac, self.tolerance) {
                continue;
            }
            any_fractional = true;
            let eligible = row
                .coefficients
                .iter()
                .any(|&c| is_fractional(fractional(c), self.tolerance));
            if eligible && (pick.is_none() || frac > best) {
                pick = Some(i);
                best = frac;
            }
        }
        match pick {
            Some(row) => CutSearch::Cut(row),
            None if any_fractional => CutSearch::NoEligibleRow,
            None => CutSearch::Integral,
        }
    }

    /// The fractional cut of a row: negated fractional parts of its
    /// coefficients and value, as a <= row. Excludes the current fractional
    /// vertex while keeping every integer point feasible.
    fn gomory_cut(&self, tableau: &Tableau, row: usize) -> LinearExpr {
        let source = &tableau.rows[row];
        let coefficients = source
            .coefficients
            .iter()
            .map(|&c| {
                let frac = fractional(c);
                if is_fractional(frac, self.tolerance) {
                    -frac
                } else {
                    0.0
                }
            })
            .collect();
        LinearExpr::new(coefficients, -fractional(source.value), Sign::LessEqual)
    }
}

fn fractional(x: f64) -> f64 {
    x - x.floor()
}

fn is_fractional(frac: f64, tol: f64) -> bool {
    frac > tol && frac < 1.0 - tol
}
