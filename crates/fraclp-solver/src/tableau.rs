use std::fmt;

use thiserror::Error;

use crate::expr::{LinearExpr, Sign};

/// Tolerance under which a value counts as zero everywhere in the engine.
pub(crate) const EPS: f64 = 1e-5;

/// Objective penalty attached to artificial basis columns. A fixed finite
/// stand-in for -inf: large enough for the small, well-scaled problems this
/// engine targets, but an objective with coefficients near or above this
/// magnitude can drown the penalty out and yield a wrong optimality
/// conclusion.
const ARTIFICIAL_COST: f64 = -100.0;

/// Bound on feasibility-repair sweeps during basis establishment.
const REPAIR_ROUNDS: usize = 100;

/// Caller-contract violations detected while assembling a problem.
///
/// Solver outcomes (infeasible, unbounded) are never errors; they surface as
/// an absent result.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("constraint has {got} coefficients but the tableau has {cols} columns")]
    RowTooWide { got: usize, cols: usize },
    #[error("numerator has {numerator} coefficients, denominator has {denominator}")]
    RatioLengthMismatch { numerator: usize, denominator: usize },
}

/// The simplex tableau: one objective row, the constraint rows, and the
/// basis bookkeeping shared by every solver in this crate.
///
/// All rows share a single column count; [`Tableau::add_constraint`] is the
/// only way columns grow, so no row can be extended independently. Cloning
/// is a deep copy: the dual transform and the fractional adapter work on
/// clones and never alias the original problem.
#[derive(Debug, Clone)]
pub struct Tableau {
    pub(crate) objective: LinearExpr,
    /// Working rows, normalized to equalities and pivoted in place.
    pub(crate) rows: Vec<LinearExpr>,
    /// Constraints exactly as supplied, sign and right-hand side intact.
    originals: Vec<LinearExpr>,
    /// Basic column per row; `None` marks a failed basis construction.
    pub(crate) basis: Vec<Option<usize>>,
    /// Objective coefficient of each basic variable, parallel to `basis`.
    pub(crate) basis_cost: Vec<f64>,
    pub(crate) cols: usize,
    orig_cols: usize,
    /// Whether the stored objective is negated relative to the caller's.
    flipped: bool,
    result: Option<Vec<f64>>,
}

impl Tableau {
    pub fn new(objective: LinearExpr) -> Self {
        let cols = objective.coefficients.len();
        Self {
            objective,
            rows: Vec::new(),
            originals: Vec::new(),
            basis: Vec::new(),
            basis_cost: Vec::new(),
            cols,
            orig_cols: cols,
            flipped: false,
            result: None,
        }
    }

    /// Adds a constraint row, absorbing its inequality into a fresh slack
    /// (<=) or surplus (>=) column that every existing row and the objective
    /// gain as well.
    pub fn add_constraint(&mut self, expr: LinearExpr) -> Result<(), ModelError> {
        if expr.coefficients.len() > self.cols {
            return Err(ModelError::RowTooWide {
                got: expr.coefficients.len(),
                cols: self.cols,
            });
        }
        self.originals.push(expr.clone());
        self.insert_row(expr);
        Ok(())
    }

    /// Row insertion shared with internally generated rows (cuts, dual
    /// rows), which are correctly sized by construction.
    pub(crate) fn insert_row(&mut self, mut expr: LinearExpr) {
        expr.coefficients.resize(self.cols, 0.0);
        match expr.sign {
            Sign::GreaterEqual => expr.coefficients.push(-1.0),
            Sign::LessEqual => expr.coefficients.push(1.0),
            Sign::Equal => {}
        }
        if expr.sign != Sign::Equal {
            for row in &mut self.rows {
                row.coefficients.push(0.0);
            }
            self.objective.coefficients.push(0.0);
            self.cols += 1;
            expr.sign = Sign::Equal;
        }
        self.rows.push(expr);
    }

    pub fn column_count(&self) -> usize {
        self.cols
    }

    /// The constraints as supplied to [`Tableau::add_constraint`], untouched
    /// by normalization or pivoting.
    pub fn constraints(&self) -> &[LinearExpr] {
        &self.originals
    }

    /// The most recent solution vector, if the last solve succeeded.
    pub fn result(&self) -> Option<&[f64]> {
        self.result.as_deref()
    }

    /// Objective value of `point` in the caller's requested direction.
    pub fn objective_value(&self, point: &[f64]) -> f64 {
        let value = self.objective.evaluate(point);
        if self.flipped { -value } else { value }
    }

    /// Flips the stored objective so the internal ascent matches the
    /// requested direction. The flip is remembered, so repeated solves in
    /// alternating directions re-flip correctly.
    pub(crate) fn orient(&mut self, maximize: bool) {
        if maximize == self.flipped {
            self.objective.scale(-1.0);
            self.flipped = !self.flipped;
        }
    }

    /// Makes column `col` the identity column of row `row`: normalizes the
    /// pivot row, then eliminates the column from every other row. The one
    /// primitive shared by basis establishment and both simplex variants.
    pub(crate) fn pivot(&mut self, row: usize, col: usize) {
        let p = self.rows[row].coefficients[col];
        assert!(p != 0.0, "pivot on a zero coefficient");
        self.rows[row].scale(1.0 / p);
        let pivot_row = self.rows[row].clone();
        for (i, other) in self.rows.iter_mut().enumerate() {
            if i != row {
                let factor = -other.coefficients[col];
                other.accumulate(&pivot_row, factor);
            }
        }
    }

    /// Reduced cost per column: `-c_j + sum_i basis_cost_i * a_ij`,
    /// recomputed in full from the current basis.
    pub(crate) fn reduced_costs(&self) -> Vec<f64> {
        (0..self.cols)
            .map(|j| {
                let mut z = -self.objective.coefficients[j];
                for (row, cost) in self.rows.iter().zip(&self.basis_cost) {
                    z += cost * row.coefficients[j];
                }
                z
            })
            .collect()
    }

    fn is_identity_column(&self, row: usize, col: usize) -> bool {
        if (self.rows[row].coefficients[col] - 1.0).abs() > EPS {
            return false;
        }
        self.rows
            .iter()
            .enumerate()
            .all(|(i, r)| i == row || r.coefficients[col].abs() <= EPS)
    }

    /// Column suited to seed a basis for `row` by pivoting: the
    /// smallest-magnitude coefficient whose orientation keeps the
    /// right-hand side nonnegative.
    fn feasible_pivot_column(&self, row: usize) -> Option<usize> {
        let value = self.rows[row].value;
        let mut pick: Option<usize> = None;
        for j in 0..self.cols {
            let c = self.rows[row].coefficients[j];
            let oriented = if value == 0.0 { c } else { c * value };
            if c.abs() > 1e-4
                && oriented > 0.0
                && pick.map_or(true, |p| c.abs() < self.rows[row].coefficients[p].abs())
            {
                pick = Some(j);
            }
        }
        pick
    }

    /// Finds or synthesizes a basis column for every row.
    ///
    /// Rows with an existing identity column adopt it. Otherwise, with
    /// `artificial` set, a fresh artificial column (objective penalty
    /// [`ARTIFICIAL_COST`]) is appended; without it, the row is pivoted on a
    /// feasibility-compatible coefficient. Remaining negative right-hand
    /// sides are then repaired by pivoting on their most negative
    /// coefficient, for at most [`REPAIR_ROUNDS`] sweeps. Returns false when
    /// no feasible start exists.
    pub(crate) fn establish_basis(&mut self, artificial: bool) -> bool {
        self.basis.clear();
        self.basis_cost.clear();
        for row in &mut self.rows {
            if row.value < -1e-3 {
                row.scale(-1.0);
            }
        }
        for i in 0..self.rows.len() {
            if let Some(j) = (0..self.cols).find(|&j| self.is_identity_column(i, j)) {
                self.basis.push(Some(j));
                continue;
            }
            if artificial {
                for (k, row) in self.rows.iter_mut().enumerate() {
                    row.coefficients.push(if k == i { 1.0 } else { 0.0 });
                }
                self.objective.coefficients.push(ARTIFICIAL_COST);
                self.cols += 1;
                self.basis.push(Some(self.cols - 1));
            } else {
                let pick = self.feasible_pivot_column(i);
                if let Some(j) = pick {
                    self.pivot(i, j);
                }
                self.basis.push(pick);
            }
        }

        let mut rounds = 0;
        loop {
            let mut negative = false;
            for i in 0..self.rows.len() {
                if self.rows[i].value < -1e-4 {
                    negative = true;
                    let mut pick: Option<usize> = None;
                    for j in 0..self.cols {
                        let c = self.rows[i].coefficients[j];
                        if c < -1e-4 && pick.map_or(true, |p| c < self.rows[i].coefficients[p]) {
                            pick = Some(j);
                        }
                    }
                    if let Some(j) = pick {
                        self.pivot(i, j);
                        self.basis[i] = Some(j);
                    }
                }
            }
            if !negative {
                break;
            }
            rounds += 1;
            if rounds > REPAIR_ROUNDS {
                return false;
            }
        }
        self.basis.iter().all(Option::is_some)
    }

    /// Seeds a unit basis for the dual method without feasibility repair:
    /// adopt natural identity columns, negating a row wholesale when the
    /// negated row exposes one. Negative right-hand sides are left for the
    /// dual iterations to clear.
    pub(crate) fn seed_dual_basis(&mut self) -> bool {
        self.basis.clear();
        for i in 0..self.rows.len() {
            let mut found = (0..self.cols).find(|&j| self.is_identity_column(i, j));
            if found.is_none() {
                self.rows[i].scale(-1.0);
                found = (0..self.cols).find(|&j| self.is_identity_column(i, j));
                if found.is_none() {
                    self.rows[i].scale(-1.0);
                }
            }
            self.basis.push(found);
        }
        self.basis.iter().all(Option::is_some)
    }

    /// Refreshes the basic objective coefficients from the current basis.
    pub(crate) fn seed_basis_costs(&mut self) {
        self.basis_cost = self
            .basis
            .iter()
            .map(|b| b.map_or(0.0, |j| self.objective.coefficients[j]))
            .collect();
    }

    /// Reads the solution off the tableau: zero everywhere except each basic
    /// column, which takes its row's value.
    pub(crate) fn extract_result(&mut self) -> Vec<f64> {
        let mut res = vec![0.0; self.cols];
        for (row, b) in self.rows.iter().zip(&self.basis) {
            if let Some(j) = *b {
                res[j] = row.value;
            }
        }
        self.result = Some(res.clone());
        res
    }

    pub(crate) fn clear_result(&mut self) {
        self.result = None;
    }

    /// Structural primal-to-dual transform; the returned tableau still needs
    /// its own solve.
    ///
    /// Constraints in <= form are negated before transposition, every dual
    /// constraint is oriented <=, and the dual objective is oriented so the
    /// standard pairing holds under this engine's direction convention:
    /// `dual(max)` solved as a minimization (and `dual(min)` as a
    /// maximization) reproduces the primal optimum.
    pub fn dual(&self, maximize: bool) -> Tableau {
        let mut objective = self.objective.clone();
        if self.flipped {
            objective.scale(-1.0);
        }
        objective.coefficients.truncate(self.orig_cols);
        if maximize {
            objective.scale(-1.0);
        }

        let rows: Vec<LinearExpr> = self
            .originals
            .iter()
            .cloned()
            .map(|mut row| {
                row.coefficients.resize(self.orig_cols, 0.0);
                if row.sign == Sign::LessEqual {
                    row.scale(-1.0);
                }
                row
            })
            .collect();

        let mut dual_objective: Vec<f64> = rows.iter().map(|row| row.value).collect();
        if maximize {
            for v in &mut dual_objective {
                *v = -*v;
            }
        }

        let mut dual = Tableau::new(LinearExpr::objective(dual_objective));
        for j in 0..self.orig_cols {
            let coefficients = rows.iter().map(|row| row.coefficients[j]).collect();
            let row = LinearExpr::new(coefficients, objective.coefficients[j], Sign::LessEqual);
            dual.originals.push(row.clone());
            dual.insert_row(row);
        }
        dual
    }
}

impl fmt::Display for Tableau {
    /// The problem in equation form, from the as-supplied constraints.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut objective = self.objective.clone();
        if self.flipped {
            objective.scale(-1.0);
        }
        objective.coefficients.truncate(self.orig_cols);
        write!(f, "F = ")?;
        write_terms(f, &objective.coefficients)?;
        writeln!(f)?;
        for row in &self.originals {
            write_terms(f, &row.coefficients)?;
            writeln!(f, " {} {}", row.sign, row.value)?;
        }
        Ok(())
    }
}

fn write_terms(f: &mut fmt::Formatter<'_>, coefficients: &[f64]) -> fmt::Result {
    for (i, &c) in coefficients.iter().enumerate() {
        if i == 0 {
            write!(f, "{}x{}", c, i + 1)?;
        } else {
            write!(f, " {} {}x{}", if c < 0.0 { '-' } else { '+' }, c.abs(), i + 1)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> Tableau {
        let mut tableau = Tableau::new(LinearExpr::objective(vec![1.0, 2.0]));
        tableau
            .add_constraint(LinearExpr::new(vec![1.0, 1.0], 4.0, Sign::LessEqual))
            .unwrap();
        tableau
            .add_constraint(LinearExpr::new(vec![1.0, 0.0], 1.0, Sign::GreaterEqual))
            .unwrap();
        tableau
    }

    #[test]
    fn constraints_grow_one_shared_column_each() {
        let tableau = sample();
        assert_eq!(tableau.column_count(), 4);
        assert_eq!(tableau.objective.coefficients, vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(tableau.rows[0].coefficients, vec![1.0, 1.0, 1.0, 0.0]);
        assert_eq!(tableau.rows[1].coefficients, vec![1.0, 0.0, 0.0, -1.0]);
        // working rows are equalities; the supplied signs survive unchanged
        assert!(tableau.rows.iter().all(|r| r.sign == Sign::Equal));
        assert_eq!(tableau.constraints()[0].sign, Sign::LessEqual);
        assert_eq!(tableau.constraints()[1].sign, Sign::GreaterEqual);
    }

    #[test]
    fn equality_rows_add_no_column() {
        let mut tableau = Tableau::new(LinearExpr::objective(vec![1.0]));
        tableau
            .add_constraint(LinearExpr::new(vec![1.0], 2.0, Sign::Equal))
            .unwrap();
        assert_eq!(tableau.column_count(), 1);
    }

    #[test]
    fn short_rows_are_padded_wide_rows_rejected() {
        let mut tableau = Tableau::new(LinearExpr::objective(vec![1.0, 2.0]));
        tableau
            .add_constraint(LinearExpr::new(vec![1.0], 3.0, Sign::LessEqual))
            .unwrap();
        assert_eq!(tableau.rows[0].coefficients, vec![1.0, 0.0, 1.0]);

        let wide = LinearExpr::new(vec![1.0; 9], 0.0, Sign::Equal);
        assert!(matches!(
            tableau.add_constraint(wide),
            Err(ModelError::RowTooWide { got: 9, cols: 3 })
        ));
    }

    #[test]
    fn pivot_builds_an_identity_column() {
        let mut tableau = sample();
        tableau.pivot(0, 1);
        assert_abs_diff_eq!(tableau.rows[0].coefficients[1], 1.0);
        assert_abs_diff_eq!(tableau.rows[1].coefficients[1], 0.0);
        assert!(tableau.is_identity_column(0, 1));
    }

    #[test]
    fn reduced_costs_come_from_the_basis() {
        let mut tableau = sample();
        tableau.basis = vec![Some(2), Some(3)];
        tableau.basis_cost = vec![0.0, 0.0];
        let zc = tableau.reduced_costs();
        assert_abs_diff_eq!(zc[0], -1.0);
        assert_abs_diff_eq!(zc[1], -2.0);
        assert_abs_diff_eq!(zc[2], 0.0);
    }

    #[test]
    fn dual_transposes_the_original_rows() {
        let mut primal = Tableau::new(LinearExpr::objective(vec![3.0, 2.0]));
        for (coefficients, value) in [
            (vec![1.0, 1.0], 4.0),
            (vec![1.0, 0.0], 3.0),
            (vec![0.0, 1.0], 3.0),
        ] {
            primal
                .add_constraint(LinearExpr::new(coefficients, value, Sign::LessEqual))
                .unwrap();
        }
        let dual = primal.dual(true);
        // one dual row per primal variable, one dual variable per primal row
        assert_eq!(dual.constraints().len(), 2);
        assert_eq!(dual.constraints()[0].coefficients, vec![-1.0, -1.0, 0.0]);
        assert_eq!(dual.constraints()[1].coefficients, vec![-1.0, 0.0, -1.0]);
        assert_abs_diff_eq!(dual.constraints()[0].value, -3.0);
        assert_abs_diff_eq!(dual.constraints()[1].value, -2.0);
        // dual objective carries the primal right-hand sides
        assert_eq!(dual.objective.coefficients[..3], [4.0, 3.0, 3.0]);
    }

    #[test]
    fn clones_do_not_alias() {
        let original = sample();
        let mut copy = original.clone();
        copy.pivot(0, 0);
        copy.rows[1].value = 99.0;
        assert_eq!(original.rows[0].coefficients, vec![1.0, 1.0, 1.0, 0.0]);
        assert_abs_diff_eq!(original.rows[1].value, 1.0);
    }
}
