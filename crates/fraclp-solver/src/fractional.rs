use crate::expr::{LinearExpr, Sign};
use crate::simplex::Simplex;
use crate::tableau::{ModelError, Tableau};

/// A linear-fractional program: optimize `(n . x) / (d . x)` over a
/// polyhedron, linearized with the Charnes-Cooper substitution
/// `y_i = t * x_i`, `t = 1 / (d . x)`.
///
/// Wraps a plain [`Tableau`] whose column 0 is the scaling variable t and
/// whose first row pins `d . y = 1`. Caller constraints are rewritten into
/// the substituted space on the way in, and solutions are un-substituted on
/// the way out.
#[derive(Debug, Clone)]
pub struct FractionalProgram {
    tableau: Tableau,
}

impl FractionalProgram {
    pub fn new(numerator: &[f64], denominator: &[f64]) -> Result<Self, ModelError> {
        if numerator.len() != denominator.len() {
            return Err(ModelError::RatioLengthMismatch {
                numerator: numerator.len(),
                denominator: denominator.len(),
            });
        }
        let mut objective = Vec::with_capacity(numerator.len() + 1);
        objective.push(0.0);
        objective.extend_from_slice(numerator);
        let mut tableau = Tableau::new(LinearExpr::objective(objective));

        let mut row = Vec::with_capacity(denominator.len() + 1);
        row.push(0.0);
        row.extend_from_slice(denominator);
        tableau.add_constraint(LinearExpr::new(row, 1.0, Sign::Equal))?;
        Ok(Self { tableau })
    }

    /// Rewrites a constraint on x into the substituted space:
    /// `a . x <= b` becomes `a . y - b t <= 0`, any other sign becomes
    /// `-a . y + b t <= 0`.
    pub fn add_constraint(&mut self, expr: LinearExpr) -> Result<(), ModelError> {
        let less = expr.sign == Sign::LessEqual;
        let mut coefficients = Vec::with_capacity(expr.coefficients.len() + 1);
        coefficients.push(if less { -expr.value } else { expr.value });
        for &a in &expr.coefficients {
            coefficients.push(if less { a } else { -a });
        }
        self.tableau
            .add_constraint(LinearExpr::new(coefficients, 0.0, Sign::LessEqual))
    }

    /// Solves the substituted program and recovers `x_i = y_i / t`.
    pub fn solve(&mut self, solver: &Simplex, maximize: bool) -> Option<Vec<f64>> {
        let y = solver.solve_primal(&mut self.tableau, maximize)?;
        Some(recover(&y))
    }

    /// Solution of the substituted (linear) program, t first.
    pub fn substituted(&self) -> Option<&[f64]> {
        self.tableau.result()
    }

    /// Objective of the linearized program at the substituted optimum,
    /// sign-corrected for the requested direction. Because `d . y = 1`,
    /// this equals the value of the original ratio.
    pub fn objective_value(&self) -> Option<f64> {
        self.tableau
            .result()
            .map(|y| self.tableau.objective_value(y))
    }

    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }
}

fn recover(y: &[f64]) -> Vec<f64> {
    let t = y[0];
    y[1..].iter().map(|v| v / t).collect()
}
