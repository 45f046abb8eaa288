mod expr;
mod fractional;
mod simplex;
mod solution;
mod tableau;

pub use expr::{LinearExpr, Sign};
pub use fractional::FractionalProgram;
pub use simplex::Simplex;
pub use solution::{Solution, SolutionStatus};
pub use tableau::{ModelError, Tableau};
