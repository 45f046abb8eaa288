use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fraclp_solver::{
    FractionalProgram, LinearExpr, Sign, Simplex, Solution, SolutionStatus, Tableau,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "fraclp")]
#[command(about = "Tableau simplex solver with Gomory cuts and ratio objectives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the linear program in a problem file
    Solve {
        /// The JSON problem file
        file: PathBuf,
        /// Round to an all-integer solution with Gomory cuts
        #[arg(short, long)]
        integer: bool,
        /// Output format (pretty, json)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Print the dual of the problem and solve it
    Dual {
        /// The JSON problem file
        file: PathBuf,
    },
    /// Solve the linear-fractional (ratio) objective in a problem file
    Ratio {
        /// The JSON problem file
        file: PathBuf,
    },
}

#[derive(Deserialize)]
struct ProblemFile {
    maximize: bool,
    #[serde(default)]
    objective: Option<Vec<f64>>,
    #[serde(default)]
    fractional: Option<RatioObjective>,
    constraints: Vec<ConstraintEntry>,
}

#[derive(Deserialize)]
struct RatioObjective {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
}

#[derive(Deserialize)]
struct ConstraintEntry {
    coefficients: Vec<f64>,
    sign: Sign,
    value: f64,
}

#[derive(Error, Debug)]
enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid problem file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("problem has no linear objective (the ratio command solves fractional ones)")]
    MissingObjective,
    #[error("problem has no fractional objective")]
    MissingRatio,
    #[error("constraint {index} has {got} coefficients, the objective has {expect}")]
    ConstraintWidth {
        index: usize,
        got: usize,
        expect: usize,
    },
    #[error(transparent)]
    Model(#[from] fraclp_solver::ModelError),
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Solve {
            file,
            integer,
            format,
        } => solve(&file, integer, &format),
        Commands::Dual { file } => dual(&file),
        Commands::Ratio { file } => ratio(&file),
    };

    match outcome {
        Ok(solution) => {
            if solution.status != SolutionStatus::Optimal {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn solve(file: &Path, integer: bool, format: &str) -> Result<Solution, LoadError> {
    let problem = load(file)?;
    let mut tableau = build_tableau(&problem)?;

    let solver = Simplex::new();
    let result = if integer {
        solver.solve_integer(&mut tableau, problem.maximize)
    } else {
        solver.solve_primal(&mut tableau, problem.maximize)
    };

    let solution = snapshot(&tableau, result, problem.maximize);
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&solution)?);
    } else {
        report(&solution);
    }
    Ok(solution)
}

fn dual(file: &Path) -> Result<Solution, LoadError> {
    let problem = load(file)?;
    let tableau = build_tableau(&problem)?;

    let mut dual = tableau.dual(problem.maximize);
    print!("{dual}");

    // the dual of a maximization solves as a minimization, and vice versa
    let maximize = !problem.maximize;
    let solver = Simplex::new();
    let result = solver.solve_primal(&mut dual, maximize);

    let solution = snapshot(&dual, result, maximize);
    report(&solution);
    Ok(solution)
}

fn ratio(file: &Path) -> Result<Solution, LoadError> {
    let problem = load(file)?;
    let objective = problem.fractional.as_ref().ok_or(LoadError::MissingRatio)?;

    let mut program = FractionalProgram::new(&objective.numerator, &objective.denominator)?;
    for row in checked_constraints(&problem, objective.numerator.len())? {
        program.add_constraint(row)?;
    }

    let solver = Simplex::new();
    let solution = match program.solve(&solver, problem.maximize) {
        Some(point) => {
            if let Some(y) = program.substituted() {
                println!("Y: [{}]", join(y));
            }
            let value = program.objective_value().unwrap_or_default();
            Solution::optimal(problem.maximize, point, value)
        }
        None => Solution::no_optimum(problem.maximize),
    };
    report(&solution);
    Ok(solution)
}

fn load(path: &Path) -> Result<ProblemFile, LoadError> {
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&source)?)
}

fn build_tableau(problem: &ProblemFile) -> Result<Tableau, LoadError> {
    let objective = problem
        .objective
        .clone()
        .ok_or(LoadError::MissingObjective)?;
    let width = objective.len();
    let mut tableau = Tableau::new(LinearExpr::objective(objective));
    for row in checked_constraints(problem, width)? {
        tableau.add_constraint(row)?;
    }
    Ok(tableau)
}

fn checked_constraints(
    problem: &ProblemFile,
    expect: usize,
) -> Result<Vec<LinearExpr>, LoadError> {
    problem
        .constraints
        .iter()
        .enumerate()
        .map(|(index, c)| {
            if c.coefficients.len() > expect {
                return Err(LoadError::ConstraintWidth {
                    index,
                    got: c.coefficients.len(),
                    expect,
                });
            }
            Ok(LinearExpr::new(c.coefficients.clone(), c.value, c.sign))
        })
        .collect()
}

fn snapshot(tableau: &Tableau, result: Option<Vec<f64>>, maximize: bool) -> Solution {
    match result {
        Some(values) => {
            let value = tableau.objective_value(&values);
            Solution::optimal(maximize, values, value)
        }
        None => Solution::no_optimum(maximize),
    }
}

fn report(solution: &Solution) {
    let (upper, lower) = if solution.maximize {
        ("Max", "max")
    } else {
        ("Min", "min")
    };
    match solution.status {
        SolutionStatus::Optimal => {
            println!(
                "{upper} point - [{}], F{lower} = {:.3}",
                join(&solution.values),
                solution.objective_value
            );
        }
        SolutionStatus::NoOptimum => println!("There is no {lower} value"),
    }
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.3}"))
        .collect::<Vec<_>>()
        .join(", ")
}
