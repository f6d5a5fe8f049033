//! Linear Programming (LP) solver abstraction layer
//!
//! This module provides a builder-based abstraction for LP solvers, allowing the
//! analysis code to be independent of specific solver backends like Gurobi and
//! coin_cbc. The analysis describes a model once (named variables, named
//! constraints, an objective) and the selected backend solves it.
//!
//! # Type Safety with Branded Types
//!
//! All core types (`VariableId`, `LinearExpression`, `Constraint`,
//! `LPModelBuilder`) use a generic `Brand` type parameter that provides
//! compile-time guarantees:
//!
//! - Variables from one builder cannot be accidentally used with another builder
//! - Constraints are type-checked to ensure they only use variables from their builder
//! - No runtime overhead - the brand is a zero-sized phantom type
//!
//! Use the `lp_model_builder!()` macro for a fresh anonymous brand, or declare a
//! brand type explicitly when the builder has to cross a function boundary:
//!
//! ```rust
//! use ptpnbound::lp_solver::{LPModelBuilder, VariableType};
//!
//! struct MyModel;
//! let mut builder = LPModelBuilder::<MyModel>::new("my_model");
//! let x = builder.add_variable("x", VariableType::Continuous, 0.0, f64::INFINITY);
//! ```
//!
//! # Building LP Models
//!
//! The `constraint!` macro provides natural comparison syntax; constraints may
//! carry a name that ends up in the exported LP file:
//!
//! ```rust,no_run
//! use ptpnbound::constraint;
//! use ptpnbound::lp_model_builder;
//! use ptpnbound::lp_solver::{OptimizationSense, VariableType};
//!
//! let mut builder = lp_model_builder!("example");
//! let x = builder.add_variable("x", VariableType::Continuous, 0.0, f64::INFINITY);
//! let y = builder.add_variable("y", VariableType::Continuous, 0.0, f64::INFINITY);
//!
//! builder.add_constraint(constraint!("cap", (x + y) <= 10.0));
//! builder.set_objective(x + 2.0 * y, OptimizationSense::Maximize);
//! let solution = builder.solve();
//! ```
//!
//! # Solver Selection
//!
//! The solver backend can be selected via the `PTPN_LP_SOLVER` environment
//! variable:
//! - `"gurobi"` - Use Gurobi (requires `gurobi` feature)
//! - `"coin_cbc"` or `"cbc"` - Use COIN-OR CBC (requires `coin_cbc` feature)
//!
//! If not set, the solver defaults to Gurobi if available, otherwise CBC.

use anyhow::Result;
use std::env;
use std::fmt::Write as _;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

/// Variable types supported by LP solvers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum VariableType {
    /// Continuous variable (can take any real value)
    Continuous,
    /// Integer variable (can only take integer values)
    Integer,
    /// Binary variable (can only take values 0 or 1)
    Binary,
}

/// Constraint sense for linear constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum ConstraintSense {
    /// Less than or equal to (≤)
    LessEqual,
    /// Equal to (=)
    Equal,
    /// Greater than or equal to (≥)
    GreaterEqual,
    /// Strictly greater than (>)
    Greater,
}

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationSense {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Status of the optimization process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// Optimal solution found
    Optimal,
    /// Feasible solution found, but not necessarily optimal
    Feasible,
    /// Problem is infeasible (no solution exists)
    Infeasible,
    /// Problem is unbounded
    Unbounded,
    /// Problem is infeasible or unbounded
    InfeasibleOrUnbounded,
    /// Other status (solver-specific)
    Other(&'static str),
}

/// Available LP solver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
enum SolverBackend {
    #[cfg(feature = "gurobi")]
    /// Gurobi commercial solver
    Gurobi,
    #[cfg(feature = "coin_cbc")]
    /// Coin CBC open-source solver
    CoinCbc,
}

impl SolverBackend {
    /// Get the solver backend from environment variable or use fallback logic
    fn from_env_or_default() -> Result<Self> {
        if let Ok(solver_name) = env::var("PTPN_LP_SOLVER") {
            match solver_name.to_lowercase().as_str() {
                "gurobi" => {
                    #[cfg(feature = "gurobi")]
                    return Ok(SolverBackend::Gurobi);
                    #[cfg(not(feature = "gurobi"))]
                    return Err(anyhow::anyhow!(
                        "Gurobi solver requested via PTPN_LP_SOLVER but gurobi feature not enabled"
                    ));
                }
                "coin_cbc" | "coin-cbc" | "cbc" => {
                    #[cfg(feature = "coin_cbc")]
                    return Ok(SolverBackend::CoinCbc);
                    #[cfg(not(feature = "coin_cbc"))]
                    return Err(anyhow::anyhow!(
                        "Coin CBC solver requested via PTPN_LP_SOLVER but coin_cbc feature not enabled"
                    ));
                }
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid solver '{}' in PTPN_LP_SOLVER. Valid options: gurobi, coin_cbc",
                        solver_name
                    ));
                }
            }
        }

        // Fallback logic: prefer gurobi if available, then coin_cbc
        #[cfg(feature = "gurobi")]
        return Ok(SolverBackend::Gurobi);

        #[allow(unreachable_code)]
        #[cfg(feature = "coin_cbc")]
        return Ok(SolverBackend::CoinCbc);

        #[cfg(not(any(feature = "gurobi", feature = "coin_cbc")))]
        Err(anyhow::anyhow!(
            "No LP solver backend available. Please enable a solver feature (e.g., 'gurobi' or 'coin_cbc')"
        ))
    }
}

/// A linear expression term: coefficient * variable
#[derive(Debug, Clone)]
pub struct LinearTerm<Brand> {
    pub coefficient: f64,
    pub variable: VariableId<Brand>,
}

/// A linear expression: sum of terms plus constant
#[derive(Debug, Clone)]
pub struct LinearExpression<Brand> {
    pub terms: Vec<LinearTerm<Brand>>,
    pub constant: f64,
}

impl<Brand> LinearExpression<Brand> {
    /// Create a new linear expression with a constant term
    pub fn new(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    /// Add a term to the expression
    pub fn add_term(&mut self, coefficient: f64, variable: VariableId<Brand>) {
        self.terms.push(LinearTerm {
            coefficient,
            variable,
        });
    }

    /// Create a linear expression from a single variable
    pub fn from_variable(variable: VariableId<Brand>) -> Self {
        Self {
            terms: vec![LinearTerm {
                coefficient: 1.0,
                variable,
            }],
            constant: 0.0,
        }
    }
}

impl<Brand> From<VariableId<Brand>> for LinearExpression<Brand> {
    fn from(variable: VariableId<Brand>) -> Self {
        Self::from_variable(variable)
    }
}

/// Unique identifier for a variable in the LP model
///
/// The `Brand` type parameter ensures that variables can only be used with the
/// builder that created them. This is enforced at compile time.
pub struct VariableId<Brand> {
    id: usize,
    _brand: PhantomData<fn() -> Brand>,
}

// Manual trait implementations that don't require Brand to implement anything
impl<Brand> std::fmt::Debug for VariableId<Brand> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableId").field("id", &self.id).finish()
    }
}

impl<Brand> Clone for VariableId<Brand> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Brand> Copy for VariableId<Brand> {}

impl<Brand> PartialEq for VariableId<Brand> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<Brand> Eq for VariableId<Brand> {}

impl<Brand> std::hash::Hash for VariableId<Brand> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Unique identifier for a constraint in the LP model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(usize);

/// A named linear constraint
///
/// Constraints define relationships between linear expressions and constants.
/// The `Brand` type parameter ensures type safety - constraints can only use
/// variables from the builder that will consume them. The name is carried into
/// exported LP files; an empty name gets an automatic `c<i>` label there.
#[derive(Debug, Clone)]
pub struct Constraint<Brand> {
    name: Arc<str>,
    expression: LinearExpression<Brand>,
    sense: ConstraintSense,
    rhs: f64,
}

impl<Brand> Constraint<Brand> {
    /// Create a new constraint
    pub fn new(
        name: impl Into<Arc<str>>,
        expression: impl Into<LinearExpression<Brand>>,
        sense: ConstraintSense,
        rhs: f64,
    ) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            sense,
            rhs,
        }
    }

    /// Create an equality constraint: expression == rhs
    pub fn eq(
        name: impl Into<Arc<str>>,
        expression: impl Into<LinearExpression<Brand>>,
        rhs: f64,
    ) -> Self {
        Self::new(name, expression, ConstraintSense::Equal, rhs)
    }

    /// Create a less-than-or-equal constraint: expression <= rhs
    pub fn le(
        name: impl Into<Arc<str>>,
        expression: impl Into<LinearExpression<Brand>>,
        rhs: f64,
    ) -> Self {
        Self::new(name, expression, ConstraintSense::LessEqual, rhs)
    }

    /// Create a greater-than-or-equal constraint: expression >= rhs
    pub fn ge(
        name: impl Into<Arc<str>>,
        expression: impl Into<LinearExpression<Brand>>,
        rhs: f64,
    ) -> Self {
        Self::new(name, expression, ConstraintSense::GreaterEqual, rhs)
    }

    /// Name of the constraint as given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Variable information stored in the model
#[derive(Debug, Clone)]
struct VariableInfo {
    name: Arc<str>,
    var_type: VariableType,
    lower_bound: f64,
    upper_bound: f64,
}

/// Objective function information
#[derive(Debug, Clone)]
struct ObjectiveInfo<Brand> {
    expression: LinearExpression<Brand>,
    sense: OptimizationSense,
}

/// Result of solving an LP model
#[derive(Debug, Clone)]
pub struct LPSolution<Brand> {
    pub status: OptimizationStatus,
    pub objective_value: f64,
    variable_values: Vec<f64>,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> LPSolution<Brand> {
    /// Get the value of a variable from the solution
    pub fn get_value(&self, var_id: VariableId<Brand>) -> Option<f64> {
        self.variable_values.get(var_id.id).copied()
    }
}

/// Builder for LP models that can work with different backends
///
/// The `Brand` type parameter ensures type safety - variables from one builder
/// cannot be accidentally used with another builder. This is enforced at
/// compile time. The builder keeps the full model description, so a model can
/// still be exported in LP format after it has been solved.
pub struct LPModelBuilder<Brand> {
    name: String,
    variables: Vec<VariableInfo>,
    constraints: Vec<Constraint<Brand>>,
    objective: Option<ObjectiveInfo<Brand>>,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> LPModelBuilder<Brand> {
    /// Create a new LP model builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: None,
            _brand: PhantomData,
        }
    }

    /// Name of the model, used in exported files and error reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a named variable to the model
    pub fn add_variable(
        &mut self,
        name: impl Into<Arc<str>>,
        var_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> VariableId<Brand> {
        let var_id = VariableId {
            id: self.variables.len(),
            _brand: PhantomData,
        };
        self.variables.push(VariableInfo {
            name: name.into(),
            var_type,
            lower_bound,
            upper_bound,
        });
        var_id
    }

    /// Add a constraint to the model
    pub fn add_constraint(&mut self, constraint: Constraint<Brand>) -> ConstraintId {
        let constr_id = ConstraintId(self.constraints.len());
        self.constraints.push(constraint);
        constr_id
    }

    /// Set the objective function
    pub fn set_objective(
        &mut self,
        expression: impl Into<LinearExpression<Brand>>,
        sense: OptimizationSense,
    ) {
        self.objective = Some(ObjectiveInfo {
            expression: expression.into(),
            sense,
        });
    }

    /// Names of all constraints, in insertion order.
    pub fn constraint_names(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().map(|c| &*c.name)
    }

    /// Number of variables added so far.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints added so far.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Solve the model using the selected backend
    pub fn solve(&self) -> Result<LPSolution<Brand>> {
        let solver = SolverBackend::from_env_or_default()?;

        log::debug!(
            "solving LP '{}' ({} variables, {} constraints)",
            self.name,
            self.variables.len(),
            self.constraints.len()
        );

        match solver {
            #[cfg(feature = "gurobi")]
            SolverBackend::Gurobi => crate::lp_solver::gurobi::solve_gurobi(self),

            #[cfg(feature = "coin_cbc")]
            SolverBackend::CoinCbc => crate::lp_solver::coin_cbc::solve_coin_cbc(self),
        }
    }

    /// Render the model in CPLEX LP file format.
    pub fn lp_format(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\\Problem name: {}", self.name);

        let (sense, objective) = match &self.objective {
            Some(obj) => (
                match obj.sense {
                    OptimizationSense::Minimize => "Minimize",
                    OptimizationSense::Maximize => "Maximize",
                },
                Some(&obj.expression),
            ),
            None => ("Minimize", None),
        };
        let _ = writeln!(out, "{}", sense);
        let _ = write!(out, " obj:");
        if let Some(expr) = objective {
            out.push_str(&self.format_terms(expr));
        }
        out.push('\n');

        let _ = writeln!(out, "Subject To");
        for (i, constraint) in self.constraints.iter().enumerate() {
            let label = if constraint.name.is_empty() {
                format!("c{}", i)
            } else {
                constraint.name.to_string()
            };
            let relation = match constraint.sense {
                ConstraintSense::LessEqual => "<=",
                ConstraintSense::Equal => "=",
                ConstraintSense::GreaterEqual | ConstraintSense::Greater => ">=",
            };
            let _ = writeln!(
                out,
                " {}:{} {} {}",
                label,
                self.format_terms(&constraint.expression),
                relation,
                constraint.rhs - constraint.expression.constant
            );
        }

        // Only non-default bounds are listed; the LP default is 0 <= v < +inf.
        let bounded: Vec<&VariableInfo> = self
            .variables
            .iter()
            .filter(|v| v.lower_bound != 0.0 || v.upper_bound != f64::INFINITY)
            .collect();
        if !bounded.is_empty() {
            let _ = writeln!(out, "Bounds");
            for v in bounded {
                if v.upper_bound == f64::INFINITY {
                    let _ = writeln!(out, " {} >= {}", v.name, v.lower_bound);
                } else {
                    let _ = writeln!(out, " {} <= {} <= {}", v.lower_bound, v.name, v.upper_bound);
                }
            }
        }

        let integers: Vec<&VariableInfo> = self
            .variables
            .iter()
            .filter(|v| v.var_type == VariableType::Integer)
            .collect();
        if !integers.is_empty() {
            let _ = writeln!(out, "Generals");
            for v in integers {
                let _ = writeln!(out, " {}", v.name);
            }
        }

        out.push_str("End\n");
        out
    }

    fn format_terms(&self, expr: &LinearExpression<Brand>) -> String {
        let mut out = String::new();
        for term in &expr.terms {
            let name = &self.variables[term.variable.id].name;
            if term.coefficient >= 0.0 {
                let _ = write!(out, " + {} {}", term.coefficient, name);
            } else {
                let _ = write!(out, " - {} {}", -term.coefficient, name);
            }
        }
        out
    }

    /// Write the model to `path` in CPLEX LP file format.
    pub fn write_lp(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.lp_format())?;
        Ok(())
    }

    /// Write a solution of this model to `path` as a name/value listing.
    pub fn write_solution(
        &self,
        solution: &LPSolution<Brand>,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let mut out = String::new();
        let _ = writeln!(out, "\\Problem name: {}", self.name);
        let _ = writeln!(out, "status: {:?}", solution.status);
        let _ = writeln!(out, "objective: {}", solution.objective_value);
        for (info, value) in self.variables.iter().zip(&solution.variable_values) {
            let _ = writeln!(out, "{} = {}", info.name, value);
        }
        std::fs::write(path, out)?;
        Ok(())
    }
}

// Macros for convenient syntax
pub mod macros;

// Operator overloading for linear expressions
pub mod ops;

pub mod output_suppression;

#[cfg(feature = "gurobi")]
pub mod gurobi;

#[cfg(feature = "coin_cbc")]
pub mod coin_cbc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constraint, lp_model_builder};

    #[test]
    fn test_constraint_macro() {
        let mut builder = lp_model_builder!("macro_test");
        let x = builder.add_variable("x", VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable("y", VariableType::Continuous, 0.0, 10.0);

        let c = constraint!((x + y) == 10.0);
        assert_eq!(c.sense, ConstraintSense::Equal);
        assert_eq!(c.rhs, 10.0);

        let c = constraint!((2.0 * x) <= 5.0);
        assert_eq!(c.sense, ConstraintSense::LessEqual);
        assert_eq!(c.rhs, 5.0);

        let c = constraint!((x - y) >= 0.0);
        assert_eq!(c.sense, ConstraintSense::GreaterEqual);
        assert_eq!(c.rhs, 0.0);

        let c = constraint!("named", (x) > 1.0);
        assert_eq!(c.name(), "named");
        assert_eq!(c.sense, ConstraintSense::Greater);
    }

    #[test]
    fn test_constraint_macro_with_builder() {
        let mut builder = lp_model_builder!("builder_test");
        let x = builder.add_variable("x", VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable("y", VariableType::Continuous, 0.0, 10.0);

        builder.add_constraint(constraint!((x + y) == 10.0));
        builder.add_constraint(constraint!((x) <= 5.0));

        assert_eq!(builder.constraints.len(), 2);
    }

    #[test]
    fn test_lp_format_output() {
        let mut builder = lp_model_builder!("format_test");
        let x = builder.add_variable("x0", VariableType::Continuous, 0.0, f64::INFINITY);
        let y = builder.add_variable("x1", VariableType::Continuous, 0.0, f64::INFINITY);

        builder.add_constraint(constraint!("cap", (x + y) <= 10.0));
        builder.set_objective(x + 2.0 * y, OptimizationSense::Maximize);

        let text = builder.lp_format();
        assert!(text.contains("\\Problem name: format_test"));
        assert!(text.contains("Maximize"));
        assert!(text.contains("cap:"));
        assert!(text.contains("x1"));
        assert!(text.ends_with("End\n"));
        // Default-bounded continuous variables need no Bounds section.
        assert!(!text.contains("Bounds"));
    }

    #[test]
    fn test_constraint_names_in_order() {
        let mut builder = lp_model_builder!("names_test");
        let x = builder.add_variable("x", VariableType::Continuous, 0.0, f64::INFINITY);

        builder.add_constraint(constraint!("first", (x) <= 1.0));
        builder.add_constraint(constraint!("second", (x) >= 0.0));

        let names: Vec<&str> = builder.constraint_names().collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_add_variable_to_linear_expression() {
        let mut builder = lp_model_builder!("expr_test");
        let x = builder.add_variable("x", VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable("y", VariableType::Continuous, 0.0, 10.0);

        let expr = 2.0 * x + 5.0;
        assert_eq!(expr.terms.len(), 1);
        assert_eq!(expr.terms[0].coefficient, 2.0);
        assert_eq!(expr.terms[0].variable, x);
        assert_eq!(expr.constant, 5.0);

        let result = expr + y;
        assert_eq!(result.terms.len(), 2);
        assert_eq!(result.constant, 5.0);
        assert_eq!(result.terms[1].coefficient, 1.0);
        assert_eq!(result.terms[1].variable, y);
    }
}
