//! Gurobi implementation of the LP solver abstraction

use crate::lp_solver::*;
use anyhow::Result;
use gurobi::{ConstrSense, Env, INFINITY, Model, ModelSense, Status, VarType};
use std::marker::PhantomData;

/// Solve an LP model using Gurobi
pub fn solve_gurobi<Brand>(builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>> {
    let env = Env::new("ptpnbound_gurobi.log")?;
    let mut model = Model::new(&builder.name, &env)?;

    // Add variables to the model; Gurobi vars end up in variable-id order
    let mut vars = Vec::with_capacity(builder.variables.len());
    for info in &builder.variables {
        let var_type = match info.var_type {
            VariableType::Continuous => VarType::Continuous,
            VariableType::Integer => VarType::Integer,
            VariableType::Binary => VarType::Binary,
        };
        let upper = if info.upper_bound == f64::INFINITY {
            INFINITY
        } else {
            info.upper_bound
        };
        let var = model.add_var(&info.name, var_type, 0.0, info.lower_bound, upper, &[], &[])?;
        vars.push(var);
    }
    model.update()?;

    // Add constraints
    for constraint in &builder.constraints {
        let sense = match constraint.sense {
            ConstraintSense::LessEqual => ConstrSense::Less,
            ConstraintSense::Equal => ConstrSense::Equal,
            ConstraintSense::GreaterEqual | ConstraintSense::Greater => ConstrSense::Greater,
        };

        let mut expr = gurobi::LinExpr::new();
        for term in &constraint.expression.terms {
            expr = expr.add_term(term.coefficient, vars[term.variable.id].clone());
        }
        expr = expr.add_constant(constraint.expression.constant);

        model.add_constr(&constraint.name, expr, sense, constraint.rhs)?;
    }

    // Set objective function
    if let Some(objective) = &builder.objective {
        let sense = match objective.sense {
            OptimizationSense::Minimize => ModelSense::Minimize,
            OptimizationSense::Maximize => ModelSense::Maximize,
        };

        let mut expr = gurobi::LinExpr::new();
        for term in &objective.expression.terms {
            expr = expr.add_term(term.coefficient, vars[term.variable.id].clone());
        }
        expr = expr.add_constant(objective.expression.constant);

        model.set_objective(expr, sense)?;
    }

    model.update()?;
    model.optimize()?;

    let status = match model.status()? {
        Status::Optimal => OptimizationStatus::Optimal,
        Status::SubOptimal => OptimizationStatus::Feasible,
        Status::Infeasible => OptimizationStatus::Infeasible,
        Status::Unbounded => OptimizationStatus::Unbounded,
        Status::InfOrUnbd => OptimizationStatus::InfeasibleOrUnbounded,
        _ => OptimizationStatus::Other("Unknown status"),
    };

    let has_solution = matches!(
        status,
        OptimizationStatus::Optimal | OptimizationStatus::Feasible
    );

    let mut variable_values = Vec::with_capacity(vars.len());
    for var in &vars {
        if has_solution {
            variable_values.push(var.get(&model, gurobi::attr::X)?);
        } else {
            variable_values.push(0.0);
        }
    }

    let objective_value = if has_solution {
        model.get(gurobi::attr::ObjVal)?
    } else {
        0.0
    };

    Ok(LPSolution {
        status,
        objective_value,
        variable_values,
        _brand: PhantomData,
    })
}
