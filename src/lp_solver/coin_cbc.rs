use crate::lp_solver::*;
use ::coin_cbc::{Model, Sense};
use anyhow::Result;
use std::marker::PhantomData;

/// Round a floating-point number to 6 significant digits
fn round_to_6_sig_digits(value: f64) -> f64 {
    if value == 0.0 {
        return 0.0;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let scale = 10_f64.powi(5 - magnitude);
    (value * scale).round() / scale
}

/// Solve an LP model using Coin CBC
pub fn solve_coin_cbc<Brand>(builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>> {
    let mut model = Model::default();

    // Add variables to the model; columns end up in variable-id order
    let cols: Vec<_> = builder
        .variables
        .iter()
        .map(|info| match info.var_type {
            VariableType::Continuous => {
                let col = model.add_col();
                model.set_col_lower(col, info.lower_bound);
                model.set_col_upper(col, info.upper_bound);
                col
            }
            VariableType::Integer => {
                let col = model.add_integer();
                model.set_col_lower(col, info.lower_bound);
                model.set_col_upper(col, info.upper_bound);
                col
            }
            VariableType::Binary => model.add_binary(),
        })
        .collect();

    // Add constraints
    for constraint in &builder.constraints {
        let row = model.add_row();

        for term in &constraint.expression.terms {
            model.set_weight(row, cols[term.variable.id], term.coefficient);
        }

        // Handle constant term
        let rhs_adjusted = constraint.rhs - constraint.expression.constant;

        match constraint.sense {
            ConstraintSense::LessEqual => {
                model.set_row_upper(row, rhs_adjusted);
            }
            ConstraintSense::Equal => {
                model.set_row_equal(row, rhs_adjusted);
            }
            ConstraintSense::GreaterEqual => {
                model.set_row_lower(row, rhs_adjusted);
            }
            ConstraintSense::Greater => {
                // Coin CBC doesn't support strict inequalities, use >= with small epsilon
                model.set_row_lower(row, rhs_adjusted + 1e-10);
            }
        }
    }

    // Set objective function
    if let Some(objective) = &builder.objective {
        for term in &objective.expression.terms {
            model.set_obj_coeff(cols[term.variable.id], term.coefficient);
        }

        let sense = match objective.sense {
            OptimizationSense::Minimize => Sense::Minimize,
            OptimizationSense::Maximize => Sense::Maximize,
        };

        model.set_obj_sense(sense);
    }

    // Solve the model, keeping CBC's console chatter out of the report output
    let suppress = output_suppression::redirect_output().ok();
    let solution = model.solve();
    drop(suppress);

    // Extract variable values from solution, in variable-id order
    let variable_values: Vec<f64> = cols
        .iter()
        .map(|col| round_to_6_sig_digits(solution.col(*col)))
        .collect();

    // Calculate objective value
    let objective_value = if let Some(objective) = &builder.objective {
        let mut obj_val = objective.expression.constant;
        for term in &objective.expression.terms {
            obj_val += term.coefficient * variable_values[term.variable.id];
        }
        round_to_6_sig_digits(obj_val)
    } else {
        0.0
    };

    // Determine optimization status
    let status = if solution.raw().is_proven_optimal() {
        OptimizationStatus::Optimal
    } else if solution.raw().is_proven_infeasible() {
        OptimizationStatus::Infeasible
    } else if solution.raw().is_continuous_unbounded() {
        OptimizationStatus::Unbounded
    } else {
        OptimizationStatus::Other("Unknown status")
    };

    Ok(LPSolution {
        status,
        objective_value,
        variable_values,
        _brand: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constraint, lp_model_builder};

    #[test]
    fn test_solve_simple_maximization() {
        let mut builder = lp_model_builder!("cbc_max");
        let x = builder.add_variable("x", VariableType::Continuous, 0.0, f64::INFINITY);
        let y = builder.add_variable("y", VariableType::Continuous, 0.0, f64::INFINITY);

        builder.add_constraint(constraint!("cap", (x + y) <= 4.0));
        builder.set_objective(x + 2.0 * y, OptimizationSense::Maximize);

        let solution = solve_coin_cbc(&builder).expect("CBC should solve");
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value - 8.0).abs() < 1e-6);
        assert!((solution.get_value(y).unwrap() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_solve_infeasible_model() {
        let mut builder = lp_model_builder!("cbc_infeasible");
        let x = builder.add_variable("x", VariableType::Continuous, 0.0, f64::INFINITY);

        builder.add_constraint(constraint!((x) <= 1.0));
        builder.add_constraint(constraint!((x) >= 2.0));
        builder.set_objective(LinearExpression::from_variable(x), OptimizationSense::Maximize);

        let solution = solve_coin_cbc(&builder).expect("CBC should report a status");
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to_6_sig_digits(0.0), 0.0);
        assert_eq!(round_to_6_sig_digits(0.3333333333), 0.333333);
        assert_eq!(round_to_6_sig_digits(1234567.0), 1234570.0);
    }
}
