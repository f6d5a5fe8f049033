//! Macros for the LP solver module
//!
//! This module contains all the macros used by the LP solver, providing
//! convenient syntax for creating models and constraints.

/// Create a new LP model builder with a unique brand
///
/// This macro ensures that each model builder has a unique type-level brand,
/// preventing accidental mixing of variables between different models.
///
/// # Examples
///
/// ```rust
/// use ptpnbound::lp_model_builder;
/// use ptpnbound::lp_solver::VariableType;
///
/// // Anonymous brand (each call creates unique anonymous type)
/// let mut builder = lp_model_builder!("model_a");
/// let x = builder.add_variable("x", VariableType::Continuous, 0.0, 10.0);
///
/// // Named brand (easier to identify in type system and errors)
/// let mut scheduling = lp_model_builder!(SchedulingModel, "scheduling");
/// let y = scheduling.add_variable("y", VariableType::Continuous, 0.0, 24.0);
///
/// // This would cause a compile-time error due to different brands:
/// // builder.add_constraint(ptpnbound::constraint!((y) <= 5.0)); // ERROR!
/// ```
#[macro_export]
macro_rules! lp_model_builder {
    // Named brand - user provides the brand name
    ($brand_name:ident, $name:expr) => {{
        struct $brand_name;
        $crate::lp_solver::LPModelBuilder::<$brand_name>::new($name)
    }};

    // Anonymous brand - the `UniqueBrand` struct is defined locally within the `{{ ... }}` block,
    // so each macro invocation creates a fresh scope with its own distinct `UniqueBrand` type
    ($name:expr) => {{
        struct UniqueBrand;
        $crate::lp_solver::LPModelBuilder::<UniqueBrand>::new($name)
    }};
}
