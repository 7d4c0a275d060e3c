//! Solving a [`FormulatedModel`] with the `HiGHS` solver.
//!
//! The model is copied into a fresh `HiGHS` problem for every call to [`solve`]; nothing
//! solver-related outlives the call.
use crate::formulation::FormulatedModel;
use crate::instance::CustomerFacilityMatrix;
use anyhow::{Result, anyhow, ensure};
use highs::{HighsModelStatus, RowProblem as Problem, Sense};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
type Variable = highs::Col;

/// Whether `HiGHS` simplifies the problem before solving it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PresolveMode {
    /// Let `HiGHS` decide
    Choose,
    /// Always presolve
    On,
    /// Never presolve
    Off,
}

/// The algorithm `HiGHS` uses to solve the LP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SolverMethod {
    /// Let `HiGHS` decide
    Choose,
    /// Dual or primal simplex
    Simplex,
    /// Interior point method
    Ipm,
    /// First-order primal-dual method
    Pdlp,
}

/// The `HiGHS` options which can be set by the user.
///
/// Options left as `None` keep the solver's own default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HighsOptions {
    /// Wall-clock limit for a solve, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,
    /// Number of threads (0 lets `HiGHS` choose)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<u16>,
    /// Presolve setting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presolve: Option<PresolveMode>,
    /// Solution algorithm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverMethod>,
}

impl HighsOptions {
    /// Check that option values are in the range `HiGHS` accepts
    pub fn check(&self) -> Result<()> {
        if let Some(time_limit) = self.time_limit {
            ensure!(
                time_limit >= 0.0,
                "time_limit must be a non-negative number of seconds, got {time_limit}"
            );
        }

        Ok(())
    }
}

/// Configuration passed through to `HiGHS`.
///
/// Retry and timeout policies are the solver's business, so they are configured here (e.g. with
/// the `time_limit` option) rather than implemented by this crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverOptions {
    /// Whether `HiGHS` should write its own progress output to the console
    pub output: bool,
    /// Named `HiGHS` options
    pub highs: HighsOptions,
}

/// An optimal solution to the LP relaxation
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    objective_value: f64,
    flows: CustomerFacilityMatrix,
}

impl Solution {
    /// The value of the objective at the optimum
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    /// Fraction of each customer's demand served by each facility
    pub fn flows(&self) -> &CustomerFacilityMatrix {
        &self.flows
    }

    /// Iterate over the flows which are not (numerically) zero
    pub fn iter_nonzero_flows(
        &self,
        tolerance: f64,
    ) -> impl Iterator<Item = ((usize, usize), f64)> {
        self.flows
            .iter()
            .filter(move |(_, flow)| flow.abs() > tolerance)
    }
}

/// Solve the given model.
///
/// # Arguments
///
/// * `model` - The model to solve
/// * `options` - Solver configuration
///
/// # Returns
///
/// * `Ok(Some(solution))` if an optimal solution was found
/// * `Ok(None)` if the model has no feasible solution
/// * An error if the solver failed for any other reason
pub fn solve(model: &FormulatedModel, options: &SolverOptions) -> Result<Option<Solution>> {
    options.highs.check()?;

    // Set up problem
    let mut problem = Problem::default();
    let variables: Vec<Variable> = model
        .variables()
        .iter()
        .map(|var| problem.add_column(var.coefficient, var.min..=var.max))
        .collect();

    for constraint in model.constraints() {
        problem.add_row(
            constraint.min..=constraint.max,
            constraint
                .terms
                .iter()
                .map(|(var, coeff)| (variables[*var], *coeff)),
        );
    }

    let mut highs_model = problem
        .try_optimise(Sense::Minimise)
        .map_err(|status| anyhow!("Could not create solver model: {status:?}"))?;
    apply_options(&mut highs_model, options);

    // Solve model
    debug!(
        "Solving model with {} variables and {} constraints",
        variables.len(),
        model.constraints().len()
    );
    let solved = highs_model
        .try_solve()
        .map_err(|status| anyhow!("Could not solve: {status:?}"))?;
    match solved.status() {
        HighsModelStatus::Optimal => {
            let objective_value = solved.objective_value();
            let flows = CustomerFacilityMatrix::from_row_major(
                model.num_facilities(),
                solved.get_solution().columns().to_vec(),
            );
            info!("Found optimal solution with objective value {objective_value}");

            Ok(Some(Solution {
                objective_value,
                flows,
            }))
        }
        HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
            info!("Model is infeasible");
            Ok(None)
        }
        status => Err(anyhow!("Could not solve: {status:?}")),
    }
}

/// Apply user options to the `HiGHS` model.
///
/// Every name and value type here is one `HiGHS` accepts, so none of these calls can fail.
fn apply_options(highs_model: &mut highs::Model, options: &SolverOptions) {
    highs_model.set_option("output_flag", options.output);
    highs_model.set_option("log_to_console", options.output);

    let highs = &options.highs;
    debug!("Setting solver options: {highs:?}");
    if let Some(time_limit) = highs.time_limit {
        highs_model.set_option("time_limit", time_limit);
    }
    if let Some(threads) = highs.threads {
        highs_model.set_option("threads", i32::from(threads));
    }
    if let Some(presolve) = highs.presolve {
        highs_model.set_option("presolve", <&str>::from(presolve));
    }
    if let Some(solver) = highs.solver {
        highs_model.set_option("solver", <&str>::from(solver));
    }
}
