//! Construction of the LP relaxation for a [`ProblemInstance`].
//!
//! There is one decision variable per (customer, facility) pair: the fraction of the customer's
//! demand which is served by that facility. Every customer must be fully served, and each
//! facility is limited both by its capacity and by the total distance its fleet may drive.
//!
//! The objective is the sum of three linear terms:
//!
//! 1. the facility opening cost, charged in proportion to how much of its capacity is used
//! 2. the service (allocation) cost
//! 3. the truck usage cost, charged in proportion to the distance driven
//!
//! Building the model does not involve the solver; see [`crate::solver`] for that.
use crate::instance::{CustomerFacilityMatrix, ProblemInstance};
use itertools::iproduct;
use log::debug;
use std::ops::RangeInclusive;

/// The index of a variable within a [`FormulatedModel`]
pub type VariableIndex = usize;

/// The definition of a variable to be optimised.
///
/// The coefficient is the variable's multiplying factor in the (linear) objective, i.e. the Cs in:
///
/// f = c1*x1 + c2*x2 + ...
///
/// with x1, x2... taking values between min and max.
#[derive(PartialEq, Debug, Clone)]
pub struct VariableDefinition {
    /// The customer whose demand this variable routes
    pub customer: usize,
    /// The facility serving the customer
    pub facility: usize,
    /// The variable's minimum value
    pub min: f64,
    /// The variable's maximum value
    pub max: f64,
    /// The coefficient of the variable in the objective
    pub coefficient: f64,
}

/// What a [`Constraint`] enforces
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ConstraintKind {
    /// All of a customer's demand must be served
    DemandCoverage(usize),
    /// A facility's fleet cannot drive further than its distance budget
    VehicleDistance(usize),
    /// A facility cannot serve more than its capacity
    FacilityCapacity(usize),
}

/// A linear constraint of the form:
///
/// min <= a1*x1 + a2*x2 + ... <= max
///
/// Only variables with a non-zero coefficient need to appear in `terms`.
#[derive(PartialEq, Debug, Clone)]
pub struct Constraint {
    /// What this constraint enforces
    pub kind: ConstraintKind,
    /// The minimum value for the constraint
    pub min: f64,
    /// The maximum value for the constraint
    pub max: f64,
    /// Pairs of variable and coefficient
    pub terms: Vec<(VariableIndex, f64)>,
}

/// A complete LP ready to be handed to a solver.
///
/// The objective is always minimised.
#[derive(PartialEq, Debug, Clone)]
pub struct FormulatedModel {
    num_customers: usize,
    num_facilities: usize,
    variables: Vec<VariableDefinition>,
    constraints: Vec<Constraint>,
}

impl FormulatedModel {
    /// The variables, in row-major (customer, facility) order
    pub fn variables(&self) -> &[VariableDefinition] {
        &self.variables
    }

    /// The constraints, in the order they were added
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The number of customers in the instance the model was built from
    pub fn num_customers(&self) -> usize {
        self.num_customers
    }

    /// The number of facilities in the instance the model was built from
    pub fn num_facilities(&self) -> usize {
        self.num_facilities
    }

    /// Get the index of the flow variable for the given customer and facility
    pub fn flow_variable(&self, customer: usize, facility: usize) -> VariableIndex {
        assert!(
            customer < self.num_customers && facility < self.num_facilities,
            "No variable found for given params"
        );
        customer * self.num_facilities + facility
    }

    /// Count the constraints whose kind matches the predicate
    pub fn count_constraints<F>(&self, predicate: F) -> usize
    where
        F: Fn(ConstraintKind) -> bool,
    {
        self.constraints
            .iter()
            .filter(|constraint| predicate(constraint.kind))
            .count()
    }

    /// Calculate the objective value for the given variable values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        assert_eq!(values.len(), self.variables.len(), "Wrong number of values");
        self.variables
            .iter()
            .zip(values)
            .map(|(var, value)| var.coefficient * value)
            .sum()
    }
}

/// Accumulates variables and constraints and then yields a [`FormulatedModel`].
pub struct ModelBuilder {
    num_customers: usize,
    num_facilities: usize,
    variables: Vec<VariableDefinition>,
    constraints: Vec<Constraint>,
}

impl ModelBuilder {
    /// Create a builder for a model with the given dimensions
    pub fn new(num_customers: usize, num_facilities: usize) -> Self {
        Self {
            num_customers,
            num_facilities,
            variables: Vec::with_capacity(num_customers * num_facilities),
            constraints: Vec::with_capacity(num_customers + 2 * num_facilities),
        }
    }

    /// Add a flow variable.
    ///
    /// Variables must be added in row-major (customer, facility) order.
    pub fn add_variable(
        &mut self,
        customer: usize,
        facility: usize,
        bounds: RangeInclusive<f64>,
        coefficient: f64,
    ) -> VariableIndex {
        let index = self.variables.len();
        assert_eq!(
            index,
            customer * self.num_facilities + facility,
            "Variables must be added in row-major order"
        );

        self.variables.push(VariableDefinition {
            customer,
            facility,
            min: *bounds.start(),
            max: *bounds.end(),
            coefficient,
        });

        index
    }

    /// Add a constraint with `bounds` on the weighted sum of `terms`
    pub fn add_constraint<I>(&mut self, kind: ConstraintKind, bounds: RangeInclusive<f64>, terms: I)
    where
        I: IntoIterator<Item = (VariableIndex, f64)>,
    {
        let terms: Vec<_> = terms.into_iter().collect();
        assert!(
            terms.iter().all(|(var, _)| *var < self.variables.len()),
            "Constraint refers to unknown variable"
        );

        self.constraints.push(Constraint {
            kind,
            min: *bounds.start(),
            max: *bounds.end(),
            terms,
        });
    }

    /// Finish building the model
    pub fn build(self) -> FormulatedModel {
        assert_eq!(
            self.variables.len(),
            self.num_customers * self.num_facilities,
            "Missing flow variables"
        );

        FormulatedModel {
            num_customers: self.num_customers,
            num_facilities: self.num_facilities,
            variables: self.variables,
            constraints: self.constraints,
        }
    }
}

/// Build the LP relaxation for the given instance.
///
/// # Arguments
///
/// * `instance` - The problem instance
///
/// # Returns
///
/// A model with one variable per (customer, facility) pair and, in this order, one demand
/// coverage constraint per customer followed by a distance and a capacity constraint for each
/// facility.
pub fn formulate(instance: &ProblemInstance) -> FormulatedModel {
    let mut builder = ModelBuilder::new(instance.num_customers(), instance.num_facilities());

    add_flow_variables(&mut builder, instance);
    add_demand_coverage_constraints(&mut builder, instance);
    add_facility_constraints(&mut builder, instance);

    let model = builder.build();
    debug!(
        "Formulated model with {} variables and {} constraints",
        model.variables().len(),
        model.constraints().len()
    );

    model
}

/// Calculate the objective coefficient for the flow from `facility` to `customer`.
///
/// This is the cost of serving all of the customer's demand from this facility.
fn calculate_cost_coefficient(instance: &ProblemInstance, customer: usize, facility: usize) -> f64 {
    // Share of the opening cost, in proportion to the capacity used
    let opening = instance.demand()[customer] * instance.opening_cost()[facility]
        / instance.capacity()[facility];
    let service = instance.alloc_cost().get(customer, facility);
    // Share of a truck's usage cost, in proportion to the distance driven
    let vehicle = instance.distance().get(customer, facility) / instance.truck_distance_limit()
        * instance.truck_usage_cost();

    opening + service + vehicle
}

/// Add one flow variable in `[0, 1]` for each (customer, facility) pair
fn add_flow_variables(builder: &mut ModelBuilder, instance: &ProblemInstance) {
    for (customer, facility) in iproduct!(0..instance.num_customers(), 0..instance.num_facilities())
    {
        let coeff = calculate_cost_coefficient(instance, customer, facility);
        builder.add_variable(customer, facility, 0.0..=1.0, coeff);
    }
}

/// Every customer's demand must be fully allocated across the facilities
fn add_demand_coverage_constraints(builder: &mut ModelBuilder, instance: &ProblemInstance) {
    let num_facilities = instance.num_facilities();
    for customer in 0..instance.num_customers() {
        let first = customer * num_facilities;
        builder.add_constraint(
            ConstraintKind::DemandCoverage(customer),
            1.0..=1.0,
            (first..first + num_facilities).map(|var| (var, 1.0)),
        );
    }
}

/// Add the distance and capacity limits for each facility
fn add_facility_constraints(builder: &mut ModelBuilder, instance: &ProblemInstance) {
    let num_facilities = instance.num_facilities();
    let max_distance = instance.fleet_distance_budget();
    let var = |customer: usize, facility: usize| customer * num_facilities + facility;

    for facility in 0..num_facilities {
        builder.add_constraint(
            ConstraintKind::VehicleDistance(facility),
            f64::NEG_INFINITY..=max_distance,
            instance
                .distance()
                .column(facility)
                .enumerate()
                .map(|(customer, distance)| (var(customer, facility), distance)),
        );

        builder.add_constraint(
            ConstraintKind::FacilityCapacity(facility),
            f64::NEG_INFINITY..=instance.capacity()[facility],
            instance
                .demand()
                .iter()
                .enumerate()
                .map(|(customer, demand)| (var(customer, facility), *demand)),
        );
    }
}

/// The objective value of a solution, split into its three components
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct CostBreakdown {
    /// Share of facility opening costs
    pub opening: f64,
    /// Service (allocation) cost
    pub service: f64,
    /// Share of truck usage costs
    pub vehicle: f64,
}

impl CostBreakdown {
    /// Calculate the costs incurred by the given flows
    ///
    /// # Arguments
    ///
    /// * `instance` - The problem instance
    /// * `flows` - Fraction of each customer's demand served by each facility
    pub fn new(instance: &ProblemInstance, flows: &CustomerFacilityMatrix) -> Self {
        let opening = (0..instance.num_facilities())
            .map(|facility| {
                let served: f64 = flows
                    .column(facility)
                    .zip(instance.demand())
                    .map(|(flow, demand)| flow * demand)
                    .sum();
                served * instance.opening_cost()[facility] / instance.capacity()[facility]
            })
            .sum();

        let service = dot(flows.as_slice(), instance.alloc_cost().as_slice());

        let distance = dot(flows.as_slice(), instance.distance().as_slice());
        let vehicle = distance / instance.truck_distance_limit() * instance.truck_usage_cost();

        Self {
            opening,
            service,
            vehicle,
        }
    }

    /// The total cost, i.e. the objective value
    pub fn total(&self) -> f64 {
        self.opening + self.service + self.vehicle
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
