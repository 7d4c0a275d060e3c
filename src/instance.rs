//! The problem instance: customers, facilities and the costs connecting them.
//!
//! A [`ProblemInstance`] can only be created through [`ProblemInstance::new`], which checks that
//! every vector and matrix has the shape implied by the declared dimensions and that all values lie
//! in their allowed ranges. Once created, an instance is never modified.
use crate::input::{MalformedInputError, Segment};
use itertools::iproduct;

/// A dense matrix with one value per (customer, facility) pair.
///
/// Values are stored row-major, i.e. all facilities for customer 0 come first, then all
/// facilities for customer 1 and so on. This is the same order used in instance files.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerFacilityMatrix {
    num_facilities: usize,
    values: Vec<f64>,
}

impl CustomerFacilityMatrix {
    /// Create a matrix from row-major values.
    ///
    /// # Panics
    ///
    /// If `num_facilities` is zero or the number of values is not a multiple of it.
    pub fn from_row_major(num_facilities: usize, values: Vec<f64>) -> Self {
        assert!(num_facilities > 0, "Matrix must have at least one column");
        assert!(
            values.len() % num_facilities == 0,
            "Number of values must be a multiple of the number of facilities"
        );

        Self {
            num_facilities,
            values,
        }
    }

    /// Create a matrix from one `Vec` per customer.
    ///
    /// # Panics
    ///
    /// If the rows are empty or do not all have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let num_facilities = rows.first().map_or(0, Vec::len);
        assert!(
            rows.iter().all(|row| row.len() == num_facilities),
            "All rows must have the same length"
        );

        Self::from_row_major(num_facilities, rows.into_iter().flatten().collect())
    }

    /// The number of customers (rows)
    pub fn num_customers(&self) -> usize {
        self.values.len() / self.num_facilities
    }

    /// The number of facilities (columns)
    pub fn num_facilities(&self) -> usize {
        self.num_facilities
    }

    /// Get the value for the given customer and facility
    pub fn get(&self, customer: usize, facility: usize) -> f64 {
        assert!(facility < self.num_facilities, "Facility index out of range");
        self.values[customer * self.num_facilities + facility]
    }

    /// The values for one customer, in facility order
    pub fn row(&self, customer: usize) -> &[f64] {
        let start = customer * self.num_facilities;
        &self.values[start..start + self.num_facilities]
    }

    /// The values for one facility, in customer order
    pub fn column(&self, facility: usize) -> impl Iterator<Item = f64> + '_ {
        assert!(facility < self.num_facilities, "Facility index out of range");
        self.values
            .iter()
            .skip(facility)
            .step_by(self.num_facilities)
            .copied()
    }

    /// Iterate over `((customer, facility), value)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        iproduct!(0..self.num_customers(), 0..self.num_facilities).zip(self.values.iter().copied())
    }

    /// All values in row-major order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// A validated facility-location instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemInstance {
    num_customers: usize,
    num_facilities: usize,
    alloc_cost: CustomerFacilityMatrix,
    demand: Vec<f64>,
    opening_cost: Vec<f64>,
    capacity: Vec<f64>,
    max_vehicles_per_facility: usize,
    truck_distance_limit: f64,
    truck_usage_cost: f64,
    distance: CustomerFacilityMatrix,
}

impl ProblemInstance {
    /// Create a new instance, checking shapes and value ranges.
    ///
    /// The maximum number of vehicles per facility is not an input: one vehicle per customer is
    /// always enough, so it is set to `num_customers`.
    ///
    /// # Arguments
    ///
    /// * `alloc_cost` - Per-unit service cost for each (customer, facility) pair
    /// * `demand` - Demand of each customer
    /// * `opening_cost` - Opening cost of each facility
    /// * `capacity` - Capacity of each facility (must be positive)
    /// * `truck_distance_limit` - Total driving distance one truck may cover (must be positive)
    /// * `truck_usage_cost` - Cost of using one truck
    /// * `distance` - Roundtrip distance for each (customer, facility) pair
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        alloc_cost: CustomerFacilityMatrix,
        demand: Vec<f64>,
        opening_cost: Vec<f64>,
        capacity: Vec<f64>,
        truck_distance_limit: f64,
        truck_usage_cost: f64,
        distance: CustomerFacilityMatrix,
    ) -> Result<Self, MalformedInputError> {
        let num_customers = demand.len();
        let num_facilities = capacity.len();
        if num_customers == 0 || num_facilities == 0 {
            return Err(MalformedInputError::InvalidValue {
                segment: Segment::Dimensions,
                reason: "there must be at least one customer and one facility".into(),
            });
        }

        check_matrix_shape(Segment::AllocationCosts, &alloc_cost, num_customers, num_facilities)?;
        check_length(Segment::OpeningCosts, opening_cost.len(), num_facilities)?;
        check_matrix_shape(Segment::Distances, &distance, num_customers, num_facilities)?;

        check_non_negative(Segment::AllocationCosts, alloc_cost.as_slice())?;
        check_non_negative(Segment::Demand, &demand)?;
        check_non_negative(Segment::OpeningCosts, &opening_cost)?;
        check_positive(Segment::Capacities, &capacity)?;
        check_positive(Segment::TruckParameters, &[truck_distance_limit])?;
        check_non_negative(Segment::TruckParameters, &[truck_usage_cost])?;
        check_non_negative(Segment::Distances, distance.as_slice())?;

        Ok(Self {
            num_customers,
            num_facilities,
            alloc_cost,
            demand,
            opening_cost,
            capacity,
            max_vehicles_per_facility: num_customers,
            truck_distance_limit,
            truck_usage_cost,
            distance,
        })
    }

    /// The number of customers
    pub fn num_customers(&self) -> usize {
        self.num_customers
    }

    /// The number of facilities
    pub fn num_facilities(&self) -> usize {
        self.num_facilities
    }

    /// Service cost paid per unit of a customer's demand served by a facility
    pub fn alloc_cost(&self) -> &CustomerFacilityMatrix {
        &self.alloc_cost
    }

    /// Demand of each customer
    pub fn demand(&self) -> &[f64] {
        &self.demand
    }

    /// Opening cost of each facility
    pub fn opening_cost(&self) -> &[f64] {
        &self.opening_cost
    }

    /// Capacity of each facility
    pub fn capacity(&self) -> &[f64] {
        &self.capacity
    }

    /// Maximum number of vehicles available at a facility
    pub fn max_vehicles_per_facility(&self) -> usize {
        self.max_vehicles_per_facility
    }

    /// Total driving distance one truck may cover
    pub fn truck_distance_limit(&self) -> f64 {
        self.truck_distance_limit
    }

    /// Cost of using one truck
    pub fn truck_usage_cost(&self) -> f64 {
        self.truck_usage_cost
    }

    /// Roundtrip distance between each customer and facility
    pub fn distance(&self) -> &CustomerFacilityMatrix {
        &self.distance
    }

    /// The total distance the fleet of a single facility may drive
    #[allow(clippy::cast_precision_loss)]
    pub fn fleet_distance_budget(&self) -> f64 {
        self.max_vehicles_per_facility as f64 * self.truck_distance_limit
    }
}

fn check_length(
    segment: Segment,
    found: usize,
    expected: usize,
) -> Result<(), MalformedInputError> {
    if found != expected {
        return Err(MalformedInputError::DimensionMismatch {
            segment,
            expected,
            found,
        });
    }

    Ok(())
}

fn check_matrix_shape(
    segment: Segment,
    matrix: &CustomerFacilityMatrix,
    num_customers: usize,
    num_facilities: usize,
) -> Result<(), MalformedInputError> {
    check_length(
        segment,
        matrix.as_slice().len(),
        num_customers * num_facilities,
    )?;
    check_length(segment, matrix.num_facilities(), num_facilities)
}

fn check_non_negative(segment: Segment, values: &[f64]) -> Result<(), MalformedInputError> {
    check_values(segment, values, |v| v >= 0.0, "must be finite and non-negative")
}

fn check_positive(segment: Segment, values: &[f64]) -> Result<(), MalformedInputError> {
    check_values(segment, values, |v| v > 0.0, "must be finite and positive")
}

fn check_values<F>(
    segment: Segment,
    values: &[f64],
    is_valid: F,
    requirement: &str,
) -> Result<(), MalformedInputError>
where
    F: Fn(f64) -> bool,
{
    if let Some(value) = values.iter().find(|v| !(v.is_finite() && is_valid(**v))) {
        return Err(MalformedInputError::InvalidValue {
            segment,
            reason: format!("{value} is out of range (values {requirement})"),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, instance_2x2, single_site_instance};
    use rstest::rstest;

    #[test]
    fn test_matrix_indexing() {
        let matrix =
            CustomerFacilityMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(matrix.num_customers(), 2);
        assert_eq!(matrix.num_facilities(), 3);
        assert_eq!(matrix.get(1, 0), 4.0);
        assert_eq!(matrix.get(0, 2), 3.0);
        assert_eq!(matrix.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(matrix.column(1).collect::<Vec<_>>(), vec![2.0, 5.0]);
        assert_eq!(
            matrix.iter().map(|(key, _)| key).collect::<Vec<_>>(),
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
    }

    #[test]
    #[should_panic(expected = "All rows must have the same length")]
    fn test_matrix_ragged_rows() {
        CustomerFacilityMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
    }

    #[rstest]
    fn test_derived_fields(instance_2x2: ProblemInstance) {
        assert_eq!(instance_2x2.num_customers(), 2);
        assert_eq!(instance_2x2.num_facilities(), 2);
        assert_eq!(instance_2x2.max_vehicles_per_facility(), 2);
        assert_eq!(instance_2x2.fleet_distance_budget(), 2.0 * 50.0);
    }

    #[rstest]
    fn test_new_wrong_opening_cost_length(single_site_instance: ProblemInstance) {
        let inst = single_site_instance;
        assert_error!(
            ProblemInstance::new(
                inst.alloc_cost().clone(),
                inst.demand().to_vec(),
                vec![0.0, 1.0],
                inst.capacity().to_vec(),
                inst.truck_distance_limit(),
                inst.truck_usage_cost(),
                inst.distance().clone(),
            ),
            "opening costs: expected 1 values but found 2"
        );
    }

    #[rstest]
    fn test_new_wrong_matrix_shape(single_site_instance: ProblemInstance) {
        let inst = single_site_instance;
        assert_error!(
            ProblemInstance::new(
                inst.alloc_cost().clone(),
                inst.demand().to_vec(),
                inst.opening_cost().to_vec(),
                inst.capacity().to_vec(),
                inst.truck_distance_limit(),
                inst.truck_usage_cost(),
                CustomerFacilityMatrix::from_rows(vec![vec![0.0], vec![0.0]]),
            ),
            "distances: expected 1 values but found 2"
        );
    }

    #[rstest]
    #[case(vec![0.0], "capacities: 0 is out of range (values must be finite and positive)")]
    #[case(vec![-3.0], "capacities: -3 is out of range (values must be finite and positive)")]
    #[case(
        vec![f64::INFINITY],
        "capacities: inf is out of range (values must be finite and positive)"
    )]
    fn test_new_bad_capacity(
        single_site_instance: ProblemInstance,
        #[case] capacity: Vec<f64>,
        #[case] msg: &str,
    ) {
        let inst = single_site_instance;
        assert_error!(
            ProblemInstance::new(
                inst.alloc_cost().clone(),
                inst.demand().to_vec(),
                inst.opening_cost().to_vec(),
                capacity,
                inst.truck_distance_limit(),
                inst.truck_usage_cost(),
                inst.distance().clone(),
            ),
            msg
        );
    }

    #[rstest]
    fn test_new_negative_demand(single_site_instance: ProblemInstance) {
        let inst = single_site_instance;
        assert!(matches!(
            ProblemInstance::new(
                inst.alloc_cost().clone(),
                vec![-1.0],
                inst.opening_cost().to_vec(),
                inst.capacity().to_vec(),
                inst.truck_distance_limit(),
                inst.truck_usage_cost(),
                inst.distance().clone(),
            ),
            Err(MalformedInputError::InvalidValue {
                segment: Segment::Demand,
                ..
            })
        ));
    }

    #[rstest]
    fn test_new_zero_truck_distance_limit(single_site_instance: ProblemInstance) {
        let inst = single_site_instance;
        assert!(matches!(
            ProblemInstance::new(
                inst.alloc_cost().clone(),
                inst.demand().to_vec(),
                inst.opening_cost().to_vec(),
                inst.capacity().to_vec(),
                0.0,
                inst.truck_usage_cost(),
                inst.distance().clone(),
            ),
            Err(MalformedInputError::InvalidValue {
                segment: Segment::TruckParameters,
                ..
            })
        ));
    }
}
