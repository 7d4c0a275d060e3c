//! Fixtures for tests

use crate::instance::{CustomerFacilityMatrix, ProblemInstance};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!($result.unwrap_err().to_string(), $msg);
    };
}
pub(crate) use assert_error;

/// One customer and one facility, with spare capacity and nothing to pay
#[fixture]
pub fn single_site_instance() -> ProblemInstance {
    ProblemInstance::new(
        CustomerFacilityMatrix::from_rows(vec![vec![0.0]]),
        vec![5.0],
        vec![0.0],
        vec![10.0],
        100.0,
        0.0,
        CustomerFacilityMatrix::from_rows(vec![vec![0.0]]),
    )
    .unwrap()
}

/// Two customers and two facilities
#[fixture]
pub fn instance_2x2() -> ProblemInstance {
    ProblemInstance::new(
        CustomerFacilityMatrix::from_rows(vec![vec![1.5, 2.0], vec![3.0, 4.25]]),
        vec![10.0, 20.0],
        vec![100.0, 200.0],
        vec![25.0, 40.0],
        50.0,
        7.0,
        CustomerFacilityMatrix::from_rows(vec![vec![5.0, 6.0], vec![7.0, 8.0]]),
    )
    .unwrap()
}
