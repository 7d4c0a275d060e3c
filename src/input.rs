//! Reading and writing instance files.
//!
//! An instance file is plain text made up of seven lines ("segments") of whitespace-separated
//! numbers, in this order:
//!
//! 1. the number of customers and the number of facilities (two integers)
//! 2. the allocation cost matrix, row-major (`customers * facilities` values)
//! 3. the demand of each customer
//! 4. the opening cost of each facility
//! 5. the capacity of each facility
//! 6. the truck distance limit and the truck usage cost
//! 7. the roundtrip distance matrix, row-major (`customers * facilities` values)
//!
//! The dimensions on the first line determine how many values every other line must contain.
use crate::instance::{CustomerFacilityMatrix, ProblemInstance};
use itertools::Itertools;
use log::info;
use std::fs;
use std::io::{self, Write};
use std::iter::Enumerate;
use std::path::{Path, PathBuf};
use std::str::{FromStr, Lines};
use strum::{Display, EnumIter};
use thiserror::Error;

/// One of the seven lines of an instance file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Segment {
    /// Number of customers and facilities
    #[strum(serialize = "dimensions")]
    Dimensions,
    /// Allocation cost matrix
    #[strum(serialize = "allocation costs")]
    AllocationCosts,
    /// Customer demands
    #[strum(serialize = "demand")]
    Demand,
    /// Facility opening costs
    #[strum(serialize = "opening costs")]
    OpeningCosts,
    /// Facility capacities
    #[strum(serialize = "capacities")]
    Capacities,
    /// Truck distance limit and usage cost
    #[strum(serialize = "truck parameters")]
    TruckParameters,
    /// Roundtrip distance matrix
    #[strum(serialize = "distances")]
    Distances,
}

impl Segment {
    /// The number of values this segment holds for an instance of the given size.
    ///
    /// Returns `None` if the number of matrix entries does not fit in a `usize`.
    pub fn expected_len(self, num_customers: usize, num_facilities: usize) -> Option<usize> {
        match self {
            Self::Dimensions | Self::TruckParameters => Some(2),
            Self::AllocationCosts | Self::Distances => num_customers.checked_mul(num_facilities),
            Self::Demand => Some(num_customers),
            Self::OpeningCosts | Self::Capacities => Some(num_facilities),
        }
    }
}

/// Indicates that an instance file (or instance data) does not have the expected shape.
#[derive(Debug, Error)]
pub enum MalformedInputError {
    /// The file could not be read at all
    #[error("could not read {}: {source}", .path.display())]
    Io {
        /// The path that was being read
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },
    /// The file ended before this segment
    #[error("{segment}: unexpected end of file at line {line}")]
    MissingSegment {
        /// The segment which was expected
        segment: Segment,
        /// The line at which it was expected
        line: usize,
    },
    /// The segment has the wrong number of values
    #[error("{segment} (line {line}): expected {expected} values but found {found}")]
    TokenCount {
        /// The offending segment
        segment: Segment,
        /// Line number of the segment
        line: usize,
        /// The number of values implied by the dimensions
        expected: usize,
        /// The number of values present
        found: usize,
    },
    /// A token could not be parsed as a number
    #[error("{segment} (line {line}): '{token}' is not a valid number")]
    InvalidNumber {
        /// The offending segment
        segment: Segment,
        /// Line number of the segment
        line: usize,
        /// The token which failed to parse
        token: String,
    },
    /// A vector or matrix does not match the declared dimensions
    #[error("{segment}: expected {expected} values but found {found}")]
    DimensionMismatch {
        /// The offending segment
        segment: Segment,
        /// The number of values implied by the dimensions
        expected: usize,
        /// The number of values present
        found: usize,
    },
    /// A value lies outside its allowed range
    #[error("{segment}: {reason}")]
    InvalidValue {
        /// The offending segment
        segment: Segment,
        /// What is wrong with the value
        reason: String,
    },
    /// There is more data after the last segment
    #[error("unexpected data after the last segment at line {line}")]
    TrailingData {
        /// Line number of the first extra line
        line: usize,
    },
}

/// Reads segments one line at a time, keeping track of line numbers for error messages
struct SegmentReader<'a> {
    lines: Enumerate<Lines<'a>>,
    line: usize,
}

impl<'a> SegmentReader<'a> {
    fn new(contents: &'a str) -> Self {
        Self {
            lines: contents.lines().enumerate(),
            line: 0,
        }
    }

    /// Read the next line, checking it has exactly `expected` tokens
    fn next_tokens(
        &mut self,
        segment: Segment,
        expected: usize,
    ) -> Result<Vec<&'a str>, MalformedInputError> {
        let Some((idx, line)) = self.lines.next() else {
            return Err(MalformedInputError::MissingSegment {
                segment,
                line: self.line + 1,
            });
        };
        self.line = idx + 1;

        let tokens = line.split_whitespace().collect_vec();
        if tokens.len() != expected {
            return Err(MalformedInputError::TokenCount {
                segment,
                line: self.line,
                expected,
                found: tokens.len(),
            });
        }

        Ok(tokens)
    }

    /// Read the next line as exactly `expected` values of type `T`
    fn read<T: FromStr>(
        &mut self,
        segment: Segment,
        expected: usize,
    ) -> Result<Vec<T>, MalformedInputError> {
        let line = self.line + 1;
        self.next_tokens(segment, expected)?
            .into_iter()
            .map(|token| {
                token
                    .parse()
                    .map_err(|_| MalformedInputError::InvalidNumber {
                        segment,
                        line,
                        token: token.to_string(),
                    })
            })
            .collect()
    }

    /// Check that nothing but blank lines remain
    fn finish(mut self) -> Result<(), MalformedInputError> {
        match self.lines.find(|(_, line)| !line.trim().is_empty()) {
            Some((idx, _)) => Err(MalformedInputError::TrailingData { line: idx + 1 }),
            None => Ok(()),
        }
    }
}

impl FromStr for ProblemInstance {
    type Err = MalformedInputError;

    fn from_str(contents: &str) -> Result<Self, Self::Err> {
        let mut reader = SegmentReader::new(contents);

        let dimensions: Vec<usize> = reader.read(Segment::Dimensions, 2)?;
        let (num_customers, num_facilities) = (dimensions[0], dimensions[1]);
        if num_customers == 0 || num_facilities == 0 {
            return Err(MalformedInputError::InvalidValue {
                segment: Segment::Dimensions,
                reason: "there must be at least one customer and one facility".into(),
            });
        }

        let mut read_segment = |segment: Segment| -> Result<Vec<f64>, MalformedInputError> {
            let expected = segment
                .expected_len(num_customers, num_facilities)
                .ok_or_else(|| MalformedInputError::InvalidValue {
                    segment: Segment::Dimensions,
                    reason: format!("{num_customers} x {num_facilities} matrices are too large"),
                })?;
            reader.read(segment, expected)
        };
        let alloc_cost = read_segment(Segment::AllocationCosts)?;
        let demand = read_segment(Segment::Demand)?;
        let opening_cost = read_segment(Segment::OpeningCosts)?;
        let capacity = read_segment(Segment::Capacities)?;
        let truck = read_segment(Segment::TruckParameters)?;
        let distance = read_segment(Segment::Distances)?;
        reader.finish()?;

        ProblemInstance::new(
            CustomerFacilityMatrix::from_row_major(num_facilities, alloc_cost),
            demand,
            opening_cost,
            capacity,
            truck[0],
            truck[1],
            CustomerFacilityMatrix::from_row_major(num_facilities, distance),
        )
    }
}

/// Load a problem instance from the given file.
///
/// No partially-read instance is ever returned: if any segment is missing, short, long or contains
/// something other than numbers, an error naming that segment is returned instead.
///
/// # Arguments
///
/// * `path` - Path to the instance file
pub fn load(path: &Path) -> Result<ProblemInstance, MalformedInputError> {
    let contents = fs::read_to_string(path).map_err(|source| MalformedInputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let instance: ProblemInstance = contents.parse()?;

    info!("Loaded instance from {}", path.display());
    info!(
        "Customers: {} Facilities: {} Vehicles per facility: {}",
        instance.num_customers(),
        instance.num_facilities(),
        instance.max_vehicles_per_facility()
    );

    Ok(instance)
}

/// Write an instance in the same format that [`load`] reads.
pub fn write_instance<W: Write>(writer: &mut W, instance: &ProblemInstance) -> io::Result<()> {
    writeln!(
        writer,
        "{} {}",
        instance.num_customers(),
        instance.num_facilities()
    )?;
    writeln!(writer, "{}", instance.alloc_cost().as_slice().iter().join(" "))?;
    writeln!(writer, "{}", instance.demand().iter().join(" "))?;
    writeln!(writer, "{}", instance.opening_cost().iter().join(" "))?;
    writeln!(writer, "{}", instance.capacity().iter().join(" "))?;
    writeln!(
        writer,
        "{} {}",
        instance.truck_distance_limit(),
        instance.truck_usage_cost()
    )?;
    writeln!(writer, "{}", instance.distance().as_slice().iter().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, instance_2x2};
    use rstest::rstest;
    use std::fs::File;
    use strum::IntoEnumIterator;
    use tempfile::tempdir;

    /// The lines of a valid 2x2 instance file, one per segment
    const VALID_LINES: [&str; 7] = [
        "2 2",
        "1.5 2 3 4.25",
        "10 20",
        "100 200",
        "25 40",
        "50 7",
        "5 6 7 8",
    ];

    fn to_contents(lines: &[String]) -> String {
        lines.iter().map(|line| format!("{line}\n")).collect()
    }

    fn valid_lines() -> Vec<String> {
        VALID_LINES.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_valid() {
        let instance: ProblemInstance = to_contents(&valid_lines()).parse().unwrap();
        assert_eq!(instance.num_customers(), 2);
        assert_eq!(instance.num_facilities(), 2);
        assert_eq!(instance.alloc_cost().row(0), &[1.5, 2.0]);
        assert_eq!(instance.alloc_cost().row(1), &[3.0, 4.25]);
        assert_eq!(instance.demand(), &[10.0, 20.0]);
        assert_eq!(instance.opening_cost(), &[100.0, 200.0]);
        assert_eq!(instance.capacity(), &[25.0, 40.0]);
        assert_eq!(instance.max_vehicles_per_facility(), 2);
        assert_eq!(instance.truck_distance_limit(), 50.0);
        assert_eq!(instance.truck_usage_cost(), 7.0);
        assert_eq!(instance.distance().get(0, 1), 6.0);
        assert_eq!(instance.distance().get(1, 0), 7.0);
    }

    #[test]
    fn test_parse_non_square() {
        let contents = "3 1\n1 2 3\n4 5 6\n7\n100\n9 1\n0.5 0.25 0\n";
        let instance: ProblemInstance = contents.parse().unwrap();
        assert_eq!(instance.num_customers(), 3);
        assert_eq!(instance.num_facilities(), 1);
        assert_eq!(instance.max_vehicles_per_facility(), 3);
        assert_eq!(instance.distance().column(0).collect_vec(), vec![0.5, 0.25, 0.0]);
    }

    #[rstest]
    fn test_round_trip(instance_2x2: ProblemInstance) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("instance.txt");
        {
            let mut file = File::create(&file_path).unwrap();
            write_instance(&mut file, &instance_2x2).unwrap();
        }

        assert_eq!(load(&file_path).unwrap(), instance_2x2);
    }

    #[test]
    fn test_truncating_any_segment_fails() {
        for (idx, segment) in Segment::iter().enumerate() {
            let mut lines = valid_lines();
            let truncated = lines[idx].split_whitespace().dropping_back(1).join(" ");
            lines[idx] = truncated;

            let result = to_contents(&lines).parse::<ProblemInstance>();
            let expected = segment.expected_len(2, 2).unwrap();
            match result {
                Err(MalformedInputError::TokenCount {
                    segment: err_segment,
                    line,
                    expected: err_expected,
                    found,
                }) => {
                    assert_eq!(err_segment, segment);
                    assert_eq!(line, idx + 1);
                    assert_eq!(err_expected, expected);
                    assert_eq!(found, expected - 1);
                }
                other => panic!("Unexpected result for {segment}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_segments_fail() {
        for (idx, segment) in Segment::iter().enumerate() {
            let lines = valid_lines()[..idx].to_vec();
            assert_error!(
                to_contents(&lines).parse::<ProblemInstance>(),
                format!("{segment}: unexpected end of file at line {}", idx + 1)
            );
        }
    }

    #[test]
    fn test_extra_token_fails() {
        let mut lines = valid_lines();
        lines[2].push_str(" 30");
        assert_error!(
            to_contents(&lines).parse::<ProblemInstance>(),
            "demand (line 3): expected 2 values but found 3"
        );
    }

    #[rstest]
    #[case(0, "2 x", "dimensions (line 1): 'x' is not a valid number")]
    #[case(0, "2 2.0", "dimensions (line 1): '2.0' is not a valid number")]
    #[case(3, "100 abc", "opening costs (line 4): 'abc' is not a valid number")]
    #[case(6, "5 6 7 8,", "distances (line 7): '8,' is not a valid number")]
    fn test_non_numeric_token_fails(#[case] idx: usize, #[case] line: &str, #[case] msg: &str) {
        let mut lines = valid_lines();
        lines[idx] = line.to_string();
        assert_error!(to_contents(&lines).parse::<ProblemInstance>(), msg);
    }

    #[rstest]
    #[case("0 2", "dimensions: there must be at least one customer and one facility")]
    #[case("2 0", "dimensions: there must be at least one customer and one facility")]
    fn test_zero_dimension_fails(#[case] line: &str, #[case] msg: &str) {
        let mut lines = valid_lines();
        lines[0] = line.to_string();
        assert_error!(to_contents(&lines).parse::<ProblemInstance>(), msg);
    }

    #[test]
    fn test_oversized_dimensions_fail() {
        let contents = "4294967296 4294967296\n1\n1\n1\n1\n1 1\n1\n";
        assert_error!(
            contents.parse::<ProblemInstance>(),
            "dimensions: 4294967296 x 4294967296 matrices are too large"
        );
    }

    #[test]
    fn test_expected_len_overflow() {
        assert_eq!(Segment::Distances.expected_len(usize::MAX, 2), None);
        assert_eq!(Segment::Demand.expected_len(usize::MAX, 2), Some(usize::MAX));
    }

    #[test]
    fn test_zero_capacity_fails() {
        let mut lines = valid_lines();
        lines[4] = "25 0".to_string();
        assert!(matches!(
            to_contents(&lines).parse::<ProblemInstance>(),
            Err(MalformedInputError::InvalidValue {
                segment: Segment::Capacities,
                ..
            })
        ));
    }

    #[test]
    fn test_nan_fails() {
        let mut lines = valid_lines();
        lines[5] = "NaN 7".to_string();
        assert!(matches!(
            to_contents(&lines).parse::<ProblemInstance>(),
            Err(MalformedInputError::InvalidValue {
                segment: Segment::TruckParameters,
                ..
            })
        ));
    }

    #[test]
    fn test_trailing_blank_lines_allowed() {
        let contents = to_contents(&valid_lines()) + "\n   \n";
        assert!(contents.parse::<ProblemInstance>().is_ok());
    }

    #[test]
    fn test_trailing_data_fails() {
        let contents = to_contents(&valid_lines()) + "\n1 2 3\n";
        assert_error!(
            contents.parse::<ProblemInstance>(),
            "unexpected data after the last segment at line 9"
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = load(&dir.path().join("nope.txt"));
        assert!(matches!(result, Err(MalformedInputError::Io { .. })));
    }
}
