//! Output comparison

/// Compares program output with the expected answer.
///
/// Leading and trailing whitespace of both sides is ignored; everything in
/// between must match exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputComparator;

impl OutputComparator {
    pub fn compare(&self, actual: &str, expected: &str) -> bool {
        actual.trim() == expected.trim()
    }
}

/// Shorthand for [`OutputComparator::compare`]
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    OutputComparator.compare(actual, expected)
}
