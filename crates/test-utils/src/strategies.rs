//! Proptest strategies for registry domain values.
//!
//! # Usage
//!
//! ```no_run
//! use exam_registry_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn stays_in_range(number in strategies::arb_registration_number_in('A', 250_001, 260_000)) {
//!         prop_assert_eq!(number.prefix(), 'A');
//!     }
//! }
//! ```

use exam_registry_types::RegistrationNumber;
use proptest::prelude::*;

/// Generates a registration number inside `[start, end]` for `prefix`.
pub fn arb_registration_number_in(
    prefix: char,
    start: u32,
    end: u32,
) -> impl Strategy<Value = RegistrationNumber> {
    (start..=end).prop_map(move |n| RegistrationNumber::new(prefix, n))
}

/// Generates text that never parses as a registration number.
///
/// Covers a lowercase prefix, a missing suffix, non-digit suffixes, and a
/// bare number.
pub fn arb_malformed_registration_number() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][0-9]{1,6}",
        "[A-Z]",
        "[A-Z][0-9]{0,3}[a-z -][0-9]{0,3}",
        "[0-9]{1,7}",
        Just(String::new()),
    ]
}
