//! Table definitions for redb storage.
//!
//! Keys are UTF-8 strings: section names for counters, registration numbers
//! for students.

use redb::TableDefinition;

/// Table definitions for registry storage.
pub struct Tables;

impl Tables {
    /// Sequence counters: section name → count of numbers issued.
    pub const COUNTERS: TableDefinition<'static, &'static str, u64> =
        TableDefinition::new("counters");

    /// Student records: registration number → postcard-encoded `StudentRecord`.
    ///
    /// Keying by registration number makes the key itself the uniqueness
    /// constraint.
    pub const STUDENTS: TableDefinition<'static, &'static str, &'static [u8]> =
        TableDefinition::new("students");
}

#[cfg(test)]
mod tests {
    use redb::TableHandle;

    use super::*;

    #[test]
    fn test_table_names_unique() {
        assert_ne!(Tables::COUNTERS.name(), Tables::STUDENTS.name());
    }
}
