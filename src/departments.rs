//! Department mapping table.
//!
//! A coordinator account is scoped to its home department; this fixed table
//! maps a coordinator department to the set of student departments it may
//! oversee. "Placement" is the wildcard entry and manages every student
//! department. The table is consulted wherever a coordinator filters or
//! manages students.
//!
//! Not every student department is required to appear under a non-wildcard
//! coordinator; an unmapped department simply resolves to the Placement cell
//! in reverse lookups. This is an accepted gap, not an error.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;

/// Fixed (coordinator department, managed student departments) pairs, in
/// definition order. The Placement wildcard is intentionally last so that
/// reverse lookups prefer the specific coordinator.
const DEPARTMENT_TABLE: &[(&str, &[&str])] = &[
    ("Computer Science and Engineering", &[
        "Computer Science and Engineering",
        "Information Technology",
        "Artificial Intelligence and Data Science",
    ]),
    ("Information Technology", &[
        "Information Technology",
        "Computer Science and Engineering",
    ]),
    ("Electronics and Communication Engineering", &[
        "Electronics and Communication Engineering",
        "Electrical and Electronics Engineering",
    ]),
    ("Electrical and Electronics Engineering", &[
        "Electrical and Electronics Engineering",
    ]),
    ("Mechanical Engineering", &[
        "Mechanical Engineering",
        "Civil Engineering",
    ]),
    ("Civil Engineering", &[
        "Civil Engineering",
    ]),
    ("Placement", PLACEMENT_MARKER),
];

/// Sentinel slice for the wildcard row; resolved to the full union at lookup time.
const PLACEMENT_MARKER: &[&str] = &[];

pub const PLACEMENT: &str = "Placement";

/// Union of all student departments named anywhere in the table.
static ALL_STUDENT_DEPARTMENTS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    DEPARTMENT_TABLE
        .iter()
        .flat_map(|(_, depts)| depts.iter().copied())
        .collect()
});

/// All known student departments, sorted.
pub fn student_departments() -> Vec<&'static str> {
    ALL_STUDENT_DEPARTMENTS.iter().copied().collect()
}

/// Student departments the given coordinator department may manage.
/// Unknown departments yield an empty set: absence signals "manages nothing".
pub fn manageable_departments(coordinator_dept: &str) -> BTreeSet<&'static str> {
    for &(coord, depts) in DEPARTMENT_TABLE {
        if coord == coordinator_dept {
            if coordinator_dept == PLACEMENT {
                return ALL_STUDENT_DEPARTMENTS.clone();
            }
            return depts.iter().copied().collect();
        }
    }
    BTreeSet::new()
}

/// Whether the coordinator department may manage students of the given department.
pub fn can_manage(coordinator_dept: &str, student_dept: &str) -> bool {
    manageable_departments(coordinator_dept).contains(student_dept)
}

/// Reverse lookup: the first coordinator department (in table definition
/// order) whose managed set contains the student department.
pub fn coordinator_for(student_dept: &str) -> Option<&'static str> {
    for &(coord, _) in DEPARTMENT_TABLE {
        if can_manage(coord, student_dept) {
            return Some(coord);
        }
    }
    tracing::debug!(department = student_dept, "no coordinator maps this student department");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_department_manages_nothing() {
        assert!(manageable_departments("Astrology").is_empty());
        assert!(!can_manage("Astrology", "Civil Engineering"));
    }

    #[test]
    fn known_departments_manage_their_peer_sets() {
        let cse = manageable_departments("Computer Science and Engineering");
        assert!(cse.contains("Information Technology"));
        assert!(cse.contains("Computer Science and Engineering"));
        assert!(!cse.contains("Civil Engineering"));

        let civil = manageable_departments("Civil Engineering");
        assert_eq!(civil.len(), 1);
        assert!(civil.contains("Civil Engineering"));
    }

    #[test]
    fn placement_is_a_wildcard_over_every_student_department() {
        for dept in student_departments() {
            assert!(can_manage(PLACEMENT, dept), "Placement should manage {}", dept);
        }
    }

    #[test]
    fn coordinator_for_round_trips_through_the_table() {
        for dept in student_departments() {
            let coord = coordinator_for(dept)
                .unwrap_or_else(|| panic!("{} should be reachable from some coordinator", dept));
            assert!(manageable_departments(coord).contains(dept));
        }
    }

    #[test]
    fn reverse_lookup_prefers_the_specific_coordinator() {
        // Placement also manages these, but it sits last in the table.
        assert_eq!(coordinator_for("Civil Engineering"), Some("Mechanical Engineering"));
        assert_eq!(coordinator_for("Information Technology"), Some("Computer Science and Engineering"));
        assert_eq!(coordinator_for("Astrology"), None);
    }
}
