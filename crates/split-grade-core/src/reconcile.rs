use indexmap::IndexMap;
use tracing::debug;

use crate::groups::{build_students_map, GroupRecord, StudentRecord};
use crate::roster::Roster;

/// Result of joining the group sheet with the roster by mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Every group member, keyed by mail. When a mail appears in more than
    /// one group the last group in sheet order wins.
    pub students_by_mail: IndexMap<String, StudentRecord>,
    /// Roster mails that belong to no group, in roster order.
    pub unmatched_roster_mails: Vec<String>,
}

impl Reconciliation {
    /// Group members with no roster row.
    pub fn unmatched_students(&self) -> impl Iterator<Item = &StudentRecord> {
        self.students_by_mail
            .values()
            .filter(|student| !student.is_reconciled())
    }
}

/// Fill in each member's identity from the roster and write each group's
/// grade into the roster rows of its members.
pub fn reconcile(groups: &[GroupRecord], roster: &mut Roster, id_prefix: &str) -> Reconciliation {
    let mut students_by_mail = build_students_map(groups);
    let unmatched_roster_mails = complete_student_identities(&mut students_by_mail, roster, id_prefix);
    fill_in_grades(&students_by_mail, roster);

    debug!(
        "Reconciled {} students, {} roster rows without group",
        students_by_mail.len(),
        unmatched_roster_mails.len()
    );

    Reconciliation {
        students_by_mail,
        unmatched_roster_mails,
    }
}

fn complete_student_identities(
    students: &mut IndexMap<String, StudentRecord>,
    roster: &Roster,
    id_prefix: &str,
) -> Vec<String> {
    let mut not_found = Vec::new();
    for row in roster.data_rows() {
        let mail = roster.mail_of(row);
        match students.get_mut(mail) {
            Some(student) => {
                let raw_id = roster.identifier_of(row);
                let moodle_id = raw_id.strip_prefix(id_prefix).unwrap_or(raw_id);
                student.moodle_id = Some(moodle_id.to_string());
                student.full_name = Some(roster.full_name_of(row).to_string());
            }
            None => not_found.push(mail.to_string()),
        }
    }
    not_found
}

fn fill_in_grades(students: &IndexMap<String, StudentRecord>, roster: &mut Roster) {
    let matched: Vec<(String, String)> = roster
        .data_rows()
        .filter_map(|row| {
            let mail = roster.mail_of(row);
            students
                .get(mail)
                .map(|student| (mail.to_string(), student.grade.clone()))
        })
        .collect();

    for (mail, grade) in matched {
        roster.write_grade(&mail, &grade);
    }
}
