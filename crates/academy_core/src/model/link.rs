//! Student-advisor junction record.

use super::person::{AdvisorId, StudentId};
use serde::{Deserialize, Serialize};

/// One many-to-many edge between a student and an advisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentAdvisorLink {
    pub student_id: StudentId,
    pub advisor_id: AdvisorId,
}

impl StudentAdvisorLink {
    pub fn new(student_id: StudentId, advisor_id: AdvisorId) -> Self {
        Self {
            student_id,
            advisor_id,
        }
    }
}

/// Document key of the `slot`-th link of a student: `"{student_id}_{slot}"`.
pub fn link_document_key(student_id: StudentId, slot: u32) -> String {
    format!("{student_id}_{slot}")
}
