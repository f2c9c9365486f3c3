//! Enrollment use-cases: seeding entities and linking students to advisors.
//!
//! # Responsibility
//! - Validate records before they reach a store.
//! - Own the linking policy: a student acquires up to its quota of
//!   distinct advisors, drawn at random.
//!
//! # Invariants
//! - Service APIs are storage-agnostic; conflict handling belongs to the
//!   store behind `AcademyStore`.
//! - A student never ends up with more than `advisor_quota` links when
//!   linking runs single-threaded. The relational store enforces this in
//!   one statement; the document store checks then inserts.

use crate::fixture::Fixture;
use crate::model::link::StudentAdvisorLink;
use crate::model::person::{Advisor, Student};
use crate::repo::store::{AcademyStore, Entity, StoreResult};
use log::{debug, info};

/// Counters returned by `EnrollmentService::seed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub advisors_inserted: usize,
    pub students_inserted: usize,
    pub links_inserted: usize,
}

/// Domain adapter over one store.
pub struct EnrollmentService<S: AcademyStore> {
    store: S,
}

impl<S: AcademyStore> EnrollmentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists an advisor unless one with the same id exists.
    pub fn add_advisor(&self, advisor: &Advisor) -> StoreResult<bool> {
        advisor.validate()?;
        self.store.insert_if_absent(Entity::Advisor(advisor))
    }

    /// Persists a student unless one with the same id exists.
    pub fn add_student(&self, student: &Student) -> StoreResult<bool> {
        student.validate()?;
        self.store.insert_if_absent(Entity::Student(student))
    }

    /// Links `student` to randomly drawn advisors until its quota is met.
    ///
    /// Draws `advisor_quota` distinct advisors and offers each one in turn;
    /// every offer re-checks the quota. Returns the number of new links.
    pub fn link_advisors(&self, student: &Student) -> StoreResult<usize> {
        let quota = student.advisor_quota;
        if self.store.advisor_link_count(student.id)? >= u64::from(quota) {
            debug!(
                "event=link_advisors module=service status=skipped reason=quota_met student_id={}",
                student.id
            );
            return Ok(0);
        }

        let candidates = self.store.sample_advisor_ids(quota as usize)?;
        let mut linked = 0;
        for advisor_id in candidates {
            let link = StudentAdvisorLink::new(student.id, advisor_id);
            if self.store.link_if_below_quota(link, quota)? {
                linked += 1;
            }
        }

        debug!(
            "event=link_advisors module=service status=ok student_id={} linked={linked}",
            student.id
        );
        Ok(linked)
    }

    /// Seeds advisors, then students and their links, from `fixture`.
    ///
    /// Ids are 1-based positions in the fixture lists. Re-running is
    /// idempotent for entities; links are topped up to quota.
    pub fn seed(&self, fixture: &Fixture, advisor_quota: u32) -> StoreResult<SeedReport> {
        let mut report = SeedReport::default();

        for advisor in fixture.advisors() {
            if self.add_advisor(&advisor)? {
                report.advisors_inserted += 1;
            }
        }

        for student in fixture.students(advisor_quota) {
            if self.add_student(&student)? {
                report.students_inserted += 1;
            }
            report.links_inserted += self.link_advisors(&student)?;
        }

        info!(
            "event=seed module=service status=ok advisors={} students={} links={}",
            report.advisors_inserted, report.students_inserted, report.links_inserted
        );
        Ok(report)
    }
}
