use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::PrimitiveDateTime;

use crate::db::models::{
    AttemptHistoryEntry, AttemptStatusRecord, DivergenceCounts, ExamTest, Reservation,
    ResultRecord, Student,
};
use crate::db::types::AttemptStatus;
use crate::store::{AttemptCommit, AttemptStore, CommitOutcome, StoreError};

type Pair = (String, String);

fn pair(test_id: &str, student_id: &str) -> Pair {
    (test_id.to_string(), student_id.to_string())
}

#[derive(Default)]
struct MemoryState {
    students: BTreeMap<String, Student>,
    tests: HashMap<String, ExamTest>,
    assignments: BTreeSet<Pair>,
    reservations: BTreeMap<Pair, Reservation>,
    results: BTreeMap<Pair, ResultRecord>,
    history: BTreeMap<Pair, AttemptHistoryEntry>,
    statuses: HashMap<Pair, AttemptStatusRecord>,
    commit_faults: VecDeque<StoreError>,
}

/// Single-lock store; every operation is atomic with respect to the others.
#[derive(Default)]
pub(crate) struct MemoryAttemptStore {
    state: Mutex<MemoryState>,
}

impl MemoryAttemptStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn insert_student(&self, student: Student) {
        self.state().students.insert(student.id.clone(), student);
    }

    /// Queues errors returned by the next `commit_attempt` calls, in order.
    pub(crate) fn fail_next_commits(&self, errors: impl IntoIterator<Item = StoreError>) {
        self.state().commit_faults.extend(errors);
    }

    pub(crate) fn result_count(&self) -> usize {
        self.state().results.len()
    }

    pub(crate) fn history_count(&self) -> usize {
        self.state().history.len()
    }

    pub(crate) fn remove_test(&self, test_id: &str) {
        self.state().tests.remove(test_id);
    }

    pub(crate) fn insert_orphan_result(&self, result: ResultRecord) {
        let key = pair(&result.test_id, &result.student_id);
        self.state().results.insert(key, result);
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_test(&self, test_id: &str) -> Result<Option<ExamTest>, StoreError> {
        Ok(self.state().tests.get(test_id).cloned())
    }

    async fn create_test(&self, test: &ExamTest, assignees: &[String]) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.tests.contains_key(&test.id) {
            return Err(StoreError::ConstraintViolation(format!("test {} already exists", test.id)));
        }
        state.tests.insert(test.id.clone(), test.clone());
        for student_id in assignees {
            state.assignments.insert(pair(&test.id, student_id));
        }
        Ok(())
    }

    async fn tests_assigned_to(&self, student_id: &str) -> Result<Vec<ExamTest>, StoreError> {
        let state = self.state();
        let mut tests: Vec<ExamTest> = state
            .assignments
            .iter()
            .filter(|(_, assigned)| assigned == student_id)
            .filter_map(|(test_id, _)| state.tests.get(test_id).cloned())
            .collect();
        tests.sort_by(|a, b| {
            (a.scheduled_at.is_none(), a.scheduled_at, a.created_at).cmp(&(
                b.scheduled_at.is_none(),
                b.scheduled_at,
                b.created_at,
            ))
        });
        Ok(tests)
    }

    async fn find_student_by_account(
        &self,
        account_id: &str,
    ) -> Result<Option<Student>, StoreError> {
        Ok(self.state().students.values().find(|student| student.account_id == account_id).cloned())
    }

    async fn roster_ids(
        &self,
        organization: Option<&str>,
        class_name: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .state()
            .students
            .values()
            .filter(|student| {
                organization.map_or(true, |org| student.organization.as_deref() == Some(org))
            })
            .filter(|student| {
                class_name.map_or(true, |class| student.class_name.as_deref() == Some(class))
            })
            .map(|student| student.id.clone())
            .collect())
    }

    async fn existing_student_ids(
        &self,
        student_ids: &[String],
    ) -> Result<Vec<String>, StoreError> {
        let state = self.state();
        Ok(student_ids.iter().filter(|id| state.students.contains_key(*id)).cloned().collect())
    }

    async fn assign_students(
        &self,
        test_id: &str,
        student_ids: &[String],
        _now: PrimitiveDateTime,
    ) -> Result<u64, StoreError> {
        let mut state = self.state();
        let added = student_ids
            .iter()
            .filter(|student_id| state.assignments.insert(pair(test_id, student_id)))
            .count();
        Ok(added as u64)
    }

    async fn is_assigned(&self, test_id: &str, student_id: &str) -> Result<bool, StoreError> {
        Ok(self.state().assignments.contains(&pair(test_id, student_id)))
    }

    async fn assigned_student_ids(&self, test_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .state()
            .assignments
            .iter()
            .filter(|(assigned_test, _)| assigned_test == test_id)
            .map(|(_, student_id)| student_id.clone())
            .collect())
    }

    async fn reserve_submission(&self, reservation: &Reservation) -> Result<bool, StoreError> {
        let mut state = self.state();
        let key = pair(&reservation.test_id, &reservation.student_id);
        if !state.assignments.contains(&key) {
            return Err(StoreError::ConstraintViolation(
                "reservation violates the assigned-set constraint".to_string(),
            ));
        }
        if state.reservations.contains_key(&key) {
            return Ok(false);
        }
        state.reservations.insert(key, reservation.clone());
        Ok(true)
    }

    async fn release_reservation(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.state();
        let key = pair(test_id, student_id);
        let releasable =
            state.reservations.get(&key).is_some_and(|reservation| reservation.committed_at.is_none());
        if releasable {
            state.reservations.remove(&key);
        }
        Ok(releasable)
    }

    async fn is_submitted(&self, test_id: &str, student_id: &str) -> Result<bool, StoreError> {
        Ok(self.state().reservations.contains_key(&pair(test_id, student_id)))
    }

    async fn submitted_student_ids(&self, test_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .state()
            .reservations
            .keys()
            .filter(|(reserved_test, _)| reserved_test == test_id)
            .map(|(_, student_id)| student_id.clone())
            .collect())
    }

    async fn submitted_test_ids(&self, student_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .state()
            .reservations
            .keys()
            .filter(|(_, reserved_student)| reserved_student == student_id)
            .map(|(test_id, _)| test_id.clone())
            .collect())
    }

    async fn uncommitted_reservations(
        &self,
        reserved_before: PrimitiveDateTime,
        limit: u32,
    ) -> Result<Vec<Reservation>, StoreError> {
        let mut pending: Vec<Reservation> = self
            .state()
            .reservations
            .values()
            .filter(|r| r.committed_at.is_none() && r.reserved_at < reserved_before)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.reserved_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn commit_attempt(&self, commit: &AttemptCommit) -> Result<CommitOutcome, StoreError> {
        let mut state = self.state();
        if let Some(fault) = state.commit_faults.pop_front() {
            return Err(fault);
        }

        let key = pair(&commit.result.test_id, &commit.result.student_id);
        let Some(reservation) = state.reservations.get(&key) else {
            return Err(StoreError::ReservationMissing { test_id: key.0, student_id: key.1 });
        };
        if reservation.committed_at.is_some() {
            return Ok(CommitOutcome::AlreadyCommitted);
        }

        let existing = state.results.get(&key).cloned();
        let (outcome, history, ended_at) = match existing {
            Some(existing) => (
                CommitOutcome::AlreadyCommitted,
                AttemptHistoryEntry::from(&existing),
                existing.attempted_at,
            ),
            None => {
                state.results.insert(key.clone(), commit.result.clone());
                (CommitOutcome::Committed, commit.history.clone(), commit.result.attempted_at)
            }
        };

        let started_at = state.statuses.get(&key).and_then(|status| status.started_at);
        state.history.entry(key.clone()).or_insert(history);
        state.statuses.insert(
            key.clone(),
            AttemptStatusRecord {
                student_id: key.1.clone(),
                test_id: key.0.clone(),
                status: AttemptStatus::Submitted,
                started_at,
                ended_at: Some(ended_at),
                updated_at: commit.committed_at,
            },
        );
        if let Some(reservation) = state.reservations.get_mut(&key) {
            reservation.committed_at = Some(commit.committed_at);
        }

        Ok(outcome)
    }

    async fn attempt_status(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<AttemptStatusRecord>, StoreError> {
        Ok(self.state().statuses.get(&pair(test_id, student_id)).cloned())
    }

    async fn mark_in_progress(
        &self,
        test_id: &str,
        student_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<AttemptStatusRecord, StoreError> {
        let mut state = self.state();
        let record = state.statuses.entry(pair(test_id, student_id)).or_insert_with(|| {
            AttemptStatusRecord {
                student_id: student_id.to_string(),
                test_id: test_id.to_string(),
                status: AttemptStatus::NotStarted,
                started_at: None,
                ended_at: None,
                updated_at: now,
            }
        });
        if !record.status.is_terminal() {
            record.status = AttemptStatus::InProgress;
            record.started_at.get_or_insert(now);
            record.updated_at = now;
        }
        Ok(record.clone())
    }

    async fn find_result(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> Result<Option<ResultRecord>, StoreError> {
        Ok(self.state().results.get(&pair(test_id, student_id)).cloned())
    }

    async fn results_for_test(&self, test_id: &str) -> Result<Vec<ResultRecord>, StoreError> {
        let mut results: Vec<ResultRecord> = self
            .state()
            .results
            .values()
            .filter(|result| result.test_id == test_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            (a.attempted_at, &a.student_id).cmp(&(b.attempted_at, &b.student_id))
        });
        Ok(results)
    }

    async fn history_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<AttemptHistoryEntry>, StoreError> {
        let mut entries: Vec<AttemptHistoryEntry> = self
            .state()
            .history
            .values()
            .filter(|entry| entry.student_id == student_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.attempted_at.cmp(&a.attempted_at));
        Ok(entries)
    }

    async fn set_feedback(
        &self,
        test_id: &str,
        student_id: &str,
        feedback: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state();
        match state.results.get_mut(&pair(test_id, student_id)) {
            Some(result) => {
                result.feedback = feedback.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn divergences(
        &self,
        settled_before: PrimitiveDateTime,
    ) -> Result<DivergenceCounts, StoreError> {
        let state = self.state();
        let count = |n: usize| n as i64;

        Ok(DivergenceCounts {
            reserved_without_result: count(
                state
                    .reservations
                    .iter()
                    .filter(|(key, r)| {
                        r.reserved_at < settled_before && !state.results.contains_key(*key)
                    })
                    .count(),
            ),
            result_without_reservation: count(
                state.results.keys().filter(|key| !state.reservations.contains_key(*key)).count(),
            ),
            result_without_history: count(
                state.results.keys().filter(|key| !state.history.contains_key(*key)).count(),
            ),
            history_without_result: count(
                state.history.keys().filter(|key| !state.results.contains_key(*key)).count(),
            ),
            result_without_submitted_status: count(
                state
                    .results
                    .keys()
                    .filter(|key| {
                        state.statuses.get(*key).map(|s| s.status) != Some(AttemptStatus::Submitted)
                    })
                    .count(),
            ),
        })
    }
}
