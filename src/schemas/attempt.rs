use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::time::format_primitive;
use crate::db::models::{AttemptHistoryEntry, AttemptStatusRecord, ExamTest};
use crate::db::types::AttemptStatus;
use crate::services::attempts::{AssignedTest, AttemptOverview};
use crate::services::schedule_window::TestStatus;

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub(crate) answers: Vec<Value>,
}

impl SubmitRequest {
    /// One entry per question position; anything that is not an integer counts as unanswered.
    pub(crate) fn normalized_answers(&self) -> Vec<Option<i64>> {
        self.answers.iter().map(Value::as_i64).collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) result_id: String,
    pub(crate) test_id: String,
    pub(crate) score: i32,
    pub(crate) out_of_marks: i32,
    pub(crate) attempted_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) prompt: String,
    pub(crate) options: Vec<String>,
    pub(crate) weight: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct TestSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) scheduled_at: Option<String>,
    pub(crate) closes_at: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) question_count: usize,
    pub(crate) out_of_marks: i32,
}

impl From<&ExamTest> for TestSummary {
    fn from(test: &ExamTest) -> Self {
        Self {
            id: test.id.clone(),
            title: test.title.clone(),
            scheduled_at: test.scheduled_at.map(format_primitive),
            closes_at: test.closes_at().map(format_primitive),
            duration_minutes: test.duration_minutes,
            question_count: test.questions().len(),
            out_of_marks: test.out_of_marks,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptProgress {
    pub(crate) state: AttemptStatus,
    pub(crate) started_at: Option<String>,
    pub(crate) ended_at: Option<String>,
}

impl From<AttemptStatusRecord> for AttemptProgress {
    fn from(record: AttemptStatusRecord) -> Self {
        Self {
            state: record.status,
            started_at: record.started_at.map(format_primitive),
            ended_at: record.ended_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptStatusResponse {
    pub(crate) status: TestStatus,
    pub(crate) test: TestSummary,
    pub(crate) progress: AttemptProgress,
    /// Present only while the test can be attempted.
    pub(crate) questions: Option<Vec<QuestionView>>,
}

impl From<AttemptOverview> for AttemptStatusResponse {
    fn from(overview: AttemptOverview) -> Self {
        let attemptable = overview.status == TestStatus::Ongoing
            || (overview.status == TestStatus::Upcoming && overview.test.scheduled_at.is_none());
        let questions = attemptable.then(|| {
            overview
                .test
                .questions()
                .iter()
                .map(|question| QuestionView {
                    prompt: question.prompt.clone(),
                    options: question.options.clone(),
                    weight: question.effective_weight(),
                })
                .collect()
        });
        let progress = overview.progress.map(AttemptProgress::from).unwrap_or(AttemptProgress {
            state: AttemptStatus::NotStarted,
            started_at: None,
            ended_at: None,
        });

        Self { status: overview.status, test: TestSummary::from(&overview.test), progress, questions }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignedTestResponse {
    pub(crate) status: TestStatus,
    pub(crate) test: TestSummary,
}

impl From<AssignedTest> for AssignedTestResponse {
    fn from(entry: AssignedTest) -> Self {
        Self { status: entry.status, test: TestSummary::from(&entry.test) }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryEntryResponse {
    pub(crate) test_id: String,
    pub(crate) score: i32,
    pub(crate) out_of_marks: i32,
    pub(crate) attempted_at: String,
}

impl From<AttemptHistoryEntry> for HistoryEntryResponse {
    fn from(entry: AttemptHistoryEntry) -> Self {
        Self {
            test_id: entry.test_id,
            score: entry.score,
            out_of_marks: entry.out_of_marks,
            attempted_at: format_primitive(entry.attempted_at),
        }
    }
}
