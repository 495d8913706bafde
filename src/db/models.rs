use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::AttemptStatus;
use crate::services::schedule_window;

pub(crate) const DEFAULT_QUESTION_WEIGHT: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) prompt: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_option: i32,
    #[serde(default = "default_weight")]
    pub(crate) weight: i32,
}

pub(crate) fn default_weight() -> i32 {
    DEFAULT_QUESTION_WEIGHT
}

impl Question {
    /// Weight actually awarded; unweighted or nonsensical weights count as one mark.
    pub(crate) fn effective_weight(&self) -> i32 {
        if self.weight > 0 {
            self.weight
        } else {
            DEFAULT_QUESTION_WEIGHT
        }
    }
}

/// A scheduled, teacher-owned test. The assigned and submitted sets live in their own tables.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamTest {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) title: String,
    pub(crate) scheduled_at: Option<PrimitiveDateTime>,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: Json<Vec<Question>>,
    pub(crate) out_of_marks: i32,
    pub(crate) organization: Option<String>,
    pub(crate) class_name: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

impl ExamTest {
    pub(crate) fn questions(&self) -> &[Question] {
        &self.questions.0
    }

    /// End of the attempt window, exclusive.
    pub(crate) fn closes_at(&self) -> Option<PrimitiveDateTime> {
        self.scheduled_at.map(|start| schedule_window::closes_at(start, self.duration_minutes))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) account_id: String,
    pub(crate) full_name: String,
    pub(crate) organization: Option<String>,
    pub(crate) class_name: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Row of the submitted set. Holds the raw answers until the result is committed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Reservation {
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) answers: Json<Vec<Option<i64>>>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) reserved_at: PrimitiveDateTime,
    pub(crate) committed_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AnswerRecord {
    pub(crate) question_index: i32,
    pub(crate) submitted_option: Option<i64>,
    pub(crate) correct_option: i32,
    pub(crate) is_correct: bool,
    pub(crate) awarded: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ResultRecord {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) teacher_id: String,
    pub(crate) score: i32,
    pub(crate) out_of_marks: i32,
    pub(crate) answers: Json<Vec<AnswerRecord>>,
    pub(crate) attempted_at: PrimitiveDateTime,
    pub(crate) duration_taken_seconds: Option<i64>,
    pub(crate) feedback: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub(crate) struct AttemptHistoryEntry {
    pub(crate) student_id: String,
    pub(crate) test_id: String,
    pub(crate) score: i32,
    pub(crate) out_of_marks: i32,
    pub(crate) attempted_at: PrimitiveDateTime,
}

impl From<&ResultRecord> for AttemptHistoryEntry {
    fn from(result: &ResultRecord) -> Self {
        Self {
            student_id: result.student_id.clone(),
            test_id: result.test_id.clone(),
            score: result.score,
            out_of_marks: result.out_of_marks,
            attempted_at: result.attempted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AttemptStatusRecord {
    pub(crate) student_id: String,
    pub(crate) test_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) ended_at: Option<PrimitiveDateTime>,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Pairs on which the submitted set, results, history and statuses disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub(crate) struct DivergenceCounts {
    pub(crate) reserved_without_result: i64,
    pub(crate) result_without_reservation: i64,
    pub(crate) result_without_history: i64,
    pub(crate) history_without_result: i64,
    pub(crate) result_without_submitted_status: i64,
}

impl DivergenceCounts {
    pub(crate) fn total(&self) -> i64 {
        self.reserved_without_result
            + self.result_without_reservation
            + self.result_without_history
            + self.history_without_result
            + self.result_without_submitted_status
    }
}
