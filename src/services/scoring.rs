use crate::db::models::{AnswerRecord, Question};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoreSheet {
    pub(crate) score: i32,
    pub(crate) out_of_marks: i32,
    pub(crate) records: Vec<AnswerRecord>,
}

pub(crate) fn out_of_marks(questions: &[Question]) -> i32 {
    questions.iter().map(Question::effective_weight).sum()
}

/// Marks each question against its key. Missing, negative or out-of-range answers score zero;
/// answers past the last question are ignored.
pub(crate) fn score(questions: &[Question], answers: &[Option<i64>]) -> ScoreSheet {
    let records: Vec<AnswerRecord> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let submitted_option = answers.get(index).copied().flatten();
            let in_range = submitted_option
                .is_some_and(|option| option >= 0 && (option as usize) < question.options.len());
            let is_correct = in_range && submitted_option == Some(i64::from(question.correct_option));

            AnswerRecord {
                question_index: index as i32,
                submitted_option,
                correct_option: question.correct_option,
                is_correct,
                awarded: if is_correct { question.effective_weight() } else { 0 },
            }
        })
        .collect();

    let out_of_marks = out_of_marks(questions);
    let score = records.iter().map(|record| record.awarded).sum::<i32>().clamp(0, out_of_marks);

    ScoreSheet { score, out_of_marks, records }
}
