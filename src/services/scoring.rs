// src/services/scoring.rs

//! Scoring of a submission against a quiz snapshot.
//!
//! Pure: no storage, no clock. Stale or foreign option ids and questions
//! without a correct option are tolerated, never raised as errors.

use crate::models::{
    answer_option::AnswerOption,
    attempt::{QuestionResult, Submission},
    quiz::QuestionWithOptions,
};

/// Review of a single question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionReview {
    pub question_id: i64,
    pub question_text: String,
    /// The chosen option, when it resolved to one of this question's options.
    pub selected: Option<AnswerOption>,
    /// First option flagged correct, if any.
    pub correct: Option<AnswerOption>,
    /// Raw submitted value that could not be resolved.
    pub rejected_choice: Option<String>,
}

impl QuestionReview {
    pub fn is_correct(&self) -> bool {
        self.selected.as_ref().is_some_and(|o| o.is_correct)
    }
}

impl From<QuestionReview> for QuestionResult {
    fn from(review: QuestionReview) -> Self {
        QuestionResult {
            is_correct: review.is_correct(),
            question_id: review.question_id,
            question_text: review.question_text,
            selected_option: review.selected,
            correct_option: review.correct,
            rejected_choice: review.rejected_choice,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    /// Always within `0..=total_questions`.
    pub score: usize,
    pub total_questions: usize,
    /// One entry per question, in quiz order.
    pub details: Vec<QuestionReview>,
}

impl ScoreReport {
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.total_questions)
    }

    /// Submitted values that did not resolve, as (question id, raw value).
    pub fn rejected_choices(&self) -> impl Iterator<Item = (i64, &str)> {
        self.details
            .iter()
            .filter_map(|d| d.rejected_choice.as_deref().map(|c| (d.question_id, c)))
    }
}

/// `score / total * 100`, or 0 for an empty quiz.
pub fn percentage(score: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (score as f64 / total as f64) * 100.0
}

/// Scores `submission` against `questions`, which must already be in quiz order.
pub fn compute_score(questions: &[QuestionWithOptions], submission: &Submission) -> ScoreReport {
    let mut score = 0;
    let mut details = Vec::with_capacity(questions.len());

    for entry in questions {
        let question = &entry.question;
        let choice = submission.get(&question.id.to_string());

        let selected = choice.and_then(|raw| resolve_choice(entry, raw));
        let rejected_choice = match (choice, &selected) {
            (Some(raw), None) => Some(raw.clone()),
            _ => None,
        };

        if selected.as_ref().is_some_and(|o| o.is_correct) {
            score += 1;
        }

        let correct = entry.options.iter().find(|o| o.is_correct).cloned();

        details.push(QuestionReview {
            question_id: question.id,
            question_text: question.text.clone(),
            selected,
            correct,
            rejected_choice,
        });
    }

    ScoreReport {
        score,
        total_questions: questions.len(),
        details,
    }
}

/// Finds the option named by `raw` among this question's own options.
fn resolve_choice(entry: &QuestionWithOptions, raw: &str) -> Option<AnswerOption> {
    let option_id: i64 = raw.trim().parse().ok()?;
    entry.options.iter().find(|o| o.id == option_id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Question;

    fn option(id: i64, question_id: i64, is_correct: bool) -> AnswerOption {
        AnswerOption {
            id,
            question_id,
            text: format!("Option {}", id),
            is_correct,
            feedback: None,
        }
    }

    fn question(id: i64, options: Vec<AnswerOption>) -> QuestionWithOptions {
        QuestionWithOptions {
            question: Question {
                id,
                quiz_id: 1,
                text: format!("Question {}", id),
                order: 0,
            },
            options,
        }
    }

    /// Q1: 10 correct, 11 and 12 wrong. Q2: 20 correct, 21 wrong.
    fn geography() -> Vec<QuestionWithOptions> {
        vec![
            question(
                1,
                vec![option(10, 1, true), option(11, 1, false), option(12, 1, false)],
            ),
            question(2, vec![option(20, 2, true), option(21, 2, false)]),
        ]
    }

    fn submission(pairs: &[(&str, &str)]) -> Submission {
        pairs
            .iter()
            .map(|(q, o)| (q.to_string(), o.to_string()))
            .collect()
    }

    #[test]
    fn geography_half_right() {
        let report = compute_score(&geography(), &submission(&[("1", "10"), ("2", "21")]));

        assert_eq!(report.score, 1);
        assert_eq!(report.total_questions, 2);
        assert_eq!(report.percentage(), 50.0);

        assert!(report.details[0].is_correct());
        assert!(!report.details[1].is_correct());
        assert_eq!(report.details[1].selected.as_ref().map(|o| o.id), Some(21));
        assert_eq!(report.details[1].correct.as_ref().map(|o| o.id), Some(20));
    }

    #[test]
    fn all_correct_scores_full_marks() {
        let report = compute_score(&geography(), &submission(&[("1", "10"), ("2", "20")]));
        assert_eq!(report.score, 2);
        assert_eq!(report.percentage(), 100.0);
    }

    #[test]
    fn empty_submission_scores_zero() {
        let report = compute_score(&geography(), &Submission::new());

        assert_eq!(report.score, 0);
        assert_eq!(report.percentage(), 0.0);
        assert_eq!(report.details.len(), 2);
        assert!(report.details.iter().all(|d| d.selected.is_none()));
        assert!(report.details.iter().all(|d| d.rejected_choice.is_none()));
    }

    #[test]
    fn no_questions_means_zero_percent() {
        let report = compute_score(&[], &submission(&[("1", "10")]));
        assert_eq!(report.score, 0);
        assert_eq!(report.total_questions, 0);
        assert_eq!(report.percentage(), 0.0);
        assert!(report.details.is_empty());
    }

    #[test]
    fn foreign_option_counts_as_no_selection() {
        // 20 is correct, but for question 2, not question 1.
        let report = compute_score(&geography(), &submission(&[("1", "20"), ("2", "20")]));

        assert_eq!(report.score, 1);
        assert!(report.details[0].selected.is_none());
        assert_eq!(report.details[0].rejected_choice.as_deref(), Some("20"));

        let rejected: Vec<(i64, &str)> = report.rejected_choices().collect();
        assert_eq!(rejected, vec![(1, "20")]);
    }

    #[test]
    fn garbage_and_unknown_ids_are_tolerated() {
        let report = compute_score(
            &geography(),
            &submission(&[("1", "not-a-number"), ("2", "999"), ("77", "10")]),
        );

        assert_eq!(report.score, 0);
        assert_eq!(report.details.len(), 2);
        assert_eq!(report.rejected_choices().count(), 2);
    }

    #[test]
    fn question_without_correct_option() {
        let questions = vec![question(1, vec![option(10, 1, false), option(11, 1, false)])];
        let report = compute_score(&questions, &submission(&[("1", "10")]));

        assert_eq!(report.score, 0);
        assert!(report.details[0].correct.is_none());
        assert_eq!(report.details[0].selected.as_ref().map(|o| o.id), Some(10));
    }

    #[test]
    fn several_correct_options_pick_the_first() {
        let questions = vec![question(
            1,
            vec![option(10, 1, false), option(11, 1, true), option(12, 1, true)],
        )];

        let report = compute_score(&questions, &submission(&[("1", "12")]));
        assert_eq!(report.score, 1);
        assert_eq!(report.details[0].correct.as_ref().map(|o| o.id), Some(11));
    }

    #[test]
    fn details_follow_question_order() {
        let mut questions = geography();
        questions.reverse();
        let report = compute_score(&questions, &Submission::new());
        let ids: Vec<i64> = report.details.iter().map(|d| d.question_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn scoring_is_repeatable() {
        let answers = submission(&[("1", "11"), ("2", "20")]);
        let first = compute_score(&geography(), &answers);
        let second = compute_score(&geography(), &answers);
        assert_eq!(first, second);
    }
}
