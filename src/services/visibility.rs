// src/services/visibility.rs

use chrono::{DateTime, Utc};

use crate::models::quiz::{Quiz, QuizListParams};

/// A quiz can be attempted while it is active and its deadline, if any,
/// has not passed. The deadline instant itself still counts as open.
pub fn is_attemptable(quiz: &Quiz, now: DateTime<Utc>) -> bool {
    quiz.is_active && quiz.available_until.is_none_or(|until| until >= now)
}

/// Quizzes to show in the public list, evaluated against `now`.
pub fn list_visible_quizzes(quizzes: Vec<Quiz>, now: DateTime<Utc>) -> Vec<Quiz> {
    quizzes
        .into_iter()
        .filter(|q| is_attemptable(q, now))
        .collect()
}

/// Narrows a list by the optional difficulty and search filters.
pub fn apply_list_filters(quizzes: Vec<Quiz>, params: &QuizListParams) -> Vec<Quiz> {
    let needle = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    quizzes
        .into_iter()
        .filter(|q| params.difficulty.is_none_or(|d| q.difficulty == d))
        .filter(|q| match &needle {
            None => true,
            Some(needle) => {
                q.title.to_lowercase().contains(needle)
                    || q
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(needle))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::Difficulty;
    use chrono::Duration;

    fn quiz(id: i64, is_active: bool, available_until: Option<DateTime<Utc>>) -> Quiz {
        Quiz {
            id,
            title: format!("Quiz {}", id),
            description: None,
            created_by: None,
            created_at: Utc::now(),
            duration_minutes: 10,
            difficulty: Difficulty::Medium,
            is_active,
            available_until,
        }
    }

    #[test]
    fn filters_inactive_and_expired() {
        let now = Utc::now();
        let quizzes = vec![
            quiz(1, true, None),
            quiz(2, true, Some(now + Duration::hours(1))),
            quiz(3, true, Some(now - Duration::seconds(1))),
            quiz(4, false, None),
            quiz(5, false, Some(now + Duration::hours(1))),
            quiz(6, true, Some(now)),
        ];

        let ids: Vec<i64> = list_visible_quizzes(quizzes, now)
            .iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 6]);
    }

    #[test]
    fn visibility_depends_on_now() {
        let now = Utc::now();
        let q = quiz(1, true, Some(now + Duration::minutes(5)));
        assert!(is_attemptable(&q, now));
        assert!(!is_attemptable(&q, now + Duration::minutes(6)));
    }

    #[test]
    fn search_and_difficulty() {
        let mut a = quiz(1, true, None);
        a.title = "World Geography".to_string();
        a.difficulty = Difficulty::Easy;
        let mut b = quiz(2, true, None);
        b.description = Some("Capitals of the WORLD".to_string());
        b.difficulty = Difficulty::Hard;
        let c = quiz(3, true, None);

        let params = QuizListParams {
            difficulty: None,
            search: Some(" world ".to_string()),
        };
        let ids: Vec<i64> = apply_list_filters(vec![a.clone(), b.clone(), c.clone()], &params)
            .iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);

        let params = QuizListParams {
            difficulty: Some(Difficulty::Hard),
            search: None,
        };
        let ids: Vec<i64> = apply_list_filters(vec![a, b, c], &params)
            .iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec![2]);
    }
}
