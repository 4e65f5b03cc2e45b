use crate::stats::TestResult;
use itertools::Itertools;
use serde::Serialize;

/// Best performance of one user. The two maxima are taken independently and
/// may come from different tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub max_wpm: f64,
    pub max_accuracy: f64,
    pub tests: usize,
}

/// One entry per user, best wpm first, ties by ascending user id.
pub fn aggregate(results: &[TestResult]) -> Vec<LeaderboardEntry> {
    results
        .iter()
        .into_group_map_by(|r| r.user_id)
        .into_iter()
        .map(|(user_id, rows)| LeaderboardEntry {
            user_id,
            max_wpm: rows.iter().map(|r| r.wpm).fold(f64::NEG_INFINITY, f64::max),
            max_accuracy: rows
                .iter()
                .map(|r| r.accuracy)
                .fold(f64::NEG_INFINITY, f64::max),
            tests: rows.len(),
        })
        .sorted_by(|a, b| {
            b.max_wpm
                .total_cmp(&a.max_wpm)
                .then(a.user_id.cmp(&b.user_id))
        })
        .collect()
}

/// Top individual tests by wpm; a user may appear more than once.
pub fn top_results(results: &[TestResult], limit: usize) -> Vec<TestResult> {
    results
        .iter()
        .sorted_by(|a, b| {
            b.wpm
                .total_cmp(&a.wpm)
                .then(a.user_id.cmp(&b.user_id))
                .then(a.taken_at.cmp(&b.taken_at))
                .then(a.id.cmp(&b.id))
        })
        .take(limit)
        .cloned()
        .collect()
}

/// 1-based position of `user_id` in an aggregated leaderboard
pub fn rank_of(entries: &[LeaderboardEntry], user_id: i64) -> Option<usize> {
    entries
        .iter()
        .position(|e| e.user_id == user_id)
        .map(|idx| idx + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};

    fn result(id: i64, user_id: i64, wpm: f64, accuracy: f64) -> TestResult {
        TestResult {
            id,
            user_id,
            wpm,
            accuracy,
            taken_at: Local::now() + Duration::seconds(id),
        }
    }

    #[test]
    fn test_aggregate_takes_independent_maxima() {
        let rows = vec![
            result(1, 1, 50.0, 90.0),
            result(2, 1, 70.0, 80.0),
            result(3, 2, 60.0, 95.0),
        ];

        let board = aggregate(&rows);

        assert_eq!(
            board,
            vec![
                LeaderboardEntry {
                    user_id: 1,
                    max_wpm: 70.0,
                    max_accuracy: 90.0,
                    tests: 2,
                },
                LeaderboardEntry {
                    user_id: 2,
                    max_wpm: 60.0,
                    max_accuracy: 95.0,
                    tests: 1,
                },
            ]
        );
    }

    #[test]
    fn test_aggregate_ties_break_on_user_id() {
        let rows = vec![
            result(1, 9, 40.0, 99.0),
            result(2, 3, 40.0, 50.0),
            result(3, 5, 40.0, 75.0),
        ];

        let order: Vec<i64> = aggregate(&rows).iter().map(|e| e.user_id).collect();
        assert_eq!(order, vec![3, 5, 9]);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let mut rows = vec![
            result(1, 1, 10.0, 10.0),
            result(2, 2, 20.0, 20.0),
            result(3, 1, 30.0, 5.0),
        ];
        let forward = aggregate(&rows);
        rows.reverse();
        assert_eq!(forward, aggregate(&rows));
    }

    #[test]
    fn test_top_results_allows_duplicate_users() {
        let rows = vec![
            result(1, 1, 50.0, 90.0),
            result(2, 1, 70.0, 80.0),
            result(3, 2, 60.0, 95.0),
        ];

        let top = top_results(&rows, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, 2);
        assert_eq!(top[1].id, 3);

        let all = top_results(&rows, 10);
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3, 1]);
    }

    #[test]
    fn test_rank_of() {
        let rows = vec![result(1, 7, 30.0, 90.0), result(2, 8, 45.0, 90.0)];
        let board = aggregate(&rows);

        assert_eq!(rank_of(&board, 8), Some(1));
        assert_eq!(rank_of(&board, 7), Some(2));
        assert_eq!(rank_of(&board, 1), None);
    }
}
