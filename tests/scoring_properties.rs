use assert_matches::assert_matches;
use typex::leaderboard::aggregate;
use typex::scoring::{accuracy, score, words_per_minute};
use typex::stats::TestResult;
use typex::ScoringError;

const SAMPLES: &[(&str, &str)] = &[
    ("the cat sat", "the cat sat"),
    ("the cat sat", "teh cat sat on the mat"),
    ("hello world", "hola world"),
    ("hello world", ""),
    ("a", "bbbbbbbbbbbbbbbbbbbbbbbb"),
    ("Grüße aus Köln", "Grusse aus Koln"),
    ("  padded   text ", "padded text"),
];

const DURATIONS: &[f64] = &[0.001, 0.5, 1.0, 6.0, 59.9, 3600.0];

#[test]
fn accuracy_and_wpm_stay_in_bounds() {
    for &(reference, typed) in SAMPLES {
        for &secs in DURATIONS {
            let s = score(reference, typed, secs).unwrap();
            assert!(
                (0.0..=100.0).contains(&s.accuracy()),
                "{reference:?}/{typed:?}"
            );
            assert!(s.wpm() >= 0.0);
        }
    }
}

#[test]
fn exact_copy_is_perfectly_accurate() {
    for &(reference, _) in SAMPLES {
        for &secs in DURATIONS {
            assert_eq!(score(reference, reference, secs).unwrap().accuracy(), 100.0);
        }
        assert_eq!(accuracy(reference, reference).unwrap(), 100.0);
    }
}

#[test]
fn doubling_time_halves_wpm() {
    for &(reference, typed) in SAMPLES {
        for &secs in DURATIONS {
            let once = words_per_minute(reference, typed, secs).unwrap();
            let twice = words_per_minute(reference, typed, secs * 2.0).unwrap();
            assert!((once - twice * 2.0).abs() < 1e-9 * once.max(1.0));
        }
    }
}

#[test]
fn non_positive_duration_always_fails() {
    for &(reference, typed) in SAMPLES.iter().chain([("", "")].iter()) {
        for secs in [0.0, -0.0, -1.0, -1e9] {
            assert_matches!(
                score(reference, typed, secs),
                Err(ScoringError::InvalidDuration(_))
            );
        }
    }
}

#[test]
fn pinned_examples() {
    let s = score("the cat sat", "the cat sat", 6.0).unwrap();
    assert_eq!((s.wpm(), s.accuracy()), (30.0, 100.0));

    let s = score("hello world", "hola world", 10.0).unwrap();
    assert!((s.accuracy() - 200.0 / 11.0).abs() < 1e-9);
    assert!((s.wpm() - 6.0).abs() < 1e-9);
}

#[test]
fn leaderboard_example() {
    let now = chrono::Local::now();
    let row = |id, user_id, wpm, accuracy| TestResult {
        id,
        user_id,
        wpm,
        accuracy,
        taken_at: now,
    };
    let rows = [
        row(1, 1, 50.0, 90.0),
        row(2, 1, 70.0, 80.0),
        row(3, 2, 60.0, 95.0),
    ];

    let board = aggregate(&rows);
    let summary: Vec<(i64, f64, f64)> = board
        .iter()
        .map(|e| (e.user_id, e.max_wpm, e.max_accuracy))
        .collect();
    assert_eq!(summary, vec![(1, 70.0, 90.0), (2, 60.0, 95.0)]);
}
