// History store tests: best-effort JSON persistence keyed by user and
// part.

use anyhow::Result;
use speakroom::{Feedback, HistoryStore, Part};
use tempfile::TempDir;

fn feedback(overall: f64) -> Feedback {
    serde_json::from_value(serde_json::json!({
        "overall_score": overall,
        "transcript": "some answer",
        "details": {
            "fluency": {"score": 6.0},
            "pronunciation": {"score": 6.0},
            "grammar": {"score": 6.0},
            "vocabulary": {"score": 6.0}
        },
        "general_suggestions": ["More linking words."]
    }))
    .unwrap()
}

#[test]
fn records_round_trip_per_user() -> Result<()> {
    let dir = TempDir::new()?;
    let store = HistoryStore::new(dir.path());

    store.save("user-1", Part::Two, 201, &feedback(6.5))?;
    store.save("user-1", Part::One, 101, &feedback(5.5))?;
    store.save("user-2", Part::Three, 301, &feedback(7.0))?;

    let records = store.load_all("user-1")?;
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.user_id, "user-1");
        assert_eq!(record.general_suggestions, vec!["More linking words."]);
    }

    let other = store.load_all("user-2")?;
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].part, Part::Three);
    assert_eq!(other[0].part_ref, 301);
    assert!((other[0].overall_score - 7.0).abs() < f64::EPSILON);

    Ok(())
}

#[test]
fn unknown_user_has_empty_history() -> Result<()> {
    let dir = TempDir::new()?;
    let store = HistoryStore::new(dir.path());
    assert!(store.load_all("nobody")?.is_empty());
    Ok(())
}

#[test]
fn unreadable_files_are_skipped() -> Result<()> {
    let dir = TempDir::new()?;
    let store = HistoryStore::new(dir.path());

    store.save("user-1", Part::One, 101, &feedback(6.0))?;
    std::fs::write(dir.path().join("user-1").join("broken.json"), "not json")?;

    let records = store.load_all("user-1")?;
    assert_eq!(records.len(), 1);

    Ok(())
}
