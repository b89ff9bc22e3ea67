//! End-to-end properties of export and restore through the public API

use std::collections::BTreeSet;
use std::sync::Arc;

use encore::backup::{
    decode, BackupEngine, FileSink, MemorySink, Section, SectionRecords, Selection,
    StoreAdapter, StoreSet,
};
use encore::config::EncorePaths;
use encore::error::BackupError;
use encore::models::{
    Favorite, LyricsEntry, PreferenceValue, SearchHistoryEntry, TransitionMode, TransitionRule,
};
use encore::storage::Storage;
use serde_json::json;
use tempfile::TempDir;

fn create_env() -> (TempDir, Storage, BackupEngine) {
    let temp_dir = TempDir::new().unwrap();
    let paths = EncorePaths::with_base_dir(temp_dir.path().to_path_buf());
    let storage = Storage::new(paths).unwrap();
    let engine = BackupEngine::new(StoreSet::from_storage(&storage));
    (temp_dir, storage, engine)
}

fn populate(storage: &Storage) {
    storage
        .preferences
        .set("playback.crossfade", PreferenceValue::Boolean(true))
        .unwrap();
    storage
        .preferences
        .set("eq.preamp", PreferenceValue::Float(0.75))
        .unwrap();
    storage
        .preferences
        .set(
            "library.folders",
            PreferenceValue::StringSet(BTreeSet::from(["/music".to_string()])),
        )
        .unwrap();

    storage
        .favorites
        .add(Favorite::new("t1", "Blue in Green").with_artist("Miles Davis"))
        .unwrap();
    storage.favorites.add(Favorite::new("t2", "So What")).unwrap();

    storage
        .lyrics
        .cache(LyricsEntry::new("t1", "lrclib", "[00:01.00]hello"))
        .unwrap();

    storage.search_history.record("miles davis").unwrap();
    storage.search_history.record("coltrane").unwrap();

    storage
        .transitions
        .add_rule(TransitionRule::new(
            Some("t1".into()),
            None,
            TransitionMode::Crossfade,
            4_000,
        ))
        .unwrap();
}

/// Snapshot of every store's contents, serialized for comparison
fn state(storage: &Storage) -> serde_json::Value {
    json!({
        "preferences": storage.preferences.get_all().unwrap(),
        "favorites": storage.favorites.get_all().unwrap(),
        "lyrics": storage.lyrics.get_all().unwrap(),
        "searchHistory": storage.search_history.get_all().unwrap(),
        "transitions": storage.transitions.get_all().unwrap(),
    })
}

fn mutate(storage: &Storage) {
    storage.favorites.clear().unwrap();
    storage.favorites.add(Favorite::new("t9", "Other")).unwrap();
    storage
        .lyrics
        .cache(LyricsEntry::new("t9", "local", "words"))
        .unwrap();
    storage.search_history.record("something else").unwrap();
    storage
        .preferences
        .set("playback.crossfade", PreferenceValue::Boolean(false))
        .unwrap();
    storage.transitions.clear().unwrap();
}

#[test]
fn round_trip_restores_selected_and_leaves_the_rest() {
    let (_temp, storage, engine) = create_env();
    populate(&storage);
    let before = state(&storage);

    let sink = MemorySink::new();
    let selection = Selection::from_keys(["favorites", "preferences", "transitions"]);
    engine.export(&selection, &sink).unwrap();

    mutate(&storage);
    let mutated = state(&storage);

    let report = engine.restore(&selection, &sink).unwrap();
    assert_eq!(
        report.restored_sections(),
        vec![Section::Preferences, Section::Favorites, Section::Transitions]
    );
    assert!(report.all_restored());

    let after = state(&storage);
    for key in ["preferences", "favorites", "transitions"] {
        assert_eq!(after[key], before[key], "{} not restored", key);
    }
    for key in ["lyrics", "searchHistory"] {
        assert_eq!(after[key], mutated[key], "{} should be untouched", key);
    }
}

#[test]
fn full_round_trip_through_a_file() {
    let (temp, storage, engine) = create_env();
    populate(&storage);
    let before = state(&storage);

    let sink = FileSink::new(temp.path().join("out").join("snapshot.json"));
    engine.export(&Selection::all(), &sink).unwrap();
    mutate(&storage);

    engine.restore(&Selection::all(), &sink).unwrap();
    assert_eq!(state(&storage), before);

    // The restored files load back into fresh stores
    let reopened = Storage::new(storage.paths().clone()).unwrap();
    reopened.load_all().unwrap();
    assert_eq!(state(&reopened), before);
}

#[test]
fn empty_selection_exports_nothing_and_restores_nothing() {
    let (_temp, storage, engine) = create_env();
    populate(&storage);
    let before = state(&storage);

    let sink = MemorySink::new();
    let report = engine.export(&Selection::none(), &sink).unwrap();
    assert!(report.sections.is_empty());

    let decoded = decode(&sink.contents()).unwrap();
    assert!(decoded.snapshot.present_sections().is_empty());

    let restored = engine.restore(&Selection::all(), &sink).unwrap();
    assert!(restored.restored.is_empty());
    assert_eq!(restored.skipped.len(), 5);
    assert_eq!(state(&storage), before);
}

#[test]
fn absent_section_is_kept_and_empty_section_is_wiped() {
    let (_temp, storage, engine) = create_env();
    populate(&storage);

    let sink = MemorySink::with_bytes(
        r#"{"formatVersion": 1, "exportedAtEpochMillis": 1700000000000, "searchHistory": []}"#,
    );
    let selection = Selection::from_keys(["favorites", "searchHistory"]);
    let report = engine.restore(&selection, &sink).unwrap();

    assert_eq!(storage.favorites.count().unwrap(), 2);
    assert_eq!(storage.search_history.count().unwrap(), 0);
    assert_eq!(report.skipped, vec![Section::Favorites]);
}

#[test]
fn scenario_export_favorites_and_lyrics() {
    let (_temp, storage, engine) = create_env();
    for i in 0..3 {
        storage
            .favorites
            .add(Favorite::new(format!("t{}", i), format!("Track {}", i)))
            .unwrap();
    }
    storage.search_history.record("not exported").unwrap();

    let sink = MemorySink::new();
    engine
        .export(&Selection::from_keys(["favorites", "lyrics"]), &sink)
        .unwrap();

    let snapshot = decode(&sink.contents()).unwrap().snapshot;
    assert_eq!(snapshot.get(Section::Favorites).map(|r| r.len()), Some(3));
    assert_eq!(
        snapshot.get(Section::Lyrics),
        Some(&SectionRecords::Lyrics(Vec::new()))
    );
    for absent in [
        Section::SearchHistory,
        Section::Preferences,
        Section::Transitions,
    ] {
        assert!(!snapshot.contains(absent), "{} should be absent", absent);
    }
}

#[test]
fn newer_format_version_is_refused_without_touching_stores() {
    let (_temp, storage, engine) = create_env();
    populate(&storage);
    let before = state(&storage);

    let sink = MemorySink::with_bytes(
        r#"{"formatVersion": 2, "exportedAtEpochMillis": 1, "favorites": []}"#,
    );
    let err = engine.restore(&Selection::all(), &sink).unwrap_err();
    assert!(matches!(
        err,
        BackupError::UnsupportedFormat {
            found: 2,
            supported: 1
        }
    ));
    assert_eq!(state(&storage), before);
}

#[test]
fn malformed_lyrics_do_not_block_favorites() {
    let (_temp, storage, engine) = create_env();
    storage.lyrics.cache(LyricsEntry::new("old", "p", "x")).unwrap();

    let sink = MemorySink::with_bytes(
        json!({
            "formatVersion": 1,
            "exportedAtEpochMillis": 1,
            "favorites": [
                {"mediaId": "t1", "title": "One", "addedAt": "2024-05-01T10:00:00Z"}
            ],
            "lyrics": [{"mediaId": 42}]
        })
        .to_string(),
    );

    let err = engine
        .restore(&Selection::from_keys(["favorites", "lyrics"]), &sink)
        .unwrap_err();

    match err {
        BackupError::PartialRestoreFailure { restored, failed } => {
            assert_eq!(restored, vec![Section::Favorites]);
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].section, Section::Lyrics);
            assert!(matches!(
                failed[0].error,
                BackupError::SectionDecodeFailure {
                    section: Section::Lyrics,
                    ..
                }
            ));
        }
        other => panic!("expected partial failure, got {other}"),
    }

    assert!(storage.favorites.is_favorite("t1").unwrap());
    assert!(storage.lyrics.lyrics_for("old").unwrap().is_some());
}

#[test]
fn malformed_unselected_section_is_ignored() {
    let (_temp, storage, engine) = create_env();

    let sink = MemorySink::with_bytes(
        r#"{"formatVersion": 1, "favorites": [], "lyrics": "nope"}"#,
    );
    let report = engine
        .restore(&Selection::from_keys(["favorites"]), &sink)
        .unwrap();
    assert_eq!(report.restored, vec![(Section::Favorites, 0)]);
    assert_eq!(storage.favorites.count().unwrap(), 0);
}

#[test]
fn restore_is_idempotent() {
    let (_temp, storage, engine) = create_env();
    populate(&storage);

    let sink = MemorySink::new();
    engine.export(&Selection::all(), &sink).unwrap();
    mutate(&storage);

    engine.restore(&Selection::all(), &sink).unwrap();
    let once = state(&storage);
    engine.restore(&Selection::all(), &sink).unwrap();
    assert_eq!(state(&storage), once);
}

#[test]
fn search_history_duplicates_collapse_on_restore() {
    let (_temp, storage, engine) = create_env();

    let sink = MemorySink::with_bytes(
        json!({
            "formatVersion": 1,
            "searchHistory": [
                {"query": "Coltrane", "searchedAt": "2024-01-01T00:00:00Z"},
                {"query": "coltrane ", "searchedAt": "2024-02-01T00:00:00Z"}
            ]
        })
        .to_string(),
    );
    engine
        .restore(&Selection::from_keys(["searchHistory"]), &sink)
        .unwrap();

    let entries: Vec<SearchHistoryEntry> = storage.search_history.get_all().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].normalized_query(), "coltrane");
    // Last duplicate wins
    assert_eq!(entries[0].query, "coltrane ");
}

/// A store whose every operation fails
struct BrokenStore(Section);

impl StoreAdapter for BrokenStore {
    fn section(&self) -> Section {
        self.0
    }

    fn export(&self) -> Result<SectionRecords, BackupError> {
        Err(BackupError::store(self.0, "device unplugged"))
    }

    fn replace(&self, _records: SectionRecords) -> Result<(), BackupError> {
        Err(BackupError::store(self.0, "device unplugged"))
    }
}

#[test]
fn failing_store_is_reported_and_others_still_restore() {
    let (_temp, storage, engine) = create_env();
    populate(&storage);
    let sink = MemorySink::new();
    engine.export(&Selection::all(), &sink).unwrap();
    mutate(&storage);

    let mut stores = StoreSet::from_storage(&storage);
    stores.register(Arc::new(BrokenStore(Section::Lyrics)));
    let engine = BackupEngine::new(stores);

    let err = engine.restore(&Selection::all(), &sink).unwrap_err();
    assert_eq!(err.failed_sections(), vec![Section::Lyrics]);
    match &err {
        BackupError::PartialRestoreFailure { restored, failed } => {
            assert_eq!(restored.len(), 4);
            assert!(matches!(failed[0].error, BackupError::StoreFailure { .. }));
        }
        other => panic!("expected partial failure, got {other}"),
    }
    assert!(storage.favorites.is_favorite("t1").unwrap());
}

#[test]
fn failing_export_writes_nothing() {
    let (_temp, storage, _engine) = create_env();
    populate(&storage);

    let stores = StoreSet::from_storage(&storage).with(BrokenStore(Section::Transitions));
    let engine = BackupEngine::new(stores);

    let sink = MemorySink::with_bytes("previous artifact");
    let err = engine.export(&Selection::all(), &sink).unwrap_err();
    assert!(matches!(
        err,
        BackupError::StoreFailure {
            section: Section::Transitions,
            ..
        }
    ));
    assert_eq!(sink.contents(), b"previous artifact");
}

#[test]
fn missing_source_is_sink_unavailable() {
    let (temp, _storage, engine) = create_env();
    let sink = FileSink::new(temp.path().join("nowhere.json"));

    let err = engine.restore(&Selection::all(), &sink).unwrap_err();
    assert!(matches!(err, BackupError::SinkUnavailable(_)));
}

#[test]
fn sections_without_an_adapter_are_skipped() {
    let (_temp, storage, _engine) = create_env();
    populate(&storage);
    let engine = BackupEngine::new(StoreSet::new());

    let sink = MemorySink::new();
    let report = engine.export(&Selection::all(), &sink).unwrap();
    assert!(report.sections.is_empty());
    assert_eq!(storage.favorites.count().unwrap(), 2);
}

#[test]
fn concurrent_exports_to_different_sinks() {
    let (_temp, storage, engine) = create_env();
    populate(&storage);

    let sinks: Vec<MemorySink> = (0..4).map(|_| MemorySink::new()).collect();
    std::thread::scope(|scope| {
        for sink in &sinks {
            let engine = &engine;
            scope.spawn(move || engine.export(&Selection::all(), sink).unwrap());
        }
    });

    let favorites: Vec<_> = sinks
        .iter()
        .map(|sink| {
            decode(&sink.contents())
                .unwrap()
                .snapshot
                .get(Section::Favorites)
                .cloned()
        })
        .collect();
    assert!(favorites.iter().all(|f| f == &favorites[0]));
    assert_eq!(favorites[0].as_ref().map(|r| r.len()), Some(2));
}
