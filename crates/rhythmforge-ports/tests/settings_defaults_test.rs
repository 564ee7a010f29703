use rhythmforge_ports::{AcquisitionError, ChartRecord, SettingsDto, ToleranceConfig};

#[test]
fn partial_settings_fill_in_defaults() {
    let json = r#"{ "judgment_tolerances": { "perfect": 0.05, "great": 0.1, "good": 0.15 } }"#;
    let settings: SettingsDto = serde_json::from_str(json).expect("settings should parse");

    assert_eq!(settings.judgment_tolerances, ToleranceConfig::authoring());
    assert_eq!(settings.default_method, "balanced_beat");
    assert_eq!(settings.generation.start_delay, 0.5);
    assert_eq!(settings.generation.low_density_threshold, 20);
}

#[test]
fn empty_settings_use_live_tolerances() {
    let settings: SettingsDto = serde_json::from_str("{}").expect("settings should parse");
    assert_eq!(settings.judgment_tolerances, ToleranceConfig::live());
}

#[test]
fn tolerance_validation_requires_ascending_thresholds() {
    assert!(ToleranceConfig::live().is_valid());
    assert!(ToleranceConfig::authoring().is_valid());

    let inverted = ToleranceConfig {
        perfect: 0.2,
        great: 0.1,
        good: 0.3,
    };
    assert!(!inverted.is_valid());

    let zero = ToleranceConfig {
        perfect: 0.0,
        great: 0.1,
        good: 0.2,
    };
    assert!(!zero.is_valid());
}

#[test]
fn legacy_chart_record_without_optional_fields_parses() {
    let json = r#"{
        "song_title": "Old",
        "audio_file": "old.wav",
        "notes": [{ "time": 1.25, "lane": 2 }],
        "lanes": 4
    }"#;
    let record: ChartRecord = serde_json::from_str(json).expect("record should parse");

    assert_eq!(record.created_method, "balanced_beat");
    assert_eq!(record.bpm, 0.0);
    assert_eq!(record.notes.len(), 1);
}

#[test]
fn chart_record_requires_notes() {
    let json = r#"{ "song_title": "x", "audio_file": "x.wav", "lanes": 4 }"#;
    assert!(serde_json::from_str::<ChartRecord>(json).is_err());
}

#[test]
fn acquisition_error_codes_are_stable() {
    assert_eq!(AcquisitionError::Forbidden("403".into()).code(), "forbidden");
    assert_eq!(AcquisitionError::Timeout("slow".into()).code(), "timeout");
    assert_eq!(AcquisitionError::Generic("?".into()).code(), "generic");
}
