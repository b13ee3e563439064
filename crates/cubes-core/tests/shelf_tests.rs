// Shelf anchor map: built-in layout, JSON overrides and validation.

use cubes_core::constants::{SHELF_Y, SHELF_Z};
use cubes_core::error::CubesError;
use cubes_core::music::{lookup, Key, Palette, VoiceLeadingMode};
use cubes_core::shelf::ShelfMap;
use cubes_core::stage::StageConfig;

#[test]
fn builtin_covers_the_shelf_symbols() {
    let map = ShelfMap::builtin();
    assert_eq!(map.len(), 28);
    for symbol in map.symbols() {
        assert!(lookup(symbol).is_ok());
        let a = map.get(symbol).unwrap();
        assert_eq!(a.position.z, SHELF_Z);
        assert!(a.scale > 0.0);
    }
    // resolvable but not on the shelf
    assert!(lookup("i7").is_ok());
    assert!(map.get("i7").is_none());
}

#[test]
fn primary_chords_are_largest() {
    let map = ShelfMap::builtin();
    let scale = |s: &str| map.get(s).unwrap().scale;
    assert_eq!(scale("I"), 1.2);
    assert_eq!(scale("IV"), 1.2);
    assert!(scale("vi") < scale("V"));
    assert!(scale("#iº") < scale("vi"));
    assert!((map.get("I").unwrap().position.y - (SHELF_Y + 0.8)).abs() < 1e-6);
}

#[test]
fn json_overrides_merge_over_builtin() {
    let json = r#"{
        "positions": { "I": { "x": 1.0, "y": 2.0, "z": -5.0 } },
        "scales": { "V": 0.9 }
    }"#;
    let map = ShelfMap::from_json(json).unwrap();
    let i = map.get("I").unwrap();
    assert_eq!((i.position.x, i.position.y, i.position.z), (1.0, 2.0, -5.0));
    assert_eq!(map.get("V").unwrap().scale, 0.9);
    // untouched entries keep their defaults
    assert_eq!(map.get("IV"), ShelfMap::builtin().get("IV"));
    assert_eq!(map.len(), 28);
}

#[test]
fn invalid_entries_are_dropped() {
    let mut map = ShelfMap::builtin();
    let json = r#"{
        "positions": { "Q7": { "x": 0.0, "y": 0.0, "z": 0.0 }, "i7": { "x": 0.0, "y": 0.0, "z": 0.0 } },
        "scales": { "ii": -1.0, "iii": 0.0, "vi": 0.4 }
    }"#;
    assert_eq!(map.merge_json(json).unwrap(), 1);
    assert_eq!(map.get("vi").unwrap().scale, 0.4);
    assert_eq!(map.get("ii"), ShelfMap::builtin().get("ii"));
    assert!(map.get("i7").is_none());
}

#[test]
fn typographic_keys_are_accepted() {
    let map = ShelfMap::from_json(r#"{ "scales": { "vii°7": 0.8 } }"#).unwrap();
    assert_eq!(map.get("viiº7").unwrap().scale, 0.8);
}

#[test]
fn malformed_json_is_an_error() {
    let err = ShelfMap::from_json("{ positions: ").unwrap_err();
    assert!(matches!(err, CubesError::ShelfMap(_)));
}

#[test]
fn to_json_round_trips_every_anchor() {
    let map = ShelfMap::builtin();
    let back = ShelfMap::from_json(&map.to_json().unwrap()).unwrap();
    for symbol in map.symbols() {
        assert_eq!(back.get(symbol), map.get(symbol), "{symbol}");
    }
}

#[test]
fn stage_config_fills_missing_fields() {
    let cfg = StageConfig::from_json(
        r#"{ "palette": "minor", "playback": { "key": "F#", "voice_leading": "bounded_search" } }"#,
    )
    .unwrap();
    assert_eq!(cfg.palette, Palette::Minor);
    assert_eq!(cfg.playback.key, Key::FSharp);
    assert_eq!(cfg.playback.voice_leading, VoiceLeadingMode::BoundedSearch);
    assert!(cfg.playback.bass_enabled);
    assert_eq!(cfg.gestures, StageConfig::default().gestures);
    assert_eq!(cfg.grid_size, StageConfig::default().grid_size);
}
