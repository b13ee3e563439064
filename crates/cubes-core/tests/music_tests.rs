// Chord table, key spelling and the octave helpers used by voice leading.

use cubes_core::music::{
    bounded_octave_search, lookup, nearest_octave, normalize_symbol, pitch_class, tones_for,
    wrap_into, Key, Palette, CHORDS,
};

#[test]
fn every_symbol_has_a_unique_entry() {
    for (i, c) in CHORDS.iter().enumerate() {
        assert!(
            CHORDS[..i].iter().all(|o| o.symbol != c.symbol),
            "duplicate {}",
            c.symbol
        );
        assert_eq!(lookup(c.symbol).unwrap().symbol, c.symbol);
    }
}

#[test]
fn families_are_split_by_palette() {
    let count = |p: Palette| CHORDS.iter().filter(|c| c.family == p).count();
    assert_eq!(count(Palette::Major), 7);
    assert!(count(Palette::Minor) >= 9);
    assert!(count(Palette::Applied) >= 10);
    assert_eq!(count(Palette::All), 0);
}

#[test]
fn unknown_symbols_fail_lookup_but_resolve_to_fallback() {
    assert!(lookup("ix").is_err());
    let t = tones_for("ix", Key::D);
    assert!(t.fallback);
    assert_eq!(t.symbol, "I");
    // still transposed into the requested key
    assert_eq!(t.names[0], "D");
}

#[test]
fn sharp_keys_spell_with_sharps() {
    assert_eq!(tones_for("I", Key::E).names, ["E", "G#", "B", "D#"]);
    assert_eq!(tones_for("I", Key::FSharp).names[0], "F#");
    assert_eq!(tones_for("I", Key::Ab).names, ["Ab", "C", "Eb", "G"]);
    assert_eq!(tones_for("V", Key::Db).names[..3], ["Ab", "C", "Eb"]);
}

#[test]
fn degree_labels_travel_with_the_symbol() {
    let t = tones_for("bVI", Key::G);
    assert_eq!(t.degrees, ["b6", "1", "b3", "5"]);
    assert_eq!(t.pitch_classes[0], 3);
}

#[test]
fn key_parse_and_name() {
    for key in Key::ALL {
        assert_eq!(Key::parse(key.name()), Some(key));
    }
    assert_eq!(Key::parse("gb"), Some(Key::FSharp));
    assert_eq!(Key::parse("H"), None);
}

#[test]
fn normalization_handles_diminished_spellings() {
    assert_eq!(normalize_symbol("#vo"), "#vº");
    assert_eq!(normalize_symbol(" viio7 "), "viiº7");
    assert_eq!(normalize_symbol("♭VII"), "bVII");
    assert_eq!(normalize_symbol("#v°"), "#vº");
    assert_eq!(normalize_symbol(" viiØ "), "viiø");
    // a plain lowercase numeral is left alone
    assert_eq!(normalize_symbol("iv"), "iv");
}

#[test]
fn nearest_octave_examples() {
    assert_eq!(nearest_octave(36, None), 36);
    assert_eq!(nearest_octave(36, Some(48)), 48);
    assert_eq!(nearest_octave(40, Some(36)), 40);
    assert_eq!(nearest_octave(43, Some(36)), 31);
    // exact tritone: the upper candidate wins
    assert_eq!(nearest_octave(36, Some(42)), 48);
    assert_eq!(nearest_octave(36, Some(30)), 36);
}

#[test]
fn bounded_search_examples() {
    assert_eq!(bounded_octave_search(36, None), 36);
    assert_eq!(bounded_octave_search(36, Some(48)), 48);
    // tie between 36 and 48: the first (lowest) candidate is kept
    assert_eq!(bounded_octave_search(36, Some(42)), 36);
    // cannot move further than two octaves
    assert_eq!(bounded_octave_search(36, Some(100)), 60);
}

#[test]
fn wrap_into_range() {
    assert_eq!(wrap_into(70, (36, 55)), 46);
    assert_eq!(wrap_into(20, (36, 55)), 44);
    assert_eq!(wrap_into(50, (36, 55)), 50);
}

#[test]
fn every_table_tone_parses() {
    for c in CHORDS {
        for t in c.tones_in_c {
            assert!(pitch_class(t).is_some(), "{} has bad tone {}", c.symbol, t);
        }
    }
}
