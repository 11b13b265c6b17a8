use std::f64::consts::PI;

use crate::models::{CanonicalFeatureRow, RawTrackRecord};

/// Number of pitch classes on the cyclic key scale
const PITCH_CLASSES: f64 = 12.0;

/// Time signature treated as standard; anything else encodes as 1
const STANDARD_TIME_SIGNATURE: u32 = 4;

/// Maps a raw track onto the canonical feature schema
///
/// Key becomes a point on the unit circle so that B (11) sits next to C (0),
/// explicit is coerced to 0/1 and time signature collapses to a
/// non-standard indicator. Everything else passes through unchanged.
pub fn encode(raw: &RawTrackRecord) -> CanonicalFeatureRow {
    let (key_sine, key_cosine) = cyclic_key(raw.key);
    let audio = &raw.audio;

    CanonicalFeatureRow {
        danceability: audio.danceability,
        energy: audio.energy,
        loudness: audio.loudness,
        speechiness: audio.speechiness,
        acousticness: audio.acousticness,
        instrumentalness: audio.instrumentalness,
        liveness: audio.liveness,
        valence: audio.valence,
        tempo: audio.tempo,
        duration_ms: raw.duration_ms,
        year: f64::from(raw.year),
        explicit: if raw.explicit { 1.0 } else { 0.0 },
        mode: f64::from(raw.mode),
        key_sine,
        key_cosine,
        time_signature: if raw.time_signature != STANDARD_TIME_SIGNATURE {
            1.0
        } else {
            0.0
        },
    }
}

/// `(sin, cos)` of the key's angle on the pitch-class circle
fn cyclic_key(key: u8) -> (f64, f64) {
    let angle = 2.0 * PI * f64::from(key) / PITCH_CLASSES;
    (angle.sin(), angle.cos())
}
