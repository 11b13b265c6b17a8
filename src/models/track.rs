use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Display metadata shared by seed records and catalog entries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub album_id: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub artist_ids: Vec<String>,
    #[serde(default)]
    pub track_number: u32,
}

/// Boolean-ish value as reported by upstream sources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Truthy {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Truthy {
    /// Coerces to a boolean, `None` when the value has no obvious truthiness
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Truthy::Bool(b) => Some(*b),
            Truthy::Number(n) if n.is_nan() => None,
            Truthy::Number(n) => Some(*n != 0.0),
            Truthy::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" | "" => Some(false),
                _ => None,
            },
        }
    }
}

/// Release year as either `1999` or `"1999"`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum YearValue {
    Number(i64),
    Text(String),
}

impl YearValue {
    pub fn as_year(&self) -> Option<i32> {
        match self {
            YearValue::Number(n) => i32::try_from(*n).ok(),
            YearValue::Text(s) => parse_year_prefix(s),
        }
    }
}

/// Reads the leading four-digit year of `1999`, `1999-03` or `1999-03-17`
fn parse_year_prefix(s: &str) -> Option<i32> {
    let prefix = s.trim().get(..4)?;
    if !prefix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

/// Track record as handed over by the search collaborator
///
/// Every field is optional here; conversion into [`RawTrackRecord`] is where
/// absent or malformed features are rejected. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawTrackInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub album: Option<String>,
    pub album_id: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub artist_ids: Vec<String>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub explicit: Option<Truthy>,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub key: Option<f64>,
    pub loudness: Option<f64>,
    pub mode: Option<f64>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub duration_ms: Option<f64>,
    pub time_signature: Option<f64>,
    pub year: Option<YearValue>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
}

/// Continuous audio descriptors, in canonical column order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AudioDescriptors {
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
}

/// A validated observation of one track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawTrackRecord {
    pub metadata: TrackMetadata,
    pub audio: AudioDescriptors,
    pub duration_ms: f64,
    pub year: i32,
    pub explicit: bool,
    /// 1 for major, 0 for minor
    pub mode: u8,
    /// Pitch class, 0 (C) through 11 (B)
    pub key: u8,
    pub time_signature: u32,
    pub disc_number: Option<u32>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
}

fn require(value: Option<f64>, field: &str) -> AppResult<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(AppError::MissingFeature(format!(
            "`{}` is not a finite number: {}",
            field, v
        ))),
        None => Err(AppError::MissingFeature(format!("`{}` is absent", field))),
    }
}

fn require_integral(value: Option<f64>, field: &str) -> AppResult<i64> {
    let v = require(value, field)?;
    if v.fract() != 0.0 {
        return Err(AppError::MissingFeature(format!(
            "`{}` must be an integer, got {}",
            field, v
        )));
    }
    Ok(v as i64)
}

impl TryFrom<RawTrackInput> for RawTrackRecord {
    type Error = AppError;

    fn try_from(input: RawTrackInput) -> AppResult<Self> {
        let key = require_integral(input.key, "key")?;
        if !(0..=11).contains(&key) {
            return Err(AppError::MissingFeature(format!(
                "`key` must be a pitch class in 0..=11, got {}",
                key
            )));
        }

        let time_signature = require_integral(input.time_signature, "time_signature")?;
        let time_signature = u32::try_from(time_signature)
            .ok()
            .filter(|&ts| ts > 0)
            .ok_or_else(|| {
                AppError::MissingFeature(format!(
                    "`time_signature` must be a positive 32-bit integer, got {}",
                    time_signature
                ))
            })?;

        let mode = require_integral(input.mode, "mode")?;
        if mode != 0 && mode != 1 {
            return Err(AppError::MissingFeature(format!(
                "`mode` must be 0 or 1, got {}",
                mode
            )));
        }

        let explicit = input
            .explicit
            .as_ref()
            .ok_or_else(|| AppError::MissingFeature("`explicit` is absent".to_string()))?
            .as_bool()
            .ok_or_else(|| {
                AppError::MissingFeature(format!(
                    "`explicit` has no boolean reading: {:?}",
                    input.explicit
                ))
            })?;

        let year = match &input.year {
            Some(year) => year.as_year().ok_or_else(|| {
                AppError::MissingFeature(format!("`year` is unparseable: {:?}", year))
            })?,
            None => input
                .release_date
                .as_deref()
                .and_then(parse_year_prefix)
                .ok_or_else(|| {
                    AppError::MissingFeature(
                        "`year` is absent and cannot be read from `release_date`".to_string(),
                    )
                })?,
        };

        let audio = AudioDescriptors {
            danceability: require(input.danceability, "danceability")?,
            energy: require(input.energy, "energy")?,
            loudness: require(input.loudness, "loudness")?,
            speechiness: require(input.speechiness, "speechiness")?,
            acousticness: require(input.acousticness, "acousticness")?,
            instrumentalness: require(input.instrumentalness, "instrumentalness")?,
            liveness: require(input.liveness, "liveness")?,
            valence: require(input.valence, "valence")?,
            tempo: require(input.tempo, "tempo")?,
        };
        let duration_ms = require(input.duration_ms, "duration_ms")?;

        Ok(RawTrackRecord {
            metadata: TrackMetadata {
                id: input.id.unwrap_or_default(),
                name: input.name.unwrap_or_default(),
                album: input.album.unwrap_or_default(),
                album_id: input.album_id.unwrap_or_default(),
                artists: input.artists,
                artist_ids: input.artist_ids,
                track_number: input.track_number.unwrap_or_default(),
            },
            audio,
            duration_ms,
            year,
            explicit,
            mode: mode as u8,
            key: key as u8,
            time_signature,
            disc_number: input.disc_number,
            release_date: input.release_date,
            popularity: input.popularity,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::raw_input;
    use super::*;

    #[test]
    fn test_converts_well_formed_input() {
        let record = RawTrackRecord::try_from(raw_input("t1")).unwrap();
        assert_eq!(record.metadata.id, "t1");
        assert_eq!(record.key, 5);
        assert_eq!(record.time_signature, 4);
        assert_eq!(record.year, 2015);
        assert!(!record.explicit);
        assert_eq!(record.popularity, Some(40.0));
    }

    #[test]
    fn test_missing_key_is_missing_feature() {
        let mut input = raw_input("t1");
        input.key = None;
        let err = RawTrackRecord::try_from(input).unwrap_err();
        assert!(matches!(err, AppError::MissingFeature(msg) if msg.contains("key")));
    }

    #[test]
    fn test_undetected_key_is_missing_feature() {
        let mut input = raw_input("t1");
        input.key = Some(-1.0);
        assert!(matches!(
            RawTrackRecord::try_from(input),
            Err(AppError::MissingFeature(_))
        ));
    }

    #[test]
    fn test_fractional_key_is_missing_feature() {
        let mut input = raw_input("t1");
        input.key = Some(2.5);
        assert!(matches!(
            RawTrackRecord::try_from(input),
            Err(AppError::MissingFeature(_))
        ));
    }

    #[test]
    fn test_non_positive_time_signature_rejected() {
        let mut input = raw_input("t1");
        input.time_signature = Some(0.0);
        assert!(matches!(
            RawTrackRecord::try_from(input),
            Err(AppError::MissingFeature(_))
        ));
    }

    #[test]
    fn test_out_of_range_time_signature_rejected() {
        // 2^32 + 4 must not wrap around to common time
        let mut input = raw_input("t1");
        input.time_signature = Some(4_294_967_300.0);
        assert!(matches!(
            RawTrackRecord::try_from(input),
            Err(AppError::MissingFeature(msg)) if msg.contains("time_signature")
        ));

        let mut input = raw_input("t1");
        input.time_signature = Some(1e30);
        assert!(matches!(
            RawTrackRecord::try_from(input),
            Err(AppError::MissingFeature(_))
        ));
    }

    #[test]
    fn test_missing_audio_descriptor_rejected() {
        let mut input = raw_input("t1");
        input.tempo = None;
        let err = RawTrackRecord::try_from(input).unwrap_err();
        assert!(matches!(err, AppError::MissingFeature(msg) if msg.contains("tempo")));
    }

    #[test]
    fn test_year_falls_back_to_release_date() {
        let mut input = raw_input("t1");
        input.year = None;
        input.release_date = Some("1987-11-02".to_string());
        assert_eq!(RawTrackRecord::try_from(input).unwrap().year, 1987);
    }

    #[test]
    fn test_year_missing_everywhere_rejected() {
        let mut input = raw_input("t1");
        input.year = None;
        input.release_date = None;
        assert!(matches!(
            RawTrackRecord::try_from(input),
            Err(AppError::MissingFeature(_))
        ));
    }

    #[test]
    fn test_deserializes_loose_json() {
        let json = serde_json::json!({
            "id": "abc",
            "name": "Song",
            "artists": ["A", "B"],
            "explicit": 1,
            "danceability": 0.5, "energy": 0.5, "key": 11, "loudness": -5.0,
            "mode": 0, "speechiness": 0.1, "acousticness": 0.1,
            "instrumentalness": 0.0, "liveness": 0.1, "valence": 0.3,
            "tempo": 98.0, "duration_ms": 180000, "time_signature": 3,
            "year": "2001",
            "disc_number": 1, "release_date": "2001-01-01", "popularity": 12,
            "preview_url": null
        });
        let input: RawTrackInput = serde_json::from_value(json).unwrap();
        let record = RawTrackRecord::try_from(input).unwrap();
        assert!(record.explicit);
        assert_eq!(record.year, 2001);
        assert_eq!(record.key, 11);
        assert_eq!(record.metadata.artists, vec!["A", "B"]);
    }

    #[test]
    fn test_truthy_readings() {
        assert_eq!(Truthy::Text("True".to_string()).as_bool(), Some(true));
        assert_eq!(Truthy::Text("0".to_string()).as_bool(), Some(false));
        assert_eq!(Truthy::Number(0.0).as_bool(), Some(false));
        assert_eq!(Truthy::Text("maybe".to_string()).as_bool(), None);
    }
}
