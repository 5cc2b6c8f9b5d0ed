//! Auxiliary measurement values attached to rooms by stable key.

use serde::{Deserialize, Serialize};

/// Which noise measurement a selected room takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoiseMeasurementKind {
    #[default]
    Airborne,
    Impact,
    Equipment,
}

impl NoiseMeasurementKind {
    pub const ALL: [NoiseMeasurementKind; 3] = [
        NoiseMeasurementKind::Airborne,
        NoiseMeasurementKind::Impact,
        NoiseMeasurementKind::Equipment,
    ];

    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Airborne => "AIRBORNE",
            Self::Impact => "IMPACT",
            Self::Equipment => "EQUIPMENT",
        }
    }

    pub fn parse_db_str(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_db_str() == value)
    }
}

/// Whether a room is selected for noise measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoiseSelection {
    pub selected: bool,
    pub measurement_kind: NoiseMeasurementKind,
}

/// Permissible noise levels for a room, in dBA.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NoiseThreshold {
    pub day_db: f64,
    pub night_db: f64,
}
