use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomFeature {
    Projector,
    Whiteboard,
    VideoConference,
    #[serde(rename = "TVScreen")]
    TvScreen,
    Computer,
    AirConditioning,
    WheelchairAccessible,
}

impl RoomFeature {
    pub const ALL: [RoomFeature; 7] = [
        RoomFeature::Projector,
        RoomFeature::Whiteboard,
        RoomFeature::VideoConference,
        RoomFeature::TvScreen,
        RoomFeature::Computer,
        RoomFeature::AirConditioning,
        RoomFeature::WheelchairAccessible,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoomFeature::Projector => "Projector",
            RoomFeature::Whiteboard => "Whiteboard",
            RoomFeature::VideoConference => "VideoConference",
            RoomFeature::TvScreen => "TVScreen",
            RoomFeature::Computer => "Computer",
            RoomFeature::AirConditioning => "AirConditioning",
            RoomFeature::WheelchairAccessible => "WheelchairAccessible",
        }
    }

    /// Convert from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
    }
}

/// Encode a feature set for the `rooms.features` column (JSON array of names).
pub fn encode_features(features: &[RoomFeature]) -> String {
    serde_json::to_string(features).unwrap_or_else(|_| "[]".to_string())
}

/// Decode the `rooms.features` column. Unknown names are an error rather than
/// silently dropped.
pub fn decode_features(raw: &str) -> Result<Vec<RoomFeature>, String> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let names: Vec<String> =
        serde_json::from_str(raw).map_err(|e| format!("Invalid features column: {}", e))?;
    names
        .iter()
        .map(|n| RoomFeature::from_str(n).ok_or_else(|| format!("Invalid room feature: {}", n)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub capacity: i32,
    pub description: Option<String>,
    pub floor: i32,
    pub features: Vec<RoomFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoom {
    pub name: String,
    pub capacity: i32,
    pub description: Option<String>,
    pub floor: i32,
    pub features: Vec<RoomFeature>,
}
