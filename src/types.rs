use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tabled::Tabled;

/// The six behavioural axes every evaluated call is scored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dimension {
    DialoguePacing,
    ObjectionResilience,
    ClosingDrive,
    ValueArticulation,
    AdaptiveFlexibility,
    EmotionalResonance,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::DialoguePacing,
        Dimension::ObjectionResilience,
        Dimension::ClosingDrive,
        Dimension::ValueArticulation,
        Dimension::AdaptiveFlexibility,
        Dimension::EmotionalResonance,
    ];

    /// Column header used by every processed CSV export.
    pub fn column(self) -> &'static str {
        match self {
            Dimension::DialoguePacing => "主动掌控对话节奏",
            Dimension::ObjectionResilience => "异议应对韧性",
            Dimension::ClosingDrive => "决策推进与闭环",
            Dimension::ValueArticulation => "量化价值呈现",
            Dimension::AdaptiveFlexibility => "灵活应变能力",
            Dimension::EmotionalResonance => "情绪感染力",
        }
    }

    fn index(self) -> usize {
        match self {
            Dimension::DialoguePacing => 0,
            Dimension::ObjectionResilience => 1,
            Dimension::ClosingDrive => 2,
            Dimension::ValueArticulation => 3,
            Dimension::AdaptiveFlexibility => 4,
            Dimension::EmotionalResonance => 5,
        }
    }
}

/// Per-dimension scores, nominally in `[0, 10]`. Missing data is stored as 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreVector {
    values: [f64; 6],
}

impl ScoreVector {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_values(values: [f64; 6]) -> Self {
        Self { values }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        self.values[dimension.index()]
    }

    pub fn set(&mut self, dimension: Dimension, value: f64) {
        self.values[dimension.index()] = value;
    }

    pub fn values(&self) -> [f64; 6] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.iter().map(move |d| (*d, self.get(*d)))
    }
}

// Serialized keyed by the CSV column names so exports read like the sources.
impl Serialize for ScoreVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Dimension::ALL.len()))?;
        for (dimension, value) in self.iter() {
            map.serialize_entry(dimension.column(), &value)?;
        }
        map.end()
    }
}

// Raw rows mirror the processed CSV exports. Every field is optional text so
// that a missing or misnamed column never fails the row; coercion happens in
// the loader.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCityRow {
    #[serde(rename = "d5_name")]
    pub name: Option<String>,
    #[serde(rename = "城市士气综合得分")]
    pub composite: Option<String>,
    #[serde(rename = "主动掌控对话节奏")]
    pub dialogue_pacing: Option<String>,
    #[serde(rename = "异议应对韧性")]
    pub objection_resilience: Option<String>,
    #[serde(rename = "决策推进与闭环")]
    pub closing_drive: Option<String>,
    #[serde(rename = "量化价值呈现")]
    pub value_articulation: Option<String>,
    #[serde(rename = "灵活应变能力")]
    pub adaptive_flexibility: Option<String>,
    #[serde(rename = "情绪感染力")]
    pub emotional_resonance: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawTeamRow {
    #[serde(rename = "城市")]
    pub city: Option<String>,
    #[serde(rename = "销售团队")]
    pub team: Option<String>,
    #[serde(rename = "团队士气综合得分")]
    pub composite: Option<String>,
    // Some exports wrap the header onto two lines; a few carry both.
    #[serde(rename = "团队士气综合\n得分")]
    pub composite_wrapped: Option<String>,
    #[serde(rename = "主动掌控对话节奏")]
    pub dialogue_pacing: Option<String>,
    #[serde(rename = "异议应对韧性")]
    pub objection_resilience: Option<String>,
    #[serde(rename = "决策推进与闭环")]
    pub closing_drive: Option<String>,
    #[serde(rename = "量化价值呈现")]
    pub value_articulation: Option<String>,
    #[serde(rename = "灵活应变能力")]
    pub adaptive_flexibility: Option<String>,
    #[serde(rename = "情绪感染力")]
    pub emotional_resonance: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSalesRow {
    #[serde(rename = "user_name")]
    pub name: Option<String>,
    #[serde(rename = "城市")]
    pub city: Option<String>,
    #[serde(rename = "city")]
    pub city_code: Option<String>,
    #[serde(rename = "团队")]
    pub team: Option<String>,
    #[serde(rename = "d8_name")]
    pub team_code: Option<String>,
    #[serde(rename = "销售士气综合得分")]
    pub composite: Option<String>,
    #[serde(rename = "销售士气")]
    pub morale_label: Option<String>,
    #[serde(rename = "理由")]
    pub rationale: Option<String>,
    #[serde(rename = "主动掌控对话节奏")]
    pub dialogue_pacing: Option<String>,
    #[serde(rename = "异议应对韧性")]
    pub objection_resilience: Option<String>,
    #[serde(rename = "决策推进与闭环")]
    pub closing_drive: Option<String>,
    #[serde(rename = "量化价值呈现")]
    pub value_articulation: Option<String>,
    #[serde(rename = "灵活应变能力")]
    pub adaptive_flexibility: Option<String>,
    #[serde(rename = "情绪感染力")]
    pub emotional_resonance: Option<String>,
}

/// Dimension columns of any raw row, in `Dimension::ALL` order.
pub trait RawDimensions {
    fn dimension_fields(&self) -> [Option<&str>; 6];
}

macro_rules! impl_raw_dimensions {
    ($($row:ty),+) => {
        $(impl RawDimensions for $row {
            fn dimension_fields(&self) -> [Option<&str>; 6] {
                [
                    self.dialogue_pacing.as_deref(),
                    self.objection_resilience.as_deref(),
                    self.closing_drive.as_deref(),
                    self.value_articulation.as_deref(),
                    self.adaptive_flexibility.as_deref(),
                    self.emotional_resonance.as_deref(),
                ]
            }
        })+
    };
}

impl_raw_dimensions!(RawCityRow, RawTeamRow, RawSalesRow);

#[derive(Debug, Clone, PartialEq)]
pub struct CityRecord {
    pub name: String,
    pub composite: f64,
    pub scores: ScoreVector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRecord {
    pub city: String,
    pub team: String,
    pub composite: f64,
    pub scores: ScoreVector,
}

/// One evaluated call.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub name: String,
    pub city: String,
    pub team: String,
    pub composite: f64,
    pub morale_label: String,
    pub rationale: String,
    pub scores: ScoreVector,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate { lon: 0.0, lat: 0.0 };

    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Salesperson {
    pub name: String,
    pub city: String,
    pub team: String,
    pub scores: ScoreVector,
    pub composite: f64,
    /// Label from the most recent call that carried one.
    pub morale_label: String,
    pub rationale: String,
    pub call_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    pub city: String,
    pub name: String,
    pub scores: ScoreVector,
    pub composite: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct City {
    pub name: String,
    pub composite: f64,
    pub scores: ScoreVector,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub name: String,
    pub composite: f64,
    pub city_count: usize,
    /// True when no mapped city contributed and the fallback entity's score
    /// was used instead.
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxplotStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Mean vector plus mean composite over a group, used as a radar baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baseline {
    pub scores: ScoreVector,
    pub composite: f64,
}

// Table rows for terminal previews and CSV exports.

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
    #[serde(rename = "Cities")]
    #[tabled(rename = "Cities")]
    pub cities: usize,
    #[serde(rename = "Source")]
    #[tabled(rename = "Source")]
    pub source: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CityRow {
    #[serde(rename = "City")]
    #[tabled(rename = "City")]
    pub city: String,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
    #[serde(rename = "Band")]
    #[tabled(rename = "Band")]
    pub band: String,
    #[serde(rename = "Color")]
    #[tabled(skip)]
    pub color: String,
    #[serde(rename = "Lon")]
    #[tabled(rename = "Lon")]
    pub lon: String,
    #[serde(rename = "Lat")]
    #[tabled(rename = "Lat")]
    pub lat: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankedRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Name")]
    #[tabled(rename = "Name")]
    pub name: String,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
    #[serde(rename = "Band")]
    #[tabled(rename = "Band")]
    pub band: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BoxplotRow {
    #[serde(rename = "Min")]
    #[tabled(rename = "Min")]
    pub min: String,
    #[serde(rename = "Q1")]
    #[tabled(rename = "Q1")]
    pub q1: String,
    #[serde(rename = "Median")]
    #[tabled(rename = "Median")]
    pub median: String,
    #[serde(rename = "Q3")]
    #[tabled(rename = "Q3")]
    pub q3: String,
    #[serde(rename = "Max")]
    #[tabled(rename = "Max")]
    pub max: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DimensionRow {
    #[serde(rename = "Dimension")]
    #[tabled(rename = "Dimension")]
    pub dimension: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Baseline")]
    #[tabled(rename = "Baseline")]
    pub baseline: String,
}
