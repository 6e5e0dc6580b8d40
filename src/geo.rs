// Static geographic reference data.
//
// The tables are built once per process and handed to the aggregation code
// by reference through `GeoTables`.
use crate::types::Coordinate;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

/// Locality whose score stands in for any region without data of its own.
pub const FALLBACK_LOCALITY: &str = "呼叫中心";

/// Used for the fallback entity when the call-center row itself is missing.
pub const CALL_CENTER_DEFAULT_SCORE: f64 = 6.12162;

/// The 31 mainland provincial-level regions, by short display name.
pub const REGIONS: [&str; 31] = [
    "北京", "天津", "河北", "山西", "内蒙古", "辽宁", "吉林", "黑龙江", "上海", "江苏", "浙江",
    "安徽", "福建", "江西", "山东", "河南", "湖北", "湖南", "广东", "广西", "海南", "重庆",
    "四川", "贵州", "云南", "西藏", "陕西", "甘肃", "青海", "宁夏", "新疆",
];

const CITY_REGIONS: &[(&str, &str)] = &[
    ("北京", "北京"),
    ("上海", "上海"),
    ("天津", "天津"),
    ("重庆", "重庆"),
    ("广州", "广东"),
    ("深圳", "广东"),
    ("东莞", "广东"),
    ("佛山", "广东"),
    ("杭州", "浙江"),
    ("宁波", "浙江"),
    ("金华", "浙江"),
    ("南京", "江苏"),
    ("苏州", "江苏"),
    ("无锡", "江苏"),
    ("成都", "四川"),
    ("武汉", "湖北"),
    ("西安", "陕西"),
    ("长沙", "湖南"),
    ("青岛", "山东"),
    ("济南", "山东"),
    ("厦门", "福建"),
    ("福州", "福建"),
    ("大连", "辽宁"),
    ("沈阳", "辽宁"),
    ("郑州", "河南"),
    ("合肥", "安徽"),
    ("昆明", "云南"),
    ("哈尔滨", "黑龙江"),
    ("长春", "吉林"),
    ("南宁", "广西"),
    ("贵阳", "贵州"),
    ("太原", "山西"),
    ("石家庄", "河北"),
    ("南昌", "江西"),
    ("兰州", "甘肃"),
    ("海口", "海南"),
    ("乌鲁木齐", "新疆"),
    ("呼和浩特", "内蒙古"),
    ("银川", "宁夏"),
    ("西宁", "青海"),
    ("拉萨", "西藏"),
    (FALLBACK_LOCALITY, "青海"),
];

// (lon, lat)
const CITY_COORDINATES: &[(&str, f64, f64)] = &[
    ("北京", 116.405285, 39.904989),
    ("上海", 121.472644, 31.231706),
    ("广州", 113.280637, 23.125178),
    ("深圳", 114.085947, 22.547),
    ("杭州", 120.153576, 30.287459),
    ("南京", 118.767413, 32.041544),
    ("武汉", 114.298572, 30.584355),
    ("成都", 104.065735, 30.659462),
    ("重庆", 106.504962, 29.533155),
    ("西安", 108.948024, 34.263161),
    (FALLBACK_LOCALITY, 96.778916, 36.623178),
    ("东莞", 113.746262, 23.046237),
    ("佛山", 113.121416, 23.021548),
    ("南昌", 115.858198, 28.682892),
    ("厦门", 118.089425, 24.479834),
    ("合肥", 117.227239, 31.820587),
    ("天津", 117.190182, 39.125596),
    ("宁波", 121.549792, 29.868388),
    ("无锡", 120.301663, 31.574729),
    ("昆明", 102.712251, 25.040609),
    ("济南", 117.000923, 36.675807),
    ("福州", 119.306239, 26.075302),
    ("苏州", 120.585316, 31.298886),
    ("郑州", 113.665412, 34.757975),
    ("金华", 119.649506, 29.089524),
    ("长沙", 112.982279, 28.19409),
    ("青岛", 120.355173, 36.082982),
    ("石家庄", 114.502461, 38.045474),
];

const REGION_SHORT_NAMES: &[(&str, &str)] = &[
    ("北京市", "北京"),
    ("天津市", "天津"),
    ("上海市", "上海"),
    ("重庆市", "重庆"),
    ("河北省", "河北"),
    ("山西省", "山西"),
    ("辽宁省", "辽宁"),
    ("吉林省", "吉林"),
    ("黑龙江省", "黑龙江"),
    ("江苏省", "江苏"),
    ("浙江省", "浙江"),
    ("安徽省", "安徽"),
    ("福建省", "福建"),
    ("江西省", "江西"),
    ("山东省", "山东"),
    ("河南省", "河南"),
    ("湖北省", "湖北"),
    ("湖南省", "湖南"),
    ("广东省", "广东"),
    ("海南省", "海南"),
    ("四川省", "四川"),
    ("贵州省", "贵州"),
    ("云南省", "云南"),
    ("陕西省", "陕西"),
    ("甘肃省", "甘肃"),
    ("青海省", "青海"),
    ("台湾省", "台湾"),
    ("内蒙古自治区", "内蒙古"),
    ("广西壮族自治区", "广西"),
    ("西藏自治区", "西藏"),
    ("宁夏回族自治区", "宁夏"),
    ("新疆维吾尔自治区", "新疆"),
    ("香港特别行政区", "香港"),
    ("澳门特别行政区", "澳门"),
];

static STANDARD: Lazy<GeoTables> = Lazy::new(|| {
    GeoTables::new(
        CITY_REGIONS.iter().map(|(c, r)| (c.to_string(), r.to_string())),
        CITY_COORDINATES
            .iter()
            .map(|(c, lon, lat)| (c.to_string(), Coordinate::new(*lon, *lat))),
        REGIONS.iter().map(|r| r.to_string()),
    )
});

/// Lookup tables for localities: city → region, city → coordinate, and the
/// fixed region enumeration.
#[derive(Debug, Clone)]
pub struct GeoTables {
    city_regions: HashMap<String, String>,
    coordinates: HashMap<String, Coordinate>,
    regions: Vec<String>,
    short_names: HashMap<&'static str, &'static str>,
    fallback_locality: String,
}

impl GeoTables {
    pub fn new(
        city_regions: impl IntoIterator<Item = (String, String)>,
        coordinates: impl IntoIterator<Item = (String, Coordinate)>,
        regions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            city_regions: city_regions.into_iter().collect(),
            coordinates: coordinates.into_iter().collect(),
            regions: regions.into_iter().collect(),
            short_names: REGION_SHORT_NAMES.iter().copied().collect(),
            fallback_locality: FALLBACK_LOCALITY.to_string(),
        }
    }

    /// The built-in tables for mainland China.
    pub fn standard() -> &'static GeoTables {
        &STANDARD
    }

    pub fn region_of(&self, city: &str) -> Option<&str> {
        self.city_regions.get(city).map(String::as_str)
    }

    pub fn coordinate_of(&self, city: &str) -> Option<Coordinate> {
        self.coordinates.get(city).copied()
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn fallback_locality(&self) -> &str {
        &self.fallback_locality
    }

    /// Short display name for a full legal region name. Unknown names are
    /// returned unchanged.
    pub fn short_region_name<'a>(&self, full_name: &'a str) -> &'a str {
        self.short_names.get(full_name).copied().unwrap_or(full_name)
    }

    /// Rewrite `features[].properties.name` of a boundary document from full
    /// legal names to short names. Returns how many names changed.
    pub fn rewrite_boundary_names(&self, document: &mut Value) -> usize {
        let Some(features) = document.get_mut("features").and_then(Value::as_array_mut) else {
            return 0;
        };

        let mut renamed = 0;
        for feature in features {
            let Some(name) = feature
                .get_mut("properties")
                .and_then(|p| p.get_mut("name"))
            else {
                continue;
            };
            let Some(full) = name.as_str().map(str::to_string) else {
                continue;
            };
            let short = self.short_region_name(&full);
            if short != full {
                *name = Value::String(short.to_string());
                renamed += 1;
            }
        }
        renamed
    }
}
