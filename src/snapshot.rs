// One complete, immutable load of every source, plus the views the front end
// reads from it. A reload builds a new snapshot and replaces the old one
// wholesale.
use crate::aggregate::{
    aggregate_cities, aggregate_regions, aggregate_salespeople, aggregate_teams, city_team_index,
    fallback_score, group_cities_by_region, salesperson_baseline, team_baseline, RegionDetail,
};
use crate::config::DataConfig;
use crate::geo::GeoTables;
use crate::loader::{parse_cities, parse_sales, parse_teams, LoadReport};
use crate::selection::{salespeople_for_team, teams_for_city};
use crate::source::{acquire, SourceLocation};
use crate::stats::{compute_boxplot_stats, score_color_band, ScoreBand};
use crate::types::{
    Baseline, BoxplotStats, City, CityRecord, Region, SalesRecord, Salesperson, Team, TeamRecord,
};
use crate::util::average;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub loaded_at: DateTime<Utc>,
    pub cities: Vec<City>,
    pub regions: Vec<Region>,
    pub teams: Vec<Team>,
    pub salespeople: Vec<Salesperson>,
    pub fallback_score: f64,
    #[serde(skip)]
    pub boundaries: Option<Value>,
    pub reports: Vec<LoadReport>,
}

/// National view: every region plus the city scatter points.
#[derive(Debug, Clone, Serialize)]
pub struct CityOverview {
    pub regions: Vec<Region>,
    pub cities: Vec<City>,
    pub details: Vec<RegionDetail>,
}

/// One city's teams, best first.
#[derive(Debug, Clone, Serialize)]
pub struct TeamView {
    pub city: String,
    pub teams: Vec<Team>,
    pub boxplot: Option<BoxplotStats>,
    pub baseline: Baseline,
}

/// One team's members, best first. `members` may be empty: a team can exist
/// in the team source without any salesperson rows.
#[derive(Debug, Clone, Serialize)]
pub struct SalesView {
    pub city: String,
    pub team: String,
    pub team_record: Option<Team>,
    pub members: Vec<Salesperson>,
    pub boxplot: Option<BoxplotStats>,
    pub baseline: Baseline,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonView {
    pub person: Salesperson,
    pub band: ScoreBand,
    pub baseline: Baseline,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub loaded_at: DateTime<Utc>,
    pub total_cities: usize,
    pub total_teams: usize,
    pub total_salespeople: usize,
    pub national_average: f64,
    pub fallback_score: f64,
    pub regions_on_fallback: usize,
    pub regions: Vec<Region>,
    pub reports: Vec<LoadReport>,
}

impl Snapshot {
    /// Acquire every source and rebuild. Unavailable sources degrade to empty
    /// datasets; this never fails.
    pub async fn load(data: &DataConfig, geo: &GeoTables, http: &reqwest::Client) -> Snapshot {
        let city_location = data.city_location();
        let team_location = data.team_location();
        let sales_location = data.sales_location();
        let (city_bytes, team_bytes, sales_bytes) = tokio::join!(
            acquire(&city_location, http),
            acquire(&team_location, http),
            acquire(&sales_location, http),
        );

        let (city_rows, city_report) = match city_bytes {
            Ok(bytes) => parse_cities(bytes.as_slice(), &city_location.to_string()),
            Err(e) => unavailable(&city_location, e),
        };
        let (team_rows, team_report) = match team_bytes {
            Ok(bytes) => parse_teams(bytes.as_slice(), &team_location.to_string()),
            Err(e) => unavailable(&team_location, e),
        };
        let (sales_rows, sales_report) = match sales_bytes {
            Ok(bytes) => parse_sales(bytes.as_slice(), &sales_location.to_string()),
            Err(e) => unavailable(&sales_location, e),
        };

        let mut snapshot = Snapshot::build(
            &city_rows,
            &team_rows,
            &sales_rows,
            vec![city_report, team_report, sales_report],
            geo,
        );

        if let Some(location) = data.boundary_location() {
            snapshot.boundaries = load_boundaries(&location, geo, http).await;
        }
        snapshot
    }

    /// Pure rebuild from already-normalized records.
    pub fn build(
        city_rows: &[CityRecord],
        team_rows: &[TeamRecord],
        sales_rows: &[SalesRecord],
        reports: Vec<LoadReport>,
        geo: &GeoTables,
    ) -> Snapshot {
        let cities = aggregate_cities(city_rows, geo);
        let regions = aggregate_regions(&cities, geo);
        let teams = aggregate_teams(team_rows);
        let salespeople = aggregate_salespeople(sales_rows);
        let fallback = fallback_score(&cities, geo);

        info!(
            cities = cities.len(),
            teams = teams.len(),
            salespeople = salespeople.len(),
            "snapshot built"
        );

        Snapshot {
            loaded_at: Utc::now(),
            cities,
            regions,
            teams,
            salespeople,
            fallback_score: fallback,
            boundaries: None,
            reports,
        }
    }

    /// A snapshot with nothing loaded; every region sits on the fallback.
    pub fn empty(geo: &GeoTables) -> Snapshot {
        Snapshot::build(&[], &[], &[], Vec::new(), geo)
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty() && self.teams.is_empty() && self.salespeople.is_empty()
    }

    pub fn overview(&self, geo: &GeoTables) -> CityOverview {
        CityOverview {
            regions: self.regions.clone(),
            cities: self.cities.clone(),
            details: group_cities_by_region(&self.cities, geo),
        }
    }

    /// Score of a named city, or the fallback entity's score when the city
    /// has no record.
    pub fn city_score(&self, name: &str) -> f64 {
        self.cities
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.composite)
            .unwrap_or(self.fallback_score)
    }

    pub fn city_team_index(&self) -> BTreeMap<String, BTreeSet<String>> {
        city_team_index(&self.teams)
    }

    pub fn team_view(&self, city: &str) -> TeamView {
        let mut teams: Vec<Team> = teams_for_city(&self.teams, city)
            .into_iter()
            .cloned()
            .collect();
        teams.sort_by(|a, b| descending(a.composite, b.composite));
        let scores: Vec<f64> = teams.iter().map(|t| t.composite).collect();
        TeamView {
            city: city.to_string(),
            boxplot: compute_boxplot_stats(&scores),
            baseline: team_baseline(&teams),
            teams,
        }
    }

    pub fn sales_view(&self, city: &str, team: &str) -> SalesView {
        let mut members: Vec<Salesperson> = salespeople_for_team(&self.salespeople, city, team)
            .into_iter()
            .cloned()
            .collect();
        members.sort_by(|a, b| descending(a.composite, b.composite));
        let scores: Vec<f64> = members.iter().map(|p| p.composite).collect();
        let team_record = self
            .teams
            .iter()
            .find(|t| t.city == city && t.name == team)
            .cloned();
        SalesView {
            city: city.to_string(),
            team: team.to_string(),
            team_record,
            boxplot: compute_boxplot_stats(&scores),
            baseline: salesperson_baseline(&self.salespeople),
            members,
        }
    }

    pub fn person_view(&self, city: &str, team: &str, name: &str) -> Option<PersonView> {
        let person = salespeople_for_team(&self.salespeople, city, team)
            .into_iter()
            .find(|p| p.name == name)?
            .clone();
        Some(PersonView {
            band: score_color_band(person.composite),
            baseline: salesperson_baseline(&self.salespeople),
            person,
        })
    }

    pub fn summary(&self) -> SnapshotSummary {
        let composites: Vec<f64> = self.cities.iter().map(|c| c.composite).collect();
        SnapshotSummary {
            loaded_at: self.loaded_at,
            total_cities: self.cities.len(),
            total_teams: self.teams.len(),
            total_salespeople: self.salespeople.len(),
            national_average: average(&composites),
            fallback_score: self.fallback_score,
            regions_on_fallback: self.regions.iter().filter(|r| r.fallback).count(),
            regions: self.regions.clone(),
            reports: self.reports.clone(),
        }
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn unavailable<T>(location: &SourceLocation, error: impl std::fmt::Display) -> (Vec<T>, LoadReport) {
    warn!(source = %location, error = %error, "source unavailable, treating as empty");
    (Vec::new(), LoadReport::unavailable(&location.to_string(), error))
}

async fn load_boundaries(
    location: &SourceLocation,
    geo: &GeoTables,
    http: &reqwest::Client,
) -> Option<Value> {
    let bytes = match acquire(location, http).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(source = %location, error = %e, "boundary document unavailable");
            return None;
        }
    };
    let mut document: Value = match serde_json::from_slice(&bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(source = %location, error = %e, "boundary document is not valid JSON");
            return None;
        }
    };
    let renamed = geo.rewrite_boundary_names(&mut document);
    info!(source = %location, renamed, "boundary document loaded");
    Some(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::CALL_CENTER_DEFAULT_SCORE;
    use crate::types::ScoreVector;
    use std::path::PathBuf;

    fn city_row(name: &str, composite: f64) -> CityRecord {
        CityRecord {
            name: name.to_string(),
            composite,
            scores: ScoreVector::zero(),
        }
    }

    fn team_row(city: &str, team: &str, composite: f64) -> TeamRecord {
        TeamRecord {
            city: city.to_string(),
            team: team.to_string(),
            composite,
            scores: ScoreVector::from_values([6.0; 6]),
        }
    }

    fn sales_row(name: &str, city: &str, team: &str, composite: f64) -> SalesRecord {
        SalesRecord {
            name: name.to_string(),
            city: city.to_string(),
            team: team.to_string(),
            composite,
            morale_label: String::new(),
            rationale: String::new(),
            scores: ScoreVector::from_values([5.0; 6]),
        }
    }

    fn sample() -> Snapshot {
        Snapshot::build(
            &[city_row("上海", 7.2), city_row("广州", 6.8), city_row("呼叫中心", 6.3)],
            &[
                team_row("上海", "Alpha", 7.9),
                team_row("上海", "Beta", 6.1),
                team_row("上海", "Gamma", 8.4),
                team_row("广州", "B队", 8.5),
            ],
            &[
                sales_row("张三", "上海", "Alpha", 7.0),
                sales_row("李四", "上海", "Alpha", 9.1),
                sales_row("王五", "上海", "Beta", 6.0),
            ],
            Vec::new(),
            GeoTables::standard(),
        )
    }

    #[test]
    fn team_view_sorts_best_first_with_boxplot() {
        let view = sample().team_view("上海");
        let names: Vec<&str> = view.teams.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
        let stats = view.boxplot.expect("three teams");
        assert_eq!(stats.min, 6.1);
        assert_eq!(stats.median, 7.9);
        assert_eq!(stats.max, 8.4);
    }

    #[test]
    fn team_without_members_has_empty_sales_view() {
        let view = sample().sales_view("广州", "B队");
        assert!(view.members.is_empty());
        assert!(view.boxplot.is_none());
        assert_eq!(view.team_record.map(|t| t.composite), Some(8.5));
    }

    #[test]
    fn sales_view_lists_members_best_first() {
        let view = sample().sales_view("上海", "Alpha");
        let names: Vec<&str> = view.members.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["李四", "张三"]);
        assert_eq!(view.baseline.composite, (7.0 + 9.1 + 6.0) / 3.0);
    }

    #[test]
    fn person_view_requires_matching_team() {
        let snapshot = sample();
        let view = snapshot.person_view("上海", "Alpha", "李四").expect("member");
        assert_eq!(view.band, ScoreBand::Excellent);
        assert!(snapshot.person_view("上海", "Beta", "李四").is_none());
    }

    #[test]
    fn regions_without_cities_use_call_center() {
        let snapshot = sample();
        assert_eq!(snapshot.fallback_score, 6.3);
        let xinjiang = snapshot
            .regions
            .iter()
            .find(|r| r.name == "新疆")
            .expect("新疆");
        assert_eq!(xinjiang.composite, 6.3);
        assert_eq!(snapshot.city_score("拉萨"), 6.3);
        assert_eq!(snapshot.city_score("上海"), 7.2);
    }

    #[test]
    fn empty_snapshot_still_scores_every_region() {
        let snapshot = Snapshot::empty(GeoTables::standard());
        assert!(snapshot.is_empty());
        let summary = snapshot.summary();
        assert_eq!(summary.regions.len(), 31);
        assert_eq!(summary.regions_on_fallback, 31);
        assert_eq!(summary.fallback_score, CALL_CENTER_DEFAULT_SCORE);
        assert_eq!(summary.national_average, 0.0);
    }

    #[tokio::test]
    async fn missing_sources_degrade_to_empty_snapshot() {
        let data = DataConfig {
            data_dir: PathBuf::from("/definitely/not/a/dir"),
            city_source: None,
            team_source: None,
            sales_source: None,
            boundary_source: Some("/definitely/not/a/dir/china.json".to_string()),
        };
        let http = reqwest::Client::new();
        let snapshot = Snapshot::load(&data, GeoTables::standard(), &http).await;
        assert!(snapshot.is_empty());
        assert!(snapshot.boundaries.is_none());
        assert_eq!(snapshot.reports.len(), 3);
        assert!(snapshot.reports.iter().all(|r| r.error.is_some()));
        assert_eq!(snapshot.regions.len(), 31);
    }

    #[tokio::test]
    async fn loads_sources_from_disk() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dir = tmp.path();
        let dims = "主动掌控对话节奏,异议应对韧性,决策推进与闭环,量化价值呈现,灵活应变能力,情绪感染力";
        std::fs::write(
            dir.join("processed_city_data.csv"),
            format!("d5_name,城市士气综合得分,{dims}\n上海,7.2,1,2,3,4,5,6\n"),
        )
        .expect("write cities");
        std::fs::write(
            dir.join("processed_team_data.csv"),
            format!("城市,销售团队,团队士气综合得分,{dims}\n上海,Alpha,7.9,1,2,3,4,5,6\n"),
        )
        .expect("write teams");
        std::fs::write(
            dir.join("processed_sales_data.csv"),
            format!("user_name,城市,团队,销售士气综合得分,理由,{dims}\n张三,上海,Alpha,8.0,好,2,2,2,2,2,2\n张三,上海,Alpha,6.5,,4,4,4,4,4,4\n"),
        )
        .expect("write sales");

        let data = DataConfig {
            data_dir: dir.to_path_buf(),
            city_source: None,
            team_source: None,
            sales_source: None,
            boundary_source: None,
        };
        let http = reqwest::Client::new();
        let snapshot = Snapshot::load(&data, GeoTables::standard(), &http).await;

        assert_eq!(snapshot.cities.len(), 1);
        assert_eq!(snapshot.teams.len(), 1);
        assert_eq!(snapshot.salespeople.len(), 1);
        let zhang = &snapshot.salespeople[0];
        assert_eq!(zhang.composite, 6.5);
        assert_eq!(zhang.scores.values(), [3.0; 6]);
        assert!(snapshot.reports.iter().all(|r| r.error.is_none()));
    }

    #[tokio::test]
    async fn boundary_document_is_loaded_with_short_names() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("china.json");
        std::fs::write(
            &path,
            r#"{"features":[{"properties":{"name":"广东省"}},{"properties":{"name":"南海诸岛"}}]}"#,
        )
        .expect("write boundaries");

        let data = DataConfig {
            data_dir: tmp.path().to_path_buf(),
            city_source: None,
            team_source: None,
            sales_source: None,
            boundary_source: Some(path.display().to_string()),
        };
        let http = reqwest::Client::new();
        let snapshot = Snapshot::load(&data, GeoTables::standard(), &http).await;

        let document = snapshot.boundaries.expect("boundaries loaded");
        assert_eq!(document["features"][0]["properties"]["name"], "广东");
        assert_eq!(document["features"][1]["properties"]["name"], "南海诸岛");
    }
}
