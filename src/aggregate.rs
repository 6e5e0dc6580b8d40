use crate::geo::{GeoTables, CALL_CENTER_DEFAULT_SCORE};
use crate::stats::{compute_mean_vector, mean_of_positive};
use crate::types::{
    Baseline, City, CityRecord, Coordinate, Dimension, Region, SalesRecord, Salesperson,
    ScoreVector, Team, TeamRecord,
};
use crate::util::{average, validate_composite};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Collapse per-call rows into one record per salesperson.
///
/// Groups are keyed by name and keep first-appearance order. Dimensions are
/// averaged across the group. The composite score is taken from the last row
/// of the group rather than averaged; city and team come from the first row.
pub fn aggregate_salespeople(rows: &[SalesRecord]) -> Vec<Salesperson> {
    struct Acc {
        name: String,
        city: String,
        team: String,
        vectors: Vec<ScoreVector>,
        composite: f64,
        morale_label: String,
        rationale: Vec<String>,
    }

    let mut order: Vec<Acc> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for r in rows {
        let slot = *index.entry(r.name.as_str()).or_insert_with(|| {
            order.push(Acc {
                name: r.name.clone(),
                city: r.city.clone(),
                team: r.team.clone(),
                vectors: Vec::new(),
                composite: r.composite,
                morale_label: String::new(),
                rationale: Vec::new(),
            });
            order.len() - 1
        });
        let acc = &mut order[slot];
        acc.vectors.push(r.scores);
        acc.composite = r.composite;
        if !r.morale_label.is_empty() {
            acc.morale_label = r.morale_label.clone();
        }
        if !r.rationale.is_empty() {
            acc.rationale.push(r.rationale.clone());
        }
    }

    order
        .into_iter()
        .map(|acc| Salesperson {
            scores: compute_mean_vector(&acc.vectors),
            composite: validate_composite(acc.composite),
            morale_label: acc.morale_label,
            rationale: acc.rationale.join("\n"),
            call_count: acc.vectors.len(),
            name: acc.name,
            city: acc.city,
            team: acc.team,
        })
        .collect()
}

/// Team rows arrive pre-aggregated, so this is mostly a reshape. Rows that
/// share a `{city, team}` key are merged by mean.
pub fn aggregate_teams(rows: &[TeamRecord]) -> Vec<Team> {
    let mut order: Vec<(String, String, Vec<ScoreVector>, Vec<f64>)> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    for r in rows {
        let slot = *index
            .entry((r.city.as_str(), r.team.as_str()))
            .or_insert_with(|| {
                order.push((r.city.clone(), r.team.clone(), Vec::new(), Vec::new()));
                order.len() - 1
            });
        let (_, _, vectors, composites) = &mut order[slot];
        vectors.push(r.scores);
        composites.push(validate_composite(r.composite));
    }

    if order.len() < rows.len() {
        debug!(
            rows = rows.len(),
            teams = order.len(),
            "merged duplicate team rows"
        );
    }

    order
        .into_iter()
        .map(|(city, name, vectors, composites)| Team {
            city,
            name,
            scores: compute_mean_vector(&vectors),
            composite: validate_composite(average(&composites)),
        })
        .collect()
}

/// One city per source row, placed at its known coordinate or the origin.
pub fn aggregate_cities(rows: &[CityRecord], geo: &GeoTables) -> Vec<City> {
    rows.iter()
        .map(|r| {
            let coordinate = geo.coordinate_of(&r.name).unwrap_or_else(|| {
                warn!(city = %r.name, "no coordinate for city, placing at origin");
                Coordinate::ORIGIN
            });
            City {
                name: r.name.clone(),
                composite: validate_composite(r.composite),
                scores: r.scores,
                coordinate,
            }
        })
        .collect()
}

/// Score of the fallback entity: the call-center city if loaded, otherwise
/// [`CALL_CENTER_DEFAULT_SCORE`].
pub fn fallback_score(cities: &[City], geo: &GeoTables) -> f64 {
    cities
        .iter()
        .find(|c| c.name == geo.fallback_locality())
        .map(|c| c.composite)
        .unwrap_or(CALL_CENTER_DEFAULT_SCORE)
}

/// Score every region in the fixed enumeration.
///
/// A region's score is the mean composite of the cities mapped to it. A
/// region with no mapped cities gets the fallback entity's score. Cities
/// without a region mapping are left out.
pub fn aggregate_regions(cities: &[City], geo: &GeoTables) -> Vec<Region> {
    let grouped = scores_by_region(cities, geo);
    let fallback = fallback_score(cities, geo);

    geo.regions()
        .iter()
        .map(|region| match grouped.get(region.as_str()) {
            Some(scores) if !scores.is_empty() => Region {
                name: region.clone(),
                composite: average(scores),
                city_count: scores.len(),
                fallback: false,
            },
            _ => Region {
                name: region.clone(),
                composite: fallback,
                city_count: 0,
                fallback: true,
            },
        })
        .collect()
}

fn scores_by_region<'a>(cities: &[City], geo: &'a GeoTables) -> HashMap<&'a str, Vec<f64>> {
    let mut grouped: HashMap<&str, Vec<f64>> = HashMap::new();
    for city in cities {
        match geo.region_of(&city.name) {
            Some(region) => grouped.entry(region).or_default().push(city.composite),
            None => warn!(city = %city.name, "no region mapping for city, leaving it out"),
        }
    }
    grouped
}

/// Cities contributing to one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionDetail {
    pub region: String,
    pub cities: Vec<City>,
    pub average: f64,
}

/// Group loaded cities under their regions, in region enumeration order.
/// Regions with no cities are omitted.
pub fn group_cities_by_region(cities: &[City], geo: &GeoTables) -> Vec<RegionDetail> {
    let mut grouped: HashMap<&str, Vec<City>> = HashMap::new();
    for city in cities {
        if let Some(region) = geo.region_of(&city.name) {
            grouped.entry(region).or_default().push(city.clone());
        }
    }

    geo.regions()
        .iter()
        .filter_map(|region| {
            let cities = grouped.remove(region.as_str())?;
            let scores: Vec<f64> = cities.iter().map(|c| c.composite).collect();
            Some(RegionDetail {
                region: region.clone(),
                average: average(&scores),
                cities,
            })
        })
        .collect()
}

/// Sorted cities, each with its sorted set of team names.
pub fn city_team_index(teams: &[Team]) -> BTreeMap<String, BTreeSet<String>> {
    let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for team in teams {
        index
            .entry(team.city.clone())
            .or_default()
            .insert(team.name.clone());
    }
    index
}

/// Team radar baseline. Zero and negative values are treated as missing.
pub fn team_baseline(teams: &[Team]) -> Baseline {
    let mut scores = ScoreVector::zero();
    for dimension in Dimension::ALL {
        scores.set(
            dimension,
            mean_of_positive(teams.iter().map(|t| t.scores.get(dimension))),
        );
    }
    Baseline {
        scores,
        composite: mean_of_positive(teams.iter().map(|t| t.composite)),
    }
}

/// Plain mean over every salesperson, shown as the "平均值" series.
pub fn salesperson_baseline(people: &[Salesperson]) -> Baseline {
    let vectors: Vec<ScoreVector> = people.iter().map(|p| p.scores).collect();
    let composites: Vec<f64> = people.iter().map(|p| p.composite).collect();
    Baseline {
        scores: compute_mean_vector(&vectors),
        composite: average(&composites),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::FALLBACK_LOCALITY;

    fn sales_row(name: &str, closing: f64, composite: f64, rationale: &str) -> SalesRecord {
        labelled_row(name, closing, composite, rationale, "")
    }

    fn labelled_row(
        name: &str,
        closing: f64,
        composite: f64,
        rationale: &str,
        label: &str,
    ) -> SalesRecord {
        let mut scores = ScoreVector::zero();
        scores.set(Dimension::ClosingDrive, closing);
        SalesRecord {
            name: name.to_string(),
            city: "上海".to_string(),
            team: "Alpha".to_string(),
            composite,
            morale_label: label.to_string(),
            rationale: rationale.to_string(),
            scores,
        }
    }

    fn city(name: &str, composite: f64) -> City {
        City {
            name: name.to_string(),
            composite,
            scores: ScoreVector::zero(),
            coordinate: Coordinate::ORIGIN,
        }
    }

    fn team(city: &str, name: &str, composite: f64) -> Team {
        Team {
            city: city.to_string(),
            name: name.to_string(),
            scores: ScoreVector::from_values([composite; 6]),
            composite,
        }
    }

    #[test]
    fn salesperson_dimensions_average_but_composite_is_last_row() {
        let rows = vec![
            sales_row("张三", 2.0, 6.0, "first call"),
            sales_row("张三", 4.0, 7.0, ""),
            sales_row("张三", 6.0, 8.0, "third call"),
        ];
        let people = aggregate_salespeople(&rows);

        assert_eq!(people.len(), 1);
        let p = &people[0];
        assert_eq!(p.scores.get(Dimension::ClosingDrive), 4.0);
        assert_eq!(p.composite, 8.0);
        assert_eq!(p.rationale, "first call\nthird call");
        assert_eq!(p.call_count, 3);
    }

    #[test]
    fn salespeople_keep_first_appearance_order() {
        let rows = vec![
            sales_row("李四", 5.0, 6.0, ""),
            sales_row("张三", 5.0, 6.0, ""),
            sales_row("李四", 5.0, 6.0, ""),
        ];
        let names: Vec<String> = aggregate_salespeople(&rows)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["李四", "张三"]);
    }

    #[test]
    fn morale_label_comes_from_latest_labelled_call() {
        let rows = vec![
            labelled_row("张三", 5.0, 6.0, "", "一般"),
            labelled_row("张三", 5.0, 7.0, "", "积极"),
            labelled_row("张三", 5.0, 8.0, "", ""),
        ];
        let people = aggregate_salespeople(&rows);
        assert_eq!(people[0].morale_label, "积极");
    }

    #[test]
    fn salesperson_without_rationale_has_empty_text() {
        let people = aggregate_salespeople(&[sales_row("王五", 5.0, 6.0, "")]);
        assert_eq!(people[0].rationale, "");
    }

    #[test]
    fn duplicate_team_rows_are_merged() {
        let rows = vec![
            TeamRecord {
                city: "杭州".to_string(),
                team: "KA1".to_string(),
                composite: 6.0,
                scores: ScoreVector::from_values([2.0; 6]),
            },
            TeamRecord {
                city: "杭州".to_string(),
                team: "KA1".to_string(),
                composite: 8.0,
                scores: ScoreVector::from_values([4.0; 6]),
            },
            TeamRecord {
                city: "上海".to_string(),
                team: "KA1".to_string(),
                composite: 0.0,
                scores: ScoreVector::zero(),
            },
        ];
        let teams = aggregate_teams(&rows);
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].composite, 7.0);
        assert_eq!(teams[0].scores.values(), [3.0; 6]);
        // Same team name in another city is a different team.
        assert_eq!(teams[1].city, "上海");
        assert_eq!(teams[1].composite, crate::util::COMPOSITE_FALLBACK);
    }

    #[test]
    fn unknown_city_sits_at_origin() {
        let rows = vec![
            CityRecord {
                name: "上海".to_string(),
                composite: 7.0,
                scores: ScoreVector::zero(),
            },
            CityRecord {
                name: "火星".to_string(),
                composite: 7.0,
                scores: ScoreVector::zero(),
            },
        ];
        let cities = aggregate_cities(&rows, GeoTables::standard());
        assert_ne!(cities[0].coordinate, Coordinate::ORIGIN);
        assert_eq!(cities[1].coordinate, Coordinate::ORIGIN);
    }

    #[test]
    fn regions_average_their_cities() {
        let cities = vec![city("广州", 6.0), city("深圳", 8.0), city("上海", 7.5)];
        let regions = aggregate_regions(&cities, GeoTables::standard());
        assert_eq!(regions.len(), 31);

        let guangdong = regions.iter().find(|r| r.name == "广东").expect("广东");
        assert_eq!(guangdong.composite, 7.0);
        assert_eq!(guangdong.city_count, 2);
        assert!(!guangdong.fallback);
    }

    #[test]
    fn empty_region_takes_call_center_score() {
        let cities = vec![city("上海", 7.5), city(FALLBACK_LOCALITY, 6.4)];
        let regions = aggregate_regions(&cities, GeoTables::standard());
        let tibet = regions.iter().find(|r| r.name == "西藏").expect("西藏");
        assert_eq!(tibet.composite, 6.4);
        assert!(tibet.fallback);
        assert_eq!(tibet.city_count, 0);
    }

    #[test]
    fn empty_region_without_call_center_uses_default() {
        let regions = aggregate_regions(&[], GeoTables::standard());
        assert!(regions
            .iter()
            .all(|r| r.composite == CALL_CENTER_DEFAULT_SCORE && r.fallback));
    }

    #[test]
    fn unmapped_city_is_left_out_of_regions() {
        let cities = vec![city("火星", 1.0)];
        let regions = aggregate_regions(&cities, GeoTables::standard());
        assert!(regions.iter().all(|r| r.fallback));
        assert!(group_cities_by_region(&cities, GeoTables::standard()).is_empty());
    }

    #[test]
    fn region_details_follow_enumeration_order() {
        let cities = vec![city("深圳", 8.0), city("北京", 7.0), city("广州", 6.0)];
        let details = group_cities_by_region(&cities, GeoTables::standard());
        let names: Vec<&str> = details.iter().map(|d| d.region.as_str()).collect();
        assert_eq!(names, vec!["北京", "广东"]);
        assert_eq!(details[1].cities.len(), 2);
        assert_eq!(details[1].average, 7.0);
    }

    #[test]
    fn index_sorts_cities_and_teams() {
        let teams = vec![
            team("杭州", "KA2", 6.0),
            team("上海", "Beta", 7.0),
            team("杭州", "KA1", 8.0),
            team("杭州", "KA1", 8.0),
        ];
        let index = city_team_index(&teams);
        let cities: Vec<&String> = index.keys().collect();
        assert_eq!(cities, vec!["上海", "杭州"]);
        let hz: Vec<&String> = index["杭州"].iter().collect();
        assert_eq!(hz, vec!["KA1", "KA2"]);
    }

    #[test]
    fn team_baseline_ignores_non_positive_values() {
        let teams = vec![team("杭州", "KA1", 6.0), team("杭州", "KA2", 8.0), team("杭州", "KA3", 0.0)];
        let baseline = team_baseline(&teams);
        assert_eq!(baseline.composite, 7.0);
        assert_eq!(baseline.scores.get(Dimension::DialoguePacing), 7.0);
    }

    #[test]
    fn salesperson_baseline_of_nobody_is_zero() {
        let baseline = salesperson_baseline(&[]);
        assert_eq!(baseline.scores, ScoreVector::zero());
        assert_eq!(baseline.composite, 0.0);
    }
}
