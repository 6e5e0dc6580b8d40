use crate::types::{
    CityRecord, RawCityRow, RawDimensions, RawSalesRow, RawTeamRow, SalesRecord, ScoreVector,
    TeamRecord,
};
use crate::util::{composite_or_fallback, parse_f64_safe, score_or_zero, text_or_empty};
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use tracing::{debug, warn};

/// What happened while reading one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub source: String,
    pub total_rows: usize,
    pub kept_rows: usize,
    /// Rows that could not be deserialized at all.
    pub malformed_rows: usize,
    /// Rows dropped because their identifying key was empty.
    pub skipped_rows: usize,
    /// Numeric fields replaced by a default: unparseable dimensions, and
    /// composites that were missing, unparseable or not positive.
    pub coerced_fields: usize,
    pub error: Option<String>,
}

impl LoadReport {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Self::default()
        }
    }

    pub fn unavailable(source: &str, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(source)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kept_rows == 0
    }
}

pub fn parse_cities<R: Read>(reader: R, source: &str) -> (Vec<CityRecord>, LoadReport) {
    let mut report = LoadReport::new(source);
    let rows: Vec<RawCityRow> = read_rows(reader, &mut report);

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let name = text_or_empty(row.name.clone());
        if name.is_empty() {
            report.skipped_rows += 1;
            continue;
        }
        let scores = coerce_dimensions(&row, &mut report);
        let composite = coerce_composite(row.composite.as_deref(), &mut report);
        records.push(CityRecord {
            name,
            composite,
            scores,
        });
    }

    finish(report, records)
}

pub fn parse_teams<R: Read>(reader: R, source: &str) -> (Vec<TeamRecord>, LoadReport) {
    let mut report = LoadReport::new(source);
    let rows: Vec<RawTeamRow> = read_rows(reader, &mut report);

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let city = text_or_empty(row.city.clone());
        let team = text_or_empty(row.team.clone());
        if city.is_empty() || team.is_empty() {
            report.skipped_rows += 1;
            continue;
        }
        let scores = coerce_dimensions(&row, &mut report);
        let composite = coerce_composite(
            first_present(row.composite.as_deref(), row.composite_wrapped.as_deref()),
            &mut report,
        );
        records.push(TeamRecord {
            city,
            team,
            composite,
            scores,
        });
    }

    finish(report, records)
}

pub fn parse_sales<R: Read>(reader: R, source: &str) -> (Vec<SalesRecord>, LoadReport) {
    let mut report = LoadReport::new(source);
    let rows: Vec<RawSalesRow> = read_rows(reader, &mut report);

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let name = text_or_empty(row.name.clone());
        if name.is_empty() {
            report.skipped_rows += 1;
            continue;
        }
        let scores = coerce_dimensions(&row, &mut report);
        let composite = coerce_composite(row.composite.as_deref(), &mut report);
        let city = first_present(row.city.as_deref(), row.city_code.as_deref()).map(str::to_string);
        let team = first_present(row.team.as_deref(), row.team_code.as_deref()).map(str::to_string);
        records.push(SalesRecord {
            name,
            city: text_or_empty(city),
            team: text_or_empty(team),
            composite,
            morale_label: text_or_empty(row.morale_label),
            rationale: text_or_empty(row.rationale),
            scores,
        });
    }

    finish(report, records)
}

fn read_rows<T, R>(reader: R, report: &mut LoadReport) -> Vec<T>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    if let Err(e) = rdr.headers() {
        warn!(source = %report.source, error = %e, "source has no readable header");
        report.error = Some(e.to_string());
        return Vec::new();
    }

    let mut rows = Vec::new();
    for result in rdr.deserialize::<T>() {
        report.total_rows += 1;
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                debug!(source = %report.source, error = %e, "skipping malformed row");
                report.malformed_rows += 1;
            }
        }
    }
    rows
}

fn coerce_dimensions<T: RawDimensions>(row: &T, report: &mut LoadReport) -> ScoreVector {
    let mut values = [0.0; 6];
    for (slot, field) in values.iter_mut().zip(row.dimension_fields()) {
        if is_present(field) && parse_f64_safe(field).is_none() {
            report.coerced_fields += 1;
        }
        *slot = score_or_zero(field);
    }
    ScoreVector::from_values(values)
}

fn coerce_composite(field: Option<&str>, report: &mut LoadReport) -> f64 {
    let valid = parse_f64_safe(field).filter(|v| *v > 0.0);
    if valid.is_none() {
        report.coerced_fields += 1;
    }
    composite_or_fallback(field)
}

fn is_present(field: Option<&str>) -> bool {
    field.map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Preferred column unless it is blank, then the alternate.
fn first_present<'a>(preferred: Option<&'a str>, alternate: Option<&'a str>) -> Option<&'a str> {
    if is_present(preferred) {
        preferred
    } else {
        alternate
    }
}

fn finish<T>(mut report: LoadReport, records: Vec<T>) -> (Vec<T>, LoadReport) {
    report.kept_rows = records.len();
    if report.malformed_rows > 0 || report.skipped_rows > 0 {
        warn!(
            source = %report.source,
            malformed = report.malformed_rows,
            skipped = report.skipped_rows,
            "some rows were not loaded"
        );
    }
    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dimension;
    use crate::util::COMPOSITE_FALLBACK;

    const DIMS: &str = "主动掌控对话节奏,异议应对韧性,决策推进与闭环,量化价值呈现,灵活应变能力,情绪感染力";

    #[test]
    fn city_rows_are_coerced_field_by_field() {
        let csv = format!(
            "d5_name,城市士气综合得分,{DIMS}\n\
             上海,7.1,6,5,4,3,2,1\n\
             北京,abc,x,5,,3,2,1\n\
             ,6.0,1,1,1,1,1,1\n"
        );
        let (cities, report) = parse_cities(csv.as_bytes(), "cities");

        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].name, "上海");
        assert_eq!(cities[0].composite, 7.1);
        assert_eq!(cities[0].scores.get(Dimension::EmotionalResonance), 1.0);

        assert_eq!(cities[1].composite, COMPOSITE_FALLBACK);
        assert_eq!(cities[1].scores.get(Dimension::DialoguePacing), 0.0);
        assert_eq!(cities[1].scores.get(Dimension::ClosingDrive), 0.0);

        assert_eq!(report.total_rows, 3);
        assert_eq!(report.kept_rows, 2);
        assert_eq!(report.skipped_rows, 1);
        // "abc" composite and "x" dimension; the blank dimension is absent, not coerced.
        assert_eq!(report.coerced_fields, 2);
    }

    #[test]
    fn team_composite_found_under_either_header() {
        let plain = format!("城市,销售团队,团队士气综合得分,{DIMS}\n广州,B队,8.5,1,2,3,4,5,6\n");
        let (teams, _) = parse_teams(plain.as_bytes(), "teams");
        assert_eq!(teams[0].composite, 8.5);

        let wrapped = format!("城市,销售团队,\"团队士气综合\n得分\",{DIMS}\n广州,B队,8.5,1,2,3,4,5,6\n");
        let (teams, _) = parse_teams(wrapped.as_bytes(), "teams");
        assert_eq!(teams[0].composite, 8.5);
        assert_eq!(teams[0].scores.get(Dimension::EmotionalResonance), 6.0);
    }

    #[test]
    fn team_rows_without_key_are_skipped() {
        let csv = format!("城市,销售团队,团队士气综合得分,{DIMS}\n广州,,8.5,1,2,3,4,5,6\n广州,A队,0,1,2,3,4,5,6\n");
        let (teams, report) = parse_teams(csv.as_bytes(), "teams");
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].composite, COMPOSITE_FALLBACK);
        assert_eq!(report.skipped_rows, 1);
    }

    #[test]
    fn sales_rows_accept_alternate_city_and_team_columns() {
        let csv = format!(
            "user_name,city,d8_name,销售士气综合得分,理由,{DIMS}\n\
             张三,上海,Alpha,8.2,开场清晰,1,2,3,4,5,6\n"
        );
        let (rows, report) = parse_sales(csv.as_bytes(), "sales");
        assert_eq!(report.kept_rows, 1);
        assert_eq!(rows[0].city, "上海");
        assert_eq!(rows[0].team, "Alpha");
        assert_eq!(rows[0].rationale, "开场清晰");
        assert_eq!(rows[0].morale_label, "");
    }

    #[test]
    fn both_header_variants_fall_back_per_row() {
        let teams = format!(
            "城市,销售团队,团队士气综合得分,\"团队士气综合\n得分\",{DIMS}\n\
             广州,B队,,8.5,1,2,3,4,5,6\n\
             广州,C队,7.5,9.0,1,2,3,4,5,6\n"
        );
        let (teams, report) = parse_teams(teams.as_bytes(), "teams");
        assert_eq!(report.malformed_rows, 0);
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].composite, 8.5);
        assert_eq!(teams[1].composite, 7.5);

        let sales = format!(
            "user_name,城市,city,团队,d8_name,销售士气综合得分,{DIMS}\n\
             张三,,上海,,Alpha,8.2,1,2,3,4,5,6\n\
             李四,北京,上海,Beta,Alpha,7.0,1,2,3,4,5,6\n"
        );
        let (rows, report) = parse_sales(sales.as_bytes(), "sales");
        assert_eq!(report.malformed_rows, 0);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].city.as_str(), rows[0].team.as_str()), ("上海", "Alpha"));
        assert_eq!((rows[1].city.as_str(), rows[1].team.as_str()), ("北京", "Beta"));
    }

    #[test]
    fn empty_input_is_an_error_free_empty_load() {
        let (rows, report) = parse_sales("".as_bytes(), "sales");
        assert!(rows.is_empty());
        assert!(report.is_empty());
        assert_eq!(report.total_rows, 0);
    }
}
