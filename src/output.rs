use crate::snapshot::{CityOverview, PersonView, SalesView, TeamView};
use crate::stats::score_color_band;
use crate::types::{
    Baseline, BoxplotRow, BoxplotStats, CityRow, Dimension, DimensionRow, RankedRow, RegionRow,
    ScoreVector,
};
use crate::util::format_score;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Placeholder printed wherever a chart would have no data to draw.
pub const NO_DATA: &str = "暂无数据";

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    preview_table_rows(rows, max_rows);
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("({})\n", NO_DATA);
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

// Row builders. Kept separate from printing so exports and tests can reuse them.

pub fn region_rows(overview: &CityOverview) -> Vec<RegionRow> {
    overview
        .regions
        .iter()
        .map(|r| RegionRow {
            region: r.name.clone(),
            score: format_score(r.composite),
            cities: r.city_count,
            source: if r.fallback { "fallback" } else { "cities" }.to_string(),
        })
        .collect()
}

pub fn city_rows(overview: &CityOverview) -> Vec<CityRow> {
    overview
        .cities
        .iter()
        .map(|c| {
            let band = score_color_band(c.composite);
            CityRow {
                city: c.name.clone(),
                score: format_score(c.composite),
                band: band.label().to_string(),
                color: band.color().to_string(),
                lon: format!("{:.4}", c.coordinate.lon),
                lat: format!("{:.4}", c.coordinate.lat),
            }
        })
        .collect()
}

fn ranked_rows<'a>(entries: impl Iterator<Item = (&'a str, f64)>) -> Vec<RankedRow> {
    entries
        .enumerate()
        .map(|(i, (name, score))| RankedRow {
            rank: i + 1,
            name: name.to_string(),
            score: format_score(score),
            band: score_color_band(score).label().to_string(),
        })
        .collect()
}

pub fn team_rows(view: &TeamView) -> Vec<RankedRow> {
    ranked_rows(view.teams.iter().map(|t| (t.name.as_str(), t.composite)))
}

pub fn member_rows(view: &SalesView) -> Vec<RankedRow> {
    ranked_rows(view.members.iter().map(|p| (p.name.as_str(), p.composite)))
}

pub fn boxplot_rows(stats: Option<&BoxplotStats>) -> Vec<BoxplotRow> {
    stats
        .map(|s| BoxplotRow {
            min: format_score(s.min),
            q1: format_score(s.q1),
            median: format_score(s.median),
            q3: format_score(s.q3),
            max: format_score(s.max),
        })
        .into_iter()
        .collect()
}

/// Radar series: one row per dimension plus the composite, against a baseline.
pub fn dimension_rows(
    scores: &ScoreVector,
    composite: f64,
    baseline: &Baseline,
) -> Vec<DimensionRow> {
    let mut rows: Vec<DimensionRow> = Dimension::ALL
        .iter()
        .zip(scores.values().into_iter().zip(baseline.scores.values()))
        .map(|(d, (value, base))| DimensionRow {
            dimension: d.column().to_string(),
            value: format_score(value),
            baseline: format_score(base),
        })
        .collect();
    rows.push(DimensionRow {
        dimension: "综合得分".to_string(),
        value: format_score(composite),
        baseline: format_score(baseline.composite),
    });
    rows
}

pub fn print_overview(overview: &CityOverview) {
    preview_table(
        "Regional morale",
        Some("regions without cities use the call-center score"),
        &region_rows(overview),
        usize::MAX,
    );
    preview_table("City morale", None, &city_rows(overview), usize::MAX);
}

pub fn print_team_view(view: &TeamView) {
    let title = format!("Teams in {}", view.city);
    preview_table(&title, Some("sorted by composite"), &team_rows(view), usize::MAX);
    preview_table("Team score distribution", None, &boxplot_rows(view.boxplot.as_ref()), 1);
}

pub fn print_sales_view(view: &SalesView) {
    let title = format!("{} / {}", view.city, view.team);
    if let Some(team) = &view.team_record {
        preview_table(
            &title,
            Some("baseline: salesperson 平均值"),
            &dimension_rows(&team.scores, team.composite, &view.baseline),
            usize::MAX,
        );
    } else {
        println!("\n{}", title);
    }

    if view.members.is_empty() {
        println!("(no members)\n");
        return;
    }
    preview_table("Members", Some("sorted by composite"), &member_rows(view), usize::MAX);
    preview_table("Member score distribution", None, &boxplot_rows(view.boxplot.as_ref()), 1);
}

/// One-line header under a salesperson's radar table.
pub fn person_note(view: &PersonView) -> String {
    let p = &view.person;
    let label = if p.morale_label.is_empty() {
        NO_DATA
    } else {
        p.morale_label.as_str()
    };
    format!(
        "{} calls, band {}, 销售士气 {}",
        p.call_count,
        view.band.label(),
        label
    )
}

pub fn print_person_view(view: &PersonView) {
    let p = &view.person;
    let title = format!("{} ({} / {})", p.name, p.city, p.team);
    let note = person_note(view);
    preview_table(
        &title,
        Some(&note),
        &dimension_rows(&p.scores, p.composite, &view.baseline),
        usize::MAX,
    );
    if p.rationale.is_empty() {
        println!("理由: {}\n", NO_DATA);
    } else {
        println!("理由:\n{}\n", p.rationale);
    }
}
