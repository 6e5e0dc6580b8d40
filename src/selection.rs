use crate::types::{Salesperson, Team};
use serde::Serialize;

/// Drill-down position: city, then team, then salesperson.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state")]
pub enum Selection {
    #[default]
    NoSelection,
    CitySelected {
        city: String,
    },
    TeamSelected {
        city: String,
        team: String,
    },
    SalespersonSelected {
        city: String,
        team: String,
        person: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("select a city before choosing a team")]
    NoCity,
    #[error("select a team before choosing a salesperson")]
    NoTeam,
}

impl Selection {
    /// Entry from navigation parameters. City and team together land on
    /// `TeamSelected`; a team without a city is ignored. Blank values count
    /// as absent.
    pub fn from_seed(city: Option<&str>, team: Option<&str>) -> Self {
        let city = city.filter(|c| !c.trim().is_empty());
        let team = team.filter(|t| !t.trim().is_empty());
        match (city, team) {
            (Some(city), Some(team)) => Selection::TeamSelected {
                city: city.to_string(),
                team: team.to_string(),
            },
            (Some(city), None) => Selection::CitySelected {
                city: city.to_string(),
            },
            _ => Selection::NoSelection,
        }
    }

    /// Always allowed; clears team and salesperson.
    pub fn select_city(&mut self, city: &str) {
        *self = Selection::CitySelected {
            city: city.to_string(),
        };
    }

    /// Clears the salesperson.
    pub fn select_team(&mut self, team: &str) -> Result<(), SelectionError> {
        let city = self.city().ok_or(SelectionError::NoCity)?.to_string();
        *self = Selection::TeamSelected {
            city,
            team: team.to_string(),
        };
        Ok(())
    }

    pub fn select_salesperson(&mut self, person: &str) -> Result<(), SelectionError> {
        let (city, team) = match self {
            Selection::TeamSelected { city, team }
            | Selection::SalespersonSelected { city, team, .. } => (city.clone(), team.clone()),
            Selection::CitySelected { .. } => return Err(SelectionError::NoTeam),
            Selection::NoSelection => return Err(SelectionError::NoCity),
        };
        *self = Selection::SalespersonSelected {
            city,
            team,
            person: person.to_string(),
        };
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Selection::NoSelection;
    }

    pub fn city(&self) -> Option<&str> {
        match self {
            Selection::NoSelection => None,
            Selection::CitySelected { city }
            | Selection::TeamSelected { city, .. }
            | Selection::SalespersonSelected { city, .. } => Some(city.as_str()),
        }
    }

    pub fn team(&self) -> Option<&str> {
        match self {
            Selection::TeamSelected { team, .. } | Selection::SalespersonSelected { team, .. } => {
                Some(team.as_str())
            }
            _ => None,
        }
    }

    pub fn person(&self) -> Option<&str> {
        match self {
            Selection::SalespersonSelected { person, .. } => Some(person.as_str()),
            _ => None,
        }
    }
}

/// Teams of one city. Exact, case-sensitive match.
pub fn teams_for_city<'a>(teams: &'a [Team], city: &str) -> Vec<&'a Team> {
    teams.iter().filter(|t| t.city == city).collect()
}

/// Members of one `{city, team}`. Empty when the team has no salespeople.
pub fn salespeople_for_team<'a>(
    people: &'a [Salesperson],
    city: &str,
    team: &str,
) -> Vec<&'a Salesperson> {
    people
        .iter()
        .filter(|p| p.city == city && p.team == team)
        .collect()
}
