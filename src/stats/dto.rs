use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::logs::repo_types::WatchMethod;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    #[serde(default)]
    pub year_from: Option<i32>,
    #[serde(default)]
    pub year_to: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_watches: u64,
    pub unique_titles: u64,
    pub total_rewatches: u64,
    pub total_minutes: u64,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    /// Always holds all five methods.
    pub by_method: BTreeMap<WatchMethod, u64>,
}

/// Viewing pace is not computed yet; every field is a zero placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pace {
    pub implemented: bool,
    pub watches_per_week: f64,
    pub watches_per_month: f64,
    pub minutes_per_week: f64,
}

impl Pace {
    pub fn placeholder() -> Self {
        Self {
            implemented: false,
            watches_per_week: 0.0,
            watches_per_month: 0.0,
            minutes_per_week: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsResponse {
    pub summary: Summary,
    pub distribution: Distribution,
    pub pace: Pace,
}
