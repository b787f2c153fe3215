//! Classification facts: one ordered list of rider results per session

use serde::{Deserialize, Serialize};

use super::dimension::Rider;
use super::task::Task;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiderResult {
    pub rider: Rider,
    /// `None` for riders without a classified finish
    pub position: Option<i32>,
    pub points: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub season_id: String,
    pub event_id: String,
    pub category_id: String,
    pub session_id: String,
    pub results: Vec<RiderResult>,
}

impl Classification {
    /// Attach fetched results to the resource path of the task that fetched them.
    pub fn for_task(task: &Task, results: Vec<RiderResult>) -> Self {
        Self {
            season_id: task.season_id.clone(),
            event_id: task.event_id.clone(),
            category_id: task.category_id.clone(),
            session_id: task.session_id.clone(),
            results,
        }
    }
}

// ── Wire records ──

/// Body of `/session/{id}/classification`
#[derive(Debug, Deserialize)]
pub struct ClassificationBody {
    #[serde(default)]
    pub classification: Option<Vec<ResultRecord>>,
}

#[derive(Debug, Deserialize)]
pub struct ResultRecord {
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default, alias = "point")]
    pub points: Option<f64>,
    pub rider: RiderRecord,
    #[serde(default)]
    pub team: Option<NamedRecord>,
}

#[derive(Debug, Deserialize)]
pub struct RiderRecord {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub country: Option<NamedRecord>,
    #[serde(default)]
    pub number: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct NamedRecord {
    #[serde(default)]
    pub name: Option<String>,
}

impl From<ResultRecord> for RiderResult {
    fn from(r: ResultRecord) -> Self {
        let name_of = |n: Option<NamedRecord>| n.and_then(|n| n.name).unwrap_or_default();
        Self {
            rider: Rider {
                id: r.rider.id,
                name: r.rider.full_name,
                country: name_of(r.rider.country),
                team: name_of(r.team),
                number: r.rider.number,
            },
            position: r.position,
            points: r.points.unwrap_or(0.0),
        }
    }
}
