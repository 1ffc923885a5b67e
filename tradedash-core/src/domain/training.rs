//! Training modules, units and gamification records.
//!
//! Progress bookkeeping (unlocking, streaks, token totals) happens on the
//! server. The client reads these and posts per-unit completion.

use serde::{Deserialize, Deserializer, Serialize};

use super::{id, num};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    #[serde(deserialize_with = "id::string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default, deserialize_with = "num::flexible")]
    pub progress: f64,
    #[serde(default)]
    pub completed_units: u32,
    #[serde(default)]
    pub total_units: u32,
    #[serde(default = "unlocked_by_default")]
    pub is_unlocked: bool,
}

fn unlocked_by_default() -> bool {
    true
}

/// Module detail from `GET /training/modules/:id`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Module {
    #[serde(flatten)]
    pub summary: ModuleSummary,
    #[serde(default)]
    pub units: Vec<Unit>,
}

impl Module {
    pub fn completed_count(&self) -> usize {
        self.units.iter().filter(|u| u.is_completed).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UnitModuleRef {
    #[serde(deserialize_with = "id::string")]
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// A training unit. `content` is a JSON document whose shape depends on
/// `unit_type`; it is kept raw here and parsed by [`crate::training::UnitBody`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    #[serde(deserialize_with = "id::string")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "json_text")]
    pub content: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default, alias = "type")]
    pub unit_type: String,
    #[serde(default)]
    pub progress: serde_json::Value,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub module: Option<UnitModuleRef>,
}

/// Content is normally a JSON-encoded string, but some deployments inline
/// the object. Either way we keep the text.
fn json_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Body of `POST /training/units/:id/progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProgressUpdate {
    pub completed: bool,
    pub time_spent: u64,
    pub tokens_earned: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    #[serde(default)]
    pub total_tokens: u32,
    #[serde(default)]
    pub completed_units: u32,
    #[serde(default)]
    pub total_units: u32,
    #[serde(default)]
    pub completed_quizzes: u32,
    #[serde(default)]
    pub current_phase: String,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub achievements: u32,
    #[serde(default)]
    pub badges: u32,
    #[serde(default)]
    pub recent_achievements: Vec<serde_json::Value>,
    #[serde(default)]
    pub earned_badges: Vec<serde_json::Value>,
}

impl UserProgress {
    /// Completed share in percent, 0 when there are no units.
    pub fn percent(&self) -> f64 {
        if self.total_units == 0 {
            0.0
        } else {
            f64::from(self.completed_units) / f64::from(self.total_units) * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    #[serde(deserialize_with = "id::string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub tokens_reward: u32,
    #[serde(default)]
    pub earned: bool,
    #[serde(default)]
    pub earned_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    #[serde(deserialize_with = "id::string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub requirement: String,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub earned: bool,
    #[serde(default)]
    pub earned_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(deserialize_with = "id::string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tokens: u32,
    #[serde(default)]
    pub current_phase: String,
    #[serde(default)]
    pub completed_units: u32,
    #[serde(default)]
    pub achievements: u32,
    #[serde(default)]
    pub badges: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_content_accepts_string_or_object() {
        let a: Unit = serde_json::from_str(
            r#"{"id":"u1","title":"RSI","unitType":"flashcard",
                "content":"{\"question\":\"q\",\"answer\":\"a\"}"}"#,
        )
        .unwrap();
        let b: Unit = serde_json::from_str(
            r#"{"id":"u1","title":"RSI","unitType":"flashcard",
                "content":{"question":"q","answer":"a"}}"#,
        )
        .unwrap();
        let pa: serde_json::Value = serde_json::from_str(&a.content).unwrap();
        let pb: serde_json::Value = serde_json::from_str(&b.content).unwrap();
        assert_eq!(pa, pb);
    }

    #[test]
    fn module_detail_flattens_summary() {
        let m: Module = serde_json::from_str(
            r#"{"id":"m1","title":"Basics","description":"d","phase":"beginner",
                "units":[{"id":7,"title":"t","unitType":"quiz","isCompleted":true}]}"#,
        )
        .unwrap();
        assert_eq!(m.summary.id, "m1");
        assert_eq!(m.units[0].id, "7");
        assert_eq!(m.completed_count(), 1);
    }

    #[test]
    fn progress_update_omits_missing_score() {
        let body = UnitProgressUpdate {
            completed: true,
            time_spent: 42,
            tokens_earned: 10,
            score: None,
        };
        let v = serde_json::to_value(body).unwrap();
        assert_eq!(v["timeSpent"], 42);
        assert!(v.get("score").is_none());
    }
}
