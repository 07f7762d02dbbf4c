// Response bodies of the Atlas UI endpoints. Unknown fields are ignored.

use serde::Deserialize;

use super::traits::EnvironmentPage;

#[derive(Debug, Deserialize)]
pub struct EnvironmentsResponse {
    pub environments: Vec<EnvironmentEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentEntry {
    pub name: String,
    pub current_state_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct StateVersionsResponse {
    pub state_versions: Vec<StateVersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateVersionEntry {
    pub version: i64,
}

impl EnvironmentsResponse {
    /// Collapse the listing into a name to state id map.
    pub fn into_page(self) -> EnvironmentPage {
        self.environments
            .into_iter()
            .map(|env| (env.name, env.current_state_id))
            .collect()
    }
}

impl StateVersionsResponse {
    /// The API lists newest first.
    pub fn latest(&self) -> Option<i64> {
        self.state_versions.first().map(|v| v.version)
    }
}
