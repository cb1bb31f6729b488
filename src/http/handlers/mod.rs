pub mod auth;
pub mod classes;
pub mod locations;
pub mod students;
pub mod teachers;
pub mod users;

use serde::Deserialize;

/// Common list query: offset pagination plus the two reference filters.
/// `limit=0` means "all".
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub location: Option<String>,
    pub class: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(10)
    }
}
