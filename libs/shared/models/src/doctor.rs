use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    /// Nil when registering; the directory assigns one.
    #[serde(default)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub specialty: String,
    pub license_number: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-text availability, e.g. "Mon-Fri 09:00-17:00". Not interpreted.
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("specialty", &self.specialty),
            ("license_number", &self.license_number),
        ];

        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}
