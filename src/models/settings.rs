use serde::Serialize;

use crate::models::tracker::WeightUnit;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Masked; the plaintext key never leaves the settings service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rapidapi_key: Option<String>,
    /// Which template index is "today" (0..=6).
    pub rotation_offset: u8,
    /// IANA timezone used to resolve "today" for the schedule.
    pub timezone: String,
    pub weight_unit: WeightUnit,
    pub theme: String,
    pub updated_at: String,
}
