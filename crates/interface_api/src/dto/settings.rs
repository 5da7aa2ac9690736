//! Settings DTOs

use serde::{Deserialize, Serialize};

use core_kernel::{CoreError, Kwh};
use domain_metering::BaselineSettings;

/// New baseline readings; `null` leaves a meter unset
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    pub top: Option<Kwh>,
    #[serde(default)]
    pub bottom: Option<Kwh>,
}

impl SettingsRequest {
    /// Readings as settings, rejecting negative values
    pub fn into_settings(self) -> Result<BaselineSettings, CoreError> {
        for (name, value) in [("top", self.top), ("bottom", self.bottom)] {
            if value.is_some_and(|v| v.is_negative()) {
                return Err(CoreError::out_of_range(name, "baseline reading must not be negative"));
            }
        }
        Ok(BaselineSettings {
            top: self.top,
            bottom: self.bottom,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub top: Option<Kwh>,
    pub bottom: Option<Kwh>,
    pub is_set: bool,
}

impl From<BaselineSettings> for SettingsResponse {
    fn from(settings: BaselineSettings) -> Self {
        Self {
            top: settings.top,
            bottom: settings.bottom,
            is_set: settings.is_set(),
        }
    }
}
