use serde::{Deserialize, Serialize};

/// Signed-in user and auto-upload preferences handed over by the web layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,
    pub jwt_token: Option<String>,
    pub auto_upload_enabled: bool,
    pub wifi_only_upload: bool,
    pub background_upload_enabled: bool,
    pub device_id: Option<String>,
    #[serde(default)]
    pub updated_at: String,
}

impl UserContext {
    pub fn new(user_id: String, jwt_token: Option<String>) -> Self {
        Self {
            user_id,
            jwt_token,
            auto_upload_enabled: false,
            wifi_only_upload: false,
            background_upload_enabled: false,
            device_id: None,
            updated_at: String::new(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.jwt_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Settings evaluated once per sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoUploadSettings {
    pub auto_upload_enabled: bool,
    pub wifi_only_upload: bool,
    pub background_upload_enabled: bool,
}

impl From<&UserContext> for AutoUploadSettings {
    fn from(context: &UserContext) -> Self {
        Self {
            auto_upload_enabled: context.auto_upload_enabled,
            wifi_only_upload: context.wifi_only_upload,
            background_upload_enabled: context.background_upload_enabled,
        }
    }
}
