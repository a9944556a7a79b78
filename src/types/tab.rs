use serde::{Deserialize, Serialize};

/// Opaque tab handle assigned by the host browser.
pub type TabId = i64;

/// Metadata the host reports for a tab. Display-only; never used for scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub url: String,
}

impl TabInfo {
    pub fn new(id: TabId, title: &str, url: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            fav_icon_url: None,
            url: url.to_string(),
        }
    }
}
