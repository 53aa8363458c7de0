//! Settings panel descriptor handed to the host's configuration UI.

use crate::{SORT_MODE_KEY, SortMode};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPanel {
    pub tab_title: String,
    pub settings: Vec<SettingDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub action: SettingAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SettingAction {
    Select { items: Vec<String> },
}

/// The single user-facing option: the persisted default sort mode.
pub fn settings_panel() -> SettingsPanel {
    SettingsPanel {
        tab_title: "Better Command Palette".to_string(),
        settings: vec![SettingDescriptor {
            id: SORT_MODE_KEY.to_string(),
            name: "Sort mode".to_string(),
            description: "How to sort unpinned commands in the command palette.".to_string(),
            action: SettingAction::Select {
                items: SortMode::ALL.iter().map(|m| m.label().to_string()).collect(),
            },
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_serializes_in_host_shape() {
        let json = serde_json::to_value(settings_panel()).unwrap();
        assert_eq!(json["tabTitle"], "Better Command Palette");
        let setting = &json["settings"][0];
        assert_eq!(setting["id"], "bcp_sort_mode");
        assert_eq!(setting["action"]["type"], "select");
        assert_eq!(setting["action"]["items"][1], "A → Z");
    }
}
