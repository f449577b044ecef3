//! Perspective-independent slices kept next to the search state.

use crate::action::{Action, Dispatch};
use portal_protocol::ErrorInfo;
use serde::Serialize;
use std::collections::BTreeMap;

pub const ERROR_KEY: &str = "error";
pub const OPTIONS_KEY: &str = "options";
pub const MAP_VIEWPORT_KEY: &str = "leafletMap";
pub const ANIMATION_KEY: &str = "animation";

/// Keys no perspective slice may take.
pub const GLOBAL_KEYS: [&str; 4] = [ERROR_KEY, OPTIONS_KEY, MAP_VIEWPORT_KEY, ANIMATION_KEY];

/// Most recent fetch failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub perspective_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(flatten)]
    pub error: ErrorInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapViewport {
    pub center: [f64; 2],
    pub zoom: u8,
}

impl Default for MapViewport {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            zoom: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnimationFlags {
    pub running: bool,
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalSlices {
    pub error: Option<ErrorRecord>,
    pub options: BTreeMap<String, serde_json::Value>,
    pub map_viewport: MapViewport,
    pub animation: AnimationFlags,
}

impl GlobalSlices {
    pub(crate) fn record_error(&mut self, record: ErrorRecord) {
        log::debug!(
            "Recording fetch failure for '{}': {}",
            record.perspective_id,
            record.error.message
        );
        self.error = Some(record);
    }

    pub(crate) fn reduce(&mut self, action: &Action) -> Dispatch {
        match action {
            Action::ErrorDismissed => {
                if self.error.take().is_some() {
                    Dispatch::applied()
                } else {
                    Dispatch::Ignored
                }
            }
            Action::OptionChanged { option, value } => {
                self.options.insert(option.clone(), value.clone());
                Dispatch::applied()
            }
            Action::MapViewportChanged { center, zoom } => {
                self.map_viewport = MapViewport {
                    center: *center,
                    zoom: *zoom,
                };
                Dispatch::applied()
            }
            Action::AnimationToggled => {
                self.animation.running = !self.animation.running;
                Dispatch::applied()
            }
            Action::AnimationValueSet { value } => {
                self.animation.value = *value;
                Dispatch::applied()
            }
            _ => Dispatch::Unhandled,
        }
    }
}
