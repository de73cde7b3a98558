//! The application handle handed to every plugin.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Region of the shell a widget can be mounted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Main,
    Top,
    Left,
    Right,
    Status,
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Main => "main",
            Self::Top => "top",
            Self::Left => "left",
            Self::Right => "right",
            Self::Status => "status",
        };
        f.write_str(name)
    }
}

/// Something a plugin placed in the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub label: String,
    /// Lower ranks come first within an area.
    pub rank: u32,
}

/// Application shell: identity plus the widgets mounted per area.
#[derive(Debug)]
pub struct Shell {
    name: String,
    version: String,
    areas: RwLock<BTreeMap<Area, Vec<Widget>>>,
}

impl Shell {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            areas: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Mounts a widget, keeping the area sorted by rank.
    ///
    /// Returns false if a widget with the same id is already in the area.
    pub fn add(&self, area: Area, widget: Widget) -> bool {
        let mut areas = self.areas.write();
        let widgets = areas.entry(area).or_default();
        if widgets.iter().any(|w| w.id == widget.id) {
            return false;
        }

        let position = widgets.partition_point(|w| w.rank <= widget.rank);
        tracing::debug!(area = %area, widget = %widget.id, rank = widget.rank, "Widget mounted");
        widgets.insert(position, widget);
        true
    }

    /// Widgets in `area`, in rank order.
    pub fn widgets(&self, area: Area) -> Vec<Widget> {
        self.areas.read().get(&area).cloned().unwrap_or_default()
    }

    /// Total number of mounted widgets.
    pub fn widget_count(&self) -> usize {
        self.areas.read().values().map(Vec::len).sum()
    }
}
