//! Timed notification scripts standing in for the session peer.
//!
//! A script is a JSON array such as
//! `[{"tick": 3, "event": "spawn_assigned", "entity": 7, "cell": 1200, "color": "#ef4444"}]`.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use conquest_core::{CellIndex, EntityId, Notification, RgbColor};
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
struct ScriptEntry {
    tick: u64,
    #[serde(flatten)]
    event: ScriptEvent,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ScriptEvent {
    SpawnAssigned {
        entity: u32,
        cell: u32,
        #[serde(default)]
        color: Option<String>,
    },
    TerritoryGranted {
        entity: u32,
        amount: u32,
        #[serde(default)]
        color: Option<String>,
    },
    EntityRemoved {
        entity: u32,
    },
}

impl ScriptEvent {
    fn into_notification(self) -> Result<Notification> {
        Ok(match self {
            Self::SpawnAssigned {
                entity,
                cell,
                color,
            } => Notification::SpawnAssigned {
                entity: EntityId::new(entity),
                cell: CellIndex::new(cell),
                color: parse_color(color.as_deref())?,
            },
            Self::TerritoryGranted {
                entity,
                amount,
                color,
            } => Notification::TerritoryGranted {
                entity: EntityId::new(entity),
                amount,
                color: parse_color(color.as_deref())?,
            },
            Self::EntityRemoved { entity } => Notification::EntityRemoved {
                entity: EntityId::new(entity),
            },
        })
    }
}

fn parse_color(hint: Option<&str>) -> Result<Option<RgbColor>> {
    hint.map(|hex| RgbColor::from_hex(hex).with_context(|| format!("invalid color hint {hex:?}")))
        .transpose()
}

/// Notifications ordered by the tick they are delivered before.
#[derive(Clone, Debug, Default)]
pub(crate) struct Script {
    entries: Vec<(u64, Notification)>,
    cursor: usize,
}

impl Script {
    /// Reads a script file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("failed to parse script {}", path.display()))
    }

    /// Parses a script from JSON text. Entries sharing a tick keep file order.
    pub(crate) fn parse(raw: &str) -> Result<Self> {
        let entries: Vec<ScriptEntry> = serde_json::from_str(raw)?;
        let mut entries = entries
            .into_iter()
            .map(|entry| Ok((entry.tick, entry.event.into_notification()?)))
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by_key(|(tick, _)| *tick);
        Ok(Self { entries, cursor: 0 })
    }

    /// Takes every notification scheduled at or before `tick`.
    pub(crate) fn due(&mut self, tick: u64) -> Vec<Notification> {
        let start = self.cursor;
        while self
            .entries
            .get(self.cursor)
            .is_some_and(|(scheduled, _)| *scheduled <= tick)
        {
            self.cursor += 1;
        }
        self.entries[start..self.cursor]
            .iter()
            .map(|(_, notification)| notification.clone())
            .collect()
    }

    /// Number of notifications not yet delivered.
    pub(crate) fn remaining(&self) -> usize {
        self.entries.len() - self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"[
        {"tick": 3, "event": "territory_granted", "entity": 7, "amount": 40},
        {"tick": 1, "event": "spawn_assigned", "entity": 7, "cell": 1200, "color": "#ef4444"},
        {"tick": 3, "event": "entity_removed", "entity": 7}
    ]"##;

    #[test]
    fn entries_are_delivered_in_tick_order() {
        let mut script = Script::parse(SAMPLE).expect("valid script");
        assert_eq!(script.remaining(), 3);

        assert!(script.due(0).is_empty());
        assert_eq!(
            script.due(2),
            vec![Notification::SpawnAssigned {
                entity: EntityId::new(7),
                cell: CellIndex::new(1200),
                color: Some(RgbColor::new(0xef, 0x44, 0x44)),
            }]
        );
        assert_eq!(
            script.due(3),
            vec![
                Notification::TerritoryGranted {
                    entity: EntityId::new(7),
                    amount: 40,
                    color: None,
                },
                Notification::EntityRemoved {
                    entity: EntityId::new(7),
                },
            ]
        );
        assert_eq!(script.remaining(), 0);
        assert!(script.due(10).is_empty());
    }

    #[test]
    fn invalid_color_hints_are_rejected() {
        let error = Script::parse(
            r##"[{"tick": 0, "event": "spawn_assigned", "entity": 2, "cell": 5, "color": "#zz0000"}]"##,
        )
        .expect_err("bad color must fail");
        assert!(error.to_string().contains("#zz0000"));
    }

    #[test]
    fn negative_amounts_do_not_parse() {
        let result = Script::parse(
            r#"[{"tick": 0, "event": "territory_granted", "entity": 2, "amount": -5}]"#,
        );
        assert!(result.is_err());
    }
}
