use common::req::{Alert, AlertStatus, AlertType, Component, ComponentStatus, ComponentUpdate};

use crate::db::Db;
use crate::error::MonitorError;

pub trait ComponentStore {
    /// Insert-or-update by component id. An existing record keeps its
    /// identity and only takes the telemetry fields (plus any of
    /// name/type/room explicitly supplied); a new record requires all three.
    fn upsert_component(
        &mut self,
        update: &ComponentUpdate,
        now_ms: i64,
    ) -> Result<Component, MonitorError>;
    fn components_in_room(&mut self, room: &str) -> Result<Vec<Component>, MonitorError>;
    fn all_components(&mut self) -> Result<Vec<Component>, MonitorError>;
    fn set_component_status(
        &mut self,
        id: &str,
        status: ComponentStatus,
        now_ms: i64,
    ) -> Result<Option<Component>, MonitorError>;
    fn count_components(&mut self) -> Result<i64, MonitorError>;
    fn count_active_components(&mut self) -> Result<i64, MonitorError>;
}

pub trait AlertStore {
    /// Always creates a new record, even if an equivalent one exists.
    fn insert_alert(&mut self, alert: Alert, room: &str) -> Result<Alert, MonitorError>;
    /// Insert-or-refresh the single active alert for `(kind, room)`. The
    /// match key is the room the alert was raised for, not the stored
    /// `location` field, which may carry a different display label.
    fn upsert_active_alert(
        &mut self,
        kind: AlertType,
        room: &str,
        alert: Alert,
    ) -> Result<Alert, MonitorError>;
    /// All alerts, newest first, optionally filtered by status.
    fn alerts(&mut self, status: Option<AlertStatus>) -> Result<Vec<Alert>, MonitorError>;
    /// Active alerts whose location contains `room_id`, case-insensitively.
    fn active_alerts_matching(&mut self, room_id: &str) -> Result<Vec<Alert>, MonitorError>;
    fn resolve_alert(&mut self, id: &str) -> Result<Option<Alert>, MonitorError>;
    fn count_active_alerts(&mut self) -> Result<i64, MonitorError>;
}

pub(crate) fn component_from_update(
    update: &ComponentUpdate,
    now_ms: i64,
) -> Result<Component, MonitorError> {
    let name = update.name.clone().ok_or_else(|| {
        MonitorError::Validation(format!("new component {}: name is required", update.id))
    })?;
    let kind = update.kind.ok_or_else(|| {
        MonitorError::Validation(format!("new component {}: type is required", update.id))
    })?;
    let room = update.room.clone().ok_or_else(|| {
        MonitorError::Validation(format!("new component {}: room is required", update.id))
    })?;
    Ok(Component {
        id: update.id.clone(),
        name,
        kind,
        status: update.status,
        power: update.power,
        current: update.current,
        room,
        last_updated: now_ms,
    })
}

struct StoredAlert {
    alert: Alert,
    room: String, // dedup key, may differ from alert.location
}

#[derive(Default)]
pub struct MemStore {
    components: Vec<Component>,
    alerts: Vec<StoredAlert>,
}

impl ComponentStore for MemStore {
    fn upsert_component(
        &mut self,
        update: &ComponentUpdate,
        now_ms: i64,
    ) -> Result<Component, MonitorError> {
        match self.components.iter_mut().find(|c| c.id == update.id) {
            Some(existing) => {
                existing.power = update.power;
                existing.current = update.current;
                existing.status = update.status;
                existing.last_updated = now_ms;
                if let Some(name) = &update.name {
                    existing.name = name.clone();
                }
                if let Some(kind) = update.kind {
                    existing.kind = kind;
                }
                if let Some(room) = &update.room {
                    existing.room = room.clone();
                }
                Ok(existing.clone())
            }
            None => {
                let fresh = component_from_update(update, now_ms)?;
                self.components.push(fresh.clone());
                Ok(fresh)
            }
        }
    }

    fn components_in_room(&mut self, room: &str) -> Result<Vec<Component>, MonitorError> {
        Ok(self
            .components
            .iter()
            .filter(|c| c.room == room)
            .cloned()
            .collect())
    }

    fn all_components(&mut self) -> Result<Vec<Component>, MonitorError> {
        Ok(self.components.clone())
    }

    fn set_component_status(
        &mut self,
        id: &str,
        status: ComponentStatus,
        now_ms: i64,
    ) -> Result<Option<Component>, MonitorError> {
        Ok(self.components.iter_mut().find(|c| c.id == id).map(|c| {
            c.status = status;
            c.last_updated = now_ms;
            c.clone()
        }))
    }

    fn count_components(&mut self) -> Result<i64, MonitorError> {
        Ok(self.components.len() as i64)
    }

    fn count_active_components(&mut self) -> Result<i64, MonitorError> {
        Ok(self
            .components
            .iter()
            .filter(|c| c.status != ComponentStatus::Off)
            .count() as i64)
    }
}

impl AlertStore for MemStore {
    fn insert_alert(&mut self, alert: Alert, room: &str) -> Result<Alert, MonitorError> {
        self.alerts.push(StoredAlert {
            alert: alert.clone(),
            room: room.to_string(),
        });
        Ok(alert)
    }

    fn upsert_active_alert(
        &mut self,
        kind: AlertType,
        room: &str,
        alert: Alert,
    ) -> Result<Alert, MonitorError> {
        match self.alerts.iter_mut().find(|a| {
            a.alert.kind == kind && a.room == room && a.alert.status == AlertStatus::Active
        }) {
            Some(existing) => {
                existing.alert = alert.clone();
                Ok(alert)
            }
            None => self.insert_alert(alert, room),
        }
    }

    fn alerts(&mut self, status: Option<AlertStatus>) -> Result<Vec<Alert>, MonitorError> {
        let mut out: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|a| status.map_or(true, |s| a.alert.status == s))
            .map(|a| a.alert.clone())
            .collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    fn active_alerts_matching(&mut self, room_id: &str) -> Result<Vec<Alert>, MonitorError> {
        let needle = room_id.to_lowercase();
        Ok(self
            .alerts
            .iter()
            .filter(|a| {
                a.alert.status == AlertStatus::Active
                    && a.alert.location.to_lowercase().contains(&needle)
            })
            .map(|a| a.alert.clone())
            .collect())
    }

    fn resolve_alert(&mut self, id: &str) -> Result<Option<Alert>, MonitorError> {
        Ok(self
            .alerts
            .iter_mut()
            .find(|a| a.alert.id == id)
            .map(|a| {
                a.alert.status = AlertStatus::Resolved;
                a.alert.clone()
            }))
    }

    fn count_active_alerts(&mut self) -> Result<i64, MonitorError> {
        Ok(self
            .alerts
            .iter()
            .filter(|a| a.alert.status == AlertStatus::Active)
            .count() as i64)
    }
}

/// Deployment-selected store: sqlite when `DATABASE_URL` is configured,
/// in-memory otherwise.
pub enum Backend {
    Sqlite(Db),
    Memory(MemStore),
}

impl ComponentStore for Backend {
    fn upsert_component(
        &mut self,
        update: &ComponentUpdate,
        now_ms: i64,
    ) -> Result<Component, MonitorError> {
        match self {
            Self::Sqlite(db) => db.upsert_component(update, now_ms),
            Self::Memory(mem) => mem.upsert_component(update, now_ms),
        }
    }

    fn components_in_room(&mut self, room: &str) -> Result<Vec<Component>, MonitorError> {
        match self {
            Self::Sqlite(db) => db.components_in_room(room),
            Self::Memory(mem) => mem.components_in_room(room),
        }
    }

    fn all_components(&mut self) -> Result<Vec<Component>, MonitorError> {
        match self {
            Self::Sqlite(db) => db.all_components(),
            Self::Memory(mem) => mem.all_components(),
        }
    }

    fn set_component_status(
        &mut self,
        id: &str,
        status: ComponentStatus,
        now_ms: i64,
    ) -> Result<Option<Component>, MonitorError> {
        match self {
            Self::Sqlite(db) => db.set_component_status(id, status, now_ms),
            Self::Memory(mem) => mem.set_component_status(id, status, now_ms),
        }
    }

    fn count_components(&mut self) -> Result<i64, MonitorError> {
        match self {
            Self::Sqlite(db) => db.count_components(),
            Self::Memory(mem) => mem.count_components(),
        }
    }

    fn count_active_components(&mut self) -> Result<i64, MonitorError> {
        match self {
            Self::Sqlite(db) => db.count_active_components(),
            Self::Memory(mem) => mem.count_active_components(),
        }
    }
}

impl AlertStore for Backend {
    fn insert_alert(&mut self, alert: Alert, room: &str) -> Result<Alert, MonitorError> {
        match self {
            Self::Sqlite(db) => db.insert_alert(alert, room),
            Self::Memory(mem) => mem.insert_alert(alert, room),
        }
    }

    fn upsert_active_alert(
        &mut self,
        kind: AlertType,
        room: &str,
        alert: Alert,
    ) -> Result<Alert, MonitorError> {
        match self {
            Self::Sqlite(db) => db.upsert_active_alert(kind, room, alert),
            Self::Memory(mem) => mem.upsert_active_alert(kind, room, alert),
        }
    }

    fn alerts(&mut self, status: Option<AlertStatus>) -> Result<Vec<Alert>, MonitorError> {
        match self {
            Self::Sqlite(db) => db.alerts(status),
            Self::Memory(mem) => mem.alerts(status),
        }
    }

    fn active_alerts_matching(&mut self, room_id: &str) -> Result<Vec<Alert>, MonitorError> {
        match self {
            Self::Sqlite(db) => db.active_alerts_matching(room_id),
            Self::Memory(mem) => mem.active_alerts_matching(room_id),
        }
    }

    fn resolve_alert(&mut self, id: &str) -> Result<Option<Alert>, MonitorError> {
        match self {
            Self::Sqlite(db) => db.resolve_alert(id),
            Self::Memory(mem) => mem.resolve_alert(id),
        }
    }

    fn count_active_alerts(&mut self) -> Result<i64, MonitorError> {
        match self {
            Self::Sqlite(db) => db.count_active_alerts(),
            Self::Memory(mem) => mem.count_active_alerts(),
        }
    }
}
