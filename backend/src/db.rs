use anyhow::Result;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use common::req::{
    Alert, AlertStatus, AlertType, Component, ComponentStatus, ComponentType, ComponentUpdate,
    Severity,
};

use crate::error::MonitorError;
use crate::schema::{alerts, components};
use crate::store::{component_from_update, AlertStore, ComponentStore};

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = components)]
struct ComponentRow {
    id: String,
    name: String,
    kind: String,
    status: String,
    power: f64,   // W
    current: f64, // A
    room: String,
    last_updated: i64, // ms
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = components)]
struct ComponentChanges {
    power: f64,
    current: f64,
    status: String,
    last_updated: i64,
    name: Option<String>,
    kind: Option<String>,
    room: Option<String>,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = alerts)]
struct AlertRow {
    id: String,
    kind: String,
    severity: String,
    location: String,
    message: String,
    status: String,
    timestamp: i64, // ms
    room: String,   // dedup key, may differ from location
}

fn row_to_component(row: ComponentRow) -> Result<Component, MonitorError> {
    let kind = ComponentType::from_str(&row.kind)
        .ok_or_else(|| MonitorError::Store(format!("unknown component type {:?}", row.kind)))?;
    let status = ComponentStatus::from_str(&row.status)
        .ok_or_else(|| MonitorError::Store(format!("unknown component status {:?}", row.status)))?;
    Ok(Component {
        id: row.id,
        name: row.name,
        kind,
        status,
        power: row.power,
        current: row.current,
        room: row.room,
        last_updated: row.last_updated,
    })
}

fn component_to_row(c: &Component) -> ComponentRow {
    ComponentRow {
        id: c.id.clone(),
        name: c.name.clone(),
        kind: c.kind.as_str().to_string(),
        status: c.status.as_str().to_string(),
        power: c.power,
        current: c.current,
        room: c.room.clone(),
        last_updated: c.last_updated,
    }
}

fn row_to_alert(row: AlertRow) -> Result<Alert, MonitorError> {
    let kind = AlertType::from_str(&row.kind)
        .ok_or_else(|| MonitorError::Store(format!("unknown alert type {:?}", row.kind)))?;
    let severity = Severity::from_str(&row.severity)
        .ok_or_else(|| MonitorError::Store(format!("unknown severity {:?}", row.severity)))?;
    let status = AlertStatus::from_str(&row.status)
        .ok_or_else(|| MonitorError::Store(format!("unknown alert status {:?}", row.status)))?;
    Ok(Alert {
        id: row.id,
        kind,
        severity,
        location: row.location,
        message: row.message,
        status,
        timestamp: row.timestamp,
    })
}

fn alert_to_row(a: &Alert, room: &str) -> AlertRow {
    AlertRow {
        id: a.id.clone(),
        kind: a.kind.as_str().to_string(),
        severity: a.severity.as_str().to_string(),
        location: a.location.clone(),
        message: a.message.clone(),
        status: a.status.as_str().to_string(),
        timestamp: a.timestamp,
        room: room.to_string(),
    }
}

pub struct Db {
    conn: SqliteConnection,
}

impl Db {
    pub fn connect(database_url: &str) -> Result<Self> {
        let mut conn = SqliteConnection::establish(database_url)?;

        diesel::sql_query(
            "CREATE TABLE IF NOT EXISTS components (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                power DOUBLE NOT NULL,
                current DOUBLE NOT NULL,
                room TEXT NOT NULL,
                last_updated BIGINT NOT NULL
            )",
        )
        .execute(&mut conn)?;
        diesel::sql_query(
            "CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY NOT NULL,
                kind TEXT NOT NULL,
                severity TEXT NOT NULL,
                location TEXT NOT NULL,
                message TEXT NOT NULL,
                status TEXT NOT NULL,
                timestamp BIGINT NOT NULL,
                room TEXT NOT NULL
            )",
        )
        .execute(&mut conn)?;

        Ok(Self { conn })
    }
}

impl ComponentStore for Db {
    fn upsert_component(
        &mut self,
        update: &ComponentUpdate,
        now_ms: i64,
    ) -> Result<Component, MonitorError> {
        use crate::schema::components::dsl::*;

        let existing = components
            .filter(id.eq(&update.id))
            .first::<ComponentRow>(&mut self.conn)
            .optional()?;

        match existing {
            Some(_) => {
                diesel::update(components.filter(id.eq(&update.id)))
                    .set(&ComponentChanges {
                        power: update.power,
                        current: update.current,
                        status: update.status.as_str().to_string(),
                        last_updated: now_ms,
                        name: update.name.clone(),
                        kind: update.kind.map(|k| k.as_str().to_string()),
                        room: update.room.clone(),
                    })
                    .execute(&mut self.conn)?;
                let row = components
                    .filter(id.eq(&update.id))
                    .first::<ComponentRow>(&mut self.conn)?;
                row_to_component(row)
            }
            None => {
                let fresh = component_from_update(update, now_ms)?;
                diesel::insert_into(components)
                    .values(&component_to_row(&fresh))
                    .execute(&mut self.conn)?;
                Ok(fresh)
            }
        }
    }

    fn components_in_room(&mut self, room_name: &str) -> Result<Vec<Component>, MonitorError> {
        use crate::schema::components::dsl::*;

        let rows = components
            .filter(room.eq(room_name))
            .load::<ComponentRow>(&mut self.conn)?;
        rows.into_iter().map(row_to_component).collect()
    }

    fn all_components(&mut self) -> Result<Vec<Component>, MonitorError> {
        use crate::schema::components::dsl::*;

        let rows = components.load::<ComponentRow>(&mut self.conn)?;
        rows.into_iter().map(row_to_component).collect()
    }

    fn set_component_status(
        &mut self,
        component_id: &str,
        new_status: ComponentStatus,
        now_ms: i64,
    ) -> Result<Option<Component>, MonitorError> {
        use crate::schema::components::dsl::*;

        let changed = diesel::update(components.filter(id.eq(component_id)))
            .set((status.eq(new_status.as_str()), last_updated.eq(now_ms)))
            .execute(&mut self.conn)?;
        if changed == 0 {
            return Ok(None);
        }
        let row = components
            .filter(id.eq(component_id))
            .first::<ComponentRow>(&mut self.conn)?;
        row_to_component(row).map(Some)
    }

    fn count_components(&mut self) -> Result<i64, MonitorError> {
        use crate::schema::components::dsl::*;

        Ok(components.count().get_result::<i64>(&mut self.conn)?)
    }

    fn count_active_components(&mut self) -> Result<i64, MonitorError> {
        use crate::schema::components::dsl::*;

        Ok(components
            .filter(status.ne(ComponentStatus::Off.as_str()))
            .count()
            .get_result::<i64>(&mut self.conn)?)
    }
}

impl AlertStore for Db {
    fn insert_alert(&mut self, alert: Alert, room: &str) -> Result<Alert, MonitorError> {
        diesel::insert_into(alerts::table)
            .values(&alert_to_row(&alert, room))
            .execute(&mut self.conn)?;
        Ok(alert)
    }

    fn upsert_active_alert(
        &mut self,
        alert_kind: AlertType,
        room_key: &str,
        alert: Alert,
    ) -> Result<Alert, MonitorError> {
        use crate::schema::alerts::dsl::*;

        let existing = alerts
            .filter(kind.eq(alert_kind.as_str()))
            .filter(room.eq(room_key))
            .filter(status.eq(AlertStatus::Active.as_str()))
            .first::<AlertRow>(&mut self.conn)
            .optional()?;

        match existing {
            Some(row) => {
                diesel::update(alerts.filter(id.eq(&row.id)))
                    .set((
                        id.eq(&alert.id),
                        severity.eq(alert.severity.as_str()),
                        location.eq(&alert.location),
                        message.eq(&alert.message),
                        timestamp.eq(alert.timestamp),
                    ))
                    .execute(&mut self.conn)?;
                Ok(alert)
            }
            None => {
                diesel::insert_into(alerts)
                    .values(&alert_to_row(&alert, room_key))
                    .execute(&mut self.conn)?;
                Ok(alert)
            }
        }
    }

    fn alerts(&mut self, status_filter: Option<AlertStatus>) -> Result<Vec<Alert>, MonitorError> {
        use crate::schema::alerts::dsl::*;

        let mut query = alerts.order(timestamp.desc()).into_boxed();
        if let Some(s) = status_filter {
            query = query.filter(status.eq(s.as_str()));
        }
        let rows = query.load::<AlertRow>(&mut self.conn)?;
        rows.into_iter().map(row_to_alert).collect()
    }

    fn active_alerts_matching(&mut self, room_id: &str) -> Result<Vec<Alert>, MonitorError> {
        use crate::schema::alerts::dsl::*;

        let rows = alerts
            .filter(status.eq(AlertStatus::Active.as_str()))
            .load::<AlertRow>(&mut self.conn)?;
        let needle = room_id.to_lowercase();
        rows.into_iter()
            .filter(|row| row.location.to_lowercase().contains(&needle))
            .map(row_to_alert)
            .collect()
    }

    fn resolve_alert(&mut self, alert_id: &str) -> Result<Option<Alert>, MonitorError> {
        use crate::schema::alerts::dsl::*;

        let changed = diesel::update(alerts.filter(id.eq(alert_id)))
            .set(status.eq(AlertStatus::Resolved.as_str()))
            .execute(&mut self.conn)?;
        if changed == 0 {
            return Ok(None);
        }
        let row = alerts
            .filter(id.eq(alert_id))
            .first::<AlertRow>(&mut self.conn)?;
        row_to_alert(row).map(Some)
    }

    fn count_active_alerts(&mut self) -> Result<i64, MonitorError> {
        use crate::schema::alerts::dsl::*;

        Ok(alerts
            .filter(status.eq(AlertStatus::Active.as_str()))
            .count()
            .get_result::<i64>(&mut self.conn)?)
    }
}
