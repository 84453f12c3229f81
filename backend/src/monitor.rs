use common::req::{
    Alert, AlertStatus, AlertType, Component, ComponentStatus, ComponentUpdate, RoomInfo,
    RoomResponse, Severity, SystemStatus,
};

use crate::error::MonitorError;
use crate::store::{AlertStore, ComponentStore};
use crate::utils::ms_since_epoch;

/// Aggregate room load above which a power-limit alert is raised (W).
/// The comparison is strict: a room at exactly the limit is fine.
pub const SAFE_LIMIT_W: f64 = 1500.0;

/// Label written into the `location` field of generated alerts. The
/// dashboard pins fault banners to the living room; the power-limit dedup
/// key still uses the real room of the triggering component.
const ALERT_DISPLAY_LOCATION: &str = "Living Room";

/// Evaluates the two fault rules (aggregate overload, short circuit) against
/// every incoming telemetry update and keeps the alert store consistent:
/// at most one active power-limit alert per room, short circuits recorded
/// unconditionally.
pub struct FaultMonitor<S> {
    store: S,
}

impl<S: ComponentStore + AlertStore> FaultMonitor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist one telemetry update, then re-evaluate the fault rules for
    /// the component's room. The write always lands before evaluation runs,
    /// so the aggregate includes the update itself.
    pub fn apply_component_update(
        &mut self,
        update: &ComponentUpdate,
    ) -> Result<Component, MonitorError> {
        validate_update(update)?;
        let now = ms_since_epoch();
        let component = self.store.upsert_component(update, now)?;

        let room_components = self.store.components_in_room(&component.room)?;
        let total_power: f64 = room_components.iter().map(|c| c.power).sum();
        if total_power > SAFE_LIMIT_W {
            // Refreshes id and timestamp of the room's active alert on every
            // re-trigger instead of growing the list.
            let alert = Alert {
                id: format!("alert-{}-power-{}", component.room, now),
                kind: AlertType::PowerLimit,
                severity: Severity::Critical,
                location: ALERT_DISPLAY_LOCATION.to_string(),
                message: format!(
                    "Power consumption exceeds safe limits. Total load: {}W",
                    total_power
                ),
                status: AlertStatus::Active,
                timestamp: now,
            };
            self.store
                .upsert_active_alert(AlertType::PowerLimit, &component.room, alert)?;
        }

        if update.status == ComponentStatus::ShortCircuit {
            // Every occurrence gets its own record, no dedup.
            let alert = Alert {
                id: format!("alert-{}-{}", component.id, now),
                kind: AlertType::ShortCircuit,
                severity: Severity::Critical,
                location: ALERT_DISPLAY_LOCATION.to_string(),
                message: format!(
                    "Short circuit detected at {}. Immediate attention required!",
                    component.name
                ),
                status: AlertStatus::Active,
                timestamp: now,
            };
            self.store.insert_alert(alert, &component.room)?;
        }

        Ok(component)
    }

    /// Sequential upserts without fault evaluation or rollback; failed items
    /// are logged and skipped, the count reflects what landed.
    pub fn apply_bulk_update(
        &mut self,
        updates: &[ComponentUpdate],
    ) -> Result<usize, MonitorError> {
        let now = ms_since_epoch();
        let mut count = 0;
        for update in updates {
            let written =
                validate_update(update).and_then(|_| self.store.upsert_component(update, now));
            match written {
                Ok(_) => count += 1,
                Err(err) => log::warn!("bulk update skipped component {:?}: {err}", update.id),
            }
        }
        Ok(count)
    }

    pub fn list_alerts(
        &mut self,
        status: Option<AlertStatus>,
    ) -> Result<Vec<Alert>, MonitorError> {
        self.store.alerts(status)
    }

    /// Active -> resolved, one-way. The condition clearing on its own never
    /// resolves an alert.
    pub fn resolve_alert(&mut self, alert_id: &str) -> Result<Alert, MonitorError> {
        self.store
            .resolve_alert(alert_id)?
            .ok_or_else(|| MonitorError::NotFound(format!("alert {alert_id}")))
    }

    pub fn list_components(&mut self) -> Result<Vec<Component>, MonitorError> {
        self.store.all_components()
    }

    /// Direct status write, no fault evaluation.
    pub fn control_component(
        &mut self,
        component_id: &str,
        status: ComponentStatus,
    ) -> Result<Component, MonitorError> {
        self.store
            .set_component_status(component_id, status, ms_since_epoch())?
            .ok_or_else(|| MonitorError::NotFound(format!("component {component_id}")))
    }

    pub fn room_view(&mut self, room_id: &str) -> Result<RoomResponse, MonitorError> {
        let components = self.store.components_in_room(room_id)?;
        let alerts = self.store.active_alerts_matching(room_id)?;
        Ok(RoomResponse {
            room: RoomInfo {
                id: room_id.to_string(),
                name: room_display_name(room_id),
                components,
            },
            alerts,
        })
    }

    pub fn system_status(&mut self) -> Result<SystemStatus, MonitorError> {
        let total_components = self.store.count_components()?;
        let active_components = self.store.count_active_components()?;
        let active_alerts = self.store.count_active_alerts()?;
        let total_power = self
            .store
            .all_components()?
            .iter()
            .map(|c| c.power)
            .sum();
        Ok(SystemStatus {
            online: true,
            total_components,
            active_components,
            active_alerts,
            total_power,
            last_update: ms_since_epoch(),
        })
    }
}

fn validate_update(update: &ComponentUpdate) -> Result<(), MonitorError> {
    if update.id.trim().is_empty() {
        return Err(MonitorError::Validation("id must not be empty".to_string()));
    }
    if !update.power.is_finite() || update.power < 0.0 {
        return Err(MonitorError::Validation(
            "power must be a non-negative number".to_string(),
        ));
    }
    if !update.current.is_finite() || update.current < 0.0 {
        return Err(MonitorError::Validation(
            "current must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

/// "living-room" -> "Living Room"
fn room_display_name(room_id: &str) -> String {
    room_id
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use common::req::ComponentType;

    fn monitor() -> FaultMonitor<MemStore> {
        FaultMonitor::new(MemStore::default())
    }

    fn update(id: &str, room: &str, power: f64) -> ComponentUpdate {
        ComponentUpdate {
            id: id.to_string(),
            power,
            current: 2.0,
            status: ComponentStatus::On,
            name: Some(format!("{id} device")),
            kind: Some(ComponentType::Appliance),
            room: Some(room.to_string()),
        }
    }

    #[test]
    fn repeated_update_is_idempotent_on_the_component() {
        let mut m = monitor();
        let first = m.apply_component_update(&update("c1", "kitchen", 200.0)).unwrap();
        let second = m.apply_component_update(&update("c1", "kitchen", 200.0)).unwrap();

        let all = m.list_components().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.power, first.power);
        assert_eq!(second.room, first.room);
        assert!(second.last_updated >= first.last_updated);
    }

    #[test]
    fn no_alert_at_exactly_the_limit() {
        let mut m = monitor();
        m.apply_component_update(&update("c1", "kitchen", 1000.0)).unwrap();
        m.apply_component_update(&update("c2", "kitchen", 500.0)).unwrap();

        assert!(m.list_alerts(None).unwrap().is_empty());
    }

    #[test]
    fn one_watt_over_the_limit_raises_an_alert() {
        let mut m = monitor();
        m.apply_component_update(&update("c1", "kitchen", 1000.0)).unwrap();
        m.apply_component_update(&update("c2", "kitchen", 501.0)).unwrap();

        let alerts = m.list_alerts(None).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertType::PowerLimit);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].status, AlertStatus::Active);
        assert!(alerts[0].message.contains("1501"));
    }

    #[test]
    fn repeated_overload_keeps_a_single_active_alert() {
        let mut m = monitor();
        m.apply_component_update(&update("c1", "kitchen", 1600.0)).unwrap();
        m.apply_component_update(&update("c2", "kitchen", 100.0)).unwrap();
        m.apply_component_update(&update("c1", "kitchen", 1700.0)).unwrap();

        let alerts = m.list_alerts(Some(AlertStatus::Active)).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertType::PowerLimit);
        // the surviving record carries the most recent aggregate
        assert!(alerts[0].message.contains("1800"));
    }

    #[test]
    fn every_short_circuit_gets_its_own_record() {
        let mut m = monitor();
        let mut shorted = update("c1", "kitchen", 10.0);
        shorted.status = ComponentStatus::ShortCircuit;

        m.apply_component_update(&shorted).unwrap();
        m.apply_component_update(&shorted).unwrap();

        let alerts = m.list_alerts(None).unwrap();
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.kind == AlertType::ShortCircuit));
        assert!(alerts[0].message.contains("c1 device"));
    }

    #[test]
    fn resolve_flips_status_and_nothing_else() {
        let mut m = monitor();
        m.apply_component_update(&update("c1", "kitchen", 1600.0)).unwrap();
        let before = m.list_alerts(None).unwrap().remove(0);

        let resolved = m.resolve_alert(&before.id).unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert_eq!(resolved.kind, before.kind);
        assert_eq!(resolved.location, before.location);
        assert_eq!(resolved.message, before.message);
    }

    #[test]
    fn resolving_an_unknown_id_is_not_found_and_mutates_nothing() {
        let mut m = monitor();
        m.apply_component_update(&update("c1", "kitchen", 1600.0)).unwrap();

        let err = m.resolve_alert("no-such-alert").unwrap_err();
        assert!(matches!(err, MonitorError::NotFound(_)));
        let alerts = m.list_alerts(None).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].status, AlertStatus::Active);
    }

    #[test]
    fn overloads_do_not_leak_across_rooms() {
        let mut m = monitor();
        m.apply_component_update(&update("c1", "kitchen", 1600.0)).unwrap();
        // a quiet bedroom never trips anything and never touches the
        // kitchen's alert
        m.apply_component_update(&update("c2", "bedroom", 50.0)).unwrap();

        let alerts = m.list_alerts(Some(AlertStatus::Active)).unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(!alerts.iter().any(|a| a.location == "Bedroom"));

        // a second overloaded room gets its own alert record
        m.apply_component_update(&update("c3", "bedroom", 1600.0)).unwrap();
        let alerts = m.list_alerts(Some(AlertStatus::Active)).unwrap();
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn living_room_scenario_end_to_end() {
        let mut m = monitor();
        m.apply_component_update(&update("a", "living-room", 600.0)).unwrap();
        m.apply_component_update(&update("b", "living-room", 600.0)).unwrap();
        m.apply_component_update(&update("c", "living-room", 400.0)).unwrap();

        let alerts = m.list_alerts(Some(AlertStatus::Active)).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertType::PowerLimit);
        assert!(alerts[0].message.contains("1600"));

        // dropping back under the limit does not resolve anything
        m.apply_component_update(&update("c", "living-room", 0.0)).unwrap();
        let alerts = m.list_alerts(Some(AlertStatus::Active)).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].status, AlertStatus::Active);
        assert!(alerts[0].message.contains("1600"));
    }

    #[test]
    fn bulk_update_writes_without_evaluating_faults() {
        let mut m = monitor();
        let count = m
            .apply_bulk_update(&[
                update("c1", "kitchen", 900.0),
                update("c2", "kitchen", 900.0),
                update("c3", "kitchen", 900.0),
            ])
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(m.list_components().unwrap().len(), 3);
        // 2700 W in one room, but the bulk path only persists
        assert!(m.list_alerts(None).unwrap().is_empty());
    }

    #[test]
    fn bulk_update_skips_bad_items_and_keeps_going() {
        let mut m = monitor();
        let mut bad = update("c2", "kitchen", 100.0);
        bad.power = -5.0;

        let count = m
            .apply_bulk_update(&[update("c1", "kitchen", 100.0), bad, update("c3", "kitchen", 100.0)])
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(m.list_components().unwrap().len(), 2);
    }

    #[test]
    fn control_writes_status_or_reports_not_found() {
        let mut m = monitor();
        m.apply_component_update(&update("c1", "kitchen", 100.0)).unwrap();

        let off = m.control_component("c1", ComponentStatus::Off).unwrap();
        assert_eq!(off.status, ComponentStatus::Off);

        let err = m.control_component("ghost", ComponentStatus::On).unwrap_err();
        assert!(matches!(err, MonitorError::NotFound(_)));
    }

    #[test]
    fn update_without_room_for_new_id_is_rejected() {
        let mut m = monitor();
        let mut partial = update("c1", "kitchen", 100.0);
        partial.room = None;

        let err = m.apply_component_update(&partial).unwrap_err();
        assert!(matches!(err, MonitorError::Validation(_)));
        assert!(m.list_components().unwrap().is_empty());
    }

    #[test]
    fn negative_power_is_rejected_before_any_write() {
        let mut m = monitor();
        let mut bad = update("c1", "kitchen", 100.0);
        bad.power = -1.0;

        let err = m.apply_component_update(&bad).unwrap_err();
        assert!(matches!(err, MonitorError::Validation(_)));
        assert!(m.list_components().unwrap().is_empty());
    }

    #[test]
    fn system_status_aggregates_across_all_rooms() {
        let mut m = monitor();
        m.apply_component_update(&update("c1", "kitchen", 900.0)).unwrap();
        m.apply_component_update(&update("c2", "bedroom", 800.0)).unwrap();
        m.control_component("c2", ComponentStatus::Off).unwrap();

        let status = m.system_status().unwrap();
        assert!(status.online);
        assert_eq!(status.total_components, 2);
        assert_eq!(status.active_components, 1);
        assert_eq!(status.active_alerts, 0);
        assert_eq!(status.total_power, 1700.0);
    }

    #[test]
    fn room_view_prettifies_the_room_id() {
        let mut m = monitor();
        m.apply_component_update(&update("a", "living-room", 1600.0)).unwrap();

        let view = m.room_view("living-room").unwrap();
        assert_eq!(view.room.name, "Living Room");
        assert_eq!(view.room.components.len(), 1);
        // alert locations carry the spaced display label, which the
        // hyphenated room id does not substring-match
        assert!(view.alerts.is_empty());

        let view = m.room_view("living").unwrap();
        assert_eq!(view.alerts.len(), 1);
    }
}
