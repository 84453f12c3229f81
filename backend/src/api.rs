use std::sync::{Arc, Mutex, MutexGuard};

use actix_cors::Cors;
use actix_web::{
    get, patch, post, put,
    web::{self, Data},
    App, HttpResponse, HttpServer, Responder,
};

use common::req::{
    AlertsQuery, BulkUpdateRequest, BulkUpdateResponse, ComponentUpdate, ControlRequest,
    Esp32AlertsQuery, HealthResponse, UpdateResponse,
};

use crate::error::MonitorError;
use crate::esp32::Esp32Handle;
use crate::monitor::FaultMonitor;
use crate::store::Backend;
use crate::utils::ms_since_epoch;

pub type SharedMonitor = Arc<Mutex<FaultMonitor<Backend>>>;

fn lock(monitor: &SharedMonitor) -> Result<MutexGuard<'_, FaultMonitor<Backend>>, MonitorError> {
    monitor
        .lock()
        .map_err(|_| MonitorError::Store("monitor lock poisoned".to_string()))
}

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().body("backend")
}

#[post("/api/hardware/update")]
async fn api_hardware_update(
    body: web::Json<ComponentUpdate>,
    monitor: Data<SharedMonitor>,
) -> Result<impl Responder, MonitorError> {
    let component = lock(&monitor)?.apply_component_update(&body)?;
    Ok(web::Json(UpdateResponse {
        success: true,
        component,
    }))
}

#[post("/api/hardware/bulk-update")]
async fn api_hardware_bulk_update(
    body: web::Json<BulkUpdateRequest>,
    monitor: Data<SharedMonitor>,
) -> Result<impl Responder, MonitorError> {
    let count = lock(&monitor)?.apply_bulk_update(&body.components)?;
    Ok(web::Json(BulkUpdateResponse {
        success: true,
        count,
    }))
}

#[get("/api/alerts")]
async fn api_alerts(
    query: web::Query<AlertsQuery>,
    monitor: Data<SharedMonitor>,
) -> Result<impl Responder, MonitorError> {
    let alerts = lock(&monitor)?.list_alerts(query.status)?;
    Ok(web::Json(alerts))
}

#[patch("/api/alerts/{id}/resolve")]
async fn api_resolve_alert(
    path: web::Path<String>,
    monitor: Data<SharedMonitor>,
) -> Result<impl Responder, MonitorError> {
    let alert = lock(&monitor)?.resolve_alert(&path)?;
    Ok(web::Json(alert))
}

#[get("/api/rooms/components/all")]
async fn api_components_all(
    monitor: Data<SharedMonitor>,
) -> Result<impl Responder, MonitorError> {
    let components = lock(&monitor)?.list_components()?;
    Ok(web::Json(components))
}

#[patch("/api/rooms/components/{id}/control")]
async fn api_control_component(
    path: web::Path<String>,
    body: web::Json<ControlRequest>,
    monitor: Data<SharedMonitor>,
) -> Result<impl Responder, MonitorError> {
    let component = lock(&monitor)?.control_component(&path, body.status)?;
    Ok(web::Json(component))
}

#[get("/api/rooms/{room_id}")]
async fn api_room(
    path: web::Path<String>,
    monitor: Data<SharedMonitor>,
) -> Result<impl Responder, MonitorError> {
    let view = lock(&monitor)?.room_view(&path)?;
    Ok(web::Json(view))
}

#[get("/api/status")]
async fn api_system_status(monitor: Data<SharedMonitor>) -> Result<impl Responder, MonitorError> {
    let status = lock(&monitor)?.system_status()?;
    Ok(web::Json(status))
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    web::Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: ms_since_epoch(),
    })
}

#[get("/api/esp32/status")]
async fn api_esp32_status(esp32: Data<Esp32Handle>) -> impl Responder {
    web::Json(esp32.snapshot())
}

#[get("/api/esp32/alerts")]
async fn api_esp32_alerts(
    query: web::Query<Esp32AlertsQuery>,
    esp32: Data<Esp32Handle>,
) -> impl Responder {
    let alerts = esp32.alerts(query.status);
    let count = alerts.len();
    web::Json(common::req::Esp32AlertList { alerts, count })
}

#[put("/api/esp32/alerts/{id}/resolve")]
async fn api_esp32_resolve(
    path: web::Path<i64>,
    esp32: Data<Esp32Handle>,
) -> Result<impl Responder, MonitorError> {
    let id = path.into_inner();
    esp32
        .resolve(id, ms_since_epoch())
        .map(web::Json)
        .ok_or_else(|| MonitorError::NotFound(format!("alert {id}")))
}

#[put("/api/esp32/alerts/{id}/acknowledge")]
async fn api_esp32_acknowledge(
    path: web::Path<i64>,
    esp32: Data<Esp32Handle>,
) -> Result<impl Responder, MonitorError> {
    let id = path.into_inner();
    esp32
        .acknowledge(id, ms_since_epoch())
        .map(web::Json)
        .ok_or_else(|| MonitorError::NotFound(format!("alert {id}")))
}

pub async fn new_http_server(
    monitor: SharedMonitor,
    esp32: Option<Esp32Handle>,
    port: u16,
) -> std::io::Result<()> {
    HttpServer::new(move || {
        let app = App::new()
            .app_data(Data::new(monitor.clone()))
            .service(hello)
            .service(api_hardware_update)
            .service(api_hardware_bulk_update)
            .service(api_alerts)
            .service(api_resolve_alert)
            .service(api_components_all)
            .service(api_control_component)
            .service(api_room)
            .service(api_system_status)
            .service(api_health)
            .wrap(Cors::permissive());
        match &esp32 {
            Some(handle) => app
                .app_data(Data::new(handle.clone()))
                .service(api_esp32_status)
                .service(api_esp32_alerts)
                .service(api_esp32_resolve)
                .service(api_esp32_acknowledge),
            None => app,
        }
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};
    use common::req::{
        Alert, AlertStatus, AlertType, Component, ComponentStatus, ComponentType, SystemStatus,
    };
    use serde_json::json;

    use crate::store::MemStore;

    fn shared_monitor() -> SharedMonitor {
        Arc::new(Mutex::new(FaultMonitor::new(Backend::Memory(
            MemStore::default(),
        ))))
    }

    fn update_body(id: &str, room: &str, power: f64) -> serde_json::Value {
        json!({
            "id": id,
            "power": power,
            "current": 2.0,
            "status": "on",
            "name": format!("{id} device"),
            "type": "appliance",
            "room": room,
        })
    }

    #[actix_web::test]
    async fn update_alert_resolve_round_trip() {
        let monitor = shared_monitor();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(monitor.clone()))
                .service(api_hardware_update)
                .service(api_alerts)
                .service(api_resolve_alert)
                .service(api_system_status),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/hardware/update")
            .set_json(update_body("heater", "living-room", 1600.0))
            .to_request();
        let resp: UpdateResponse = test::call_and_read_body_json(&app, req).await;
        assert!(resp.success);
        assert_eq!(resp.component.id, "heater");
        assert_eq!(resp.component.status, ComponentStatus::On);

        let req = test::TestRequest::get().uri("/api/alerts").to_request();
        let alerts: Vec<Alert> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertType::PowerLimit);

        let req = test::TestRequest::patch()
            .uri(&format!("/api/alerts/{}/resolve", alerts[0].id))
            .to_request();
        let resolved: Alert = test::call_and_read_body_json(&app, req).await;
        assert_eq!(resolved.status, AlertStatus::Resolved);

        let req = test::TestRequest::get()
            .uri("/api/alerts?status=active")
            .to_request();
        let active: Vec<Alert> = test::call_and_read_body_json(&app, req).await;
        assert!(active.is_empty());

        let req = test::TestRequest::get().uri("/api/status").to_request();
        let status: SystemStatus = test::call_and_read_body_json(&app, req).await;
        assert_eq!(status.total_components, 1);
        assert_eq!(status.active_alerts, 0);
        assert_eq!(status.total_power, 1600.0);
    }

    #[actix_web::test]
    async fn bulk_update_reports_the_written_count() {
        let monitor = shared_monitor();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(monitor.clone()))
                .service(api_hardware_bulk_update)
                .service(api_components_all),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/hardware/bulk-update")
            .set_json(json!({
                "components": [
                    update_body("c1", "kitchen", 100.0),
                    update_body("c2", "kitchen", 200.0),
                ]
            }))
            .to_request();
        let resp: BulkUpdateResponse = test::call_and_read_body_json(&app, req).await;
        assert!(resp.success);
        assert_eq!(resp.count, 2);

        let req = test::TestRequest::get()
            .uri("/api/rooms/components/all")
            .to_request();
        let components: Vec<Component> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].kind, ComponentType::Appliance);
    }

    #[actix_web::test]
    async fn errors_map_to_http_statuses() {
        let monitor = shared_monitor();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(monitor.clone()))
                .service(api_hardware_update)
                .service(api_resolve_alert)
                .service(api_control_component),
        )
        .await;

        // negative power -> validation
        let req = test::TestRequest::post()
            .uri("/api/hardware/update")
            .set_json(update_body("c1", "kitchen", -5.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // unknown alert -> not found
        let req = test::TestRequest::patch()
            .uri("/api/alerts/nope/resolve")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // unknown component -> not found
        let req = test::TestRequest::patch()
            .uri("/api/rooms/components/ghost/control")
            .set_json(json!({"status": "off"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn room_view_returns_components_and_matching_alerts() {
        let monitor = shared_monitor();
        let app = test::init_service(
            App::new()
                .app_data(Data::new(monitor.clone()))
                .service(api_hardware_update)
                .service(api_room),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/hardware/update")
            .set_json(update_body("tv", "living", 1600.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get().uri("/api/rooms/living").to_request();
        let view: common::req::RoomResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view.room.name, "Living");
        assert_eq!(view.room.components.len(), 1);
        assert_eq!(view.alerts.len(), 1);
        assert_eq!(view.alerts[0].location, "Living Room");
    }
}
