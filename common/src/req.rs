// keep in sync with db.rs of backend

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Lighting,
    Appliance,
    Electronics,
    Hvac,
    Outlet,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lighting => "lighting",
            Self::Appliance => "appliance",
            Self::Electronics => "electronics",
            Self::Hvac => "hvac",
            Self::Outlet => "outlet",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lighting" => Some(Self::Lighting),
            "appliance" => Some(Self::Appliance),
            "electronics" => Some(Self::Electronics),
            "hvac" => Some(Self::Hvac),
            "outlet" => Some(Self::Outlet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentStatus {
    On,
    Off,
    InUse,
    ShortCircuit,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::InUse => "in-use",
            Self::ShortCircuit => "short-circuit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "in-use" => Some(Self::InUse),
            "short-circuit" => Some(Self::ShortCircuit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertType {
    PowerLimit,
    ShortCircuit,
    Offline,
    Warning,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PowerLimit => "power-limit",
            Self::ShortCircuit => "short-circuit",
            Self::Offline => "offline",
            Self::Warning => "warning",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "power-limit" => Some(Self::PowerLimit),
            "short-circuit" => Some(Self::ShortCircuit),
            "offline" => Some(Self::Offline),
            "warning" => Some(Self::Warning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String, // unique, key
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub status: ComponentStatus,
    pub power: f64,   // W
    pub current: f64, // A
    pub room: String,
    pub last_updated: i64, // ms
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub severity: Severity,
    pub location: String,
    pub message: String,
    pub status: AlertStatus,
    pub timestamp: i64, // ms
}

/// Telemetry update as sent by the hardware. `name`, `type` and `room` are
/// only needed the first time an id is seen.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentUpdate {
    pub id: String,
    pub power: f64,   // W
    pub current: f64, // A
    pub status: ComponentStatus,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<ComponentType>,
    #[serde(default)]
    pub room: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct BulkUpdateRequest {
    pub components: Vec<ComponentUpdate>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub component: Component,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct BulkUpdateResponse {
    pub success: bool,
    pub count: usize,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    pub status: Option<AlertStatus>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ControlRequest {
    pub status: ComponentStatus,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RoomInfo {
    pub id: String,
    pub name: String,
    pub components: Vec<Component>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RoomResponse {
    pub room: RoomInfo,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub online: bool,
    pub total_components: i64,
    pub active_components: i64, // status != off
    pub active_alerts: i64,
    pub total_power: f64, // W
    pub last_update: i64, // ms
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64, // ms
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ---- ESP32 proxy surface ----

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LoadStatus {
    pub status: String,
    pub class: String,
    pub fault: bool,
}

impl Default for LoadStatus {
    fn default() -> Self {
        Self {
            status: "No Fault!".to_string(),
            class: "success".to_string(),
            fault: false,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Esp32Snapshot {
    pub load1: LoadStatus,
    pub load2: LoadStatus,
    pub load3: LoadStatus,
    pub message: String,
    pub message_class: String,
    pub last_update: i64, // ms
    pub is_connected: bool,
}

impl Default for Esp32Snapshot {
    fn default() -> Self {
        Self {
            load1: LoadStatus::default(),
            load2: LoadStatus::default(),
            load3: LoadStatus::default(),
            message: String::new(),
            message_class: "hide".to_string(),
            last_update: 0,
            is_connected: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoadFlags {
    pub load1: bool,
    pub load2: bool,
    pub load3: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Esp32AlertKind {
    ShortCircuit,
    Overload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Esp32AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Esp32Alert {
    pub id: i64,
    pub timestamp: i64, // ms
    #[serde(rename = "type")]
    pub kind: Esp32AlertKind,
    pub severity: Severity,
    pub message: String,
    pub loads: LoadFlags,
    pub status: Esp32AlertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Esp32AlertsQuery {
    #[serde(default)]
    pub status: Option<Esp32AlertStatus>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Esp32AlertList {
    pub alerts: Vec<Esp32Alert>,
    pub count: usize,
}
