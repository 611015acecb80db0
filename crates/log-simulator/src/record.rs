use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Information,
    Warning,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Debug => "Debug",
            LogLevel::Information => "Information",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
        };
        f.write_str(s)
    }
}

/// One telemetry document. `tenant_id` is its partition key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: Uuid,
    pub tenant_id: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub service: String,
    pub level: LogLevel,
    pub message: String,
    /// User the operation ran on behalf of, empty when unknown.
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl LogRecord {
    /// Creates an `Information` record with fresh ids and the current time.
    pub fn new(
        tenant_id: impl Into<String>,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            timestamp: Utc::now(),
            correlation_id: Uuid::new_v4(),
            service: service.into(),
            level: LogLevel::Information,
            message: message.into(),
            user: String::new(),
            payload: None,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let record = LogRecord::new("CLIENTE-001", "Auth.API", "Operación 1 completada.");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["tenantId"], "CLIENTE-001");
        assert_eq!(json["service"], "Auth.API");
        assert_eq!(json["level"], "Information");
        assert!(json.get("correlationId").is_some());
        assert!(json.get("payload").is_none());
        assert_eq!(json["user"], "");
    }

    #[test]
    fn user_defaults_to_empty_when_absent() {
        let record = LogRecord::new("CLIENTE-004", "Auth.API", "login").with_user("mrojas");
        assert_eq!(serde_json::to_value(&record).unwrap()["user"], "mrojas");

        let mut json = serde_json::to_value(&record).unwrap();
        json.as_object_mut().unwrap().remove("user");
        let back: LogRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.user, "");
    }

    #[test]
    fn payload_is_kept() {
        let record = LogRecord::new("CLIENTE-002", "Inventory.API", "stock")
            .with_level(LogLevel::Warning)
            .with_payload(serde_json::json!({ "sku": "A-1" }));

        let back: LogRecord =
            serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(back, record);
    }
}
