use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::diff::diff_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLogMode {
    Full,
    Diffed,
}

/// NDJSON record of API exchanges. Request and response lines share an `id`.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_by_path: HashMap<String, Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_by_path: HashMap::new(),
        })
    }

    /// Returns the correlation id for the matching response line.
    pub fn log_request(&mut self, method: &str, path: &str, body: Option<&Value>) -> String {
        let id = Uuid::new_v4().to_string();
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "id": id,
            "dir": "req",
            "method": method,
            "path": path,
            "body": body,
        });
        self.write_line(&entry);
        id
    }

    pub fn log_command(&mut self, device: &str, field: &str, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "device": device,
            "field": field,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, id: &str, path: &str, status: u16, body: &Value) {
        let entry = match self.mode {
            MessageLogMode::Full => json!({
                "ts": Utc::now().to_rfc3339(),
                "id": id,
                "dir": "resp",
                "path": path,
                "status": status,
                "body": body,
            }),
            MessageLogMode::Diffed => match self.previous_by_path.get(path) {
                None => json!({
                    "ts": Utc::now().to_rfc3339(),
                    "id": id,
                    "dir": "resp",
                    "path": path,
                    "status": status,
                    "full": true,
                    "body": body,
                }),
                Some(prev) => {
                    let mut changes = Vec::new();
                    diff_json(prev, body, "", &mut changes);
                    let change_entries: Vec<Value> = changes
                        .iter()
                        .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                        .collect();
                    json!({
                        "ts": Utc::now().to_rfc3339(),
                        "id": id,
                        "dir": "resp",
                        "path": path,
                        "status": status,
                        "changes": change_entries,
                    })
                }
            },
        };
        self.write_line(&entry);
        if self.mode == MessageLogMode::Diffed {
            self.previous_by_path.insert(path.to_string(), body.clone());
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.file.flush() {
            warn!("failed to flush message log: {e}");
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn read_lines(path: &str) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn request_and_response_share_id() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        let id = logger.log_request("GET", "/buildings", None);
        logger.log_response(&id, "/buildings", 200, &json!([]));

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "req");
        assert_eq!(lines[0]["method"], "GET");
        assert!(lines[0]["ts"].as_str().is_some());
        assert_eq!(lines[1]["dir"], "resp");
        assert_eq!(lines[0]["id"], lines[1]["id"]);
    }

    #[test]
    fn diffed_mode_logs_full_first_then_changes() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Diffed, path).unwrap();

        let p = "/buildings/b1/devices";
        logger.log_response("1", p, 200, &json!([{"dbt": 100}]));
        logger.log_response("2", p, 200, &json!([{"dbt": 104}]));

        let lines = read_lines(path);
        assert_eq!(lines[0]["full"], true);
        assert!(lines[0]["body"].is_array());
        let changes = lines[1]["changes"].as_array().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0]["path"], "0.dbt");
    }

    #[test]
    fn diffed_mode_tracks_paths_separately() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Diffed, path).unwrap();
        logger.log_response("1", "/buildings", 200, &json!([]));
        logger.log_response("2", "/account/me", 200, &json!({"email": "a@b"}));

        let lines = read_lines(path);
        assert_eq!(lines[1]["full"], true);
    }

    #[test]
    fn log_command_captures_device_and_field() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap();
        let mut logger = MessageLogger::new(MessageLogMode::Full, path).unwrap();
        logger.log_command("ABC123", "wwsd", &json!({"wwsd": "off"}));

        let lines = read_lines(path);
        assert_eq!(lines[0]["dir"], "cmd");
        assert_eq!(lines[0]["device"], "ABC123");
        assert_eq!(lines[0]["field"], "wwsd");
    }
}
