// Job Domain Model

use data_encoding::BASE32;
use serde::{Deserialize, Serialize};

/// Key namespace for status records
pub const STATUS_KEY_PREFIX: &str = "goq:queue:job:status:";

/// Job identity (base32 of the raw payload bytes)
pub type JobId = String;

/// Progress record stored per job.
///
/// Serialized as `{"Code":0,"Progress":0}` so that records written by other
/// clients of the same key space stay readable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    pub code: u8,
    pub progress: u8,
}

impl Status {
    pub fn new(code: u8, progress: u8) -> Self {
        Self { code, progress }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code={} progress={}", self.code, self.progress)
    }
}

/// Derive the identity of a payload.
///
/// This is an encoding, not a hash: byte-identical payloads always map to the
/// same identity and therefore share one status record.
pub fn job_id_for(payload: &str) -> JobId {
    BASE32.encode(payload.as_bytes())
}

/// Broker key holding the status record of `id`
pub fn status_key(id: &str) -> String {
    format!("{}{}", STATUS_KEY_PREFIX, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_is_standard_base32() {
        assert_eq!(job_id_for("foobar"), "MZXW6YTBOI======");
        assert_eq!(job_id_for(""), "");
    }

    #[test]
    fn test_job_id_deterministic() {
        let payload = r#"{"task":"resize"}"#;
        assert_eq!(job_id_for(payload), job_id_for(payload));
    }

    #[test]
    fn test_distinct_payloads_distinct_ids() {
        assert_ne!(
            job_id_for(r#"{"task":"resize"}"#),
            job_id_for(r#"{"task":"resize" }"#)
        );
    }

    #[test]
    fn test_status_key_namespace() {
        assert_eq!(status_key("ABC"), "goq:queue:job:status:ABC");
    }

    #[test]
    fn test_status_wire_format() {
        let json = Status::new(1, 100).to_json().unwrap();
        assert_eq!(json, r#"{"Code":1,"Progress":100}"#);

        let status = Status::from_json(r#"{"Code":7,"Progress":42}"#).unwrap();
        assert_eq!(status, Status::new(7, 42));
    }

    #[test]
    fn test_status_rejects_out_of_range() {
        assert!(Status::from_json(r#"{"Code":256,"Progress":0}"#).is_err());
        assert!(Status::from_json("not json").is_err());
    }
}
