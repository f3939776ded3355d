use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Information about a model installed on the serving host.
///
/// Only `name` is required; the remaining fields are informational and may be
/// absent on older servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name, e.g. `llama3:latest`.
    pub name: String,

    /// Time the model was last pulled or modified.
    #[serde(
        default,
        with = "crate::utils::time::rfc3339_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub modified_at: Option<OffsetDateTime>,

    /// Size on disk in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Content digest of the model blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn model_info_from_tags_entry() {
        let json = r#"{
            "name": "llama3:latest",
            "modified_at": "2024-05-08T13:54:41-07:00",
            "size": 4661224676,
            "digest": "365c0bd3c000",
            "details": {"family": "llama"}
        }"#;

        let info: ModelInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.name, "llama3:latest");
        assert_eq!(info.size, Some(4_661_224_676));
        assert_eq!(info.modified_at, Some(datetime!(2024-05-08 13:54:41 -7)));
        assert_eq!(info.digest.as_deref(), Some("365c0bd3c000"));
    }

    #[test]
    fn model_info_name_only() {
        let info: ModelInfo = serde_json::from_str(r#"{"name":"phi3"}"#).unwrap();
        assert_eq!(info.name, "phi3");
        assert!(info.modified_at.is_none());
        assert!(info.size.is_none());
    }

    #[test]
    fn model_info_requires_name() {
        assert!(serde_json::from_str::<ModelInfo>(r#"{"size":1}"#).is_err());
    }
}
