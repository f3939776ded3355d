use serde::{Deserialize, Serialize};

use crate::types::{ModelInfo, ModelName};

/// Response from `GET /api/tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListResponse {
    /// Models installed on the host.
    pub models: Vec<ModelInfo>,
}

impl ModelListResponse {
    /// Get the list of models.
    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    /// The model names, sorted ascending with duplicates removed.
    pub fn sorted_names(&self) -> Vec<ModelName> {
        let mut names: Vec<ModelName> = self.models.iter().map(|m| m.name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sorted() {
        let response: ModelListResponse = serde_json::from_str(
            r#"{"models":[{"name":"llama3"},{"name":"codellama"},{"name":"llama2"}]}"#,
        )
        .unwrap();
        assert_eq!(response.models().len(), 3);
        assert_eq!(
            response.sorted_names(),
            vec!["codellama".to_string(), "llama2".to_string(), "llama3".to_string()]
        );
    }

    #[test]
    fn missing_models_field_is_an_error() {
        assert!(serde_json::from_str::<ModelListResponse>(r#"{"data":[]}"#).is_err());
    }
}
