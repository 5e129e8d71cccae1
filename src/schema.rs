//! The conformance test-case JSON schema. The harness that drives fixtures
//! in this format is out of scope here, but the schema itself is a small,
//! useful surface for a caller who wants to load upstream-style fixtures
//! and run them through [`crate::JsonAta`] with their own runner.

use serde::Deserialize;

/// One test case, matching the reference conformance suite's JSON shape.
/// Exactly one of `data`/`dataset` is expected to be present (both absent
/// means the input is `Undefined`); exactly one of `result`/
/// `undefined_result`/`code` is the success criterion.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub expr: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub bindings: std::collections::HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub timelimit: Option<u64>,
    #[serde(default)]
    pub depth: Option<usize>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default, rename = "undefinedResult")]
    pub undefined_result: Option<bool>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl TestCase {
    /// Resolves this case's input, given a base path to look up `dataset`
    /// references under `<base_path>/datasets/<name>.json`. Returns
    /// `Undefined`-equivalent `None` when neither `data` nor `dataset` is
    /// present.
    pub fn resolve_input(&self, base_path: &std::path::Path) -> std::io::Result<Option<serde_json::Value>> {
        if let Some(data) = &self.data {
            return Ok(Some(data.clone()));
        }
        if let Some(name) = &self.dataset {
            let path = base_path.join("datasets").join(format!("{}.json", name));
            let text = std::fs::read_to_string(path)?;
            let value = serde_json::from_str(&text)?;
            return Ok(Some(value));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_minimal_case() {
        let json = r#"{"expr": "1 + 1", "result": 2}"#;
        let case: TestCase = serde_json::from_str(json).unwrap();
        assert_eq!(case.expr, "1 + 1");
        assert_eq!(case.result, Some(serde_json::json!(2)));
        assert!(case.data.is_none());
        assert!(case.dataset.is_none());
    }

    #[test]
    fn deserializes_an_error_case() {
        let json = r#"{"expr": "1 +", "code": "S0201", "token": "+"}"#;
        let case: TestCase = serde_json::from_str(json).unwrap();
        assert_eq!(case.code.as_deref(), Some("S0201"));
        assert_eq!(case.token.as_deref(), Some("+"));
    }
}
