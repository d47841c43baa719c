//! The single JSON line printed on stdout.

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// `{"success": true, "output": ...}` or `{"success": false, "error": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Success { success: bool, output: String },
    Failure { success: bool, error: String },
}

impl Report {
    pub fn success(output: &Path) -> Self {
        Self::Success {
            success: true,
            output: output.display().to_string(),
        }
    }

    /// Failure payload carrying the full error chain.
    pub fn failure(error: &anyhow::Error) -> Self {
        Self::Failure {
            success: false,
            error: format!("{:#}", error),
        }
    }

    pub fn from_result(result: &Result<PathBuf>) -> Self {
        match result {
            Ok(path) => Self::success(path),
            Err(e) => Self::failure(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn to_json(&self) -> String {
        // Two string fields and a bool cannot fail to serialise.
        serde_json::to_string(self).unwrap_or_else(|_| {
            String::from(r#"{"success":false,"error":"failed to serialise result"}"#)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn success_payload_shape() {
        let report = Report::success(Path::new("public/results/a_result.jpg"));
        assert_eq!(
            report.to_json(),
            r#"{"success":true,"output":"public/results/a_result.jpg"}"#
        );
    }

    #[test]
    fn failure_payload_keeps_error_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("no such file"))
            .context("failed to load model")
            .expect_err("error");
        let report = Report::failure(&err);
        assert!(!report.is_success());
        assert_eq!(
            report.to_json(),
            r#"{"success":false,"error":"failed to load model: no such file"}"#
        );
    }
}
