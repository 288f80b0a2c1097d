use serde::Serialize;

use std::sync::Arc;

use fillcrop::{ErrorKind, ProcessedResult};

/// Machine-readable view of a batch, one entry per input in input order
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<Entry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Entry<'a> {
    pub filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl<'a> Report<'a> {
    pub fn new(results: &'a [Arc<ProcessedResult>]) -> Self {
        let results: Vec<_> = results.iter().map(|r| Entry::new(r)).collect();
        let failed = results.iter().filter(|e| e.error.is_some()).count();

        Report {
            processed: results.len() - failed,
            failed,
            results,
        }
    }
}

impl<'a> Entry<'a> {
    fn new(result: &'a ProcessedResult) -> Self {
        match &result.outcome {
            Ok(resized) => Entry {
                filename: &result.filename,
                download_name: Some(result.download_name()),
                mime_type: Some(ProcessedResult::MIME_TYPE),
                original_width: Some(resized.original.width()),
                original_height: Some(resized.original.height()),
                width: Some(resized.resized.width()),
                height: Some(resized.resized.height()),
                processing_time_secs: Some(resized.processing_time.as_secs_f64()),
                error: None,
                error_kind: None,
            },
            Err(e) => Entry {
                filename: &result.filename,
                download_name: None,
                mime_type: None,
                original_width: None,
                original_height: None,
                width: None,
                height: None,
                processing_time_secs: None,
                error: Some(e.to_string()),
                error_kind: Some(e.kind()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fillcrop::ProcessError;

    #[test]
    fn failures_only_carry_the_error() {
        let results = vec![Arc::new(ProcessedResult {
            filename: "bad.png".into(),
            outcome: Err(ProcessError::Decode),
        })];

        let json = serde_json::to_value(Report::new(&results)).unwrap();

        assert_eq!(json["processed"], 0);
        assert_eq!(json["failed"], 1);
        assert_eq!(
            json["results"][0],
            serde_json::json!({
                "filename": "bad.png",
                "error": "invalid image file",
                "error_kind": "Decode",
            })
        );
    }
}
