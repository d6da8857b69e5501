// Rust guideline compliant 2026-10-16

//! HTTP adapter for the `SnapshotSource` and `StatusWriter` ports.
//!
//! Talks to the detection backend's REST API:
//! - `GET  {base}/api/fraud-cases?limit=N` -- full snapshot, a JSON array of cases;
//! - `PATCH {base}/api/fraud-cases/{id}/status` -- status write; the endpoint
//!   only accepts the Spanish status spelling (`"CONFIRMADO"`).
//!
//! Snapshot records that fail to decode are dropped with a warning; the rest
//! of the snapshot is still applied.

use domain::{
    CaseId, FetchError, FraudCase, SnapshotSource, StatusUpdate, StatusWriter, WriteError,
};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Upper bound on any single request, connect included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Body of a status write.
#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    status: &'static str,
    notes: Option<&'a str>,
    user: &'a str,
}

impl<'a> StatusBody<'a> {
    fn new(update: &'a StatusUpdate) -> Self {
        Self {
            status: update.status.backend_code(),
            notes: update.notes.as_deref(),
            user: &update.actor,
        }
    }
}

/// `SnapshotSource` + `StatusWriter` adapter over one backend base URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    snapshot_limit: usize,
}

impl HttpBackend {
    /// Create a client for `base_url` (e.g. `http://localhost:8000`).
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error when the HTTP client cannot be built.
    pub fn new(base_url: &str, snapshot_limit: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned(), snapshot_limit })
    }

    fn cases_url(&self) -> String {
        format!("{}/api/fraud-cases", self.base_url)
    }

    fn status_url(&self, case_id: CaseId) -> String {
        format!("{}/api/fraud-cases/{case_id}/status", self.base_url)
    }
}

/// Decode a snapshot body, dropping records that fail to decode.
fn parse_snapshot(body: Value) -> Result<Vec<FraudCase>, FetchError> {
    let Value::Array(records) = body else {
        return Err(FetchError::InvalidResponse {
            reason: "expected a JSON array of cases".to_owned(),
        });
    };
    let mut cases = Vec::with_capacity(records.len());
    for record in records {
        match FraudCase::from_value(record) {
            Ok(case) => cases.push(case),
            Err(e) => tracing::warn!(error = %e, "http_backend.snapshot.invalid_record"),
        }
    }
    Ok(cases)
}

impl SnapshotSource for HttpBackend {
    async fn fetch_all(&self) -> Result<Vec<FraudCase>, FetchError> {
        let response = self
            .client
            .get(self.cases_url())
            .query(&[("limit", self.snapshot_limit)])
            .send()
            .await
            .map_err(|e| FetchError::Unavailable { reason: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Unavailable { reason: format!("HTTP {status}") });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse { reason: e.to_string() })?;
        let cases = parse_snapshot(body)?;
        tracing::debug!(count = cases.len(), "http_backend.snapshot.fetched");
        Ok(cases)
    }
}

impl StatusWriter for HttpBackend {
    async fn write_status(&self, update: &StatusUpdate) -> Result<(), WriteError> {
        let request_id = Uuid::new_v4();
        let body = StatusBody::new(update);

        let response = self
            .client
            .patch(self.status_url(update.case_id))
            .header("X-Request-Id", request_id.to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| WriteError::Unreachable { reason: e.to_string() })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(
                case_id = update.case_id,
                status = %update.status,
                %request_id,
                "http_backend.status.written"
            );
            return Ok(());
        }

        let reason = response.text().await.unwrap_or_default();
        tracing::warn!(case_id = update.case_id, http_status = status.as_u16(), %request_id, "http_backend.status.rejected");
        Err(WriteError::Rejected { status: status.as_u16(), reason })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{HttpBackend, StatusBody, parse_snapshot};
    use chrono::{TimeZone as _, Utc};
    use domain::{CaseStatus, DetectorType, FetchError, Severity, StatusUpdate};
    use serde_json::json;

    #[test]
    fn urls_follow_rest_layout() {
        let backend = HttpBackend::new("http://localhost:8000/", 500).unwrap();
        assert_eq!(backend.cases_url(), "http://localhost:8000/api/fraud-cases");
        assert_eq!(backend.status_url(17), "http://localhost:8000/api/fraud-cases/17/status");
    }

    #[test]
    fn snapshot_drops_invalid_records() {
        let body = json!([
            {
                "id": 1,
                "case_number": "FRD-00001",
                "detector_type": "FUEL_THEFT",
                "severity": "ALTO",
                "status": "PENDIENTE",
                "detection_date": "2024-05-01T10:00:00"
            },
            { "id": 2, "case_number": "FRD-00002" },
            {
                "id": 3,
                "case_number": "FRD-00003",
                "detector_type": "AFTER_HOURS",
                "severity": "LOW",
                "amount_involved": 12.5,
                "detection_date": "2024-05-02T10:00:00Z"
            }
        ]);

        let cases = parse_snapshot(body).unwrap();

        assert_eq!(cases.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(cases[0].status, CaseStatus::Pending);
        assert_eq!(cases[1].amount, Some(12.5));
    }

    // List records as the backend builds them: defaults filled in, naive
    // dates, no created_at/updated_at.
    #[test]
    fn snapshot_accepts_backend_list_records() {
        let body = json!([
            {
                "id": 40,
                "case_number": "",
                "detector_type": "UNKNOWN",
                "severity": "MEDIO",
                "status": "PENDIENTE",
                "title": "Sin título",
                "description": null,
                "amount": null,
                "client_code": null,
                "client_name": null,
                "detection_date": "2024-05-03T09:15:00",
                "confidence_score": null
            },
            {
                "id": 41,
                "case_number": "FRD-2024-0041",
                "detector_type": "UNKNOWN",
                "severity": "MEDIO",
                "status": "PENDIENTE",
                "title": "Sin título",
                "description": null,
                "amount": 1520.75,
                "client_code": "C-220",
                "client_name": "Estación Sur",
                "detection_date": "2024-05-03T09:15:42.512345",
                "confidence_score": 64.0
            }
        ]);

        let cases = parse_snapshot(body).unwrap();

        assert_eq!(cases.len(), 1, "an empty case_number is dropped");
        let case = &cases[0];
        assert_eq!(case.id, 41);
        assert_eq!(case.detector_type, DetectorType::Unknown);
        assert_eq!(case.severity, Severity::Medium);
        assert_eq!(case.status, CaseStatus::Pending);
        assert_eq!(case.title.as_deref(), Some("Sin título"));
        assert_eq!(case.updated_at, None);
        assert_eq!(case.created_at, None);
        assert_eq!(
            case.detection_date.date_naive(),
            Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap().date_naive()
        );
    }

    #[test]
    fn snapshot_must_be_an_array() {
        let result = parse_snapshot(json!({ "cases": [] }));
        assert!(matches!(result, Err(FetchError::InvalidResponse { .. })));
    }

    #[test]
    fn status_body_uses_backend_field_names_and_spelling() {
        let update = StatusUpdate {
            case_id: 7,
            status: CaseStatus::Rejected,
            notes: Some("false alarm".to_owned()),
            actor: "analyst".to_owned(),
        };
        assert_eq!(
            serde_json::to_value(StatusBody::new(&update)).unwrap(),
            json!({ "status": "RECHAZADO", "notes": "false alarm", "user": "analyst" })
        );
    }

    #[test]
    fn status_body_spelling_matches_backend_enum() {
        let expected = [
            (CaseStatus::Pending, "PENDIENTE"),
            (CaseStatus::Investigating, "INVESTIGANDO"),
            (CaseStatus::Confirmed, "CONFIRMADO"),
            (CaseStatus::Rejected, "RECHAZADO"),
            (CaseStatus::Resolved, "RESUELTO"),
        ];
        for (status, code) in expected {
            let update = StatusUpdate { case_id: 1, status, notes: None, actor: "analyst".to_owned() };
            let body = serde_json::to_value(StatusBody::new(&update)).unwrap();
            assert_eq!(body["status"], json!(code));
            assert_eq!(body["notes"], json!(null));
        }
    }
}
