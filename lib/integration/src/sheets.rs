//! Google Sheets record store.
//!
//! Every `connect` signs a fresh service account assertion, exchanges it for
//! an access token and resolves the title of the spreadsheet's first
//! worksheet. Lookups then read A1 ranges through `values.get`.

use crate::connector::StoreConnector;
use crate::credential::{AccessToken, JWT_BEARER_GRANT, ServiceAccountCredentials};
use crate::error::StoreError;
use crate::store::{RecordStore, RowRef};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

/// OAuth scope for reading and writing spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Public Sheets API endpoint.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Which spreadsheet to read.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    /// Spreadsheet key, as it appears in the sheet's URL.
    pub sheet_id: String,
    /// API endpoint, overridable for proxies.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    SHEETS_API_BASE.to_string()
}

impl SheetsConfig {
    /// Creates a config for the public API.
    #[must_use]
    pub fn new(sheet_id: impl Into<String>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<WorksheetEntry>,
}

#[derive(Debug, Deserialize)]
struct WorksheetEntry {
    properties: WorksheetProperties,
}

#[derive(Debug, Deserialize)]
struct WorksheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
}

/// Row or column orientation of a values request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Rows,
    Columns,
}

impl Dimension {
    fn as_str(self) -> &'static str {
        match self {
            Self::Rows => "ROWS",
            Self::Columns => "COLUMNS",
        }
    }
}

/// Connects to one spreadsheet with a service account.
#[derive(Debug, Clone)]
pub struct GoogleSheetsConnector {
    http: reqwest::Client,
    credentials: ServiceAccountCredentials,
    config: SheetsConfig,
}

impl GoogleSheetsConnector {
    /// Creates a connector.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        credentials: ServiceAccountCredentials,
        config: SheetsConfig,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::ConnectionFailed {
                reason: format!("HTTP client error: {e}"),
            })?;

        Ok(Self {
            http,
            credentials,
            config,
        })
    }

    #[instrument(skip(self), fields(client_email = %self.credentials.client_email))]
    async fn fetch_token(&self) -> Result<AccessToken, StoreError> {
        let now = Utc::now();
        let assertion = self.credentials.sign_assertion(&[SHEETS_SCOPE], now)?;

        let response = self
            .http
            .post(&self.credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(request_error)?;

        let token: TokenResponse = match read_json(response).await {
            // The token endpoint answers bad grants with 400
            Err(StoreError::RequestFailed { reason, .. }) => {
                return Err(StoreError::AuthenticationFailed { reason });
            }
            other => other?,
        };

        debug!(expires_in = token.expires_in, "obtained access token");
        Ok(AccessToken::new(token.access_token, token.expires_in, now))
    }

    #[instrument(skip(self, token), fields(sheet_id = %self.config.sheet_id))]
    async fn first_worksheet(&self, token: &AccessToken) -> Result<String, StoreError> {
        let mut url = spreadsheet_url(&self.config)?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");

        let response = self
            .http
            .get(url)
            .bearer_auth(&token.token)
            .send()
            .await
            .map_err(request_error)?;

        let metadata: SpreadsheetMetadata = read_json(response).await?;
        metadata
            .sheets
            .into_iter()
            .next()
            .map(|sheet| sheet.properties.title)
            .ok_or_else(|| StoreError::ProtocolError {
                reason: "spreadsheet has no worksheets".to_string(),
            })
    }
}

#[async_trait]
impl StoreConnector for GoogleSheetsConnector {
    type Store = GoogleSheet;

    fn name(&self) -> &str {
        "google_sheets"
    }

    async fn connect(&self) -> Result<Self::Store, StoreError> {
        let token = self.fetch_token().await?;
        let title = self.first_worksheet(&token).await?;
        debug!(worksheet = %title, "connected to spreadsheet");

        Ok(GoogleSheet {
            http: self.http.clone(),
            token,
            config: self.config.clone(),
            title,
        })
    }
}

/// An authorised handle to the first worksheet of a spreadsheet.
#[derive(Debug)]
pub struct GoogleSheet {
    http: reqwest::Client,
    token: AccessToken,
    config: SheetsConfig,
    title: String,
}

impl GoogleSheet {
    async fn get_values(
        &self,
        a1: &str,
        dimension: Dimension,
    ) -> Result<Vec<Vec<String>>, StoreError> {
        let range = qualified_range(&self.title, a1);
        let mut url = spreadsheet_url(&self.config)?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| StoreError::ProtocolError {
                reason: "API base cannot carry a path".to_string(),
            })?;
            segments.extend(["values", range.as_str()]);
        }
        url.query_pairs_mut()
            .append_pair("majorDimension", dimension.as_str());

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token.token)
            .send()
            .await
            .map_err(request_error)?;

        let values: ValueRange = read_json(response).await?;
        Ok(values
            .values
            .into_iter()
            .map(|line| line.into_iter().map(cell_text).collect())
            .collect())
    }
}

#[async_trait]
impl RecordStore for GoogleSheet {
    #[instrument(skip(self, key), fields(worksheet = %self.title))]
    async fn find_row_by_key(
        &self,
        column: u32,
        key: &str,
    ) -> Result<Option<RowRef>, StoreError> {
        let letters = column_letters(column)?;
        let columns = self
            .get_values(&format!("{letters}:{letters}"), Dimension::Columns)
            .await?;

        let position = columns
            .first()
            .and_then(|cells| cells.iter().position(|cell| cell == key));

        debug!(found = position.is_some(), "key lookup finished");
        Ok(position.map(|i| RowRef::new(i as u32 + 1)))
    }

    #[instrument(skip(self), fields(worksheet = %self.title))]
    async fn get_cell(&self, row: RowRef, column: u32) -> Result<Option<String>, StoreError> {
        if row.row() == 0 {
            return Err(StoreError::InvalidReference { row });
        }
        let letters = column_letters(column)?;
        let rows = self
            .get_values(&format!("{letters}{}", row.row()), Dimension::Rows)
            .await?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(|cells| cells.into_iter().next())
            .filter(|cell| !cell.is_empty()))
    }

    #[instrument(skip(self), fields(worksheet = %self.title))]
    async fn get_row(&self, row: RowRef) -> Result<Vec<String>, StoreError> {
        if row.row() == 0 {
            return Err(StoreError::InvalidReference { row });
        }
        let rows = self
            .get_values(&format!("{0}:{0}", row.row()), Dimension::Rows)
            .await?;

        Ok(rows.into_iter().next().unwrap_or_default())
    }
}

fn spreadsheet_url(config: &SheetsConfig) -> Result<Url, StoreError> {
    let mut url = Url::parse(&config.api_base).map_err(|e| StoreError::ProtocolError {
        reason: format!("invalid API base '{}': {e}", config.api_base),
    })?;
    url.path_segments_mut()
        .map_err(|()| StoreError::ProtocolError {
            reason: "API base cannot carry a path".to_string(),
        })?
        .pop_if_empty()
        .extend(["v4", "spreadsheets", config.sheet_id.as_str()]);
    Ok(url)
}

/// Converts a 1-based column number into spreadsheet letters.
fn column_letters(column: u32) -> Result<String, StoreError> {
    if column == 0 {
        return Err(StoreError::ProtocolError {
            reason: "columns are numbered from 1".to_string(),
        });
    }

    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    Ok(letters.into_iter().rev().collect())
}

/// Prefixes an A1 range with a quoted worksheet title.
fn qualified_range(title: &str, a1: &str) -> String {
    format!("'{}'!{a1}", title.replace('\'', "''"))
}

fn cell_text(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn request_error(err: reqwest::Error) -> StoreError {
    StoreError::ConnectionFailed {
        reason: err.to_string(),
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let reason = error_message(&body);
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                StoreError::AuthenticationFailed { reason }
            }
            _ => StoreError::RequestFailed {
                status: status.as_u16(),
                reason,
            },
        });
    }

    response.json::<T>().await.map_err(|e| StoreError::ProtocolError {
        reason: format!("unexpected response body: {e}"),
    })
}

/// Pulls a readable message out of a Google error body.
///
/// API errors nest it under `error.message`; the token endpoint uses
/// `error_description`.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<JsonValue>(body) else {
        return body.trim().to_string();
    };

    value
        .pointer("/error/message")
        .or_else(|| value.get("error_description"))
        .or_else(|| value.get("error"))
        .and_then(JsonValue::as_str)
        .map_or_else(|| body.trim().to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_follow_spreadsheet_naming() {
        assert_eq!(column_letters(1).unwrap(), "A");
        assert_eq!(column_letters(3).unwrap(), "C");
        assert_eq!(column_letters(26).unwrap(), "Z");
        assert_eq!(column_letters(27).unwrap(), "AA");
        assert_eq!(column_letters(52).unwrap(), "AZ");
        assert_eq!(column_letters(703).unwrap(), "AAA");
        assert!(column_letters(0).is_err());
    }

    #[test]
    fn ranges_quote_worksheet_titles() {
        assert_eq!(qualified_range("Sheet1", "A:A"), "'Sheet1'!A:A");
        assert_eq!(qualified_range("Bob's staff", "B7"), "'Bob''s staff'!B7");
    }

    #[test]
    fn spreadsheet_url_appends_sheet_id() {
        let config = SheetsConfig::new("abc-123");
        let url = spreadsheet_url(&config).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc-123"
        );

        let config = SheetsConfig {
            sheet_id: "abc".to_string(),
            api_base: "http://localhost:8080/proxy/".to_string(),
        };
        let url = spreadsheet_url(&config).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/proxy/v4/spreadsheets/abc");
    }

    #[test]
    fn value_ranges_tolerate_missing_values() {
        let empty: ValueRange =
            serde_json::from_str(r#"{"range":"'Sheet1'!B9","majorDimension":"ROWS"}"#).unwrap();
        assert!(empty.values.is_empty());

        let filled: ValueRange =
            serde_json::from_str(r#"{"values":[["123","0999",42,null]]}"#).unwrap();
        let cells: Vec<String> = filled.values[0].iter().cloned().map(cell_text).collect();
        assert_eq!(cells, vec!["123", "0999", "42", ""]);
    }

    #[test]
    fn metadata_lists_worksheets_in_order() {
        let metadata: SpreadsheetMetadata = serde_json::from_str(
            r#"{"sheets":[{"properties":{"title":"Staff"}},{"properties":{"title":"Old"}}]}"#,
        )
        .unwrap();
        assert_eq!(metadata.sheets[0].properties.title, "Staff");
    }

    #[test]
    fn error_messages_are_extracted() {
        assert_eq!(
            error_message(r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#),
            "Requested entity was not found."
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid JWT Signature."}"#),
            "Invalid JWT Signature."
        );
        assert_eq!(error_message(r#"{"error":"invalid_grant"}"#), "invalid_grant");
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn token_response_defaults_expiry() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"ya29.x","token_type":"Bearer"}"#).unwrap();
        assert_eq!(token.expires_in, 3600);
    }

    mod against_stub_server {
        use super::*;
        use axum::extract::{Path, Query, State};
        use axum::http::{HeaderMap, StatusCode};
        use axum::response::{IntoResponse, Response};
        use axum::routing::{get, post};
        use axum::{Form, Json, Router};
        use serde_json::json;
        use std::collections::HashMap;
        use std::sync::{Arc, Mutex};

        const TEST_KEY: &str = include_str!("../testdata/service-account-key.pem");
        const TOKEN: &str = "stub-access-token";

        #[derive(Clone, Default)]
        struct Stub {
            /// `(range, majorDimension)` of every values request.
            ranges: Arc<Mutex<Vec<(String, String)>>>,
            /// `kid` of every assertion presented at the token endpoint.
            kids: Arc<Mutex<Vec<Option<String>>>>,
            reject_grants: bool,
        }

        fn authorized(headers: &HeaderMap) -> bool {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == format!("Bearer {TOKEN}"))
        }

        fn unauthorized() -> Response {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"code": 401, "message": "Request had invalid authentication credentials."}})),
            )
                .into_response()
        }

        async fn token(State(stub): State<Stub>, Form(form): Form<HashMap<String, String>>) -> Response {
            if form.get("grant_type").map(String::as_str) != Some(JWT_BEARER_GRANT) {
                return (StatusCode::BAD_REQUEST, Json(json!({"error": "unsupported_grant_type"})))
                    .into_response();
            }
            let assertion = form.get("assertion").cloned().unwrap_or_default();
            let header = jsonwebtoken::decode_header(&assertion).unwrap();
            stub.kids.lock().unwrap().push(header.kid);

            if stub.reject_grants {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant", "error_description": "Invalid JWT Signature."})),
                )
                    .into_response();
            }
            Json(json!({"access_token": TOKEN, "expires_in": 3599, "token_type": "Bearer"}))
                .into_response()
        }

        async fn metadata(
            Path(sheet_id): Path<String>,
            Query(query): Query<HashMap<String, String>>,
            headers: HeaderMap,
        ) -> Response {
            if !authorized(&headers) {
                return unauthorized();
            }
            if sheet_id != "staff-sheet" {
                return (
                    StatusCode::NOT_FOUND,
                    Json(json!({"error": {"code": 404, "message": "Requested entity was not found."}})),
                )
                    .into_response();
            }
            assert_eq!(query.get("fields").map(String::as_str), Some("sheets.properties.title"));
            Json(json!({"sheets": [
                {"properties": {"title": "Staff Sheet"}},
                {"properties": {"title": "Archive"}},
            ]}))
            .into_response()
        }

        async fn values(
            State(stub): State<Stub>,
            Path((_sheet_id, range)): Path<(String, String)>,
            Query(query): Query<HashMap<String, String>>,
            headers: HeaderMap,
        ) -> Response {
            if !authorized(&headers) {
                return unauthorized();
            }
            let dimension = query.get("majorDimension").cloned().unwrap_or_default();
            stub.ranges.lock().unwrap().push((range.clone(), dimension));

            let values = match range.as_str() {
                "'Staff Sheet'!A:A" => json!([["ID", "111", "123"]]),
                "'Staff Sheet'!B3" => json!([["0999"]]),
                "'Staff Sheet'!C2" => json!([]),
                "'Staff Sheet'!3:3" => json!([["123", "0999", "مسموح", "HR", 7]]),
                _ => json!([]),
            };
            Json(json!({"range": range, "values": values})).into_response()
        }

        async fn serve(stub: Stub) -> String {
            let app = Router::new()
                .route("/token", post(token))
                .route("/v4/spreadsheets/{id}", get(metadata))
                .route("/v4/spreadsheets/{id}/values/{range}", get(values))
                .with_state(stub);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{addr}")
        }

        fn connector(base: &str, sheet_id: &str) -> GoogleSheetsConnector {
            let credentials = ServiceAccountCredentials {
                project_id: Some("staffcheck-test".to_string()),
                private_key_id: "key-1".to_string(),
                private_key: TEST_KEY.to_string(),
                client_email: "bot@staffcheck-test.iam.gserviceaccount.com".to_string(),
                client_id: None,
                token_uri: format!("{base}/token"),
            };
            let config = SheetsConfig {
                sheet_id: sheet_id.to_string(),
                api_base: base.to_string(),
            };
            GoogleSheetsConnector::new(credentials, config).unwrap()
        }

        #[tokio::test]
        async fn lookups_read_the_first_worksheet() {
            let stub = Stub::default();
            let base = serve(stub.clone()).await;
            let sheet = connector(&base, "staff-sheet").connect().await.unwrap();

            let row = sheet.find_row_by_key(1, "123").await.unwrap();
            assert_eq!(row, Some(RowRef::new(3)));
            assert_eq!(sheet.find_row_by_key(1, "12").await.unwrap(), None);

            let row = RowRef::new(3);
            assert_eq!(sheet.get_cell(row, 2).await.unwrap().as_deref(), Some("0999"));
            assert_eq!(sheet.get_cell(RowRef::new(2), 3).await.unwrap(), None);
            assert_eq!(
                sheet.get_row(row).await.unwrap(),
                vec!["123", "0999", "مسموح", "HR", "7"]
            );

            assert_eq!(
                *stub.ranges.lock().unwrap(),
                vec![
                    ("'Staff Sheet'!A:A".to_string(), "COLUMNS".to_string()),
                    ("'Staff Sheet'!A:A".to_string(), "COLUMNS".to_string()),
                    ("'Staff Sheet'!B3".to_string(), "ROWS".to_string()),
                    ("'Staff Sheet'!C2".to_string(), "ROWS".to_string()),
                    ("'Staff Sheet'!3:3".to_string(), "ROWS".to_string()),
                ]
            );
            assert_eq!(*stub.kids.lock().unwrap(), vec![Some("key-1".to_string())]);
        }

        #[tokio::test]
        async fn every_connect_exchanges_a_new_assertion() {
            let stub = Stub::default();
            let base = serve(stub.clone()).await;
            let connector = connector(&base, "staff-sheet");

            connector.connect().await.unwrap();
            connector.connect().await.unwrap();

            assert_eq!(stub.kids.lock().unwrap().len(), 2);
        }

        #[tokio::test]
        async fn rejected_grant_is_an_authentication_failure() {
            let stub = Stub {
                reject_grants: true,
                ..Stub::default()
            };
            let base = serve(stub).await;

            let err = connector(&base, "staff-sheet").connect().await.unwrap_err();
            assert_eq!(
                err,
                StoreError::AuthenticationFailed {
                    reason: "Invalid JWT Signature.".to_string()
                }
            );
        }

        #[tokio::test]
        async fn unknown_spreadsheet_is_a_request_failure() {
            let base = serve(Stub::default()).await;

            let err = connector(&base, "missing").connect().await.unwrap_err();
            assert_eq!(
                err,
                StoreError::RequestFailed {
                    status: 404,
                    reason: "Requested entity was not found.".to_string()
                }
            );
        }

        #[tokio::test]
        async fn row_zero_is_rejected_before_any_request() {
            let stub = Stub::default();
            let base = serve(stub.clone()).await;
            let sheet = connector(&base, "staff-sheet").connect().await.unwrap();

            assert_eq!(
                sheet.get_row(RowRef::new(0)).await.unwrap_err(),
                StoreError::InvalidReference {
                    row: RowRef::new(0)
                }
            );
            assert!(stub.ranges.lock().unwrap().is_empty());
        }
    }
}
