//! Minimal PostgREST reads.
//!
//! The dashboard only ever reads: SQL views own every computation, so the
//! builder covers filters, ordering and limits and nothing else. Schema
//! routing uses the `Accept-Profile` header (the accounting views live in
//! `erp_core`, not `public`).

use std::fmt::Display;

use serde::de::DeserializeOwned;

use crate::{ApiError, Session, Supabase, into_checked_response, retry};

/// A pending read against one relation (table or view).
#[must_use]
pub struct QueryBuilder<'a> {
    api: &'a Supabase,
    relation: String,
    schema: Option<String>,
    params: Vec<(String, String)>,
    limit: Option<usize>,
}

impl Supabase {
    /// Start a read against `relation` in the default (`public`) schema.
    pub fn query(&self, relation: impl Into<String>) -> QueryBuilder<'_> {
        QueryBuilder {
            api: self,
            relation: relation.into(),
            schema: None,
            params: Vec::new(),
            limit: None,
        }
    }
}

impl QueryBuilder<'_> {
    /// Route the read to a non-default Postgres schema.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Restrict the selected columns (defaults to `*`).
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn gte(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("gte.{value}")));
        self
    }

    pub fn lt(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("lt.{value}")));
        self
    }

    pub fn not_is_null(mut self, column: &str) -> Self {
        self.params.push((column.to_string(), "not.is.null".to_string()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params.push(("order".to_string(), format!("{column}.{direction}")));
        self
    }

    pub fn limit(mut self, rows: usize) -> Self {
        self.limit = Some(rows);
        self
    }

    /// Execute and deserialize all rows.
    pub async fn fetch<T: DeserializeOwned>(self, session: &Session) -> Result<Vec<T>, ApiError> {
        let mut url = self.api.endpoint(&format!("rest/v1/{}", self.relation));
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.params {
                pairs.append_pair(key, value);
            }
            if let Some(rows) = self.limit {
                pairs.append_pair("limit", &rows.to_string());
            }
        }

        let outcome = retry::send_with_retry(
            || {
                let mut request = self
                    .api
                    .http
                    .get(url.clone())
                    .header("apikey", self.api.config.anon_key())
                    .bearer_auth(session.access_token());
                if let Some(schema) = &self.schema {
                    request = request.header("Accept-Profile", schema);
                }
                request
            },
            &self.api.retry,
        )
        .await;

        let response = into_checked_response(outcome).await?;
        Ok(response.json().await?)
    }

    /// Execute expecting zero or one row.
    ///
    /// Two rows mean the filter was wrong, not that the backend is flaky, so
    /// that surfaces as an error instead of silently taking the first.
    pub async fn maybe_single<T: DeserializeOwned>(
        self,
        session: &Session,
    ) -> Result<Option<T>, ApiError> {
        let relation = self.relation.clone();
        let mut rows: Vec<T> = self.limit(2).fetch(session).await?;
        if rows.len() > 1 {
            return Err(ApiError::Backend(format!(
                "expected at most one row from {relation}"
            )));
        }
        Ok(rows.pop())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::retry::RetryConfig;
    use crate::{ApiError, Session, Supabase, SupabaseConfig};

    #[derive(Debug, PartialEq, Deserialize)]
    struct Row {
        client_code: String,
    }

    fn api_for(server: &MockServer) -> Supabase {
        Supabase::new(SupabaseConfig::new(&server.uri(), "anon-key").unwrap())
            .unwrap()
            .with_retry_config(RetryConfig::fast())
    }

    fn session() -> Session {
        serde_json::from_value(serde_json::json!({
            "access_token": "jwt-1",
            "refresh_token": "r",
            "expires_at": Utc::now(),
            "user_email": null
        }))
        .expect("session")
    }

    #[tokio::test]
    async fn fetch_sends_filters_order_limit_and_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/v_dashboard_sales_invoices_pending"))
            .and(query_param("select", "*"))
            .and(query_param("client_code", "eq.CLIENT_001"))
            .and(query_param("order", "due_date.asc"))
            .and(query_param("limit", "50"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer jwt-1"))
            .and(header("accept-profile", "erp_core"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "client_code": "CLIENT_001" }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let rows: Vec<Row> = api
            .query("v_dashboard_sales_invoices_pending")
            .schema("erp_core")
            .select("*")
            .eq("client_code", "CLIENT_001")
            .order("due_date", true)
            .limit(50)
            .fetch(&session())
            .await
            .expect("rows");

        assert_eq!(rows, vec![Row { client_code: "CLIENT_001".to_string() }]);
    }

    #[tokio::test]
    async fn date_window_filters_compose() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/tax_filings"))
            .and(query_param("settled_at", "not.is.null"))
            .and(query_param("status", "eq.SETTLED"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let rows: Vec<Row> = api
            .query("tax_filings")
            .eq("status", "SETTLED")
            .not_is_null("settled_at")
            .fetch(&session())
            .await
            .expect("rows");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn maybe_single_returns_none_for_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/v_fiscal_current_snapshot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let row: Option<Row> = api
            .query("v_fiscal_current_snapshot")
            .maybe_single(&session())
            .await
            .expect("query");
        assert_eq!(row, None);
    }

    #[tokio::test]
    async fn maybe_single_rejects_multiple_rows() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/v_fiscal_current_snapshot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "client_code": "CLIENT_001" },
                { "client_code": "CLIENT_002" }
            ])))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api
            .query("v_fiscal_current_snapshot")
            .maybe_single::<Row>(&session())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Backend(_)));
    }

    #[tokio::test]
    async fn http_errors_carry_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/clients"))
            .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api.query("clients").fetch::<Row>(&session()).await.unwrap_err();
        match err {
            ApiError::Http { status, body } => {
                assert_eq!(status.as_u16(), 403);
                assert!(body.contains("permission denied"));
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }
}
