//! Edge Function invocation.
//!
//! The dashboard talks to serverless endpoints in two shapes:
//!
//! - the `dashboard` function, a single dispatcher taking `{widget,
//!   client_code?}` and answering `{data: rows}` or `{error: message}`
//! - named feeds (`treasury-feed`, `treasury-timeseries`,
//!   `client-tax-payments-list`) answering a bare rows array, or `null`
//!   when the client has no data yet
//!
//! Plus one admin-only write: `admin-tax-filing-upsert`, sent with an
//! idempotency key that stays stable across retries.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use finaptico_types::{ClientCode, SeriesPoint, TaxFiling, TaxFilingDraft, TreasuryRow, Widget};

use crate::{ApiError, Session, Supabase, into_checked_response, retry};

#[derive(Deserialize)]
struct WidgetEnvelope<T> {
    #[serde(default = "Option::default")]
    data: Option<Vec<T>>,
    #[serde(default)]
    error: Option<String>,
}

impl Supabase {
    /// Invoke the `dashboard` Edge Function for one widget.
    pub async fn invoke_widget<T: DeserializeOwned>(
        &self,
        session: &Session,
        widget: Widget,
        client_code: Option<&ClientCode>,
    ) -> Result<Vec<T>, ApiError> {
        let url = self.endpoint("functions/v1/dashboard");
        let mut body = serde_json::json!({ "widget": widget.wire_name() });
        if let Some(code) = client_code {
            body["client_code"] = serde_json::Value::String(code.as_str().to_string());
        }

        let outcome = retry::send_with_retry(
            || {
                self.http
                    .post(url.clone())
                    .header("apikey", self.config.anon_key())
                    .bearer_auth(session.access_token())
                    .json(&body)
            },
            &self.retry,
        )
        .await;

        let response = into_checked_response(outcome).await?;
        // Two-step decode: widget row shapes vary, and serde_json points at
        // the offending field where reqwest's decode error would not.
        let payload: serde_json::Value = response.json().await?;
        let envelope: WidgetEnvelope<T> = serde_json::from_value(payload)?;

        if let Some(message) = envelope.error {
            tracing::warn!(widget = %widget, message, "Widget query rejected by backend");
            return Err(ApiError::Backend(message));
        }
        Ok(envelope.data.unwrap_or_default())
    }

    /// Latest treasury snapshot rows, one per ERP instance.
    pub async fn treasury_feed(
        &self,
        session: &Session,
        client_code: Option<&ClientCode>,
    ) -> Result<Vec<TreasuryRow>, ApiError> {
        self.feed("treasury-feed", session, client_code).await
    }

    /// Historical balance series.
    pub async fn treasury_timeseries(
        &self,
        session: &Session,
        client_code: Option<&ClientCode>,
    ) -> Result<Vec<SeriesPoint>, ApiError> {
        self.feed("treasury-timeseries", session, client_code).await
    }

    async fn feed<T: DeserializeOwned>(
        &self,
        name: &str,
        session: &Session,
        client_code: Option<&ClientCode>,
    ) -> Result<Vec<T>, ApiError> {
        let mut url = self.endpoint(&format!("functions/v1/{name}"));
        if let Some(code) = client_code {
            url.query_pairs_mut().append_pair("client_code", code.as_str());
        }

        let outcome = retry::send_with_retry(
            || {
                self.http
                    .get(url.clone())
                    .header("apikey", self.config.anon_key())
                    .bearer_auth(session.access_token())
            },
            &self.retry,
        )
        .await;

        let response = into_checked_response(outcome).await?;
        let rows: Option<Vec<T>> = response.json().await?;
        Ok(rows.unwrap_or_default())
    }

    /// Tax filings settled as PAYABLE during the current (UTC) year.
    pub async fn settled_tax_payments(
        &self,
        session: &Session,
        client_code: &ClientCode,
    ) -> Result<Vec<TaxFiling>, ApiError> {
        let url = self.endpoint("functions/v1/client-tax-payments-list");
        let body = serde_json::json!({ "client_code": client_code.as_str() });

        let outcome = retry::send_with_retry(
            || {
                self.http
                    .post(url.clone())
                    .header("apikey", self.config.anon_key())
                    .bearer_auth(session.access_token())
                    .json(&body)
            },
            &self.retry,
        )
        .await;

        let response = into_checked_response(outcome).await?;
        let rows: Option<Vec<TaxFiling>> = response.json().await?;
        Ok(rows.unwrap_or_default())
    }

    /// Create or update a tax filing (advisor surface).
    ///
    /// The idempotency key is generated once per call, so backend-side
    /// retries of the same upsert cannot double-insert.
    pub async fn upsert_tax_filing(
        &self,
        session: &Session,
        draft: &TaxFilingDraft,
    ) -> Result<(), ApiError> {
        let url = self.endpoint("functions/v1/admin-tax-filing-upsert");
        let idempotency_key = format!("filing-upsert-{}", Uuid::new_v4());

        let outcome = retry::send_with_retry(
            || {
                self.http
                    .post(url.clone())
                    .header("apikey", self.config.anon_key())
                    .header("Idempotency-Key", &idempotency_key)
                    .bearer_auth(session.access_token())
                    .json(draft)
            },
            &self.retry,
        )
        .await;

        let response = into_checked_response(outcome).await?;
        let reply: serde_json::Value = response.json().await.unwrap_or_default();
        if let Some(message) = reply.get("error").and_then(serde_json::Value::as_str) {
            return Err(ApiError::Backend(message.to_string()));
        }
        Ok(())
    }
}
