//! `PostgREST` verbs over `/rest/v1/{table}`.

use std::fmt::Display;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{Caller, SupabaseClient, SupabaseError, check, json};

/// Filters, ordering and paging for one table.
///
/// Values are passed as `PostgREST` query parameters, e.g.
/// `Query::table("services").eq("is_public", true).order("position.asc")`
/// becomes `?select=*&is_public=eq.true&order=position.asc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: &'static str,
    params: Vec<(String, String)>,
}

impl Query {
    #[must_use]
    pub const fn table(table: &'static str) -> Self {
        Self {
            table,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.table
    }

    /// Equality filter on a column.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Ordering, e.g. `created_at.desc`. Repeated calls add tie-breakers.
    #[must_use]
    pub fn order(mut self, spec: &str) -> Self {
        if let Some((_, existing)) = self.params.iter_mut().find(|(k, _)| k == "order") {
            existing.push(',');
            existing.push_str(spec);
        } else {
            self.params.push(("order".to_string(), spec.to_string()));
        }
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.params.retain(|(k, _)| k != "limit");
        self.params.push(("limit".to_string(), n.to_string()));
        self
    }

    fn select_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(self.params.iter().cloned());
        params
    }

    fn filter_params(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .filter(|(k, _)| k != "order" && k != "limit")
            .cloned()
            .collect()
    }
}

/// Parse the total from a `Content-Range` header (`0-24/57`, `*/0`).
#[must_use]
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

impl SupabaseClient {
    fn rest_url(&self, table: &str) -> String {
        self.url(&format!("/rest/v1/{table}"))
    }

    /// Fetch all rows matching a query.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or rows don't deserialize.
    #[instrument(skip(self, caller), fields(table = query.table))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        caller: Caller<'_>,
        query: &Query,
    ) -> Result<Vec<T>, SupabaseError> {
        let response = self
            .request(Method::GET, &self.rest_url(query.table), caller)
            .query(&query.select_params())
            .send()
            .await?;
        json(check(response).await?).await
    }

    /// Fetch the first row matching a query.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the row doesn't deserialize.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        caller: Caller<'_>,
        query: &Query,
    ) -> Result<Option<T>, SupabaseError> {
        let rows = self.select(caller, &query.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` on a unique violation, or any request error.
    #[instrument(skip(self, caller, body))]
    pub async fn insert<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        caller: Caller<'_>,
        table: &'static str,
        body: &B,
    ) -> Result<T, SupabaseError> {
        let response = self
            .request(Method::POST, &self.rest_url(table), caller)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = json(check(response).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SupabaseError::Parse(format!("insert into {table} returned no row")))
    }

    /// Insert one row without reading it back.
    ///
    /// Used where row-level security allows the caller to insert but not to
    /// select, as with anonymous contact submissions.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, caller, body))]
    pub async fn insert_minimal<B: Serialize + Sync>(
        &self,
        caller: Caller<'_>,
        table: &'static str,
        body: &B,
    ) -> Result<(), SupabaseError> {
        let response = self
            .request(Method::POST, &self.rest_url(table), caller)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Patch matching rows and return the first updated one.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, caller, body), fields(table = query.table))]
    pub async fn update<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        caller: Caller<'_>,
        query: &Query,
        body: &B,
    ) -> Result<Option<T>, SupabaseError> {
        let response = self
            .request(Method::PATCH, &self.rest_url(query.table), caller)
            .query(&query.filter_params())
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = json(check(response).await?).await?;
        Ok(rows.into_iter().next())
    }

    /// Delete matching rows, returning how many went away.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, caller), fields(table = query.table))]
    pub async fn delete(&self, caller: Caller<'_>, query: &Query) -> Result<usize, SupabaseError> {
        let response = self
            .request(Method::DELETE, &self.rest_url(query.table), caller)
            .query(&query.filter_params())
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = json(check(response).await?).await?;
        Ok(rows.len())
    }

    /// Count matching rows without fetching them.
    ///
    /// # Errors
    ///
    /// Returns `Parse` if the response carries no usable `Content-Range`.
    #[instrument(skip(self, caller), fields(table = query.table))]
    pub async fn count(&self, caller: Caller<'_>, query: &Query) -> Result<u64, SupabaseError> {
        let mut params = query.filter_params();
        params.push(("select".to_string(), "*".to_string()));
        let response = self
            .request(Method::HEAD, &self.rest_url(query.table), caller)
            .query(&params)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = check(response).await?;
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| SupabaseError::Parse("missing Content-Range total".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::supabase::test_support::{ADMIN_TOKEN, ANON_KEY, client_for};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: i32,
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-24/57"), Some(57));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-9/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_query_params() {
        let q = Query::table("t")
            .eq("status", "new")
            .order("is_flagship.desc")
            .order("created_at.desc")
            .limit(5)
            .limit(1);
        assert_eq!(
            q.select_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("status".to_string(), "eq.new".to_string()),
                ("order".to_string(), "is_flagship.desc,created_at.desc".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(
            q.filter_params(),
            vec![("status".to_string(), "eq.new".to_string())]
        );
    }

    #[tokio::test]
    async fn test_select_sends_keys_and_filters() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/things")
                    .query_param("select", "*")
                    .query_param("kind", "eq.a")
                    .header("apikey", ANON_KEY)
                    .header("authorization", format!("Bearer {ANON_KEY}"));
                then.status(200).json_body(json!([{ "id": 1 }, { "id": 2 }]));
            })
            .await;

        let client = client_for(&server);
        let rows: Vec<Row> = client
            .select(Caller::Anonymous, &Query::table("things").eq("kind", "a"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(rows, vec![Row { id: 1 }, Row { id: 2 }]);
    }

    #[tokio::test]
    async fn test_admin_caller_uses_access_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/things")
                    .query_param("id", "eq.7")
                    .header("apikey", ANON_KEY)
                    .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
                    .header("prefer", "return=representation")
                    .json_body(json!({ "label": "x" }));
                then.status(200).json_body(json!([{ "id": 7 }]));
            })
            .await;

        let client = client_for(&server);
        let row: Option<Row> = client
            .update(
                Caller::Admin(ADMIN_TOKEN),
                &Query::table("things").eq("id", 7),
                &json!({ "label": "x" }),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(row, Some(Row { id: 7 }));
    }

    #[tokio::test]
    async fn test_count_reads_content_range() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::HEAD)
                    .path("/rest/v1/things")
                    .header("prefer", "count=exact");
                then.status(200).header("content-range", "*/42");
            })
            .await;

        let client = client_for(&server);
        let total = client
            .count(Caller::Anonymous, &Query::table("things"))
            .await
            .unwrap();
        assert_eq!(total, 42);
    }

    #[tokio::test]
    async fn test_delete_returns_row_count() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/rest/v1/things").query_param("id", "eq.3");
                then.status(200).json_body(json!([]));
            })
            .await;

        let client = client_for(&server);
        let deleted = client
            .delete(Caller::Admin(ADMIN_TOKEN), &Query::table("things").eq("id", 3))
            .await
            .unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/things");
                then.status(401)
                    .json_body(json!({ "code": "PGRST301", "message": "JWT expired" }));
            })
            .await;

        let client = client_for(&server);
        let err = client
            .select::<Row>(Caller::Admin(ADMIN_TOKEN), &Query::table("things"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }
}
