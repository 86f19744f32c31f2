//! Table operations through the managed REST gateway.
//!
//! Every call is a single request; rows come back as JSON arrays because all
//! writes ask for `return=representation`.

use reqwest::{Method, Response};
use serde::{Serialize, de::DeserializeOwned};
use tracing::instrument;

use super::{BackendError, DatabaseError, ServiceClient};

const PREFER_REPRESENTATION: &str = "return=representation";

/// An equality filter on one column (`column=eq.value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    column: String,
    value: String,
}

impl Filter {
    /// Match rows whose `column` equals `value`.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    fn query_pair(&self) -> (&str, String) {
        (self.column.as_str(), format!("eq.{}", self.value))
    }
}

impl ServiceClient {
    /// Insert one row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Database` with the SQLSTATE code when a
    /// constraint rejects the row (`23505`, `23502`, `22P02`, ...).
    #[instrument(skip(self, row))]
    pub async fn insert<T, R>(&self, table: &str, row: &T) -> Result<R, BackendError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.inner.endpoint(["rest", "v1", table])?;
        let response = self
            .inner
            .request(Method::POST, url)
            .header("Prefer", PREFER_REPRESENTATION)
            .json(row)
            .send()
            .await?;

        read_rows(response).await?.into_iter().next().ok_or_else(|| {
            BackendError::UnexpectedResponse(format!("insert into {table} returned no row"))
        })
    }

    /// Apply `patch` to every row matching `filter`; returns the updated rows.
    ///
    /// An empty result means nothing matched.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Database` when the patch violates a constraint.
    #[instrument(skip(self, patch))]
    pub async fn update<T, R>(
        &self,
        table: &str,
        patch: &T,
        filter: &Filter,
    ) -> Result<Vec<R>, BackendError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.inner.endpoint(["rest", "v1", table])?;
        let response = self
            .inner
            .request(Method::PATCH, url)
            .query(&[filter.query_pair()])
            .header("Prefer", PREFER_REPRESENTATION)
            .json(patch)
            .send()
            .await?;

        read_rows(response).await
    }

    /// Delete every row matching `filter`; returns the deleted rows.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Database` if the gateway rejects the delete.
    #[instrument(skip(self))]
    pub async fn delete<R>(&self, table: &str, filter: &Filter) -> Result<Vec<R>, BackendError>
    where
        R: DeserializeOwned,
    {
        let url = self.inner.endpoint(["rest", "v1", table])?;
        let response = self
            .inner
            .request(Method::DELETE, url)
            .query(&[filter.query_pair()])
            .header("Prefer", PREFER_REPRESENTATION)
            .send()
            .await?;

        read_rows(response).await
    }

    /// Select rows, optionally filtered and ordered (`order` uses gateway
    /// syntax, e.g. `created_at.desc`).
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Database` if the gateway rejects the query.
    #[instrument(skip(self))]
    pub async fn select<R>(
        &self,
        table: &str,
        filter: Option<&Filter>,
        order: Option<&str>,
    ) -> Result<Vec<R>, BackendError>
    where
        R: DeserializeOwned,
    {
        let url = self.inner.endpoint(["rest", "v1", table])?;
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        if let Some(filter) = filter {
            query.push(filter.query_pair());
        }
        if let Some(order) = order {
            query.push(("order", order.to_string()));
        }

        let response = self
            .inner
            .request(Method::GET, url)
            .query(&query)
            .send()
            .await?;

        read_rows(response).await
    }

    /// Check that the REST gateway answers with this key.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway is unreachable or rejects the key.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), BackendError> {
        let url = self.inner.endpoint(["rest", "v1", ""])?;
        let response = self.inner.request(Method::GET, url).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await?;
        Err(BackendError::Database(DatabaseError::from_response(
            status.as_u16(),
            &body,
        )))
    }
}

async fn read_rows<R: DeserializeOwned>(response: Response) -> Result<Vec<R>, BackendError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let err = DatabaseError::from_response(status.as_u16(), &body);
        tracing::debug!(code = %err.code, message = %err.message, "database rejected request");
        return Err(BackendError::Database(err));
    }

    Ok(serde_json::from_slice(&body)?)
}
