//! HTTP client for buckyd daemons.
//!
//! One client serves every seam the cluster logic needs: ring membership,
//! metric listing and series transfer. Daemons are addressed as
//! `http://host:port`.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bucky_cluster::{
    MembershipSource, MetricCatalog, MetricTransfer, MetricsByNode, RingDescription,
    TransferError, TransferRequest, TransferStatus,
};
use bucky_core::{ClientConfig, Error, Result};
use futures::future::try_join_all;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Characters left unescaped in a metric name path segment (RFC 3986 unreserved).
const METRIC_ENCODE_SET: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Talks to buckyd daemons over HTTP.
#[derive(Debug, Clone)]
pub struct BuckydClient {
    http: Client,
}

impl BuckydClient {
    /// Creates a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http })
    }

    fn url(address: &str, path: &str) -> String {
        format!("http://{address}{path}")
    }

    /// URL of a single metric. The name is one path segment, so `/`, `?`, `#`
    /// and `%` are escaped.
    fn metric_url(address: &str, metric: &str) -> String {
        let encoded = utf8_percent_encode(metric, METRIC_ENCODE_SET);
        format!("http://{address}/metrics/{encoded}")
    }

    async fn list_node(
        &self,
        address: &str,
        regex: Option<&str>,
        force_rebuild: bool,
    ) -> Result<Vec<String>> {
        let mut query = vec![("force", force_rebuild.to_string())];
        if let Some(regex) = regex {
            query.push(("regex", regex.to_string()));
        }

        let response = self
            .http
            .get(Self::url(address, "/metrics"))
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::catalog(address, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::catalog(address, format!("unexpected status {status}")));
        }

        let metrics: Vec<String> =
            response.json().await.map_err(|e| Error::catalog(address, e.to_string()))?;
        debug!(node = %address, count = metrics.len(), "Listed metrics");
        Ok(metrics)
    }

    async fn list_nodes(
        &self,
        hostports: &[String],
        regex: Option<&str>,
        force_rebuild: bool,
    ) -> Result<MetricsByNode> {
        let listed = try_join_all(hostports.iter().map(|address| async move {
            let metrics = self.list_node(address, regex, force_rebuild).await?;
            Ok::<_, Error>((address.clone(), metrics))
        }))
        .await?;
        Ok(listed.into_iter().collect())
    }
}

fn connection_error(node: &str, error: &reqwest::Error) -> TransferError {
    if error.is_timeout() {
        return TransferError::Other(format!("request to {node} timed out"));
    }
    TransferError::Unreachable { node: node.to_string(), reason: error.to_string() }
}

#[async_trait]
impl MembershipSource for BuckydClient {
    async fn describe_ring(&self, address: &str) -> Result<RingDescription> {
        let response = self
            .http
            .get(Self::url(address, "/hashring"))
            .send()
            .await
            .map_err(|e| Error::Topology(format!("{address}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Topology(format!("{address}: unexpected status {status}")));
        }

        response.json().await.map_err(|e| Error::Topology(format!("{address}: {e}")))
    }
}

#[async_trait]
impl MetricCatalog for BuckydClient {
    async fn list_all_metrics(
        &self,
        hostports: &[String],
        force_rebuild: bool,
    ) -> Result<MetricsByNode> {
        self.list_nodes(hostports, None, force_rebuild).await
    }

    async fn list_regex_metrics(
        &self,
        hostports: &[String],
        pattern: &str,
        force_rebuild: bool,
    ) -> Result<MetricsByNode> {
        self.list_nodes(hostports, Some(pattern), force_rebuild).await
    }
}

#[async_trait]
impl MetricTransfer for BuckydClient {
    async fn transfer(
        &self,
        request: &TransferRequest,
    ) -> std::result::Result<TransferStatus, TransferError> {
        let source = &request.source;
        let response = self
            .http
            .get(Self::metric_url(source, &request.old_name))
            .send()
            .await
            .map_err(|e| connection_error(source, &e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(TransferStatus::SourceNotFound),
            status if !status.is_success() => {
                return Err(TransferError::Rejected {
                    node: source.clone(),
                    status: status.as_u16(),
                });
            }
            _ => {}
        }
        let data = response.bytes().await.map_err(|e| connection_error(source, &e))?;
        let bytes = data.len() as u64;

        let destination = &request.destination;
        let response = self
            .http
            .put(Self::metric_url(destination, &request.new_name))
            .body(data)
            .send()
            .await
            .map_err(|e| connection_error(destination, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Rejected {
                node: destination.clone(),
                status: status.as_u16(),
            });
        }

        debug!(
            src = %source,
            dst = %destination,
            old = %request.old_name,
            new = %request.new_name,
            bytes,
            "Copied metric"
        );
        Ok(TransferStatus::Copied { bytes })
    }

    async fn delete_source(
        &self,
        request: &TransferRequest,
    ) -> std::result::Result<(), TransferError> {
        let source = &request.source;
        let response = self
            .http
            .delete(Self::metric_url(source, &request.old_name))
            .send()
            .await
            .map_err(|e| connection_error(source, &e))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(TransferError::Rejected { node: source.clone(), status: status.as_u16() })
        }
    }
}
