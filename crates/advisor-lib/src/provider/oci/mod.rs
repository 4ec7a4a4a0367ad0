//! OCI REST provider
//!
//! Talks to the public OCI endpoints of one region with API-key request
//! signing. List calls follow `opc-next-page` until exhausted.

mod signer;


pub use signer::{RequestSigner, SignedHeaders, HTTP_DATE_FORMAT};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::{
    BackupLister, CloudProvider, CompartmentLister, DatabaseLister, InstanceLister,
    LoadBalancerLister, MetricsQuerier, ObjectStorage, Operation, ProviderFactory, VolumeLister,
};
use crate::error::{AdvisorError, Result};
use crate::metrics::{MetricStream, SummarizeRequest};
use crate::models::{
    BackupKind, BlockVolume, Bucket, BucketSummary, CloudProfile, CompartmentSummary, ComputeInstance,
    Database, DbHome, DbNode, DbNodeParent, LoadBalancer, LoadBalancerHealth, VolumeAttachment,
    VolumeBackup,
};

const CORE_API: &str = "20160918";
const LOAD_BALANCER_API: &str = "20170115";
const TELEMETRY_API: &str = "20180401";
const NEXT_PAGE_HEADER: &str = "opc-next-page";
const BUCKET_FIELDS: &str = "approximateCount,approximateSize,autoTiering";

/// Service base URLs for one region.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub identity: Url,
    pub core: Url,
    pub database: Url,
    pub load_balancer: Url,
    pub object_storage: Url,
    pub telemetry: Url,
}

impl Endpoints {
    pub fn for_region(region: &str) -> std::result::Result<Self, url::ParseError> {
        let service = |name: &str| Url::parse(&format!("https://{name}.{region}.oraclecloud.com/"));
        Ok(Self {
            identity: service("identity")?,
            core: service("iaas")?,
            database: service("database")?,
            load_balancer: service("iaas")?,
            object_storage: service("objectstorage")?,
            telemetry: service("telemetry")?,
        })
    }

    /// Routes every service to one base URL.
    pub fn single(base: Url) -> Self {
        Self {
            identity: base.clone(),
            core: base.clone(),
            database: base.clone(),
            load_balancer: base.clone(),
            object_storage: base.clone(),
            telemetry: base,
        }
    }
}

fn endpoint(operation: Operation, base: &Url, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AdvisorError::Provider {
            operation,
            message: format!("{base} cannot be a base URL"),
        })?
        .pop_if_empty()
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

pub struct OciClient {
    http: Client,
    signer: RequestSigner,
    endpoints: Endpoints,
}

impl OciClient {
    pub fn new(signer: RequestSigner, endpoints: Endpoints, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdvisorError::Signing(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            signer,
            endpoints,
        })
    }

    async fn send(
        &self,
        operation: Operation,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        let date = Utc::now().format(HTTP_DATE_FORMAT).to_string();
        let signed = self.signer.sign(&method, &url, &date, body.as_deref())?;

        let mut request = self
            .http
            .request(method, url)
            .header("date", signed.date)
            .header("authorization", signed.authorization)
            .header("accept", signer::JSON_CONTENT_TYPE);
        if let Some(body) = body {
            request = request
                .header("content-type", signer::JSON_CONTENT_TYPE)
                .header("x-content-sha256", signed.content_sha256.unwrap_or_default())
                .body(body);
        }

        let response = request.send().await.map_err(|e| AdvisorError::Provider {
            operation,
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::HttpStatus {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(operation: Operation, response: Response) -> Result<T> {
        response.json().await.map_err(|e| AdvisorError::Provider {
            operation,
            message: format!("failed to parse response: {e}"),
        })
    }

    async fn get<T: DeserializeOwned>(&self, operation: Operation, url: Url) -> Result<T> {
        let response = self.send(operation, Method::GET, url, None).await?;
        Self::decode(operation, response).await
    }

    /// Collects every page of a list call.
    async fn list<T: DeserializeOwned>(&self, operation: Operation, url: Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page: Option<String> = None;
        loop {
            let mut page_url = url.clone();
            if let Some(page) = &page {
                page_url.query_pairs_mut().append_pair("page", page);
            }
            let response = self.send(operation, Method::GET, page_url, None).await?;
            let next = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            items.extend(Self::decode::<Vec<T>>(operation, response).await?);

            match next {
                Some(next) => page = Some(next),
                None => return Ok(items),
            }
        }
    }

    async fn list_in_compartment<T: DeserializeOwned>(
        &self,
        operation: Operation,
        base: &Url,
        segments: &[&str],
        compartment_id: &str,
        extra: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut query = vec![("compartmentId", compartment_id)];
        query.extend_from_slice(extra);
        let url = endpoint(operation, base, segments, &query)?;
        self.list(operation, url).await
    }
}

#[async_trait]
impl CompartmentLister for OciClient {
    async fn list_compartments(&self, tenancy_id: &str) -> Result<Vec<CompartmentSummary>> {
        self.list_in_compartment(
            Operation::ListCompartments,
            &self.endpoints.identity,
            &[CORE_API, "compartments"],
            tenancy_id,
            &[
                ("compartmentIdInSubtree", "true"),
                ("accessLevel", "ANY"),
                ("lifecycleState", "ACTIVE"),
            ],
        )
        .await
    }
}

#[async_trait]
impl InstanceLister for OciClient {
    async fn list_instances(&self, compartment_id: &str) -> Result<Vec<ComputeInstance>> {
        self.list_in_compartment(
            Operation::ListInstances,
            &self.endpoints.core,
            &[CORE_API, "instances"],
            compartment_id,
            &[],
        )
        .await
    }
}

#[async_trait]
impl VolumeLister for OciClient {
    async fn list_volumes(&self, compartment_id: &str) -> Result<Vec<BlockVolume>> {
        self.list_in_compartment(
            Operation::ListVolumes,
            &self.endpoints.core,
            &[CORE_API, "volumes"],
            compartment_id,
            &[],
        )
        .await
    }

    async fn list_volume_attachments(&self, compartment_id: &str) -> Result<Vec<VolumeAttachment>> {
        self.list_in_compartment(
            Operation::ListVolumeAttachments,
            &self.endpoints.core,
            &[CORE_API, "volumeAttachments", ""],
            compartment_id,
            &[],
        )
        .await
    }
}

#[async_trait]
impl BackupLister for OciClient {
    async fn list_volume_backups(&self, compartment_id: &str) -> Result<Vec<VolumeBackup>> {
        self.list_in_compartment(
            Operation::ListVolumeBackups,
            &self.endpoints.core,
            &[CORE_API, "volumeBackups"],
            compartment_id,
            &[],
        )
        .await
        .map(|backups| with_kind(backups, BackupKind::Volume))
    }

    async fn list_boot_volume_backups(&self, compartment_id: &str) -> Result<Vec<VolumeBackup>> {
        self.list_in_compartment(
            Operation::ListBootVolumeBackups,
            &self.endpoints.core,
            &[CORE_API, "bootVolumeBackups"],
            compartment_id,
            &[],
        )
        .await
        .map(|backups| with_kind(backups, BackupKind::BootVolume))
    }
}

/// The wire shape does not say which listing a backup came from.
fn with_kind(mut backups: Vec<VolumeBackup>, kind: BackupKind) -> Vec<VolumeBackup> {
    backups.iter_mut().for_each(|b| b.kind = kind);
    backups
}

#[async_trait]
impl DatabaseLister for OciClient {
    async fn list_db_homes(&self, compartment_id: &str) -> Result<Vec<DbHome>> {
        self.list_in_compartment(
            Operation::ListDbHomes,
            &self.endpoints.database,
            &[CORE_API, "dbHomes"],
            compartment_id,
            &[],
        )
        .await
    }

    async fn list_databases(&self, compartment_id: &str, db_home_id: &str) -> Result<Vec<Database>> {
        self.list_in_compartment(
            Operation::ListDatabases,
            &self.endpoints.database,
            &[CORE_API, "databases"],
            compartment_id,
            &[("dbHomeId", db_home_id)],
        )
        .await
    }

    async fn list_db_nodes(&self, compartment_id: &str, parent: &DbNodeParent) -> Result<Vec<DbNode>> {
        let filter = match parent {
            DbNodeParent::DbSystem(id) => ("dbSystemId", id.as_str()),
            DbNodeParent::VmCluster(id) => ("vmClusterId", id.as_str()),
        };
        self.list_in_compartment(
            Operation::ListDbNodes,
            &self.endpoints.database,
            &[CORE_API, "dbNodes"],
            compartment_id,
            &[filter],
        )
        .await
    }
}

#[async_trait]
impl LoadBalancerLister for OciClient {
    async fn list_load_balancer_healths(&self, compartment_id: &str) -> Result<Vec<LoadBalancerHealth>> {
        self.list_in_compartment(
            Operation::ListLoadBalancerHealths,
            &self.endpoints.load_balancer,
            &[LOAD_BALANCER_API, "loadBalancerHealths"],
            compartment_id,
            &[],
        )
        .await
    }

    async fn list_load_balancers(&self, compartment_id: &str) -> Result<Vec<LoadBalancer>> {
        self.list_in_compartment(
            Operation::ListLoadBalancers,
            &self.endpoints.load_balancer,
            &[LOAD_BALANCER_API, "loadBalancers"],
            compartment_id,
            &[],
        )
        .await
    }
}

#[async_trait]
impl ObjectStorage for OciClient {
    async fn get_namespace(&self, compartment_id: &str) -> Result<String> {
        let url = endpoint(
            Operation::GetNamespace,
            &self.endpoints.object_storage,
            &["n", ""],
            &[("compartmentId", compartment_id)],
        )?;
        self.get(Operation::GetNamespace, url).await
    }

    async fn list_buckets(&self, compartment_id: &str, namespace: &str) -> Result<Vec<BucketSummary>> {
        self.list_in_compartment(
            Operation::ListBuckets,
            &self.endpoints.object_storage,
            &["n", namespace, "b", ""],
            compartment_id,
            &[],
        )
        .await
    }

    async fn get_bucket(&self, namespace: &str, bucket_name: &str) -> Result<Bucket> {
        let url = endpoint(
            Operation::GetBucket,
            &self.endpoints.object_storage,
            &["n", namespace, "b", bucket_name, ""],
            &[("fields", BUCKET_FIELDS)],
        )?;
        self.get(Operation::GetBucket, url).await
    }
}

#[async_trait]
impl MetricsQuerier for OciClient {
    async fn summarize_metrics(&self, request: &SummarizeRequest) -> Result<Vec<MetricStream>> {
        let operation = Operation::SummarizeMetricsData;
        let url = endpoint(
            operation,
            &self.endpoints.telemetry,
            &[TELEMETRY_API, "metrics", "actions", "summarizeMetricsData"],
            &[("compartmentId", request.compartment_id.as_str())],
        )?;
        let body = serde_json::to_vec(request)?;
        let response = self.send(operation, Method::POST, url, Some(body)).await?;
        Self::decode(operation, response).await
    }
}

/// Connects profiles to their region's OCI endpoints.
pub struct OciProviderFactory {
    timeout: Duration,
    base_url: Option<Url>,
}

impl OciProviderFactory {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            base_url: None,
        }
    }

    /// Sends every call to `base_url` instead of the regional endpoints.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    async fn private_key(profile: &CloudProfile) -> Result<String> {
        if let Some(pem) = &profile.private_key {
            return Ok(pem.clone());
        }
        let path = profile.private_key_path.as_ref().ok_or_else(|| AdvisorError::Connect {
            profile_id: profile.id.clone(),
            message: "neither private_key nor private_key_path is set".to_string(),
        })?;
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AdvisorError::Connect {
                profile_id: profile.id.clone(),
                message: format!("failed to read {}: {e}", path.display()),
            })
    }
}

#[async_trait]
impl ProviderFactory for OciProviderFactory {
    async fn connect(&self, profile: &CloudProfile) -> Result<Arc<dyn CloudProvider>> {
        let connect_error = |message: String| AdvisorError::Connect {
            profile_id: profile.id.clone(),
            message,
        };

        let pem = Self::private_key(profile).await?;
        let key_id = format!(
            "{}/{}/{}",
            profile.tenancy_id, profile.user_id, profile.key_fingerprint
        );
        let signer = RequestSigner::from_pem(key_id, &pem).map_err(|e| connect_error(e.to_string()))?;

        let endpoints = match &self.base_url {
            Some(base) => Endpoints::single(base.clone()),
            None => Endpoints::for_region(&profile.region)
                .map_err(|e| connect_error(format!("invalid region {:?}: {e}", profile.region)))?,
        };

        let client = OciClient::new(signer, endpoints, self.timeout)
            .map_err(|e| connect_error(e.to_string()))?;
        let provider: Arc<dyn CloudProvider> = Arc::new(client);
        Ok(provider)
    }
}
