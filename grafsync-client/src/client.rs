//! [`GrafanaApi`] over the Grafana HTTP API.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use grafsync_core::{
    is_general, none_if_general, ApiError, Dashboard, DashboardContent, DashboardSummary,
    DashboardWriteResult, Folder, FolderUpdate, GrafanaApi, ObjectKind,
};

use crate::connection::{ca_certificates_from_env, Auth, Connection};
use crate::error::ClientError;

/// Page size for `GET /api/folders`.
const FOLDER_PAGE_SIZE: usize = 1000;
/// Page size for `GET /api/search`; Grafana caps it at 5000.
const SEARCH_PAGE_SIZE: usize = 5000;

const WRITE_MESSAGE: &str = "Dashboard updated via API";

/// HTTP client for one Grafana instance.
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    http: reqwest::Client,
    base_url: String,
    auth: Auth,
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateFolderRequest<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_uid: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UpdateFolderRequest<'a> {
    title: &'a str,
    overwrite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoveFolderRequest<'a> {
    /// Omitted to move to the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_uid: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateDashboardRequest<'a> {
    dashboard: &'a DashboardContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_uid: Option<&'a str>,
    message: &'a str,
    overwrite: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Message of a Grafana error body, falling back to the raw text.
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message,
            status: Some(status),
        }) => format!("{message} ({status})"),
        Ok(ErrorBody { message, .. }) => message,
        Err(_) => body.trim().to_string(),
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(Box::new(err))
}

// ---------------------------------------------------------------------------
// Construction and request plumbing
// ---------------------------------------------------------------------------

impl GrafanaClient {
    /// Build a client for `conn`, trusting any CA certificates configured in
    /// the environment.
    pub fn new(conn: &Connection) -> Result<Self, ClientError> {
        let base_url = conn.base_url()?;
        let auth = conn.auth()?;

        let mut builder = reqwest::Client::builder().timeout(conn.timeout());
        for cert in ca_certificates_from_env()? {
            builder = builder.add_root_certificate(cert);
        }
        let http = builder.build()?;

        tracing::debug!("connecting to {base_url}");
        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.auth {
            Auth::Token(token) => builder.bearer_auth(token),
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
        }
    }

    /// Send `builder` and return the body of a successful response.
    ///
    /// A 404 becomes [`ApiError::NotFound`] when `target` names the object
    /// the request is about.
    async fn execute(
        &self,
        builder: RequestBuilder,
        target: Option<(ObjectKind, &str)>,
    ) -> Result<String, ApiError> {
        let request = builder.build().map_err(transport)?;
        let method = request.method().to_string();
        let url = request.url().to_string();
        if let Some(body) = request.body().and_then(|b| b.as_bytes()) {
            tracing::debug!("HTTP {method} {url} body: {}", String::from_utf8_lossy(body));
        } else {
            tracing::debug!("HTTP {method} {url}");
        }

        let response = self.http.execute(request).await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        tracing::debug!("HTTP {method} {url} -> {status}: {body}");

        if status.is_success() {
            return Ok(body);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some((kind, uid)) = target {
                return Err(ApiError::NotFound {
                    kind,
                    uid: uid.to_owned(),
                });
            }
        }
        Err(ApiError::Status {
            method,
            url,
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        target: Option<(ObjectKind, &str)>,
    ) -> Result<T, ApiError> {
        let body = self.execute(builder, target).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Collect every page of a paginated listing.
    async fn paginate<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        page_size: usize,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page = 1usize;
        loop {
            let builder = self
                .request(Method::GET, path)
                .query(params)
                .query(&[("limit", page_size), ("page", page)]);
            let batch: Vec<T> = self.fetch(builder, None).await?;
            let done = batch.len() < page_size;
            items.extend(batch);
            if done {
                return Ok(items);
            }
            page += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// GrafanaApi
// ---------------------------------------------------------------------------

#[async_trait]
impl GrafanaApi for GrafanaClient {
    async fn get_folder(&self, uid: &str) -> Result<Folder, ApiError> {
        if is_general(Some(uid)) {
            return Err(ApiError::folder_not_found(uid));
        }
        let builder = self.request(Method::GET, &format!("/api/folders/{uid}"));
        self.fetch(builder, Some((ObjectKind::Folder, uid))).await
    }

    async fn list_folders(&self, parent_uid: Option<&str>) -> Result<Vec<Folder>, ApiError> {
        let params: Vec<(&str, String)> = none_if_general(parent_uid)
            .map(|p| vec![("parentUid", p.to_owned())])
            .unwrap_or_default();
        let listed = self
            .paginate("/api/folders", &params, FOLDER_PAGE_SIZE)
            .await;
        match (listed, none_if_general(parent_uid)) {
            (Err(ApiError::Status { status: 404, .. }), Some(parent)) => {
                Err(ApiError::folder_not_found(parent))
            }
            (listed, _) => listed,
        }
    }

    async fn create_folder(
        &self,
        title: &str,
        uid: Option<&str>,
        parent_uid: Option<&str>,
    ) -> Result<Folder, ApiError> {
        let body = CreateFolderRequest {
            title,
            uid,
            parent_uid: none_if_general(parent_uid),
        };
        let builder = self.request(Method::POST, "/api/folders").json(&body);
        self.fetch(builder, None).await
    }

    async fn update_folder(&self, uid: &str, update: FolderUpdate) -> Result<Folder, ApiError> {
        if !update.overwrite && update.version.is_none() {
            return Err(ApiError::InvalidRequest(
                "version must be provided when overwrite is false".into(),
            ));
        }
        let body = UpdateFolderRequest {
            title: &update.title,
            overwrite: update.overwrite,
            version: if update.overwrite { None } else { update.version },
        };
        let builder = self
            .request(Method::PUT, &format!("/api/folders/{uid}"))
            .json(&body);
        let updated: Folder = self
            .fetch(builder, Some((ObjectKind::Folder, uid)))
            .await?;

        let Some(parent) = update.parent_uid else {
            return Ok(updated);
        };
        let body = MoveFolderRequest {
            parent_uid: none_if_general(parent.as_deref()),
        };
        let builder = self
            .request(Method::POST, &format!("/api/folders/{uid}/move"))
            .json(&body);
        self.fetch(builder, Some((ObjectKind::Folder, uid))).await
    }

    async fn delete_folder(&self, uid: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, &format!("/api/folders/{uid}"));
        self.execute(builder, Some((ObjectKind::Folder, uid)))
            .await
            .map(drop)
    }

    async fn search_dashboards(
        &self,
        folder_uids: Option<&[String]>,
    ) -> Result<Vec<DashboardSummary>, ApiError> {
        let mut params = vec![("type", "dash-db".to_string())];
        if let Some(uids) = folder_uids.filter(|u| !u.is_empty()) {
            params.push(("folderUIDs", uids.join(",")));
        }
        self.paginate("/api/search", &params, SEARCH_PAGE_SIZE)
            .await
    }

    async fn get_dashboard(&self, uid: &str) -> Result<Dashboard, ApiError> {
        let builder = self.request(Method::GET, &format!("/api/dashboards/uid/{uid}"));
        self.fetch(builder, Some((ObjectKind::Dashboard, uid)))
            .await
    }

    async fn update_dashboard(
        &self,
        content: &DashboardContent,
        folder_uid: Option<&str>,
    ) -> Result<DashboardWriteResult, ApiError> {
        let dashboard = content.without_id();
        let body = UpdateDashboardRequest {
            dashboard: &dashboard,
            folder_uid: none_if_general(folder_uid),
            message: WRITE_MESSAGE,
            overwrite: true,
        };
        let builder = self
            .request(Method::POST, "/api/dashboards/db")
            .json(&body);
        self.fetch(builder, None).await
    }

    async fn delete_dashboard(&self, uid: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, &format!("/api/dashboards/uid/{uid}"));
        self.execute(builder, Some((ObjectKind::Dashboard, uid)))
            .await
            .map(drop)
    }
}
