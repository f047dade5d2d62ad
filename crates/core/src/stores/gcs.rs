//! Google Cloud Storage over the JSON API.
//!
//! Authentication is whatever bearer token the environment provides; this
//! client never mints or refreshes credentials.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::Write;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{ObjectStore, RemoteObject};
use crate::config::GcsConfig;
use crate::error::StoreError;

pub struct GcsStore {
    client: Client,
    endpoint: Url,
    bucket: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<GcsObject>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GcsObject {
    name: String,
    updated: DateTime<Utc>,
    /// The JSON API reports sizes as decimal strings.
    #[serde(default)]
    size: Option<String>,
}

impl From<GcsObject> for RemoteObject {
    fn from(object: GcsObject) -> Self {
        RemoteObject {
            size: object.size.and_then(|s| s.parse().ok()),
            name: object.name,
            updated: object.updated,
        }
    }
}

impl GcsStore {
    pub fn new(bucket: impl Into<String>, config: &GcsConfig) -> Result<Self, StoreError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| StoreError::InvalidEndpoint(format!("{}: {}", config.endpoint, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::InvalidEndpoint(config.endpoint.clone()));
        }

        let client = Client::builder()
            .user_agent(concat!("modelvault/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            bucket: bucket.into(),
            token: config.token.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn objects_url(&self) -> Result<Url, StoreError> {
        self.url(&["storage", "v1", "b", &self.bucket, "o"])
    }

    fn object_url(&self, name: &str) -> Result<Url, StoreError> {
        // `name` is a single segment; slashes inside it get percent-encoded.
        self.url(&["storage", "v1", "b", &self.bucket, "o", name])
    }

    fn upload_url(&self) -> Result<Url, StoreError> {
        self.url(&["upload", "storage", "v1", "b", &self.bucket, "o"])
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    fn location(&self) -> String {
        format!("gs://{}", self.bucket)
    }

    async fn upload(&self, name: &str, source: &Path) -> Result<(), StoreError> {
        let body = fs::read(source).map_err(|source_err| StoreError::Io {
            path: source.to_path_buf(),
            source: source_err,
        })?;

        let request = self
            .client
            .post(self.upload_url()?)
            .query(&[("uploadType", "media"), ("name", name)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body);

        self.send(request).await?;
        tracing::debug!("Uploaded {} to {}", name, self.location());
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<RemoteObject>, StoreError> {
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("prefix", prefix.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let request = self.client.get(self.objects_url()?).query(&query);
            let page: ListResponse = self.send(request).await?.json().await?;

            objects.extend(page.items.into_iter().map(RemoteObject::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn download(&self, name: &str, dest: &Path) -> Result<u64, StoreError> {
        let request = self
            .client
            .get(self.object_url(name)?)
            .query(&[("alt", "media")]);

        let response = match self.send(request).await {
            Err(StoreError::Status { status: 404, .. }) => {
                return Err(StoreError::ObjectMissing(name.to_string()))
            }
            other => other?,
        };

        let total_size = response.content_length().unwrap_or(0);

        let pb = ProgressBar::new(total_size);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(name.to_string());

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Stream into a sibling `.part` file so an interrupted transfer never
        // leaves a truncated artifact under its final name.
        let partial = partial_path(dest);
        let downloaded = match write_stream(response, &partial, &pb).await {
            Ok(downloaded) => downloaded,
            Err(e) => {
                let _ = fs::remove_file(&partial);
                pb.abandon();
                return Err(e);
            }
        };
        fs::rename(&partial, dest).map_err(|source| StoreError::Io {
            path: dest.to_path_buf(),
            source,
        })?;

        pb.finish_with_message(format!("Downloaded {}", name));
        Ok(downloaded)
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn write_stream(response: Response, path: &Path, pb: &ProgressBar) -> Result<u64, StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).map_err(io_err)?;
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).map_err(io_err)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }
    file.flush().map_err(io_err)?;

    Ok(downloaded)
}
