use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::model::Document;

const GIST_API: &str = "https://api.github.com/gists";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the document lives between restarts.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short label for logs and `/debug`.
    fn describe(&self) -> String;

    /// `Ok(None)` when the store exists but holds no document yet.
    async fn fetch(&self) -> Result<Option<Document>>;

    async fn store(&self, doc: &Document) -> Result<()>;
}

/// A single file inside a GitHub Gist.
pub struct GistBackend {
    client: reqwest::Client,
    token: String,
    gist_id: String,
    file_name: String,
}

impl GistBackend {
    pub fn new(token: String, gist_id: String, file_name: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("motolog/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            token,
            gist_id,
            file_name,
        })
    }

    fn url(&self) -> String {
        format!("{}/{}", GIST_API, self.gist_id)
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url())
            .header(reqwest::header::AUTHORIZATION, format!("token {}", self.token))
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
    }
}

/// Pulls `files[file_name].content` out of a Gist API response and parses it.
fn document_from_gist(body: &serde_json::Value, file_name: &str) -> Result<Option<Document>> {
    let Some(content) = body["files"][file_name]["content"].as_str() else {
        return Ok(None);
    };
    let doc = serde_json::from_str(content).context("gist file is not a valid document")?;
    Ok(Some(doc))
}

/// `Ok(false)` on 404, an error on any other non-2xx status.
fn gist_has_body(status: reqwest::StatusCode) -> Result<bool> {
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(false);
    }
    if !status.is_success() {
        return Err(anyhow!("gist returned {}", status));
    }
    Ok(true)
}

/// PATCH body replacing `file_name` with the pretty-printed document.
fn gist_payload(doc: &Document, file_name: &str) -> Result<serde_json::Value> {
    let content = serde_json::to_string_pretty(doc)?;
    let mut files = serde_json::Map::new();
    files.insert(file_name.to_string(), json!({ "content": content }));
    Ok(json!({ "files": files }))
}

#[async_trait]
impl Backend for GistBackend {
    fn describe(&self) -> String {
        format!("gist {} ({})", self.gist_id, self.file_name)
    }

    async fn fetch(&self) -> Result<Option<Document>> {
        let resp = self
            .request(reqwest::Method::GET)
            .send()
            .await
            .context("gist request failed")?;
        if !gist_has_body(resp.status())? {
            return Ok(None);
        }
        let body: serde_json::Value = resp.json().await.context("gist response is not JSON")?;
        document_from_gist(&body, &self.file_name)
    }

    async fn store(&self, doc: &Document) -> Result<()> {
        let payload = gist_payload(doc, &self.file_name)?;
        let resp = self
            .request(reqwest::Method::PATCH)
            .json(&payload)
            .send()
            .await
            .context("gist update failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("gist update returned {}: {}", status, compact(&body, 200)));
        }
        Ok(())
    }
}

/// Pretty JSON on local disk.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Backend for FileBackend {
    fn describe(&self) -> String {
        format!("arquivo {}", self.path.display())
    }

    async fn fetch(&self) -> Result<Option<Document>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("cannot read {}", self.path.display()))
            }
        };
        let doc = serde_json::from_str(&raw)
            .with_context(|| format!("invalid JSON in {}", self.path.display()))?;
        Ok(Some(doc))
    }

    async fn store(&self, doc: &Document) -> Result<()> {
        let content = serde_json::to_string_pretty(doc)?;
        // Write next to the target and rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("cannot write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("cannot replace {}", self.path.display()))?;
        Ok(())
    }
}

/// Result of a write-through mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mutation<T> {
    pub value: T,
    /// `false` means the change only lives in memory until the next successful save.
    pub persisted: bool,
}

/// Owns the in-memory document and writes it through to the backend after every change.
pub struct Db {
    doc: Mutex<Document>,
    backend: Arc<dyn Backend>,
}

impl Db {
    /// Loads the document. Never fails: errors and absence both start from an empty document.
    pub async fn open(backend: Arc<dyn Backend>) -> Self {
        let doc = match backend.fetch().await {
            Ok(Some(doc)) if doc.is_empty() => {
                info!(storage = %backend.describe(), "Stored document has no records");
                doc
            }
            Ok(Some(doc)) => {
                info!(
                    storage = %backend.describe(),
                    km = doc.km.len(),
                    fuel = doc.fuel.len(),
                    manu = doc.manu.len(),
                    "Document loaded"
                );
                doc
            }
            Ok(None) => {
                info!(storage = %backend.describe(), "No document stored yet, starting empty");
                Document::default()
            }
            Err(err) => {
                warn!(storage = %backend.describe(), error = %err, "Failed to load document, starting empty");
                Document::default()
            }
        };
        Self {
            doc: Mutex::new(doc),
            backend,
        }
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    pub async fn snapshot(&self) -> Document {
        self.doc.lock().await.clone()
    }

    /// Applies `f` and, when it succeeds, saves the result before releasing the lock.
    /// An `Err` from `f` leaves the document untouched as far as storage is concerned.
    pub async fn mutate<T, E>(
        &self,
        f: impl FnOnce(&mut Document) -> Result<T, E>,
    ) -> Result<Mutation<T>, E> {
        let mut doc = self.doc.lock().await;
        let value = f(&mut *doc)?;
        let persisted = self.save(&doc).await;
        Ok(Mutation { value, persisted })
    }

    /// Saves the current document. Returns `false` when the backend refused it.
    pub async fn persist(&self) -> bool {
        let doc = self.doc.lock().await;
        self.save(&doc).await
    }

    async fn save(&self, doc: &Document) -> bool {
        match self.backend.store(doc).await {
            Ok(()) => {
                debug!(storage = %self.backend.describe(), "Document saved");
                true
            }
            Err(err) => {
                warn!(storage = %self.backend.describe(), error = %err, "Failed to save document");
                false
            }
        }
    }
}

pub fn compact(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut s = value.chars().take(max).collect::<String>();
        s.push_str("...");
        s
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::MemoryBackend;
    use super::*;
    use crate::model::OdometerReading;

    fn reading(km: i64) -> OdometerReading {
        OdometerReading { km, date: "01/01/25 às 10:00".to_string() }
    }

    #[tokio::test]
    async fn open_falls_back_to_empty_document() {
        let backend = Arc::new(MemoryBackend::default());
        backend.fail.store(true, Ordering::SeqCst);
        let db = Db::open(backend).await;
        assert!(db.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn mutate_writes_through() {
        let backend = Arc::new(MemoryBackend::default());
        let db = Db::open(backend.clone()).await;

        let m = db
            .mutate(|doc| {
                doc.km.push(reading(1500));
                Ok::<_, ()>(doc.km.len())
            })
            .await
            .unwrap();
        assert_eq!(m, Mutation { value: 1, persisted: true });
        assert_eq!(backend.stored().unwrap(), db.snapshot().await);
    }

    #[tokio::test]
    async fn failed_closure_does_not_save() {
        let backend = Arc::new(MemoryBackend::default());
        let db = Db::open(backend.clone()).await;
        let res = db.mutate(|_| Err::<(), _>("nope")).await;
        assert_eq!(res, Err("nope"));
        assert_eq!(backend.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_save_keeps_local_change() {
        let backend = Arc::new(MemoryBackend::default());
        let db = Db::open(backend.clone()).await;
        backend.fail.store(true, Ordering::SeqCst);

        let m = db
            .mutate(|doc| {
                doc.km.push(reading(800));
                Ok::<_, ()>(())
            })
            .await
            .unwrap();
        assert!(!m.persisted);
        assert_eq!(db.snapshot().await.last_km(), 800);
        assert!(!db.persist().await);

        backend.fail.store(false, Ordering::SeqCst);
        assert!(db.persist().await);
        assert_eq!(backend.stored().unwrap().last_km(), 800);
    }

    #[tokio::test]
    async fn file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("moto_data.json"));
        assert_eq!(backend.fetch().await.unwrap(), None);

        let mut doc = Document::default();
        doc.km.push(reading(12345));
        backend.store(&doc).await.unwrap();
        assert_eq!(backend.fetch().await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn file_backend_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moto_data.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(FileBackend::new(&path).fetch().await.is_err());

        let db = Db::open(Arc::new(FileBackend::new(&path))).await;
        assert!(db.snapshot().await.is_empty());
    }

    #[test]
    fn extracts_document_from_gist_payload() {
        let body = json!({
            "files": {
                "moto_data.json": {
                    "content": "{\"km\":[{\"km\":900,\"date\":\"01/01/25 às 10:00\"}],\"fuel\":[],\"manu\":[]}"
                }
            }
        });
        let doc = document_from_gist(&body, "moto_data.json").unwrap().unwrap();
        assert_eq!(doc.last_km(), 900);
        assert_eq!(document_from_gist(&body, "other.json").unwrap(), None);

        let broken = json!({ "files": { "moto_data.json": { "content": "{" } } });
        assert!(document_from_gist(&broken, "moto_data.json").is_err());
    }

    #[test]
    fn gist_payload_replaces_the_named_file() {
        let mut doc = Document::default();
        doc.km.push(reading(15000));
        doc.manu.push(crate::model::MaintenanceEvent {
            desc: "Troca de óleo".to_string(),
            date: "01/01/25 às 10:00".to_string(),
            km: 15000,
            price: None,
        });

        let payload = gist_payload(&doc, "moto_data.json").unwrap();
        let files = payload["files"].as_object().unwrap();
        assert_eq!(files.len(), 1);
        let content = payload["files"]["moto_data.json"]["content"].as_str().unwrap();
        assert!(content.contains('\n'), "content is pretty-printed");
        assert!(content.contains("Troca de óleo"));
        assert!(!content.contains("\\u"));

        assert_eq!(document_from_gist(&payload, "moto_data.json").unwrap(), Some(doc));
    }

    #[test]
    fn gist_status_mapping() {
        use reqwest::StatusCode;
        assert!(gist_has_body(StatusCode::OK).unwrap());
        assert!(!gist_has_body(StatusCode::NOT_FOUND).unwrap());
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN, StatusCode::INTERNAL_SERVER_ERROR] {
            assert!(gist_has_body(status).is_err(), "{}", status);
        }
    }

    #[test]
    fn compact_truncates_long_bodies() {
        assert_eq!(compact("short", 10), "short");
        assert_eq!(compact("abcdefghij", 4), "abcd...");
    }
}
