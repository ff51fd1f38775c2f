//! Where the fallback dataset comes from.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;

use crate::error::{MapError, Result};

/// Fetches a text resource by URL.
pub trait DatasetSource {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>>;
}

/// Serves site-relative URLs from a static directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        FileSource { root: root.into() }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        self.root.join(path.trim_start_matches('/'))
    }
}

impl DatasetSource for FileSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        let path = self.resolve(url);
        tracing::debug!(url, path = %path.display(), "reading static asset");
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(body),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(MapError::Fetch {
                url: url.to_string(),
                status: 404,
            }),
            Err(err) => Err(err.into()),
        }
    }
}

/// HTTP client with a bounded request time.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Option<String>,
    request_timeout: Duration,
}

impl HttpSource {
    pub fn new(request_timeout: Duration, base_url: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(HttpSource {
            client,
            base_url: base_url.map(|base| base.trim_end_matches('/').to_string()),
            request_timeout,
        })
    }

    fn resolve(&self, url: &str) -> String {
        match self.base_url {
            Some(ref base) if url.starts_with('/') => format!("{}{}", base, url),
            _ => url.to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl DatasetSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        let target = self.resolve(url);
        tracing::debug!(url = %target, "GET");
        let resp = self.client.get(&target).send().await.map_err(|err| {
            if err.is_timeout() {
                MapError::Timeout { url: target.clone() }
            } else {
                MapError::Http(err)
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MapError::Fetch {
                url: target,
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

/// Absolute `http(s)` URLs go over the network, everything else is read from
/// the static directory.
#[derive(Debug, Clone)]
pub struct AssetSource {
    files: FileSource,
    http: HttpSource,
}

impl AssetSource {
    pub fn new(files: FileSource, http: HttpSource) -> Self {
        AssetSource { files, http }
    }
}

impl DatasetSource for AssetSource {
    async fn fetch(&self, url: &str) -> Result<String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.http.fetch(url).await
        } else {
            self.files.fetch(url).await
        }
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Body(String),
    Status(u16),
}

/// Canned responses keyed by URL; unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct MemorySource {
    responses: HashMap<String, Canned>,
    requests: RefCell<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource::default()
    }

    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), Canned::Body(body.to_string()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Canned::Status(status));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl DatasetSource for MemorySource {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requests.borrow_mut().push(url.to_string());
        match self.responses.get(url) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Status(status)) => Err(MapError::Fetch {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(MapError::Fetch {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Accepts one connection on a local port, reads the request head and
    /// hands the socket to `respond`.
    fn serve_once<F>(respond: F) -> String
    where
        F: FnOnce(std::net::TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            respond(stream);
        });
        format!("http://{}", addr)
    }

    #[test]
    fn memory_source_answers_and_counts() {
        let source = MemorySource::new()
            .with_body("/a.geojson", "{}")
            .with_status("/b.geojson", 500);
        assert_eq!(block_on(source.fetch("/a.geojson")).unwrap(), "{}");
        assert!(matches!(
            block_on(source.fetch("/b.geojson")),
            Err(MapError::Fetch { status: 500, .. })
        ));
        assert!(matches!(
            block_on(source.fetch("/c.geojson")),
            Err(MapError::Fetch { status: 404, .. })
        ));
        assert_eq!(source.requests().len(), 3);
    }

    #[tokio::test]
    async fn file_source_resolves_site_paths() {
        let root = std::env::temp_dir().join(format!("placemap-fetch-{}", std::process::id()));
        fs::create_dir_all(root.join("geojson")).unwrap();
        fs::write(root.join("geojson/x.geojson"), "{\"type\": \"Point\"}").unwrap();

        let source = FileSource::new(&root);
        let body = source.fetch("/geojson/x.geojson?v=2").await.unwrap();
        assert!(body.contains("Point"));
        assert!(matches!(
            source.fetch("/geojson/missing.geojson").await,
            Err(MapError::Fetch { status: 404, .. })
        ));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn http_source_joins_base_url() {
        let base = Some("http://localhost:8000/".to_string());
        let source = HttpSource::new(Duration::from_secs(1), base).unwrap();
        assert_eq!(source.resolve("/geojson/n.geojson"), "http://localhost:8000/geojson/n.geojson");
        assert_eq!(
            source.resolve("https://example.org/n.geojson"),
            "https://example.org/n.geojson"
        );
    }

    #[tokio::test]
    async fn http_error_status_becomes_fetch_error() {
        let base = serve_once(|mut stream| {
            let head = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
            let _ = stream.write_all(head.as_bytes());
        });
        let source = HttpSource::new(Duration::from_secs(5), Some(base)).unwrap();
        assert!(matches!(
            source.fetch("/geojson/null-island.geojson").await,
            Err(MapError::Fetch { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn stalled_server_becomes_timeout() {
        let base = serve_once(|stream| {
            thread::sleep(Duration::from_secs(3));
            drop(stream);
        });
        let source = HttpSource::new(Duration::from_millis(300), Some(base)).unwrap();
        assert!(matches!(
            source.fetch("/geojson/null-island.geojson").await,
            Err(MapError::Timeout { .. })
        ));
    }
}
