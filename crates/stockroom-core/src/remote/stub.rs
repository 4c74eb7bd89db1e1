//! Canned-response HTTP server for remote client tests.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::RemoteSettings;

type Routes = Arc<Vec<(String, String)>>;

/// HTTP server answering `"METHOD /path"` routes with fixed JSON bodies.
/// Unknown routes get a 404.
pub struct StubApi {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubApi {
    pub async fn start(routes: &[(&str, &str)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let routes: Routes = Arc::new(
            routes
                .iter()
                .map(|(route, body)| ((*route).to_string(), (*body).to_string()))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = answer(stream, &routes, &log).await;
                });
            }
        });

        Self { base_url, requests }
    }

    pub fn settings(&self, auth_token: Option<&str>) -> RemoteSettings {
        RemoteSettings {
            base_url: self.base_url.clone(),
            auth_token: auth_token.map(str::to_string),
            request_timeout_secs: 5,
        }
    }

    /// Requests received so far, with their bearer token when one was sent
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `route` was requested
    pub fn hits(&self, route: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.split(" bearer=").next() == Some(route))
            .count()
    }
}

async fn answer(
    mut stream: TcpStream,
    routes: &Routes,
    log: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    let head_end = loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
    let header = |name: &str| {
        head.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    };
    let content_length = header("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    while buffer.len() < head_end + content_length {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    let route = head
        .lines()
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ");
    let entry = match header("authorization").and_then(|value| {
        value
            .strip_prefix("Bearer ")
            .map(str::to_string)
    }) {
        Some(token) => format!("{route} bearer={token}"),
        None => route.clone(),
    };
    log.lock().unwrap_or_else(PoisonError::into_inner).push(entry);

    let (status, body) = routes
        .iter()
        .find(|(known, _)| *known == route)
        .map_or_else(
            || ("404 Not Found", r#"{"message":"Not found"}"#.to_string()),
            |(_, body)| ("200 OK", body.clone()),
        );
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
