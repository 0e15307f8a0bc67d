#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use intake::{AppState, Config, Delivery, DeliveryError, Mailer, NotificationPayload};

pub const API_KEY: &str = "xkeysib-test-credential";

pub fn test_config(upload_dir: &Path, api_url: Option<&str>) -> Config {
    let upload_dir = upload_dir.display().to_string();
    let api_url = api_url.map(str::to_owned);
    Config::from_lookup(move |name| match name {
        "SENDER_EMAIL" => Some("loans@hanuman.example".to_string()),
        "RECEIVER_EMAIL" => Some("desk@hanuman.example".to_string()),
        "BREVO_API_KEY" => Some(API_KEY.to_string()),
        "UPLOAD_DIR" => Some(upload_dir.clone()),
        "PUBLIC_DIR" => Some(concat!(env!("CARGO_MANIFEST_DIR"), "/public").to_string()),
        "BREVO_API_URL" => api_url.clone(),
        _ => None,
    })
    .expect("test config")
}

/// Mailer that records every payload and answers with a fixed outcome.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<NotificationPayload>>,
    pub reject_with: Option<(u16, String)>,
}

impl RecordingMailer {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            reject_with: Some((status, body.to_string())),
        })
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> NotificationPayload {
        self.sent.lock().unwrap().last().cloned().expect("a payload was sent")
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, payload: &NotificationPayload) -> Result<Delivery, DeliveryError> {
        self.sent.lock().unwrap().push(payload.clone());
        match &self.reject_with {
            Some((status, body)) => Err(DeliveryError::Rejected {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(Delivery {
                message_id: Some("<test@smtp-relay.brevo.com>".to_string()),
            }),
        }
    }
}

pub fn state_with(config: Config, mailer: Arc<dyn Mailer>) -> AppState {
    AppState::new(config, mailer)
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartForm {
    boundary: &'static str,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "----intake-test-boundary",
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method("POST")
            .uri("/submit")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub const PAN_BYTES: &[u8; 10] = b"PAN-012345";
pub const BANK_BYTES: &[u8; 20] = b"BANK-STATEMENT-01234";

/// The form every scenario starts from, minus the fields listed in `skip`.
pub fn application_form(skip: &[&str]) -> MultipartForm {
    let fields = [
        ("name", "Asha Rao"),
        ("mobile", "9876543210"),
        ("dob", "1990-01-01"),
        ("employment", "Salaried"),
        ("income", "50000"),
    ];

    let mut form = MultipartForm::new();
    for (name, value) in fields {
        if !skip.contains(&name) {
            form = form.text(name, value);
        }
    }
    if !skip.contains(&"pan") {
        form = form.file("pan", "pan.pdf", PAN_BYTES);
    }
    if !skip.contains(&"bank") {
        form = form.file("bank", "bank.pdf", BANK_BYTES);
    }
    form
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn staged_file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// A request captured by [`MockBrevo`].
#[derive(Debug)]
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("json request body")
    }
}

/// A minimal HTTP server on tokio that answers one request with a canned
/// response and hands back what it received.
pub struct MockBrevo {
    listener: TcpListener,
    pub url: String,
}

impl MockBrevo {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}/v3/smtp/email");
        Self { listener, url }
    }

    pub async fn respond_once(self, status_code: u16, body: &str) -> CapturedRequest {
        let (mut stream, _) = self.listener.accept().await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers were complete");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body was complete");
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status_code} Status\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();

        CapturedRequest {
            head,
            body: buf[header_end..header_end + content_length].to_vec(),
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
