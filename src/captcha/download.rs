// Puzzle image download with bounded retries
use super::config::DownloadConfig;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Download of {url} failed after {attempts} tries: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// Fetches raw bytes for a URL, retrying internally
pub trait Downloader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

pub struct HttpDownloader {
    client: reqwest::blocking::Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpDownloader {
    pub fn new(config: &DownloadConfig) -> Result<Self, DownloadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    fn try_once(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self.client.get(url).send().map_err(|e| e.to_string())?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(format!("status_code={}", response.status().as_u16()));
        }
        let bytes = response.bytes().map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        fetch_with_retries(url, self.max_retries, self.retry_delay, || {
            self.try_once(url)
        })
    }
}

/// Run `try_once` up to `max_retries` times (at least once), sleeping
/// `retry_delay` between failed tries
pub fn fetch_with_retries<F>(
    url: &str,
    max_retries: u32,
    retry_delay: Duration,
    mut try_once: F,
) -> Result<Vec<u8>, DownloadError>
where
    F: FnMut() -> Result<Vec<u8>, String>,
{
    let attempts = max_retries.max(1);
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match try_once() {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                log::warn!("Image download failed (try {}): {}, URL: {}", attempt, e, url);
                last_error = e;
            }
        }
        if attempt < attempts {
            std::thread::sleep(retry_delay);
        }
    }
    log::error!(
        "Image download failed after {} tries: {}, URL: {}",
        attempts,
        last_error,
        url
    );
    Err(DownloadError::Exhausted {
        url: url.to_string(),
        attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Answer `requests` connections with a fixed response, return the URL
    fn serve(status_line: &'static str, body: &'static [u8], requests: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut request = [0u8; 1024];
                let _ = stream.read(&mut request);
                let header = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                stream.write_all(header.as_bytes()).unwrap();
                stream.write_all(body).unwrap();
            }
        });
        format!("http://{addr}/bg.jpg")
    }

    fn downloader(max_retries: u32) -> HttpDownloader {
        HttpDownloader::new(&DownloadConfig {
            timeout: Duration::from_secs(5),
            max_retries,
            retry_delay: Duration::ZERO,
        })
        .unwrap()
    }

    #[test]
    fn test_http_ok_returns_body() {
        let url = serve("200 OK", b"jpeg bytes", 1);
        assert_eq!(downloader(3).fetch(&url).unwrap(), b"jpeg bytes".to_vec());
    }

    #[test]
    fn test_http_error_status_is_a_failed_try() {
        let url = serve("503 Service Unavailable", b"busy", 2);
        let err = downloader(2).fetch(&url).unwrap_err();
        match err {
            DownloadError::Exhausted {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 2);
                assert_eq!(last_error, "status_code=503");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_first_try_succeeds() {
        let mut calls = 0;
        let bytes = fetch_with_retries("http://x", 3, Duration::ZERO, || {
            calls += 1;
            Ok(vec![1, 2, 3])
        })
        .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_recovers_after_failures() {
        let mut calls = 0;
        let bytes = fetch_with_retries("http://x", 3, Duration::ZERO, || {
            calls += 1;
            if calls < 3 {
                Err("status_code=502".to_string())
            } else {
                Ok(vec![9])
            }
        })
        .unwrap();
        assert_eq!(bytes, vec![9]);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhausted_reports_last_error() {
        let mut calls = 0;
        let err = fetch_with_retries("http://x/bg.jpg", 2, Duration::ZERO, || {
            calls += 1;
            Err(format!("error {calls}"))
        })
        .unwrap_err();
        assert_eq!(calls, 2);
        match err {
            DownloadError::Exhausted {
                url,
                attempts,
                last_error,
            } => {
                assert_eq!(url, "http://x/bg.jpg");
                assert_eq!(attempts, 2);
                assert_eq!(last_error, "error 2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_retries_still_tries_once() {
        let mut calls = 0;
        let _ = fetch_with_retries("http://x", 0, Duration::ZERO, || {
            calls += 1;
            Err("nope".to_string())
        });
        assert_eq!(calls, 1);
    }
}
