//! Blocking HTTP transport for the supervisord XML-RPC endpoint.
//!
//! Supervisord listens either on an inet socket (`http://host:port`) or a
//! Unix domain socket (`unix:///path/to/supervisor.sock`). Either way the
//! conversation is a single HTTP/1.1 POST to `/RPC2` per call, written
//! directly over the connected stream.

use std::io::{Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use super::DirectoryError;

/// Default inet port supervisord serves its RPC interface on.
const DEFAULT_PORT: u16 = 9001;

/// Parsed supervisord endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Http { host: String, port: u16 },
    Unix { path: PathBuf },
}

impl Endpoint {
    /// Parses `http://host[:port]` and `unix:///path` URLs.
    pub fn parse(url: &str) -> Result<Self, DirectoryError> {
        if let Some(rest) = url.strip_prefix("http://") {
            let rest = rest.trim_end_matches('/');
            if rest.is_empty() {
                return Err(DirectoryError::Url(url.to_string()));
            }
            let (host, port) = match rest.rsplit_once(':') {
                Some((host, port)) => {
                    let port = port
                        .parse()
                        .map_err(|_| DirectoryError::Url(url.to_string()))?;
                    (host, port)
                }
                None => (rest, DEFAULT_PORT),
            };
            if host.is_empty() {
                return Err(DirectoryError::Url(url.to_string()));
            }
            Ok(Endpoint::Http {
                host: host.to_string(),
                port,
            })
        } else if let Some(path) = url.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(DirectoryError::Url(url.to_string()));
            }
            Ok(Endpoint::Unix {
                path: PathBuf::from(path),
            })
        } else {
            Err(DirectoryError::Url(url.to_string()))
        }
    }
}

/// Performs one XML-RPC POST and returns the response body.
pub fn post(endpoint: &Endpoint, body: &str) -> Result<String, DirectoryError> {
    match endpoint {
        Endpoint::Http { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))?;
            roundtrip(stream, &format!("{}:{}", host, port), body)
        }
        #[cfg(unix)]
        Endpoint::Unix { path } => {
            let stream = UnixStream::connect(path)?;
            roundtrip(stream, "localhost", body)
        }
        #[cfg(not(unix))]
        Endpoint::Unix { .. } => Err(DirectoryError::Url(
            "unix:// endpoints are only supported on unix".to_string(),
        )),
    }
}

fn roundtrip<S: Read + Write>(
    mut stream: S,
    host: &str,
    body: &str,
) -> Result<String, DirectoryError> {
    let request = format!(
        "POST /RPC2 HTTP/1.1\r\nHost: {}\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        host,
        body.len(),
        body
    );
    stream.write_all(request.as_bytes())?;
    stream.flush()?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw)?;
    extract_body(&String::from_utf8_lossy(&raw))
}

/// Splits an HTTP response into status + body, rejecting non-200 answers.
fn extract_body(raw: &str) -> Result<String, DirectoryError> {
    let (head, body) = raw
        .split_once("\r\n\r\n")
        .ok_or_else(|| DirectoryError::Parse("truncated http response".to_string()))?;

    let status_line = head.lines().next().unwrap_or("");
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DirectoryError::Parse(format!("bad status line {:?}", status_line)))?;
    if status != 200 {
        return Err(DirectoryError::Http(status));
    }

    Ok(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_endpoint() {
        assert_eq!(
            Endpoint::parse("http://127.0.0.1:9001").unwrap(),
            Endpoint::Http {
                host: "127.0.0.1".to_string(),
                port: 9001
            }
        );
    }

    #[test]
    fn test_parse_http_endpoint_default_port() {
        assert_eq!(
            Endpoint::parse("http://localhost/").unwrap(),
            Endpoint::Http {
                host: "localhost".to_string(),
                port: 9001
            }
        );
    }

    #[test]
    fn test_parse_unix_endpoint() {
        assert_eq!(
            Endpoint::parse("unix:///var/run/supervisor.sock").unwrap(),
            Endpoint::Unix {
                path: PathBuf::from("/var/run/supervisor.sock")
            }
        );
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(matches!(
            Endpoint::parse("https://localhost:9001"),
            Err(DirectoryError::Url(_))
        ));
        assert!(matches!(
            Endpoint::parse("localhost:9001"),
            Err(DirectoryError::Url(_))
        ));
        assert!(matches!(
            Endpoint::parse("http://:9001"),
            Err(DirectoryError::Url(_))
        ));
    }

    #[test]
    fn test_extract_body_ok() {
        let raw = "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: 5\r\n\r\nhello";
        assert_eq!(extract_body(raw).unwrap(), "hello");
    }

    #[test]
    fn test_extract_body_http_error() {
        let raw = "HTTP/1.1 401 Unauthorized\r\n\r\ndenied";
        assert!(matches!(extract_body(raw), Err(DirectoryError::Http(401))));
    }

    #[test]
    fn test_extract_body_truncated() {
        assert!(matches!(
            extract_body("HTTP/1.1 200 OK\r\n"),
            Err(DirectoryError::Parse(_))
        ));
    }
}
