//! Passive-mode FTP client for anonymous downloads.
//!
//! Every call opens its own control connection, logs in, runs one command
//! and quits. Only the connection attempt is bounded by a timeout; once
//! connected, transfers run as long as the server keeps the socket open.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use freshness_cache::{RemoteError, RemoteSource};
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, instrument, trace};

const DEFAULT_FTP_PORT: u16 = 21;
const ANONYMOUS_USER: &str = "anonymous";

/// FTP remote.
#[derive(Debug, Clone)]
pub struct FtpSource {
    connect_timeout: Duration,
}

impl FtpSource {
    /// Anonymous client with the given connection timeout.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Modification time reported by `MDTM`.
    #[instrument(skip(self))]
    pub async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>, RemoteError> {
        let target = FtpTarget::parse(url)?;
        let mut control = self.login(&target).await?;

        let reply = control.command(&format!("MDTM {}", target.path)).await?;
        let result = match reply.code {
            213 => parse_mdtm(&reply.text),
            550 => Err(RemoteError::NotFound(url.to_string())),
            _ => Err(unexpected("MDTM", &reply)),
        };

        control.quit().await;
        result
    }

    /// Download the file with a passive-mode `RETR`.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        let target = FtpTarget::parse(url)?;
        let mut control = self.login(&target).await?;

        let reply = control.command("PASV").await?;
        if reply.code != 227 {
            return Err(unexpected("PASV", &reply));
        }
        let mut data_addr = SocketAddr::V4(parse_pasv(&reply.text)?);
        if data_addr.ip().is_unspecified() {
            data_addr.set_ip(control.peer.ip());
        }
        let mut data = self.connect(data_addr).await?;

        let reply = control.command(&format!("RETR {}", target.path)).await?;
        match reply.code {
            125 | 150 => {}
            550 => return Err(RemoteError::NotFound(url.to_string())),
            _ => return Err(unexpected("RETR", &reply)),
        }

        let mut contents = Vec::new();
        data.read_to_end(&mut contents).await?;
        drop(data);

        let done = control.read_reply().await?;
        if !matches!(done.code, 226 | 250) {
            return Err(unexpected("RETR", &done));
        }

        control.quit().await;
        debug!(bytes = contents.len(), "FTP transfer complete");
        Ok(Bytes::from(contents))
    }

    async fn connect<A: ToSocketAddrs + std::fmt::Display>(
        &self,
        addr: A,
    ) -> Result<TcpStream, RemoteError> {
        let label = addr.to_string();
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(RemoteError::Connect(format!("{}: {}", label, e))),
            Err(_) => Err(RemoteError::Timeout),
        }
    }

    async fn login(&self, target: &FtpTarget) -> Result<ControlConnection, RemoteError> {
        let stream = self
            .connect(format!("{}:{}", target.host, target.port))
            .await?;
        let mut control = ControlConnection::new(stream)?;

        let greeting = control.read_reply().await?;
        if greeting.code != 220 {
            return Err(unexpected("connect", &greeting));
        }

        let reply = control.command(&format!("USER {}", ANONYMOUS_USER)).await?;
        match reply.code {
            230 => {}
            331 => {
                let reply = control.command("PASS ").await?;
                if !matches!(reply.code, 230 | 202) {
                    return Err(unexpected("PASS", &reply));
                }
            }
            _ => return Err(unexpected("USER", &reply)),
        }

        let reply = control.command("TYPE I").await?;
        if reply.code != 200 {
            return Err(unexpected("TYPE", &reply));
        }

        trace!(host = %target.host, "FTP login complete");
        Ok(control)
    }
}

#[async_trait]
impl RemoteSource for FtpSource {
    async fn modified_at(&self, url: &str) -> Result<DateTime<Utc>, RemoteError> {
        FtpSource::modified_at(self, url).await
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        FtpSource::fetch(self, url).await
    }
}

/// Host, port and path pulled from an `ftp://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FtpTarget {
    host: String,
    port: u16,
    path: String,
}

impl FtpTarget {
    fn parse(url: &str) -> Result<Self, RemoteError> {
        let parsed = Url::parse(url)
            .map_err(|e| RemoteError::Protocol(format!("invalid URL {}: {}", url, e)))?;
        if parsed.scheme() != "ftp" {
            return Err(RemoteError::Protocol(format!("not an ftp URL: {}", url)));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| RemoteError::Protocol(format!("missing host in {}", url)))?;

        Ok(Self {
            host: host.to_string(),
            port: parsed.port().unwrap_or(DEFAULT_FTP_PORT),
            path: parsed.path().to_string(),
        })
    }
}

/// Server reply; multi-line texts are joined with newlines.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reply {
    code: u16,
    text: String,
}

struct ControlConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: SocketAddr,
}

impl ControlConnection {
    fn new(stream: TcpStream) -> Result<Self, RemoteError> {
        let peer = stream.peer_addr()?;
        let (read, write) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read),
            writer: write,
            peer,
        })
    }

    async fn command(&mut self, command: &str) -> Result<Reply, RemoteError> {
        if command.starts_with("PASS") {
            trace!("> PASS ****");
        } else {
            trace!("> {}", command);
        }
        self.writer.write_all(command.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<Reply, RemoteError> {
        let first = self.read_line().await?;
        let (code, mut more, text) = parse_reply_line(&first)
            .ok_or_else(|| RemoteError::Protocol(format!("malformed reply: {}", first.trim_end())))?;

        let mut text = text.to_string();
        while more {
            let line = self.read_line().await?;
            text.push('\n');
            match parse_reply_line(&line) {
                Some((c, false, last)) if c == code => {
                    text.push_str(last);
                    more = false;
                }
                _ => text.push_str(line.trim_end()),
            }
        }

        trace!("< {} {}", code, text);
        Ok(Reply { code, text })
    }

    async fn read_line(&mut self) -> Result<String, RemoteError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(RemoteError::Protocol(
                "control connection closed by server".to_string(),
            ));
        }
        Ok(line)
    }

    async fn quit(mut self) {
        if self.command("QUIT").await.is_err() {
            trace!("QUIT not acknowledged");
        }
    }
}

fn unexpected(command: &str, reply: &Reply) -> RemoteError {
    RemoteError::Protocol(format!(
        "{} rejected: {} {}",
        command, reply.code, reply.text
    ))
}

/// Split a reply line into code, continuation flag and text.
fn parse_reply_line(line: &str) -> Option<(u16, bool, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let code = line.get(..3)?;
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code = code.parse().ok()?;

    match line.as_bytes().get(3) {
        None => Some((code, false, "")),
        Some(b' ') => Some((code, false, &line[4..])),
        Some(b'-') => Some((code, true, &line[4..])),
        Some(_) => None,
    }
}

/// Data address from a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply.
fn parse_pasv(text: &str) -> Result<SocketAddrV4, RemoteError> {
    let malformed = || RemoteError::Protocol(format!("malformed PASV reply: {}", text));

    let start = text.find('(').ok_or_else(malformed)?;
    let end = text[start..].find(')').ok_or_else(malformed)? + start;
    let parts = text[start + 1..end]
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed())?;

    if parts.len() != 6 {
        return Err(malformed());
    }

    let ip = Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
    let port = u16::from(parts[4]) << 8 | u16::from(parts[5]);
    Ok(SocketAddrV4::new(ip, port))
}

/// UTC time from an `MDTM` reply (`YYYYMMDDHHMMSS[.sss]`).
fn parse_mdtm(text: &str) -> Result<DateTime<Utc>, RemoteError> {
    let value = text.split_whitespace().next().unwrap_or("");
    let seconds = value.split('.').next().unwrap_or("");
    let naive = NaiveDateTime::parse_from_str(seconds, "%Y%m%d%H%M%S")
        .map_err(|_| RemoteError::Protocol(format!("malformed MDTM reply: {}", text)))?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_line() {
        assert_eq!(
            parse_reply_line("220 ProFTPD Server ready.\r\n"),
            Some((220, false, "ProFTPD Server ready."))
        );
        assert_eq!(parse_reply_line("230-Welcome\r\n"), Some((230, true, "Welcome")));
        assert_eq!(parse_reply_line("226\r\n"), Some((226, false, "")));
        assert_eq!(parse_reply_line("  continuation text\r\n"), None);
        assert_eq!(parse_reply_line("22x nope"), None);
    }

    #[test]
    fn test_parse_pasv() {
        let addr = parse_pasv("Entering Passive Mode (134,178,253,145,195,80).").unwrap();
        assert_eq!(addr.ip(), &Ipv4Addr::new(134, 178, 253, 145));
        assert_eq!(addr.port(), 195 * 256 + 80);

        assert!(parse_pasv("Entering Passive Mode").is_err());
        assert!(parse_pasv("(1,2,3,4,5)").is_err());
        assert!(parse_pasv("(1,2,3,4,5,300)").is_err());
    }

    #[test]
    fn test_parse_mdtm() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 5, 30, 12).unwrap();
        assert_eq!(parse_mdtm("20240301053012").unwrap(), expected);
        assert_eq!(parse_mdtm("20240301053012.123").unwrap(), expected);
        assert!(parse_mdtm("yesterday").is_err());
        assert!(parse_mdtm("").is_err());
    }

    #[test]
    fn test_target_from_url() {
        let target = FtpTarget::parse("ftp://ftp.bom.gov.au/anon/gen/fwo/IDN60910.tgz").unwrap();
        assert_eq!(target.host, "ftp.bom.gov.au");
        assert_eq!(target.port, 21);
        assert_eq!(target.path, "/anon/gen/fwo/IDN60910.tgz");

        let target = FtpTarget::parse("ftp://127.0.0.1:2121/IDV60910.tgz").unwrap();
        assert_eq!(target.port, 2121);

        assert!(FtpTarget::parse("http://example.com/IDV60910.tgz").is_err());
    }
}
