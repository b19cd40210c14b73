//! FtpSource against a scripted in-process FTP server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use freshness_cache::RemoteError;
use source_client::{FtpSource, RemoteClient};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

struct FakeFile {
    mdtm: &'static str,
    contents: Vec<u8>,
}

struct FakeFtpServer {
    addr: SocketAddr,
    sessions: Arc<AtomicUsize>,
}

impl FakeFtpServer {
    async fn start(greeting: &'static str, files: HashMap<&'static str, FakeFile>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let files = Arc::new(files);
        let sessions = Arc::new(AtomicUsize::new(0));

        let counter = sessions.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let files = files.clone();
                tokio::spawn(async move {
                    let _ = serve_session(stream, greeting, &files).await;
                });
            }
        });

        Self { addr, sessions }
    }

    fn url(&self, path: &str) -> String {
        format!("ftp://{}{}", self.addr, path)
    }

    fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

async fn serve_session(
    stream: TcpStream,
    greeting: &str,
    files: &HashMap<&'static str, FakeFile>,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    let mut passive: Option<TcpListener> = None;

    write.write_all(greeting.as_bytes()).await?;

    while let Some(line) = lines.next_line().await? {
        let (command, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        match command {
            "USER" => write.write_all(b"331 Anonymous login ok, send password\r\n").await?,
            "PASS" => {
                write
                    .write_all(b"230-Welcome to the archive\r\n230-Be nice\r\n230 Login ok\r\n")
                    .await?
            }
            "TYPE" => write.write_all(b"200 Type set to I\r\n").await?,
            "MDTM" => match files.get(arg) {
                Some(file) => {
                    write
                        .write_all(format!("213 {}\r\n", file.mdtm).as_bytes())
                        .await?
                }
                None => write.write_all(b"550 No such file\r\n").await?,
            },
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                passive = Some(listener);
                let reply = format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{}).\r\n",
                    port >> 8,
                    port & 0xff
                );
                write.write_all(reply.as_bytes()).await?;
            }
            "RETR" => match (files.get(arg), passive.take()) {
                (Some(file), Some(listener)) => {
                    write.write_all(b"150 Opening BINARY mode data connection\r\n").await?;
                    let (mut data, _) = listener.accept().await?;
                    data.write_all(&file.contents).await?;
                    data.shutdown().await?;
                    drop(data);
                    write.write_all(b"226 Transfer complete\r\n").await?;
                }
                _ => write.write_all(b"550 No such file\r\n").await?,
            },
            "QUIT" => {
                write.write_all(b"221 Goodbye\r\n").await?;
                return Ok(());
            }
            _ => write.write_all(b"502 Command not implemented\r\n").await?,
        }
    }
    Ok(())
}

fn bom_files() -> HashMap<&'static str, FakeFile> {
    let mut files = HashMap::new();
    files.insert(
        "/anon/gen/fwo/IDN60910.tgz",
        FakeFile {
            mdtm: "20240301053012",
            contents: (0..=255u8).cycle().take(70_000).collect(),
        },
    );
    files
}

fn client() -> FtpSource {
    FtpSource::new(Duration::from_secs(2))
}

#[tokio::test]
async fn test_mdtm_reports_utc_time() {
    let server = FakeFtpServer::start("220 Fake FTP ready\r\n", bom_files()).await;

    let modified = client()
        .modified_at(&server.url("/anon/gen/fwo/IDN60910.tgz"))
        .await
        .unwrap();

    assert_eq!(modified, Utc.with_ymd_and_hms(2024, 3, 1, 5, 30, 12).unwrap());
}

#[tokio::test]
async fn test_multiline_greeting_is_consumed() {
    let greeting = "220-Bureau of Meteorology\r\n220-Anonymous access only\r\n220 Ready\r\n";
    let server = FakeFtpServer::start(greeting, bom_files()).await;

    let modified = client()
        .modified_at(&server.url("/anon/gen/fwo/IDN60910.tgz"))
        .await;
    tokio_test::assert_ok!(modified);
}

#[tokio::test]
async fn test_retr_downloads_whole_file() {
    let server = FakeFtpServer::start("220 Fake FTP ready\r\n", bom_files()).await;

    let bytes = client()
        .fetch(&server.url("/anon/gen/fwo/IDN60910.tgz"))
        .await
        .unwrap();

    assert_eq!(bytes.len(), 70_000);
    assert_eq!(bytes[256], 0);
    assert_eq!(bytes[300], 44);
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let server = FakeFtpServer::start("220 Fake FTP ready\r\n", bom_files()).await;
    let url = server.url("/anon/gen/fwo/IDX99999.tgz");

    let err = client().modified_at(&url).await.unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(ref u) if *u == url));

    let err = client().fetch(&url).await.unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(_)));
}

#[tokio::test]
async fn test_each_call_opens_a_session() {
    let server = FakeFtpServer::start("220 Fake FTP ready\r\n", bom_files()).await;
    let url = server.url("/anon/gen/fwo/IDN60910.tgz");
    let ftp = client();

    ftp.modified_at(&url).await.unwrap();
    ftp.fetch(&url).await.unwrap();

    assert_eq!(server.sessions(), 2);
}

#[tokio::test]
async fn test_bad_greeting_is_protocol_error() {
    let server = FakeFtpServer::start("421 Too many users\r\n", bom_files()).await;

    let err = client()
        .modified_at(&server.url("/anon/gen/fwo/IDN60910.tgz"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Protocol(_)));
}

#[tokio::test]
async fn test_refused_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client()
        .modified_at(&format!("ftp://{}/IDN60910.tgz", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Connect(_)));
}

#[tokio::test]
async fn test_remote_client_dispatches_to_ftp() {
    use freshness_cache::RemoteSource;

    let server = FakeFtpServer::start("220 Fake FTP ready\r\n", bom_files()).await;
    let remote = RemoteClient::for_base_url(&server.url("/anon/gen/fwo/"), Duration::from_secs(2)).unwrap();

    let bytes = remote
        .fetch(&server.url("/anon/gen/fwo/IDN60910.tgz"))
        .await
        .unwrap();
    assert_eq!(bytes.len(), 70_000);
}
