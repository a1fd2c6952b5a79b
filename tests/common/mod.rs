//! Common test utilities - PartyTest harness for end-to-end testing

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use partyd::{Config, Server};
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// A random free port on localhost
fn free_addr() -> Result<SocketAddr> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Poll `/health` until the server answers
async fn wait_ready(client: &Client, addr: SocketAddr, attempts: usize) -> bool {
    for _ in 0..attempts {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
    }
    false
}

/// Test harness that spawns a real partyd server on a random port
pub struct PartyTest {
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl PartyTest {
    /// Start a server with an in-memory database and OS dice
    pub async fn start() -> Result<Self> {
        Self::start_with(None, None).await
    }

    /// Start a server with optional dice seed and database file
    pub async fn start_with(dice_seed: Option<u64>, db_path: Option<&Path>) -> Result<Self> {
        let addr = free_addr()?;
        let config = Config {
            bind_addr: addr,
            db_path: db_path.map(|p| p.to_string_lossy().into_owned()),
            dice_seed,
            ..Config::default()
        };

        let server = Arc::new(Server::new(config).await?);
        let server_clone = server.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
        if !wait_ready(&client, addr, 20).await {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .put(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Get direct access to the database for test setup/assertions
    pub fn db(&self) -> Arc<partyd::db::Database> {
        self.server.db()
    }

    /// Shutdown the server gracefully
    pub fn shutdown(&self) {
        self.server.shutdown();
    }

    /// WebSocket URL for a chat room
    pub fn ws_url(&self, room: &str) -> String {
        format!("ws://{}/party/{}/ws", self.addr, room)
    }

    /// Join a chat room and return a test client
    pub async fn join_room(&self, room: &str) -> Result<WsClient> {
        let (ws_stream, _) = connect_async(&self.ws_url(room)).await?;
        let (write, read) = ws_stream.split();
        Ok(WsClient { write, read })
    }
}

impl Drop for PartyTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}

/// WebSocket client for testing
pub struct WsClient {
    write: futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        Message,
    >,
    read: futures_util::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    >,
}

impl WsClient {
    /// Send a chat line
    pub async fn say(&mut self, text: &str) -> Result<()> {
        let msg = serde_json::json!({
            "type": "say",
            "text": text
        });
        self.write
            .send(Message::Text(msg.to_string().into()))
            .await?;
        Ok(())
    }

    /// Send a ping message
    pub async fn send_ping(&mut self) -> Result<()> {
        let msg = serde_json::json!({
            "type": "ping"
        });
        self.write
            .send(Message::Text(msg.to_string().into()))
            .await?;
        Ok(())
    }

    /// Receive the next message as JSON
    pub async fn recv_json(&mut self) -> Result<serde_json::Value> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(serde_json::from_str(&text)?);
                }
                Some(Ok(Message::Close(_))) | None => {
                    anyhow::bail!("WebSocket closed");
                }
                _ => continue, // Skip binary/ping/pong frames
            }
        }
    }

    /// Receive with timeout
    pub async fn recv_json_timeout(&mut self, timeout: Duration) -> Result<serde_json::Value> {
        match tokio::time::timeout(timeout, self.recv_json()).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!("Timeout waiting for WebSocket message"),
        }
    }

    /// Next broadcast text, failing on any other frame
    pub async fn recv_broadcast(&mut self) -> Result<String> {
        let msg = self.recv_json_timeout(Duration::from_secs(2)).await?;
        if msg["type"] != "broadcast" {
            anyhow::bail!("expected broadcast, got {}", msg);
        }
        Ok(msg["text"].as_str().unwrap_or_default().to_string())
    }

    /// Close the connection
    pub async fn close(&mut self) -> Result<()> {
        self.write.close().await?;
        Ok(())
    }
}

/// Spawns the actual partyd binary with an on-disk database
pub struct BinaryServer {
    pub addr: SocketAddr,
    pub client: Client,
    child: Child,
    pub db_path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl BinaryServer {
    pub async fn start(extra_args: &[&str]) -> Result<Self> {
        let temp_dir = tempfile::TempDir::new()?;
        let db_path = temp_dir.path().join("party.db");
        let addr = free_addr()?;

        let child = Command::new(env!("CARGO_BIN_EXE_partyd"))
            .arg("--bind")
            .arg(addr.to_string())
            .arg("--database")
            .arg(db_path.to_string_lossy().as_ref())
            .args(extra_args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
        let mut server = Self {
            addr,
            client,
            child,
            db_path,
            _temp_dir: temp_dir,
        };

        // Up to 5 seconds under load
        if !wait_ready(&server.client, addr, 50).await {
            let _ = server.child.kill();
            anyhow::bail!("partyd binary failed to start");
        }
        if let Some(status) = server.child.try_wait()? {
            anyhow::bail!("partyd exited early: {}", status);
        }

        Ok(server)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for BinaryServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
