//! Client for the audio stream's line-oriented control socket and its public
//! Icecast status page.

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

use crate::config::DiagnosticsSettings;

const END_MARKER: &str = "END";
const BYE_MARKER: &str = "Bye!";
const UNKNOWN_COMMAND_PREFIX: &str = "ERROR: unknown command";
const NO_SOURCE_CLIENT: &str = "no source client connected";
pub const UNKNOWN_SONG: &str = "Artiste inconnu - Titre inconnu";
pub const NOT_AVAILABLE: &str = "N/A";

/// What currently feeds the harbor (live) input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarborSource {
    /// Nobody is streaming live; the playlist is on air.
    Idle,
    /// A live client is connected.
    Live(String),
    /// The harbor input does not exist on this setup, the stream relays another one.
    Relay,
}

impl HarborSource {
    pub fn from_reply(lines: &[String]) -> Self {
        match lines.last().map(|line| line.trim()) {
            None => HarborSource::Idle,
            Some(line) if line.starts_with(UNKNOWN_COMMAND_PREFIX) => HarborSource::Relay,
            Some(line) if line == NO_SOURCE_CLIENT => HarborSource::Idle,
            Some(line) => HarborSource::Live(line.to_string()),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, HarborSource::Live(_))
    }

    pub fn describe(&self) -> String {
        match self {
            HarborSource::Idle => "Playlist".to_string(),
            HarborSource::Live(source) => source.clone(),
            HarborSource::Relay => "RELAY".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DiagnosticsClient {
    settings: DiagnosticsSettings,
}

impl DiagnosticsClient {
    pub fn new(settings: DiagnosticsSettings) -> Self {
        Self { settings }
    }

    /// Sends one command and collects the reply lines, sentinels and blanks removed.
    pub async fn query(&self, command: &str) -> Result<Vec<String>> {
        let address = format!("{}:{}", self.settings.host, self.settings.port);
        let exchange = async {
            let stream = TcpStream::connect(&address)
                .await
                .with_context(|| format!("failed to connect to diagnostics socket {address}"))?;
            let (reader, mut writer) = stream.into_split();
            writer
                .write_all(format!("{command}\r\nquit\r\n").as_bytes())
                .await
                .context("failed to send diagnostics command")?;
            read_reply(BufReader::new(reader)).await
        };

        let lines = timeout(self.settings.timeout, exchange)
            .await
            .map_err(|_| anyhow!("diagnostics command {command:?} timed out"))??;
        debug!(command, lines = lines.len(), "diagnostics reply");
        Ok(lines)
    }

    pub async fn uptime(&self) -> Result<String> {
        let lines = self.query("uptime").await?;
        lines
            .last()
            .cloned()
            .ok_or_else(|| anyhow!("empty uptime reply"))
    }

    pub async fn harbor_source(&self) -> Result<HarborSource> {
        let command = format!("{}.status", self.settings.harbor_source);
        let lines = self.query(&command).await?;
        Ok(HarborSource::from_reply(&lines))
    }

    pub async fn current_song(&self) -> Result<String> {
        let live = self.harbor_source().await?.is_live();
        let lines = self.query("output(dot)shoutcast.metadata").await?;
        Ok(song_from_metadata(&lines, live).unwrap_or_else(|| UNKNOWN_SONG.to_string()))
    }

    pub async fn next_tracks(&self) -> Result<Vec<String>> {
        let lines = self.query("playlist(dot)m3u.next").await?;
        Ok(lines.into_iter().skip(1).collect())
    }

    pub async fn on_air_request(&self) -> Result<Option<String>> {
        let lines = self.query("request.on_air").await?;
        Ok(lines.last().map(|line| line.trim().to_string()))
    }

    pub async fn request_metadata(&self, rid: &str) -> Result<Vec<String>> {
        if rid.is_empty() || !rid.chars().all(|c| c.is_ascii_digit()) {
            return Err(anyhow!("invalid request id {rid:?}"));
        }
        self.query(&format!("request.metadata {rid}")).await
    }

    pub async fn remaining_seconds(&self) -> Result<f64> {
        let lines = self.query("radio(dot)mp3.remaining").await?;
        let first = lines
            .first()
            .ok_or_else(|| anyhow!("empty remaining-time reply"))?;
        first
            .trim()
            .parse::<f64>()
            .with_context(|| format!("unexpected remaining-time reply {first:?}"))
    }
}

pub async fn read_reply<R>(mut reader: R) -> Result<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    let mut buffer = String::new();
    loop {
        buffer.clear();
        let read = reader
            .read_line(&mut buffer)
            .await
            .context("failed to read diagnostics reply")?;
        if read == 0 {
            break;
        }
        let line = buffer.trim_end_matches(['\r', '\n']);
        if line == END_MARKER || line == BYE_MARKER {
            break;
        }
        if !line.trim().is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

/// Picks `title=` (playlist) or `song=` (live source) from a metadata dump.
pub fn song_from_metadata(lines: &[String], live: bool) -> Option<String> {
    let key = if live { "song=" } else { "title=" };
    lines
        .iter()
        .rev()
        .find_map(|line| line.strip_prefix(key))
        .map(|value| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// `125` seconds → `2mns 5 secs`; singular forms for 0 and 1.
pub fn format_remaining(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let minutes = total / 60;
    let secs = total % 60;

    let mut text = format!("{minutes}mn");
    if minutes > 1 {
        text.push('s');
    }
    text.push_str(&format!(" {secs} sec"));
    if secs > 1 {
        text.push('s');
    }
    text
}

pub async fn fetch_stream_title(client: &reqwest::Client, url: &str) -> Result<Option<String>> {
    let status: Value = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed to reach stream status at {url}"))?
        .error_for_status()
        .context("stream status answered with an error")?
        .json()
        .await
        .context("stream status is not valid JSON")?;
    Ok(stream_title(&status))
}

/// `icestats.source` is an object for a single mount and an array otherwise.
pub fn stream_title(status: &Value) -> Option<String> {
    let source = status.get("icestats")?.get("source")?;
    let title = match source {
        Value::Array(mounts) => mounts
            .iter()
            .find_map(|mount| mount.get("title").and_then(Value::as_str)),
        other => other.get("title").and_then(Value::as_str),
    }?;
    Some(title.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    #[tokio::test]
    async fn reply_stops_at_end_marker() {
        let raw = b"first line\r\n\r\nsecond\r\nEND\r\nBye!\r\n" as &[u8];
        let lines = read_reply(BufReader::new(raw)).await.unwrap();
        assert_eq!(lines, vec!["first line".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn reply_accepts_connection_close() {
        let raw = b"0d 02h 13m 55s" as &[u8];
        let lines = read_reply(BufReader::new(raw)).await.unwrap();
        assert_eq!(lines, vec!["0d 02h 13m 55s".to_string()]);
    }

    #[tokio::test]
    async fn query_round_trips_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = vec![0_u8; 64];
            let n = socket.read(&mut received).await.unwrap();
            socket
                .write_all(b"187.5\r\nEND\r\nBye!\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&received[..n]).into_owned()
        });

        let client = DiagnosticsClient::new(DiagnosticsSettings {
            host: "127.0.0.1".to_string(),
            port,
            timeout: Duration::from_secs(5),
            harbor_source: "src_4195".to_string(),
        });
        let remaining = client.remaining_seconds().await.unwrap();
        assert_eq!(remaining, 187.5);
        let sent = server.await.unwrap();
        assert!(sent.starts_with("radio(dot)mp3.remaining\r\n"));
    }

    #[tokio::test]
    async fn unreachable_socket_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let client = DiagnosticsClient::new(DiagnosticsSettings {
            host: "127.0.0.1".to_string(),
            port,
            timeout: Duration::from_secs(2),
            harbor_source: "src_4195".to_string(),
        });
        assert!(client.uptime().await.is_err());
    }

    #[test]
    fn harbor_status_is_classified() {
        let idle = vec!["no source client connected".to_string()];
        assert_eq!(HarborSource::from_reply(&idle), HarborSource::Idle);
        let relay = vec![r#"ERROR: unknown command, type "help" to get a list of commands."#.to_string()];
        assert_eq!(HarborSource::from_reply(&relay), HarborSource::Relay);
        let live = vec!["connected DJ teuk".to_string()];
        assert!(HarborSource::from_reply(&live).is_live());
    }

    #[test]
    fn song_prefers_key_matching_source() {
        let lines: Vec<String> = [
            "--- 1 ---",
            r#"artist="Daft Punk""#,
            r#"title="Daft Punk - Veridis Quo""#,
            r#"song="Live - DJ set""#,
        ]
        .map(str::to_string)
        .to_vec();
        assert_eq!(
            song_from_metadata(&lines, false).as_deref(),
            Some("Daft Punk - Veridis Quo")
        );
        assert_eq!(song_from_metadata(&lines, true).as_deref(), Some("Live - DJ set"));
        assert_eq!(song_from_metadata(&[], false), None);
    }

    #[test]
    fn remaining_time_is_humanized() {
        assert_eq!(format_remaining(125.0), "2mns 5 secs");
        assert_eq!(format_remaining(61.9), "1mn 1 sec");
        assert_eq!(format_remaining(0.0), "0mn 0 sec");
        assert_eq!(format_remaining(f64::NAN), "0mn 0 sec");
        assert_eq!(format_remaining(59.0), "0mn 59 secs");
    }

    #[test]
    fn stream_title_handles_single_and_multiple_mounts() {
        let single = json!({ "icestats": { "source": { "title": "Song A" } } });
        assert_eq!(stream_title(&single).as_deref(), Some("Song A"));
        let many = json!({ "icestats": { "source": [{ "listeners": 2 }, { "title": "Song B" }] } });
        assert_eq!(stream_title(&many).as_deref(), Some("Song B"));
        assert_eq!(stream_title(&json!({ "icestats": {} })), None);
    }
}
