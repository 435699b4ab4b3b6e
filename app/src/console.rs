//! Terminal front end: drives the background tasks and drains their events.

use std::collections::HashMap;
use std::path::PathBuf;

use api_client::Album;
use sync::{
    spawn_album_status, spawn_cover, spawn_download, spawn_search, AlbumFilter, AlbumStatus,
    CoverLoader, Downloader, MirrorLayout, Session, SyncEvent,
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use crate::config::AppConfig;

/// Why an interactive run stopped early. The caller prints it once.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("{message}")]
    Task { message: String, auth: bool },
    #[error("Background task stopped unexpectedly: {0}")]
    TaskLost(String),
    #[error("Failed to read selection: {0}")]
    Input(#[from] std::io::Error),
}

impl ConsoleError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ConsoleError::Task { auth: true, .. })
    }
}

/// Each phase opens its own channel and hands the only senders to the tasks
/// it spawns, so the receiver closes once they have all finished.
pub struct Console {
    session: Session,
    layout: MirrorLayout,
    covers: CoverLoader,
    filter: AlbumFilter,
    input: Lines<BufReader<Stdin>>,
}

#[derive(Debug, Default)]
struct AlbumRow {
    status: Option<AlbumStatus>,
    cover: Option<Option<PathBuf>>,
}

impl Console {
    pub fn new(session: Session, cfg: &AppConfig) -> Self {
        Console {
            session,
            layout: MirrorLayout::new(&cfg.download_root),
            covers: CoverLoader::new(&cfg.cache_path),
            filter: AlbumFilter::new(&cfg.title_keywords),
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    pub async fn run(mut self) -> Result<(), ConsoleError> {
        let albums = self.search().await?;
        if albums.is_empty() {
            return Ok(());
        }

        self.show_albums(&albums).await;

        let selected = match self.prompt_selection(albums.len()).await? {
            Some(indices) if !indices.is_empty() => {
                indices.into_iter().map(|i| albums[i].clone()).collect::<Vec<_>>()
            }
            _ => {
                println!("Please select at least one album to download.");
                return Ok(());
            }
        };

        self.download(selected).await
    }

    async fn search(&mut self) -> Result<Vec<Album>, ConsoleError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut task = spawn_search(self.session.clone(), self.filter.clone(), tx);
        loop {
            match next_event(&mut rx, &mut task).await? {
                SyncEvent::Status(msg) => println!("Status: {}", msg),
                SyncEvent::AlbumsFound(albums) => return Ok(albums),
                SyncEvent::Error { message, auth } => {
                    return Err(ConsoleError::Task { message, auth })
                }
                other => tracing::debug!(event = ?other, "Ignoring event during search"),
            }
        }
    }

    async fn show_albums(&mut self, albums: &[Album]) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut rows: HashMap<String, AlbumRow> = HashMap::new();
        for album in albums {
            rows.insert(album.id.clone(), AlbumRow::default());
            spawn_album_status(
                self.session.clone(),
                self.layout.clone(),
                album.clone(),
                tx.clone(),
            );
            spawn_cover(
                self.session.clone(),
                self.covers.clone(),
                album.clone(),
                tx.clone(),
            );
        }
        drop(tx);

        // A row whose task died keeps its placeholder.
        println!("Checking downloads...");
        while let Some(event) = rx.recv().await {
            match event {
                SyncEvent::AlbumStatus { album_id, status } => {
                    if let Some(row) = rows.get_mut(&album_id) {
                        row.status = Some(status);
                    }
                }
                SyncEvent::CoverReady { album_id, path } => {
                    if let Some(row) = rows.get_mut(&album_id) {
                        row.cover = Some(path);
                    }
                }
                other => tracing::debug!(event = ?other, "Ignoring event while listing"),
            }
        }

        for (index, album) in albums.iter().enumerate() {
            let row = rows.remove(&album.id).unwrap_or_default();
            println!("{}", format_row(index, album, &row));
        }
    }

    /// `Ok(None)` when stdin is closed.
    async fn prompt_selection(&mut self, count: usize) -> Result<Option<Vec<usize>>, ConsoleError> {
        loop {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(b"Select albums to download (e.g. 1,3-4, all, none) [all]: ")
                .await?;
            stdout.flush().await?;

            let Some(line) = self.input.next_line().await? else {
                return Ok(None);
            };
            match parse_selection(&line, count) {
                Ok(indices) => return Ok(Some(indices)),
                Err(msg) => println!("{}", msg),
            }
        }
    }

    async fn download(&mut self, albums: Vec<Album>) -> Result<(), ConsoleError> {
        let downloader = Downloader::new(self.session.clone(), self.layout.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut task = spawn_download(downloader, albums, tx);
        loop {
            let event = next_event(&mut rx, &mut task).await?;
            if let Some(line) = render_download_event(&event) {
                println!("{}", line);
            }
            match event {
                SyncEvent::DownloadComplete { .. } => return Ok(()),
                SyncEvent::Error { message, auth } => {
                    return Err(ConsoleError::Task { message, auth })
                }
                _ => {}
            }
        }
    }
}

/// Next event from a single-task phase. Once the task's sender is gone,
/// reports how the task ended.
async fn next_event(
    rx: &mut UnboundedReceiver<SyncEvent>,
    task: &mut JoinHandle<()>,
) -> Result<SyncEvent, ConsoleError> {
    if let Some(event) = rx.recv().await {
        return Ok(event);
    }
    let reason = match task.await {
        Ok(()) => "no result was reported".to_string(),
        Err(e) => e.to_string(),
    };
    Err(ConsoleError::TaskLost(reason))
}

fn format_row(index: usize, album: &Album, row: &AlbumRow) -> String {
    let status = match &row.status {
        Some(status) => status.to_string(),
        None => "Checking downloads...".to_string(),
    };
    let mut line = format!("[{}] {} | {}", index + 1, album.display_title(), status);
    if let Some(Some(path)) = &row.cover {
        line.push_str(&format!(" | cover: {}", path.display()));
    }
    line
}

fn render_download_event(event: &SyncEvent) -> Option<String> {
    match event {
        SyncEvent::Status(msg) => Some(format!("Status: {}", msg)),
        SyncEvent::AlbumStarted { title, total, .. } => {
            Some(format!("{}: {} item(s)", title, total))
        }
        SyncEvent::ItemDownloaded {
            filename,
            done,
            total,
            ..
        } => Some(format!("  [{}/{}] {}", done, total, filename)),
        SyncEvent::ItemFailed {
            filename, error, ..
        } => Some(format!("  Failed to download {}: {}", filename, error)),
        SyncEvent::AlbumFinished(report) => Some(format!(
            "{}: {} downloaded, {} failed -> {}",
            report.title,
            report.downloaded,
            report.failed,
            report.folder.display()
        )),
        _ => None,
    }
}

/// Parse a 1-based selection such as `1,3-4` into sorted 0-based indices.
/// Empty input and `all` select everything; `none` selects nothing.
fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, String> {
    let input = input.trim().to_lowercase();
    match input.as_str() {
        "" | "all" => return Ok((0..count).collect()),
        "none" => return Ok(Vec::new()),
        _ => {}
    }

    let mut picked = vec![false; count];
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse_index(a, count)?, parse_index(b, count)?),
            None => {
                let i = parse_index(part, count)?;
                (i, i)
            }
        };
        if start > end {
            return Err(format!("Invalid range: {}", part));
        }
        for flag in &mut picked[start..=end] {
            *flag = true;
        }
    }
    Ok(picked
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| p.then_some(i))
        .collect())
}

fn parse_index(raw: &str, count: usize) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
        _ => Err(format!("Expected a number between 1 and {}, got {:?}", count, raw.trim())),
    }
}
