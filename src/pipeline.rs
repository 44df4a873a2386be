//! The fetch-and-tag orchestrator.
//!
//! Sequences classify → resolve → match → fetch → tag for one track and
//! fans playlist submissions out into independent track-level tasks.
//! Every task advances its [`TaskRecord`] through the state machine and
//! ends in `Completed` or `Failed`; failures are recorded per task and
//! never propagate, so sibling tasks proceed unaffected.

use std::{path::PathBuf, sync::Arc};

use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::Config,
    error,
    fetch::{sanitize_filename, AssetFetcher, YtDlpFetcher},
    locator::Locator,
    matcher,
    protocol::{youtube::SearchCandidate, TrackMetadata},
    spotify::{MetadataResolver, Spotify},
    tag::{LoftyTagWriter, TagWriter},
    tracker::{TaskState, TaskStore},
    youtube::{CandidateSource, Youtube},
};

/// Per-task failure taxonomy.
///
/// Rendered into [`TaskRecord::error`] as a human-readable cause; never
/// propagated as a process-level fault.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("unsupported URL")]
    UnsupportedUrl,

    #[error("playlist URL submitted as a single track")]
    NotATrack,

    #[error("metadata retrieval failed: {0}")]
    Retrieval(#[source] error::Error),

    #[error("no matching audio found")]
    NoMatch,

    #[error("download failed")]
    Fetch,

    #[error("tagging failed: {0}")]
    TagWrite(#[source] error::Error),
}

/// Outcome of a playlist submission: the advisory parent record plus
/// one independent child task per contained track.
#[derive(Clone, Debug)]
pub struct PlaylistSubmission {
    pub parent: Uuid,
    pub children: Vec<Uuid>,
}

/// Owns the collaborators and drives track-level tasks to a terminal
/// state. Cheap to share; one instance serves all submissions.
pub struct Pipeline {
    resolver: Arc<dyn MetadataResolver>,
    candidates: Arc<dyn CandidateSource>,
    fetcher: Arc<dyn AssetFetcher>,
    tagger: Arc<dyn TagWriter>,
    store: TaskStore,
    download_dir: PathBuf,
}

impl Pipeline {
    /// Creates a pipeline with the production collaborators.
    ///
    /// # Errors
    ///
    /// Will return `Err` if either platform client cannot be built.
    pub fn new(config: &Config, store: TaskStore) -> error::Result<Arc<Self>> {
        let tag_http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Arc::new(Self {
            resolver: Arc::new(Spotify::new(config)?),
            candidates: Arc::new(Youtube::new(config)?),
            fetcher: Arc::new(YtDlpFetcher::default()),
            tagger: Arc::new(LoftyTagWriter::new(tag_http)),
            store,
            download_dir: config.download_dir.clone(),
        }))
    }

    /// Creates a pipeline from explicit collaborators.
    #[must_use]
    pub fn with_parts(
        resolver: Arc<dyn MetadataResolver>,
        candidates: Arc<dyn CandidateSource>,
        fetcher: Arc<dyn AssetFetcher>,
        tagger: Arc<dyn TagWriter>,
        store: TaskStore,
        download_dir: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            resolver,
            candidates,
            fetcher,
            tagger,
            store,
            download_dir,
        })
    }

    /// The injected record store, for callers that poll task status.
    #[must_use]
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Submits one track-level unit of work.
    ///
    /// Creates a `Pending` record and spawns the task; progress is
    /// observed by polling the store. Once started, the task runs to a
    /// terminal state.
    pub fn submit(self: &Arc<Self>, url: &str) -> Uuid {
        let id = self.store.create();
        let pipeline = Arc::clone(self);
        let url = url.to_owned();

        tokio::spawn(async move {
            if let Err(e) = pipeline.run_track(id, &url).await {
                info!("task {id} failed: {e}");
                pipeline.store.fail(id, e);
            } else {
                pipeline.store.advance(id, TaskState::Completed);
            }
        });

        id
    }

    /// Submits a playlist: resolves the full track list once, then
    /// fires and forgets one independent track task per entry.
    ///
    /// The parent record is advisory only; it lists the child IDs and
    /// completes as soon as the children are spawned. Child failures do
    /// not affect the parent or each other.
    pub async fn submit_playlist(
        self: &Arc<Self>,
        url: &str,
    ) -> Result<PlaylistSubmission, TaskError> {
        let parent = self.store.create();
        self.store.advance(parent, TaskState::Resolving);

        let result = match Locator::classify(url) {
            Locator::SpotifyPlaylist(id) => self.expand_spotify_playlist(&id).await,
            Locator::YoutubePlaylist(id) => self.expand_youtube_playlist(&id).await,
            Locator::SpotifyTrack(_) | Locator::YoutubeVideo(_) => Err(TaskError::UnsupportedUrl),
            Locator::Unknown => Err(TaskError::UnsupportedUrl),
        };

        match result {
            Ok(children) => {
                info!("playlist expanded to {} track tasks", children.len());
                self.store.update(parent, |record| {
                    record.children.clone_from(&children);
                });
                self.store.advance(parent, TaskState::Completed);
                Ok(PlaylistSubmission { parent, children })
            }
            Err(e) => {
                self.store.fail(parent, &e);
                Err(e)
            }
        }
    }

    async fn expand_spotify_playlist(self: &Arc<Self>, id: &str) -> Result<Vec<Uuid>, TaskError> {
        let tracks = self
            .resolver
            .playlist_tracks(id)
            .await
            .map_err(TaskError::Retrieval)?;

        Ok(tracks
            .iter()
            .map(|track| {
                // Construct a direct track locator; the child task then
                // follows the ordinary single-track path.
                let url = format!("https://open.spotify.com/track/{}", track.source_id);
                let child = self.submit(&url);
                self.set_display(child, track);
                child
            })
            .collect())
    }

    async fn expand_youtube_playlist(self: &Arc<Self>, id: &str) -> Result<Vec<Uuid>, TaskError> {
        let videos = self
            .candidates
            .playlist_videos(id)
            .await
            .map_err(TaskError::Retrieval)?;

        Ok(videos
            .iter()
            .map(|video| {
                let child = self.submit(&video.url);
                self.store.update(child, |record| {
                    record.track.clone_from(&video.title);
                });
                child
            })
            .collect())
    }

    /// Runs one track task through the state machine. The caller maps
    /// the result onto the record's terminal state.
    async fn run_track(self: &Arc<Self>, id: Uuid, url: &str) -> Result<(), TaskError> {
        self.store.advance(id, TaskState::Resolving);

        let (metadata, chosen) = match Locator::classify(url) {
            Locator::SpotifyTrack(track_id) => {
                let metadata = self
                    .resolver
                    .track(&track_id)
                    .await
                    .map_err(TaskError::Retrieval)?;
                self.set_display(id, &metadata);

                self.store.advance(id, TaskState::Searching);
                let chosen = self.search_candidate(&metadata).await?;
                (metadata, chosen)
            }
            Locator::YoutubeVideo(video_id) => {
                // Direct asset link: metadata comes from the video
                // itself and the search step is skipped.
                let metadata = self
                    .candidates
                    .video_metadata(&video_id)
                    .await
                    .map_err(TaskError::Retrieval)?;
                self.set_display(id, &metadata);

                let chosen = SearchCandidate::from_video_id(
                    &video_id,
                    &metadata.title,
                    metadata.duration_ms / 1000,
                );
                (metadata, chosen)
            }
            Locator::SpotifyPlaylist(_) | Locator::YoutubePlaylist(_) => {
                return Err(TaskError::NotATrack);
            }
            Locator::Unknown => return Err(TaskError::UnsupportedUrl),
        };

        self.store.advance(id, TaskState::Fetching);
        let base_name = sanitize_filename(&format!("{} - {}", metadata.artist, metadata.title));
        let path = self
            .fetcher
            .fetch(&chosen.url, &self.download_dir, &base_name)
            .await
            .ok_or(TaskError::Fetch)?;

        // Record the file before tagging: a tag failure must not lose
        // track of the audio already on disk.
        self.store.update(id, |record| {
            record.file_path = Some(path.clone());
        });

        self.store.advance(id, TaskState::Tagging);
        self.tagger
            .write_tags(&path, &metadata)
            .await
            .map_err(TaskError::TagWrite)?;

        Ok(())
    }

    /// Invokes the matcher; a failed search call degrades to "no match"
    /// so the task fails with a cause the user can act on.
    async fn search_candidate(&self, metadata: &TrackMetadata) -> Result<SearchCandidate, TaskError> {
        match matcher::best_match(self.candidates.as_ref(), metadata).await {
            Ok(Some(candidate)) => Ok(candidate),
            Ok(None) => Err(TaskError::NoMatch),
            Err(e) => {
                warn!("search failed for {metadata}: {e}");
                Err(TaskError::NoMatch)
            }
        }
    }

    fn set_display(&self, id: Uuid, metadata: &TrackMetadata) {
        self.store.update(id, |record| {
            record.track.clone_from(&metadata.title);
            record.artist.clone_from(&metadata.artist);
        });
    }
}
