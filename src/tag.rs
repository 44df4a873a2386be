//! Metadata tag writing.
//!
//! The pipeline treats "write title/artist/album/cover into file" as an
//! opaque operation behind the [`TagWriter`] trait; the container format
//! details belong to `lofty`.
//!
//! Cover art needs a secondary network fetch. Its failure is this
//! module's policy call, not the pipeline's: textual tags are still
//! written when the cover cannot be fetched.

use std::path::Path;

use async_trait::async_trait;
use lofty::{
    config::WriteOptions,
    file::TaggedFileExt,
    picture::{MimeType, Picture, PictureType},
    prelude::*,
    tag::Tag,
};

use crate::{
    error::{Error, Result},
    protocol::TrackMetadata,
};

/// Embeds descriptive metadata into a local audio file.
#[async_trait]
pub trait TagWriter: Send + Sync {
    /// Writes title, artist, album and (best-effort) cover art.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or the tags cannot
    /// be written back. A failed cover fetch alone is not an error.
    async fn write_tags(&self, path: &Path, metadata: &TrackMetadata) -> Result<()>;
}

/// Default writer backed by `lofty`, fetching cover art over HTTP.
pub struct LoftyTagWriter {
    http_client: reqwest::Client,
}

impl LoftyTagWriter {
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Downloads the cover image, returning `None` on any failure.
    async fn fetch_cover(&self, url: &str) -> Option<Vec<u8>> {
        let response = match self.http_client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("cover art download failed for {url}: {e}");
                return None;
            }
        };

        match response.error_for_status() {
            Ok(response) => match response.bytes().await {
                Ok(bytes) => Some(bytes.to_vec()),
                Err(e) => {
                    warn!("cover art body read failed for {url}: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("cover art download failed for {url}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl TagWriter for LoftyTagWriter {
    async fn write_tags(&self, path: &Path, metadata: &TrackMetadata) -> Result<()> {
        let cover = match &metadata.cover_url {
            Some(url) => self.fetch_cover(url).await,
            None => None,
        };

        let mut file = lofty::read_from_path(path)
            .map_err(|e| Error::data_loss(format!("{}: {e}", path.display())))?;

        if file.primary_tag().is_none() {
            let tag_type = file.primary_tag_type();
            file.insert_tag(Tag::new(tag_type));
        }
        let tag = file.primary_tag_mut().expect("primary tag exists");

        tag.set_title(metadata.title.clone());
        tag.set_artist(metadata.artist.clone());
        tag.set_album(metadata.album.clone());

        if let Some(data) = cover {
            tag.push_picture(Picture::new_unchecked(
                PictureType::CoverFront,
                Some(MimeType::Jpeg),
                None,
                data,
            ));
        }

        file.save_to_path(path, WriteOptions::default())
            .map_err(|e| Error::data_loss(format!("{}: {e}", path.display())))?;

        debug!("tagged {} as {metadata}", path.display());
        Ok(())
    }
}
