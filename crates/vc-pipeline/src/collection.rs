//! An ordered set of produced videos with on-demand metrics.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use vc_av::{ProbeFacade, VideoMetrics};
use vc_core::Result;

/// One produced file, probed through the shared [`ProbeFacade`].
#[derive(Debug, Clone)]
pub struct Video {
    path: PathBuf,
    probe: ProbeFacade,
}

impl Video {
    pub fn new(path: impl Into<PathBuf>, probe: ProbeFacade) -> Self {
        Self {
            path: path.into(),
            probe,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn metrics(&self) -> Result<VideoMetrics> {
        self.probe.metrics(&self.path).await
    }

    pub async fn duration_us(&self) -> Result<u64> {
        self.probe.duration_us(&self.path).await
    }
}

/// Produced videos in production order (slice order for slicing).
#[derive(Debug, Clone)]
pub struct VideoCollection {
    probe: ProbeFacade,
    videos: Vec<Video>,
}

impl VideoCollection {
    pub fn new(probe: ProbeFacade) -> Self {
        Self {
            probe,
            videos: Vec::new(),
        }
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.videos.push(Video::new(path, self.probe.clone()));
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Video> {
        self.videos.iter()
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.videos.iter().map(Video::path).collect()
    }

    /// Sum of member durations, probed concurrently.
    pub async fn total_duration_us(&self) -> Result<u64> {
        let durations = try_join_all(self.videos.iter().map(|v| v.duration_us())).await?;
        Ok(durations.into_iter().sum())
    }
}

impl<'a> IntoIterator for &'a VideoCollection {
    type Item = &'a Video;
    type IntoIter = std::slice::Iter<'a, Video>;

    fn into_iter(self) -> Self::IntoIter {
        self.videos.iter()
    }
}
