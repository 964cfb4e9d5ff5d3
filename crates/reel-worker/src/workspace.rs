//! Job-owned artifacts on disk.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use reel_media::{move_file, remove_path, MediaResult};
use reel_models::PipelineJob;

/// Every file and directory a job creates.
///
/// On failure [`JobWorkspace::discard`] removes all of them; on success only
/// the final artifact remains.
#[derive(Debug)]
pub struct JobWorkspace {
    work_dir: PathBuf,
    output_dir: PathBuf,
    final_path: PathBuf,
    created_output_dir: bool,
    final_preexisted: bool,
    committed: bool,
}

impl JobWorkspace {
    /// Create `output_dir` (if missing) and a private work directory inside it.
    pub async fn create(job: &PipelineJob) -> std::io::Result<Self> {
        let output_dir = std::path::absolute(&job.output_dir)?;
        let created_output_dir = !tokio::fs::try_exists(&output_dir).await?;
        tokio::fs::create_dir_all(&output_dir).await?;

        let work_dir = output_dir.join(format!(".work-{}", job.id));
        let final_path = output_dir.join(&job.final_output);
        let final_preexisted = tokio::fs::try_exists(&final_path).await?;
        let workspace = Self {
            final_path,
            work_dir,
            output_dir,
            created_output_dir,
            final_preexisted,
            committed: false,
        };

        if let Err(e) = tokio::fs::create_dir_all(workspace.clips_dir()).await {
            workspace.discard().await;
            return Err(e);
        }

        debug!("Created job work directory {}", workspace.work_dir.display());
        Ok(workspace)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Directory for normalized clips.
    pub fn clips_dir(&self) -> PathBuf {
        self.work_dir.join("clips")
    }

    /// Path of a named intermediate inside the work directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    /// Where the final artifact ends up.
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Move the finished artifact into the output directory.
    pub async fn commit(&mut self, artifact: &Path) -> MediaResult<PathBuf> {
        move_file(artifact, &self.final_path).await?;
        self.committed = true;
        Ok(self.final_path.clone())
    }

    /// Remove intermediates after success, unless asked to keep them.
    pub async fn finish(self, keep_intermediates: bool) {
        if keep_intermediates {
            debug!("Keeping intermediates in {}", self.work_dir.display());
            return;
        }
        if let Err(e) = remove_path(&self.work_dir).await {
            warn!("Failed to remove work directory {}: {}", self.work_dir.display(), e);
        }
    }

    /// Remove everything the job created.
    ///
    /// A path that existed at `final_path` before the job started is never
    /// touched, even after a commit replaced it.
    pub async fn discard(&self) {
        let mut targets = vec![self.work_dir.clone()];
        if self.committed && !self.final_preexisted {
            targets.push(self.final_path.clone());
        }
        if self.created_output_dir {
            targets.push(self.output_dir.clone());
        }

        for target in targets {
            if let Err(e) = remove_path(&target).await {
                warn!("Failed to remove job artifact {}: {}", target.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn job_in(dir: &Path) -> PipelineJob {
        PipelineJob::new("script", "narration", dir, "final_video.mp4")
    }

    #[tokio::test]
    async fn test_discard_removes_created_output_dir() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        let workspace = JobWorkspace::create(&job_in(&out)).await.unwrap();

        assert!(workspace.clips_dir().is_dir());
        workspace.discard().await;
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_discard_keeps_preexisting_output_dir() {
        let root = TempDir::new().unwrap();
        let keep = root.path().join("existing.txt");
        tokio::fs::write(&keep, b"user data").await.unwrap();

        let workspace = JobWorkspace::create(&job_in(root.path())).await.unwrap();
        tokio::fs::write(workspace.path("partial.mp4"), b"x").await.unwrap();
        workspace.discard().await;

        assert!(root.path().is_dir());
        assert!(keep.exists());
        assert!(!workspace.work_dir().exists());
    }

    #[tokio::test]
    async fn test_commit_then_finish() {
        let root = TempDir::new().unwrap();
        let mut workspace = JobWorkspace::create(&job_in(root.path())).await.unwrap();
        let artifact = workspace.path("final.mp4");
        tokio::fs::write(&artifact, b"video").await.unwrap();

        let final_path = workspace.commit(&artifact).await.unwrap();
        let work_dir = workspace.work_dir().to_path_buf();
        workspace.finish(false).await;

        assert_eq!(final_path, root.path().join("final_video.mp4"));
        assert!(final_path.exists());
        assert!(!work_dir.exists());
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_existing_final_path() {
        let root = TempDir::new().unwrap();
        let occupied = root.path().join("final_video.mp4");
        tokio::fs::create_dir_all(&occupied).await.unwrap();
        tokio::fs::write(occupied.join("notes.txt"), b"keep").await.unwrap();

        let mut workspace = JobWorkspace::create(&job_in(root.path())).await.unwrap();
        let artifact = workspace.path("final.mp4");
        tokio::fs::write(&artifact, b"video").await.unwrap();

        assert!(workspace.commit(&artifact).await.is_err());
        workspace.discard().await;

        assert!(occupied.join("notes.txt").exists());
        assert!(!workspace.work_dir().exists());
    }

    #[tokio::test]
    async fn test_discard_after_commit_removes_final_output() {
        let root = TempDir::new().unwrap();
        let mut workspace = JobWorkspace::create(&job_in(root.path())).await.unwrap();
        let artifact = workspace.path("final.mp4");
        tokio::fs::write(&artifact, b"video").await.unwrap();

        let final_path = workspace.commit(&artifact).await.unwrap();
        workspace.discard().await;
        assert!(!final_path.exists());
    }
}
