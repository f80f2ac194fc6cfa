//! Artifact directory layout.
//!
//! All job artifacts live under a single uploads root in a fixed tree of
//! stage-named directories. Every derived file is keyed by job id, so two
//! jobs can never collide on a path. The uploaded source file is the one
//! exception: it is placed in `originals/` by the upload handler under an
//! upload-time name and referenced from the job record.

use std::path::{Path, PathBuf};

use crate::types::JobId;

/// Names of every directory in the artifact tree, in creation order.
pub const STAGE_DIRS: [&str; 10] = [
    "originals",
    "audio",
    "transcription",
    "translations",
    "translated_audio",
    "captions",
    "transcripts",
    "processed",
    "final",
    "temp",
];

/// Path arithmetic over the artifact tree. Cheap to clone; does no I/O.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every directory in the tree, for startup creation.
    pub fn all_dirs(&self) -> Vec<PathBuf> {
        STAGE_DIRS.iter().map(|d| self.root.join(d)).collect()
    }

    /// Directory for uploaded source files.
    pub fn originals_dir(&self) -> PathBuf {
        self.root.join("originals")
    }

    /// Extracted mono WAV for the speech recognizer.
    pub fn audio_path(&self, id: JobId) -> PathBuf {
        self.root.join("audio").join(format!("{id}.wav"))
    }

    /// Raw transcription output (segments with timings).
    pub fn transcription_path(&self, id: JobId) -> PathBuf {
        self.root.join("transcription").join(format!("{id}.json"))
    }

    /// Plain-text transcript of the source audio.
    pub fn transcript_text_path(&self, id: JobId) -> PathBuf {
        self.root.join("transcripts").join(format!("{id}.txt"))
    }

    /// Translated segments with timings.
    pub fn translation_path(&self, id: JobId) -> PathBuf {
        self.root.join("translations").join(format!("{id}.json"))
    }

    /// Synthesized speech in the target language.
    pub fn translated_audio_path(&self, id: JobId) -> PathBuf {
        self.root
            .join("translated_audio")
            .join(format!("{id}.mp3"))
    }

    /// Translated captions as SRT.
    pub fn captions_path(&self, id: JobId) -> PathBuf {
        self.root.join("captions").join(format!("{id}.srt"))
    }

    /// Re-muxed video before finalization.
    pub fn assembled_path(&self, id: JobId) -> PathBuf {
        self.root.join("temp").join(format!("{id}_assembled.mp4"))
    }

    /// The finished artifact the client fetches. The `processed` directory
    /// is the served location; `final/` exists in the tree but is not the
    /// path clients are pointed at.
    pub fn final_path(&self, id: JobId) -> PathBuf {
        self.root.join("processed").join(format!("{id}_final.mp4"))
    }

    /// Every derivable artifact path for a job, the finished file included.
    pub fn job_artifacts(&self, id: JobId) -> Vec<PathBuf> {
        let mut paths = self.intermediate_artifacts(id);
        paths.push(self.final_path(id));
        paths
    }

    /// Every derivable artifact path except the finished file.
    pub fn intermediate_artifacts(&self, id: JobId) -> Vec<PathBuf> {
        vec![
            self.audio_path(id),
            self.transcription_path(id),
            self.transcript_text_path(id),
            self.translation_path(id),
            self.translated_audio_path(id),
            self.captions_path(id),
            self.assembled_path(id),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_path_lives_under_processed() {
        let layout = ArtifactLayout::new("/srv/uploads");
        let id = JobId::new();
        let path = layout.final_path(id);
        assert!(path.starts_with("/srv/uploads/processed"));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("_final.mp4"));
    }

    #[test]
    fn distinct_jobs_never_share_a_path() {
        let layout = ArtifactLayout::new("uploads");
        let a = JobId::new();
        let b = JobId::new();
        for (pa, pb) in layout.job_artifacts(a).iter().zip(layout.job_artifacts(b)) {
            assert_ne!(*pa, pb);
        }
    }

    #[test]
    fn all_dirs_covers_the_whole_tree() {
        let layout = ArtifactLayout::new("uploads");
        let dirs = layout.all_dirs();
        assert_eq!(dirs.len(), STAGE_DIRS.len());
        for name in STAGE_DIRS {
            assert!(dirs.iter().any(|d| d.ends_with(name)));
        }
    }

    #[test]
    fn every_artifact_lives_under_a_stage_dir() {
        let layout = ArtifactLayout::new("uploads");
        let id = JobId::new();
        for path in layout.job_artifacts(id) {
            let dir = path.parent().unwrap().file_name().unwrap();
            assert!(STAGE_DIRS.contains(&dir.to_str().unwrap()));
        }
    }

    #[test]
    fn intermediates_exclude_the_final_artifact() {
        let layout = ArtifactLayout::new("uploads");
        let id = JobId::new();
        let final_path = layout.final_path(id);
        assert!(!layout.intermediate_artifacts(id).contains(&final_path));
    }
}
