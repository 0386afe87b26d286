use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::core::{
    domain::StagedProgram,
    traits::stager::{Stager, StagingError},
};

/// Stages every program as `<dir>/<uuid>.<extension>`.
#[derive(Clone, Debug)]
pub struct FileStager {
    dir: PathBuf,
    extension: String,
}

impl FileStager {
    pub fn new<T>(dir: T, extension: &str) -> Self
    where
        T: AsRef<Path>,
    {
        FileStager {
            dir: dir.as_ref().into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Stager for FileStager {
    async fn stage(&self, program: &str) -> Result<StagedProgram, StagingError> {
        let path = self.dir.join(format!("{}.{}", Uuid::new_v4(), self.extension));

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StagingError::Write { msg: e.to_string() })?;
        fs::write(&path, program)
            .await
            .map_err(|e| StagingError::Write { msg: e.to_string() })?;

        tracing::debug!("Staged program at {}", path.display());
        Ok(StagedProgram { path })
    }

    async fn release(&self, program: StagedProgram) -> Result<(), StagingError> {
        fs::remove_file(&program.path)
            .await
            .map_err(|e| StagingError::Remove { msg: e.to_string() })
    }
}
