use crate::errors::Error;

/// What a destination probe found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Other,
}

impl FileKind {
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            FileKind::File => "file",
            FileKind::Directory => "directory",
            FileKind::Other => "special file",
        }
    }
}

/// Storage capability consumed by the engine.
///
/// `exists` and `copy` are assumed atomic-enough per call; no cross-call
/// transaction guarantees are required. The engine never reads file contents
/// itself - every byte moves through `copy`.
pub trait Backend: Send + Sync + 'static {
    /// Probe a path; `Ok(None)` means nothing exists there.
    fn exists(
        &self,
        path: &std::path::Path,
    ) -> impl std::future::Future<Output = Result<Option<FileKind>, Error>> + Send;

    /// Copy one file, returning the number of bytes written.
    fn copy(
        &self,
        source: &std::path::Path,
        dest: &std::path::Path,
        overwrite: bool,
    ) -> impl std::future::Future<Output = Result<u64, Error>> + Send;

    /// Human-readable backend identifier for logging.
    fn describe(&self) -> String;
}

/// Local filesystem backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl Backend for LocalFs {
    async fn exists(&self, path: &std::path::Path) -> Result<Option<FileKind>, Error> {
        match tokio::fs::metadata(path).await {
            Ok(md) => {
                let kind = if md.is_dir() {
                    FileKind::Directory
                } else if md.is_file() {
                    FileKind::File
                } else {
                    FileKind::Other
                };
                Ok(Some(kind))
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(Error::backend(
                format!("failed reading metadata from {path:?}"),
                &error,
            )),
        }
    }

    async fn copy(
        &self,
        source: &std::path::Path,
        dest: &std::path::Path,
        overwrite: bool,
    ) -> Result<u64, Error> {
        if !overwrite
            && let Ok(md) = tokio::fs::metadata(dest).await
        {
            return Err(Error::AlreadyExists {
                path: dest.to_path_buf(),
                kind: if md.is_dir() { "directory" } else { "file" },
            });
        }
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                Error::backend(format!("failed creating directory {parent:?}"), &error)
            })?;
        }
        tokio::fs::copy(source, dest).await.map_err(|error| {
            Error::backend(format!("failed copying {source:?} to {dest:?}"), &error)
        })
    }

    fn describe(&self) -> String {
        "local filesystem".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils;

    #[tokio::test]
    async fn exists_distinguishes_kinds() -> anyhow::Result<()> {
        let tmp_dir = testutils::create_temp_dir().await?;
        let file = tmp_dir.join("f.txt");
        tokio::fs::write(&file, "x").await?;
        let fs = LocalFs;
        assert_eq!(fs.exists(&file).await?, Some(FileKind::File));
        assert_eq!(fs.exists(&tmp_dir).await?, Some(FileKind::Directory));
        assert_eq!(fs.exists(&tmp_dir.join("missing")).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn copy_creates_parent_directories() -> anyhow::Result<()> {
        let tmp_dir = testutils::create_temp_dir().await?;
        let src = tmp_dir.join("src.txt");
        tokio::fs::write(&src, "hello").await?;
        let dst = tmp_dir.join("deep").join("nested").join("dst.txt");
        let bytes = LocalFs.copy(&src, &dst, true).await?;
        assert_eq!(bytes, 5);
        assert_eq!(tokio::fs::read_to_string(&dst).await?, "hello");
        Ok(())
    }

    #[tokio::test]
    async fn copy_without_overwrite_fails_on_collision() -> anyhow::Result<()> {
        let tmp_dir = testutils::create_temp_dir().await?;
        let src = tmp_dir.join("src.txt");
        let dst = tmp_dir.join("dst.txt");
        tokio::fs::write(&src, "new").await?;
        tokio::fs::write(&dst, "old").await?;
        let error = LocalFs.copy(&src, &dst, false).await.unwrap_err();
        assert!(error.is_already_exists(), "unexpected error: {error}");
        assert_eq!(tokio::fs::read_to_string(&dst).await?, "old");
        Ok(())
    }
}
