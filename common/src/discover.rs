use async_recursion::async_recursion;
use tracing::instrument;

use crate::entry::UploadEntry;
use crate::errors::Error;

/// List every regular file under `src_root` and pair it with its destination
/// under `dst_root`. The source root must exist; a single-file source maps
/// directly onto the destination root. Directories themselves are never
/// uploaded. Runs as one task - entries come back in listing order, `Ready`.
#[instrument]
pub async fn list_files(
    src_root: std::path::PathBuf,
    dst_root: std::path::PathBuf,
) -> Result<Vec<UploadEntry>, Error> {
    let md = tokio::fs::metadata(&src_root).await.map_err(|error| {
        if error.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(src_root.clone())
        } else {
            Error::backend(format!("failed reading metadata from {src_root:?}"), &error)
        }
    })?;
    let mut uploads = Vec::new();
    if md.is_file() {
        let dest = rebase(&src_root, &src_root, &dst_root)?;
        uploads.push(UploadEntry::new(src_root, dest, md.len()));
        return Ok(uploads);
    }
    walk(&src_root, &src_root, &dst_root, &mut uploads).await?;
    Ok(uploads)
}

#[async_recursion]
async fn walk(
    dir: &std::path::Path,
    src_root: &std::path::Path,
    dst_root: &std::path::Path,
    uploads: &mut Vec<UploadEntry>,
) -> Result<(), Error> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|error| Error::backend(format!("cannot open directory {dir:?}"), &error))?;
    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|error| Error::backend(format!("failed listing {dir:?}"), &error))?;
        let Some(entry) = entry else {
            break;
        };
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|error| Error::backend(format!("failed reading type of {path:?}"), &error))?;
        if file_type.is_dir() {
            walk(&path, src_root, dst_root, uploads).await?;
        } else if file_type.is_file() {
            let md = entry.metadata().await.map_err(|error| {
                Error::backend(format!("failed reading metadata from {path:?}"), &error)
            })?;
            let dest = rebase(&path, src_root, dst_root)?;
            uploads.push(UploadEntry::new(path, dest, md.len()));
        } else {
            tracing::debug!("skipping non-regular file {:?}", &path);
        }
    }
    Ok(())
}

/// Re-root `path` from `src_root` onto `dst_root`. An empty relative path
/// (the source root itself) maps onto the destination root.
fn rebase(
    path: &std::path::Path,
    src_root: &std::path::Path,
    dst_root: &std::path::Path,
) -> Result<std::path::PathBuf, Error> {
    let relative = path.strip_prefix(src_root).map_err(|_| {
        Error::Internal(format!(
            "cannot get the relative path: base = {src_root:?} child = {path:?}"
        ))
    })?;
    if relative.as_os_str().is_empty() {
        Ok(dst_root.to_path_buf())
    } else {
        Ok(dst_root.join(relative))
    }
}
