#[cfg(test)]
pub async fn create_temp_dir() -> anyhow::Result<std::path::PathBuf> {
    let mut idx = 0;
    loop {
        let tmp_dir = std::env::temp_dir().join(format!("cloudup_test{}", &idx));
        if let Err(error) = tokio::fs::create_dir(&tmp_dir).await {
            match error.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    idx += 1;
                }
                _ => return Err(error.into()),
            }
        } else {
            return Ok(tmp_dir);
        }
    }
}

#[cfg(test)]
pub async fn setup_source_tree() -> anyhow::Result<std::path::PathBuf> {
    // create a temporary directory
    let tmp_dir = create_temp_dir().await?;
    // src
    // |- top.txt
    // |- subdir
    //    |- file-00 .. file-04
    //    |- largest (8 KiB)
    let src_path = tmp_dir.join("src");
    tokio::fs::create_dir(&src_path).await.unwrap();
    tokio::fs::write(src_path.join("top.txt"), "toplevel")
        .await
        .unwrap();
    let subdir_path = src_path.join("subdir");
    tokio::fs::create_dir(&subdir_path).await.unwrap();
    for idx in 0..5 {
        let name = format!("file-{idx:02}");
        tokio::fs::write(subdir_path.join(&name), name.as_bytes())
            .await
            .unwrap();
    }
    tokio::fs::write(subdir_path.join("largest"), vec![b'z'; 8192])
        .await
        .unwrap();
    Ok(tmp_dir)
}

/// In-memory backend for exercising the upload protocol without touching the
/// filesystem: records copy calls, serves a canned `exists` map and fails the
/// sources it is told to fail.
#[cfg(test)]
#[derive(Debug)]
pub struct StubBackend {
    pub copy_calls: std::sync::atomic::AtomicUsize,
    pub copy_bytes: u64,
    pub existing: std::sync::Mutex<std::collections::HashMap<std::path::PathBuf, crate::backend::FileKind>>,
    pub fail_sources: std::sync::Mutex<std::collections::HashSet<std::path::PathBuf>>,
}

#[cfg(test)]
impl Default for StubBackend {
    fn default() -> Self {
        Self {
            copy_calls: std::sync::atomic::AtomicUsize::new(0),
            copy_bytes: 1,
            existing: std::sync::Mutex::new(std::collections::HashMap::new()),
            fail_sources: std::sync::Mutex::new(std::collections::HashSet::new()),
        }
    }
}

#[cfg(test)]
impl crate::backend::Backend for StubBackend {
    async fn exists(
        &self,
        path: &std::path::Path,
    ) -> Result<Option<crate::backend::FileKind>, crate::errors::Error> {
        Ok(self.existing.lock().unwrap().get(path).copied())
    }

    async fn copy(
        &self,
        source: &std::path::Path,
        _dest: &std::path::Path,
        _overwrite: bool,
    ) -> Result<u64, crate::errors::Error> {
        self.copy_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_sources.lock().unwrap().contains(source) {
            return Err(crate::errors::Error::Backend {
                context: format!("failed copying {source:?}"),
                message: "injected failure".to_string(),
            });
        }
        Ok(self.copy_bytes)
    }

    fn describe(&self) -> String {
        "stub backend".to_string()
    }
}
