use anyhow::anyhow;

/// Reject root pairs where one path is a prefix of the other. Uploading a
/// tree into itself (or over its own parent) would make discovery race
/// against the files being written. Only meaningful when source and
/// destination live on the same storage backend.
pub fn validate_roots(src: &std::path::Path, dst: &std::path::Path) -> anyhow::Result<()> {
    if dst.starts_with(src) {
        return Err(anyhow!(
            "destination path {dst:?} is under source path {src:?}"
        ));
    }
    if src.starts_with(dst) {
        return Err(anyhow!(
            "source path {src:?} is under destination path {dst:?}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn disjoint_roots_are_fine() {
        assert!(validate_roots(Path::new("/data/src"), Path::new("/data/dest")).is_ok());
    }

    #[test]
    fn destination_under_source_is_rejected() {
        let error =
            validate_roots(Path::new("/data/src"), Path::new("/data/src/dest")).unwrap_err();
        assert!(error.to_string().contains("under source"));
    }

    #[test]
    fn source_under_destination_is_rejected() {
        let error = validate_roots(Path::new("/data/dest/src"), Path::new("/data/dest"))
            .unwrap_err();
        assert!(error.to_string().contains("under destination"));
    }

    #[test]
    fn prefix_check_is_component_wise() {
        // "/data/src-old" shares a string prefix with "/data/src" but is a
        // sibling, not a child
        assert!(validate_roots(Path::new("/data/src"), Path::new("/data/src-old")).is_ok());
    }

    #[test]
    fn identical_roots_are_rejected() {
        assert!(validate_roots(Path::new("/data"), Path::new("/data")).is_err());
    }
}
