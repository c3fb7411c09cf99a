// Home-relative repository paths.
//
// Absolute home prefixes differ per machine, so state records store paths in
// a portable `~/...` form. Only a leading home prefix is rewritten; paths
// outside the home directory pass through unchanged.

use std::path::{Path, PathBuf};

/// Rewrite a leading home-directory prefix as `~/`.
///
/// `/home/alice/src/proj` with home `/home/alice` becomes `~/src/proj`.
/// A path equal to the home directory itself becomes `~/`.
pub fn to_portable(path: &Path, home: &Path) -> String {
    match path.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~/".to_string(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => path.display().to_string(),
    }
}

/// Expand a leading `~/` back into the given home directory.
pub fn to_absolute(portable: &str, home: &Path) -> PathBuf {
    match portable.strip_prefix("~/") {
        Some(rest) if rest.is_empty() => home.to_path_buf(),
        Some(rest) => home.join(rest),
        None => PathBuf::from(portable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portable_rewrites_home_prefix() {
        let home = Path::new("/home/alice");
        assert_eq!(to_portable(Path::new("/home/alice/src/proj"), home), "~/src/proj");
    }

    #[test]
    fn portable_leaves_foreign_paths_alone() {
        let home = Path::new("/home/alice");
        assert_eq!(to_portable(Path::new("/srv/repos/proj"), home), "/srv/repos/proj");
    }

    #[test]
    fn portable_home_itself() {
        let home = Path::new("/home/alice");
        assert_eq!(to_portable(Path::new("/home/alice"), home), "~/");
    }

    #[test]
    fn portable_does_not_match_sibling_prefix() {
        // /home/alicette must not be rewritten for home /home/alice.
        let home = Path::new("/home/alice");
        assert_eq!(to_portable(Path::new("/home/alicette/proj"), home), "/home/alicette/proj");
    }

    #[test]
    fn absolute_expands_tilde() {
        let home = Path::new("/home/bob");
        assert_eq!(to_absolute("~/src/proj", home), PathBuf::from("/home/bob/src/proj"));
    }

    #[test]
    fn absolute_passes_through_plain_paths() {
        let home = Path::new("/home/bob");
        assert_eq!(to_absolute("/srv/repos/proj", home), PathBuf::from("/srv/repos/proj"));
    }

    #[test]
    fn round_trip() {
        let home = Path::new("/home/carol");
        let original = Path::new("/home/carol/work/notes");
        let portable = to_portable(original, home);
        assert_eq!(to_absolute(&portable, home), original);
    }
}
