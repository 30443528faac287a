// src/utils/fixtures.rs

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// A quiz file found under the fixtures directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureFile {
    pub path: PathBuf,
    /// Parent directory name, `_` read as a space.
    pub subject: String,
    /// File name up to the first `.`.
    pub quiz_name: String,
    pub contents: String,
}

/// Collects every `<subject>/<quiz>.txt` under `root`, sorted by path.
///
/// Files directly inside `root` have no subject and are ignored. Blocking;
/// run it on a blocking thread.
pub fn collect_fixtures(root: &Path) -> Result<Vec<FixtureFile>, std::io::Error> {
    let mut fixtures = Vec::new();

    for entry in WalkDir::new(root).min_depth(2).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        let path = entry.path();

        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "txt") {
            continue;
        }

        let subject = match path
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
        {
            Some(name) => name.replace('_', " "),
            None => continue,
        };

        let quiz_name = match path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split('.').next())
        {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        let contents = std::fs::read_to_string(path)?;

        fixtures.push(FixtureFile {
            path: path.to_path_buf(),
            subject,
            quiz_name,
            contents,
        });
    }

    Ok(fixtures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collects_subject_directories() {
        let dir = tempfile::tempdir().unwrap();
        let computing = dir.path().join("Computer_Science");
        let maths = dir.path().join("Maths");
        fs::create_dir_all(&computing).unwrap();
        fs::create_dir_all(&maths).unwrap();

        fs::write(computing.join("Rust.txt"), "Q|a|b|1\n").unwrap();
        fs::write(maths.join("Algebra.v2.txt"), "Q|a|b|2\n").unwrap();
        fs::write(maths.join("notes.md"), "ignored").unwrap();
        fs::write(dir.path().join("stray.txt"), "ignored").unwrap();

        let fixtures = collect_fixtures(dir.path()).unwrap();
        assert_eq!(fixtures.len(), 2);

        assert_eq!(fixtures[0].subject, "Computer Science");
        assert_eq!(fixtures[0].quiz_name, "Rust");
        assert_eq!(fixtures[0].contents, "Q|a|b|1\n");

        assert_eq!(fixtures[1].subject, "Maths");
        assert_eq!(fixtures[1].quiz_name, "Algebra");
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_fixtures(&dir.path().join("nope")).is_err());
    }
}
