use glob::{glob_with, MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Result, SampleError};

/// A candidate input file, selected by basename.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    pub path: PathBuf,
    pub name: String,
}

/// List the plain files directly under `root` with extension `extension`
/// whose basename contains `marker`, sorted by path.
#[tracing::instrument(level = "info", skip(root), fields(root = %root.as_ref().display()))]
pub fn find_source_files<P: AsRef<Path>>(
    root: P,
    marker: &str,
    extension: &str,
) -> Result<Vec<SourceFile>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(SampleError::Discovery(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    let root_str = root.to_str().ok_or_else(|| {
        SampleError::Discovery(format!("{} is not valid UTF-8", root.display()))
    })?;

    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(root_str.trim_end_matches('/')),
        Pattern::escape(extension.trim_start_matches('.'))
    );
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = Vec::new();
    let entries = glob_with(&pattern, options)
        .map_err(|e| SampleError::Discovery(format!("bad glob pattern '{}': {}", pattern, e)))?;
    for entry in entries {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => continue,
        };
        if !name.contains(marker) {
            debug!(file = %name, "name filter rejected");
            continue;
        }
        files.push(SourceFile { path, name });
    }

    files.sort();
    info!(count = files.len(), marker, "matched source files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn selects_marked_files_in_sorted_order() -> anyhow::Result<()> {
        let dir = tempdir()?;
        for name in [
            "Cabecera - Personas.txt",
            "Area - Personas.TXT",
            "Cabecera - Hogares.txt",
            "Personas.csv",
            "Resto - Personas.txt",
        ] {
            fs::write(dir.path().join(name), "a,b\n1,2\n")?;
        }
        fs::create_dir(dir.path().join("Nested - Personas.txt"))?;
        fs::create_dir(dir.path().join("sub"))?;
        fs::write(dir.path().join("sub").join("Deep - Personas.txt"), "a\n1\n")?;

        let found = find_source_files(dir.path(), "Personas", "txt")?;
        let names: Vec<&str> = found.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Area - Personas.TXT",
                "Cabecera - Personas.txt",
                "Resto - Personas.txt"
            ]
        );
        assert!(found.iter().all(|f| f.path.parent() == Some(dir.path())));
        Ok(())
    }

    #[test]
    fn marker_match_is_case_sensitive() -> anyhow::Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("personas.txt"), "a\n")?;
        assert!(find_source_files(dir.path(), "Personas", "txt")?.is_empty());
        Ok(())
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = find_source_files("/definitely/not/here", "Personas", "txt").unwrap_err();
        assert!(matches!(err, SampleError::Discovery(_)));
    }

    #[test]
    fn root_with_glob_metacharacters_is_escaped() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let odd = dir.path().join("2023 [enero]");
        fs::create_dir(&odd)?;
        fs::write(odd.join("Personas.txt"), "a\n1\n")?;
        let found = find_source_files(&odd, "Personas", ".txt")?;
        assert_eq!(found.len(), 1);
        Ok(())
    }
}
