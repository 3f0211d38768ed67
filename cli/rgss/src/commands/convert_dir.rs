//! `rgss convert-dir` — convert every data file or document in a directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{convert_file, Settings};

/// The extension (with dot) shared by the most files in `dir`. Ties go to the
/// alphabetically first extension.
pub fn most_common_extension(dir: &Path) -> Result<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for path in list_files(dir)? {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            *counts.entry(format!(".{ext}")).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|(a_ext, a), (b_ext, b)| a.cmp(b).then_with(|| b_ext.cmp(a_ext)))
        .map(|(ext, _)| ext)
        .with_context(|| format!("no files with an extension in {}", dir.display()))
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Convert every file in `src_dir` carrying its most common extension into
/// `dest_dir/<stem><target_ext>`, skipping names that contain an excluded
/// fragment. Stops at the first failure.
pub fn run(
    src_dir: &Path,
    dest_dir: &Path,
    target_ext: &str,
    exclude: &[String],
    settings: &Settings,
) -> Result<usize> {
    let source_ext = most_common_extension(src_dir)?;
    let target_ext = if target_ext.starts_with('.') || target_ext.is_empty() {
        target_ext.to_string()
    } else {
        format!(".{target_ext}")
    };
    let exclude: Vec<String> = exclude.iter().map(|e| e.replace("{ext}", &source_ext)).collect();

    let mut converted = 0;
    for src in list_files(src_dir)? {
        let name = src
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if !name.ends_with(&source_ext) {
            continue;
        }
        if exclude.iter().any(|fragment| name.contains(fragment.as_str())) {
            log::info!("skipping {name}");
            continue;
        }
        let stem = &name[..name.len() - source_ext.len()];
        let dest = dest_dir.join(format!("{stem}{target_ext}"));
        convert_file(&src, &dest, settings)?;
        converted += 1;
    }
    println!(
        "Converted {converted} {source_ext} file(s) from {} to {}",
        src_dir.display(),
        dest_dir.display()
    );
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryConfig;
    use rgss_core::value::Value;

    fn write_data(dir: &Path, name: &str, value: &Value) {
        fs::write(dir.join(name), rgss_marshal::dump(value)).unwrap();
    }

    #[test]
    fn picks_the_most_common_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.rxdata", "b.rxdata", "c.yaml", "README"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        assert_eq!(most_common_extension(dir.path()).unwrap(), ".rxdata");
    }

    #[test]
    fn empty_directory_has_no_extension() {
        let dir = tempfile::tempdir().unwrap();
        assert!(most_common_extension(dir.path()).is_err());
    }

    #[test]
    fn converts_all_but_excluded() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write_data(src.path(), "Map001.rvdata2", &Value::Int(1));
        write_data(src.path(), "Map002.rvdata2", &Value::Int(2));
        write_data(src.path(), "Scripts.rvdata2", &Value::Int(3));
        write_data(src.path(), "Map_doodads.rvdata2", &Value::Int(4));

        let exclude = DiscoveryConfig::default().exclude;
        let count = run(src.path(), dest.path(), "yaml", &exclude, &Settings::default()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            fs::read_to_string(dest.path().join("Map002.yaml")).unwrap(),
            "--- 2\n"
        );
        assert!(!dest.path().join("Scripts.yaml").exists());
        assert!(!dest.path().join("Map_doodads.yaml").exists());
    }

    #[test]
    fn documents_back_to_data() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::write(src.path().join("System.yaml"), "--- 5\n").unwrap();

        let count = run(src.path(), dest.path(), ".rvdata", &[], &Settings::default()).unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            fs::read(dest.path().join("System.rvdata")).unwrap(),
            rgss_marshal::dump(&Value::Int(5))
        );
    }
}
