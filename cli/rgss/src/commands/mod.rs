pub mod convert;
pub mod convert_dir;

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use rgss_core::{Dialect, Policy, Registry};
use rgss_yaml::DocumentOptions;

use crate::formats::Direction;

/// Conversion knobs resolved from flags and `rgss.toml`.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Overrides the dialect implied by the data file's extension.
    pub dialect: Option<Dialect>,
    pub round_trip: bool,
    pub table_width: Option<usize>,
}

impl Settings {
    fn policy(&self, direction: Direction) -> Policy {
        let dialect = self.dialect.unwrap_or(direction.dialect());
        Policy::resolve(dialect, self.round_trip)
    }

    fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            table_width: self.table_width,
        }
    }
}

/// Convert one file. The destination is replaced only once the whole output
/// has been produced.
pub fn convert_file(src: &Path, dest: &Path, settings: &Settings) -> Result<()> {
    if !src.is_file() {
        anyhow::bail!("source file not found: {}", src.display());
    }
    let direction = Direction::between(src, dest)?;
    let policy = settings.policy(direction);
    let registry = Registry::standard();
    log::debug!(
        "converting {} -> {} ({}, round trip: {})",
        src.display(),
        dest.display(),
        policy.dialect,
        policy.round_trip
    );

    let output = match direction {
        Direction::ToDocument(_) => {
            let bytes = fs::read(src).with_context(|| format!("reading {}", src.display()))?;
            let root = rgss_marshal::load(&bytes, &registry)
                .with_context(|| format!("decoding {}", src.display()))?;
            rgss_yaml::to_document(&root, &registry, &policy, &settings.document_options())
                .with_context(|| format!("rendering {}", src.display()))?
                .into_bytes()
        }
        Direction::ToData(_) => {
            let text = fs::read_to_string(src)
                .with_context(|| format!("reading {}", src.display()))?;
            let root = rgss_yaml::from_document(&text, &registry, &policy)
                .with_context(|| format!("parsing {}", src.display()))?;
            rgss_marshal::dump(&root)
        }
    };

    write_atomic(dest, &output)?;
    log::info!("{} -> {}", src.display(), dest.display());
    Ok(())
}

/// Write `contents` to a temporary file beside `dest`, then move it into place.
fn write_atomic(dest: &Path, contents: &[u8]) -> Result<()> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;
    tmp.write_all(contents)
        .with_context(|| format!("writing {}", dest.display()))?;
    tmp.persist(dest)
        .with_context(|| format!("replacing {}", dest.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgss_core::value::{Object, RString, Value};

    fn actor() -> Value {
        Value::Array(vec![
            Value::Nil,
            Value::Object(Object::new(
                "RPG::Actor",
                vec![
                    ("id".into(), Value::Int(1)),
                    ("name".into(), Value::String(RString::binary(b"Aluxes".to_vec()))),
                ],
            )),
        ])
    }

    #[test]
    fn binary_to_document_and_back() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Actors.rxdata");
        let yaml = dir.path().join("yaml").join("Actors.yaml");
        let back = dir.path().join("out").join("Actors.rxdata");
        let bytes = rgss_marshal::dump(&actor());
        fs::write(&data, &bytes).unwrap();

        let settings = Settings::default();
        convert_file(&data, &yaml, &settings).unwrap();
        let text = fs::read_to_string(&yaml).unwrap();
        assert!(text.starts_with("---\n- null\n- !ruby/object:RPG::Actor\n"));

        convert_file(&yaml, &back, &settings).unwrap();
        assert_eq!(fs::read(&back).unwrap(), bytes);
    }

    #[test]
    fn missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_file(
            &dir.path().join("Nope.rxdata"),
            &dir.path().join("Nope.yaml"),
            &Settings::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("source file not found"));
    }

    #[test]
    fn failed_conversion_leaves_destination_alone() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("Broken.rvdata2");
        let dest = dir.path().join("Broken.yaml");
        fs::write(&src, [0x04, 0x08, b'[', 0x07]).unwrap();
        fs::write(&dest, "previous").unwrap();

        assert!(convert_file(&src, &dest, &Settings::default()).is_err());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "previous");
    }

    #[test]
    fn flag_dialect_overrides_extension() {
        let settings = Settings {
            dialect: Some(Dialect::Ace),
            ..Settings::default()
        };
        let policy = settings.policy(Direction::ToDocument(Dialect::Xp));
        assert_eq!(policy.dialect, Dialect::Ace);
        let policy = Settings::default().policy(Direction::ToData(Dialect::Vx));
        assert_eq!(policy.dialect, Dialect::Vx);
    }
}
