//! `rgss convert` and `rgss convert-list`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use super::{convert_file, Settings};

pub fn run(src: &Path, dest: &Path, settings: &Settings) -> Result<()> {
    convert_file(src, dest, settings)
}

/// Split a comma-separated path list, dropping empty items.
pub fn parse_list(list: &str) -> Vec<PathBuf> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Convert `inputs[i]` to `outputs[i]`, stopping at the first failure.
pub fn run_list(inputs: &[PathBuf], outputs: &[PathBuf], settings: &Settings) -> Result<()> {
    if inputs.len() != outputs.len() {
        bail!(
            "input and output lists differ in length ({} vs {})",
            inputs.len(),
            outputs.len()
        );
    }
    for (src, dest) in inputs.iter().zip(outputs) {
        convert_file(src, dest, settings)?;
    }
    println!("Converted {} file(s)", inputs.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgss_core::value::Value;

    #[test]
    fn lists_split_on_commas() {
        assert_eq!(
            parse_list("a.rxdata, b.rxdata,,"),
            vec![PathBuf::from("a.rxdata"), PathBuf::from("b.rxdata")]
        );
    }

    #[test]
    fn mismatched_lists_fail() {
        let err = run_list(
            &[PathBuf::from("a.rxdata")],
            &[],
            &Settings::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("differ in length"));
    }

    #[test]
    fn converts_pairwise_and_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("A.rvdata");
        std::fs::write(&a, rgss_marshal::dump(&Value::Int(7))).unwrap();
        let missing = dir.path().join("B.rvdata");
        let c = dir.path().join("C.rvdata");
        std::fs::write(&c, rgss_marshal::dump(&Value::Int(9))).unwrap();

        let inputs = vec![a, missing, c];
        let outputs: Vec<PathBuf> = ["A.yaml", "B.yaml", "C.yaml"]
            .iter()
            .map(|name| dir.path().join(name))
            .collect();
        assert!(run_list(&inputs, &outputs, &Settings::default()).is_err());
        assert_eq!(std::fs::read_to_string(&outputs[0]).unwrap(), "--- 7\n");
        assert!(!outputs[2].exists());
    }
}
