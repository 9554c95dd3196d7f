use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::stats::{is_json_file, read_token_count};
use crate::Result;

pub const TOKENS_DIR: &str = "tokens";
pub const TOKENS_FILE: &str = "tokens.csv";

/// Per-file token counts for one project or subproject folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenReport {
    /// `(path relative to the folder, token_count)`
    pub rows: Vec<(String, u64)>,
    pub total: u64,
}

impl TokenReport {
    /// Scan every `*.json` file below `folder`. Within each directory its own
    /// files come first, by name, then its subdirectories, by name.
    pub fn scan(folder: &Path) -> Self {
        let mut report = TokenReport::default();

        for entry in WalkDir::new(folder)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_json_file(entry.path()))
        {
            let relative = entry
                .path()
                .strip_prefix(folder)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");

            let count = read_token_count(entry.path());
            report.total += count;
            report.rows.push((relative, count));
        }

        report
    }

    /// Render as `file,token_count` CSV with a closing `TOTAL` row
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("file,token_count\n");
        for (file, count) in &self.rows {
            let _ = writeln!(csv, "{},{}", csv_field(file), count);
        }
        let _ = writeln!(csv, "TOTAL,{}", self.total);
        csv
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write `<folder>/tokens/tokens.csv` and return its path with the token total
pub fn generate_token_report(folder: &Path) -> Result<(PathBuf, u64)> {
    if !folder.is_dir() {
        anyhow::bail!("Folder does not exist: {}", folder.display());
    }

    let tokens_dir = folder.join(TOKENS_DIR);
    fs_err::create_dir_all(&tokens_dir)?;

    let report = TokenReport::scan(folder);
    let csv_path = tokens_dir.join(TOKENS_FILE);
    fs_err::write(&csv_path, report.to_csv())?;

    tracing::info!(
        "Wrote {} rows ({} tokens) to {}",
        report.rows.len(),
        report.total,
        csv_path.display()
    );
    Ok((csv_path, report.total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_report_lists_files_and_total() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path();
        fs::create_dir_all(folder.join("PL1")).unwrap();
        fs::write(folder.join("b.json"), "{\"token_count\": 20}").unwrap();
        fs::write(folder.join("a.json"), "{\"token_count\": 10}").unwrap();
        fs::write(folder.join("PL1").join("c.json"), "{\"token_count\": 5}").unwrap();
        fs::write(folder.join("bad.json"), "oops").unwrap();
        fs::write(folder.join("readme.md"), "ignored").unwrap();

        let (path, total) = generate_token_report(folder).unwrap();
        assert_eq!(path, folder.join("tokens").join("tokens.csv"));
        assert_eq!(total, 35);

        let csv = fs::read_to_string(&path).unwrap();
        assert_eq!(
            csv,
            "file,token_count\na.json,10\nb.json,20\nbad.json,0\nPL1/c.json,5\nTOTAL,35\n"
        );
    }

    #[test]
    fn test_files_precede_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path();
        fs::create_dir_all(folder.join("a_sub").join("deep")).unwrap();
        fs::create_dir_all(folder.join("m_sub")).unwrap();
        fs::write(folder.join("z.json"), "{\"token_count\": 1}").unwrap();
        fs::write(folder.join("a_sub").join("y.json"), "{\"token_count\": 2}").unwrap();
        fs::write(folder.join("a_sub").join("deep").join("x.json"), "{\"token_count\": 3}").unwrap();
        fs::write(folder.join("m_sub").join("w.json"), "{\"token_count\": 4}").unwrap();

        let report = TokenReport::scan(folder);
        let files: Vec<_> = report.rows.iter().map(|(file, _)| file.as_str()).collect();
        assert_eq!(
            files,
            vec!["z.json", "a_sub/y.json", "a_sub/deep/x.json", "m_sub/w.json"]
        );
        assert_eq!(report.total, 10);
    }

    #[test]
    fn test_regenerating_does_not_count_itself() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{\"token_count\": 4}").unwrap();

        generate_token_report(dir.path()).unwrap();
        let (path, total) = generate_token_report(dir.path()).unwrap();

        assert_eq!(total, 4);
        assert_eq!(fs::read_to_string(path).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain.json"), "plain.json");
        assert_eq!(csv_field("a,b.json"), "\"a,b.json\"");
        assert_eq!(csv_field("say \"hi\".json"), "\"say \"\"hi\"\".json\"");
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(generate_token_report(&dir.path().join("absent")).is_err());
    }
}
