use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use walkdir::WalkDir;

use crate::Result;

/// Totals for every transcript file below one directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub file_count: u64,
    pub token_total: u64,
    pub byte_total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectStats {
    pub project: String,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubprojectStats {
    pub project: String,
    pub subproject: String,
    #[serde(flatten)]
    pub totals: Totals,
}

pub(crate) fn is_json_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("json")
}

/// Interpret a `token_count` value the way a lenient integer cast would
fn token_count_of(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        Value::Bool(b) => u64::from(*b),
        _ => 0,
    }
}

/// `token_count` of a transcript file; 0 for unreadable or malformed files
pub fn read_token_count(path: &Path) -> u64 {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("{}", e);
            return 0;
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(data) => data.get("token_count").map(token_count_of).unwrap_or(0),
        Err(e) => {
            tracing::debug!("Skipping tokens of malformed {}: {}", path.display(), e);
            0
        }
    }
}

/// Recursively total every `*.json` file below `dir`
pub fn collect_totals(dir: &Path) -> Totals {
    let mut totals = Totals::default();

    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_json_file(entry.path()))
    {
        totals.file_count += 1;
        totals.byte_total += entry.metadata().map(|m| m.len()).unwrap_or(0);
        totals.token_total += read_token_count(entry.path());
    }

    totals
}

/// Sorted names of the immediate child directories of `dir`
pub(crate) fn child_dirs(dir: &Path) -> std::io::Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs_err::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// One row per project under `root`
pub fn project_stats(root: &Path) -> Result<Vec<ProjectStats>> {
    Ok(child_dirs(root)?
        .into_iter()
        .map(|project| {
            let totals = collect_totals(&root.join(&project));
            ProjectStats { project, totals }
        })
        .collect())
}

/// One row per subproject of every project under `root`
pub fn subproject_stats(root: &Path) -> Result<Vec<SubprojectStats>> {
    let mut rows = Vec::new();
    for project in child_dirs(root)? {
        let project_dir = root.join(&project);
        for subproject in child_dirs(&project_dir)? {
            let totals = collect_totals(&project_dir.join(&subproject));
            rows.push(SubprojectStats {
                project: project.clone(),
                subproject,
                totals,
            });
        }
    }
    Ok(rows)
}
