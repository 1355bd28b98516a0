use fixlab_rs::loader::{load_tsv, LoadedTable};
use fixlab_rs::runner::{detect_python, locate_bridge_script};
use fixlab_rs::{DetectorOptions, I2mcRunner, SnapshotFormat};
use std::path::{Path, PathBuf};

fn is_glob_pattern(input: &str) -> bool {
    input.chars().any(|c| matches!(c, '*' | '?' | '['))
}

/// Expand input arguments into file paths, keeping argument order.
/// Matches of one glob pattern are sorted.
pub fn resolve_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut files: Vec<PathBuf> = Vec::new();

    for input in inputs {
        if is_glob_pattern(input) {
            let paths = glob::glob(input)
                .map_err(|e| format!("Invalid glob pattern '{}': {}", input, e))?;
            let mut matched: Vec<PathBuf> = Vec::new();
            for entry in paths {
                match entry {
                    Ok(path) if path.is_file() => matched.push(path),
                    Ok(_) => {}
                    Err(e) => log::warn!("glob error: {}", e),
                }
            }
            if matched.is_empty() {
                return Err(format!("No files match '{}'", input));
            }
            matched.sort();
            files.extend(matched);
        } else {
            let path = PathBuf::from(input);
            if !path.is_file() {
                return Err(format!("Input file not found: {}", input));
            }
            files.push(path);
        }
    }

    Ok(files)
}

/// Load and concatenate all input tables
pub fn load_inputs(files: &[PathBuf]) -> Result<LoadedTable, String> {
    let mut table = LoadedTable::default();
    for file in files {
        let loaded = load_tsv(file).map_err(|e| format!("{}: {}", file.display(), e))?;
        log::info!("Loaded {} samples from {}", loaded.samples.len(), file.display());
        table.extend(loaded);
    }
    Ok(table)
}

pub fn load_options(path: Option<&str>) -> Result<DetectorOptions, String> {
    match path {
        Some(path) => DetectorOptions::from_json_file(path)
            .map_err(|e| format!("Invalid detector options in '{}': {}", path, e)),
        None => Ok(DetectorOptions::default()),
    }
}

/// Explicit `--format`, else the output extension, else CSV
pub fn resolve_format(format: Option<&str>, output: &str) -> Result<SnapshotFormat, String> {
    match format {
        Some(f) => f.parse(),
        None => Ok(Path::new(output)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SnapshotFormat::from_extension)
            .unwrap_or_default()),
    }
}

pub fn resolve_python(python: Option<&str>) -> Option<String> {
    match python {
        Some(p) if !p.is_empty() => Some(p.to_string()),
        _ => detect_python(),
    }
}

pub fn resolve_bridge(bridge: Option<&str>) -> Result<PathBuf, String> {
    match bridge {
        Some(b) if !b.is_empty() => Ok(PathBuf::from(b)),
        _ => locate_bridge_script().map_err(|e| e.to_string()),
    }
}

pub fn resolve_runner(python: Option<&str>, bridge: Option<&str>) -> Result<I2mcRunner, String> {
    let python = resolve_python(python).ok_or_else(|| {
        "No Python interpreter found (tried python3, python). Use --python or $FIXLAB_PYTHON"
            .to_string()
    })?;
    let bridge = resolve_bridge(bridge)?;
    I2mcRunner::new(python, bridge).map_err(|e| e.to_string())
}
