use crate::detector::FixationDetector;
use crate::error::{FixlabError, Result};
use crate::options::DetectorOptions;
use crate::types::{CleanedSample, Fixation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use uuid::Uuid;

/// Overrides the Python interpreter used for the bridge
pub const PYTHON_ENV: &str = "FIXLAB_PYTHON";
/// Overrides the location of the bridge script
pub const BRIDGE_SCRIPT_ENV: &str = "FIXLAB_BRIDGE_SCRIPT";

const BRIDGE_SCRIPT_NAME: &str = "i2mc_bridge.py";
const PYTHON_CANDIDATES: [&str; 2] = ["python3", "python"];

/// I2MC bridge runner
///
/// Runs the I2MC Python library through `i2mc_bridge.py`. Each session is
/// written to a temporary TSV, the bridge receives one JSON request line on
/// stdin and answers with one JSON line on stdout.
#[derive(Debug, Clone)]
pub struct I2mcRunner {
    python_path: PathBuf,
    bridge_script: PathBuf,
    timeout: Option<Duration>,
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    request_id: &'a str,
    data_path: String,
    options: serde_json::Value,
}

#[derive(Deserialize)]
struct BridgeResponse {
    status: String,
    #[serde(default)]
    fixations: Vec<Fixation>,
    #[serde(default)]
    error: Option<String>,
}

impl I2mcRunner {
    /// Create a runner for an explicit interpreter and bridge script
    ///
    /// # Arguments
    /// * `python_path` - Interpreter used to run the bridge
    /// * `bridge_script` - Path to `i2mc_bridge.py`
    pub fn new<P: AsRef<Path>, S: AsRef<Path>>(python_path: P, bridge_script: S) -> Result<Self> {
        let bridge_script = bridge_script.as_ref().to_path_buf();
        if !bridge_script.exists() {
            return Err(FixlabError::BridgeNotFound(
                bridge_script.display().to_string(),
            ));
        }

        Ok(Self {
            python_path: python_path.as_ref().to_path_buf(),
            bridge_script,
            timeout: None,
        })
    }

    /// Find an interpreter and the bridge script.
    ///
    /// The interpreter comes from `$FIXLAB_PYTHON` or the first of `python3`,
    /// `python` that starts; the script from [`locate_bridge_script`].
    pub fn discover() -> Result<Self> {
        let python = match std::env::var(PYTHON_ENV) {
            Ok(path) if !path.is_empty() => path,
            _ => detect_python().ok_or_else(|| {
                FixlabError::PythonNotFound(format!(
                    "tried {}; set ${} to choose one",
                    PYTHON_CANDIDATES.join(", "),
                    PYTHON_ENV
                ))
            })?,
        };
        let script = locate_bridge_script()?;
        Self::new(python, script)
    }

    /// Kill the bridge if one session takes longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn python_path(&self) -> &Path {
        &self.python_path
    }

    pub fn bridge_script(&self) -> &Path {
        &self.bridge_script
    }

    /// Installed I2MC version, if the interpreter can import it
    pub fn i2mc_version(&self) -> Option<String> {
        let output = std::process::Command::new(&self.python_path)
            .args([
                "-c",
                "from importlib.metadata import version; print(version('I2MC'))",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .ok()?;

        if output.status.success() {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            None
        }
    }

    async fn invoke(&self, request_json: &str) -> Result<Vec<Fixation>> {
        let mut child = Command::new(&self.python_path)
            .arg(&self.bridge_script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                FixlabError::DetectionFailed(format!(
                    "Failed to spawn bridge ({}): {}",
                    self.python_path.display(),
                    e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request_json.as_bytes()).await.map_err(|e| {
                FixlabError::DetectionFailed(format!("Failed to write bridge request: {}", e))
            })?;
            stdin.write_all(b"\n").await.map_err(|e| {
                FixlabError::DetectionFailed(format!("Failed to write bridge request: {}", e))
            })?;
            // Dropping stdin signals EOF
        }

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    FixlabError::DetectionFailed(format!(
                        "Bridge timed out after {:.1}s",
                        limit.as_secs_f64()
                    ))
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| FixlabError::DetectionFailed(format!("Failed to wait for bridge: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("I2MC bridge failed with status: {}", output.status);
            log::error!("stderr: {}", stderr);
            return Err(FixlabError::DetectionFailed(format!(
                "Bridge failed with status: {}. stderr: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            log::debug!("bridge stderr: {}", stderr.trim());
        }

        parse_bridge_response(&String::from_utf8_lossy(&output.stdout))
    }
}

impl FixationDetector for I2mcRunner {
    async fn detect(
        &self,
        samples: &[CleanedSample],
        options: &DetectorOptions,
    ) -> Result<Vec<Fixation>> {
        let request_id = Uuid::new_v4().to_string();
        let data_path = std::env::temp_dir().join(format!("i2mc_input_{}.tsv", request_id));

        write_samples_tsv(&data_path, samples, options)?;

        let request = BridgeRequest {
            request_id: &request_id,
            data_path: data_path.display().to_string(),
            options: options.to_bridge_value()?,
        };
        let request_json = serde_json::to_string(&request)?;

        log::debug!(
            "Running I2MC bridge on {} samples (request {})",
            samples.len(),
            request_id
        );
        let start_time = Instant::now();
        let result = self.invoke(&request_json).await;
        log::debug!(
            "I2MC bridge finished in {:.2}s",
            start_time.elapsed().as_secs_f64()
        );

        let _ = tokio::fs::remove_file(&data_path).await;
        result
    }
}

/// Write cleaned samples in the column layout the bridge loads into I2MC.
///
/// Missing coordinates are written as the configured sentinel, or left empty
/// (read back as NaN) when none is configured.
pub fn write_samples_tsv(
    path: &Path,
    samples: &[CleanedSample],
    options: &DetectorOptions,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;

    writer.write_record(["time", "L_X", "L_Y", "R_X", "R_Y"])?;

    let cell = |value: Option<f64>, sentinel: Option<f64>| -> String {
        value
            .or(sentinel)
            .map(|v| v.to_string())
            .unwrap_or_default()
    };

    for sample in samples {
        writer.write_record([
            sample.time.to_string(),
            cell(sample.left.x, options.missing_x),
            cell(sample.left.y, options.missing_y),
            cell(sample.right.x, options.missing_x),
            cell(sample.right.y, options.missing_y),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Parse the bridge's answer. Only the last non-empty stdout line is the
/// response; anything before it is library chatter.
pub fn parse_bridge_response(stdout: &str) -> Result<Vec<Fixation>> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| FixlabError::ParseError("Bridge produced no output".to_string()))?;

    let response: BridgeResponse = serde_json::from_str(line.trim()).map_err(|e| {
        FixlabError::ParseError(format!(
            "Failed to parse bridge response: {} (raw: {})",
            e,
            line.chars().take(200).collect::<String>()
        ))
    })?;

    match response.status.as_str() {
        "ok" => Ok(response.fixations),
        "error" => Err(FixlabError::DetectionFailed(
            response
                .error
                .unwrap_or_else(|| "Unknown bridge error".to_string()),
        )),
        other => Err(FixlabError::ParseError(format!(
            "Unexpected bridge status '{}'",
            other
        ))),
    }
}

/// First interpreter name on `PATH` that starts successfully
pub fn detect_python() -> Option<String> {
    PYTHON_CANDIDATES
        .iter()
        .find(|candidate| {
            std::process::Command::new(candidate)
                .args(["-c", "import sys"])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
        })
        .map(|candidate| candidate.to_string())
}

/// Locate `i2mc_bridge.py`.
///
/// Checked in order: `$FIXLAB_BRIDGE_SCRIPT`, `resources/python/` under the
/// working directory, the crate's own `resources/python/`, and next to the
/// executable.
pub fn locate_bridge_script() -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Ok(path) = std::env::var(BRIDGE_SCRIPT_ENV) {
        if !path.is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }
    candidates.push(Path::new("resources/python").join(BRIDGE_SCRIPT_NAME));
    candidates.push(
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("resources/python")
            .join(BRIDGE_SCRIPT_NAME),
    );
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join("resources/python").join(BRIDGE_SCRIPT_NAME));
        candidates.push(exe_dir.join(BRIDGE_SCRIPT_NAME));
    }

    candidates
        .iter()
        .find(|p| p.exists())
        .cloned()
        .ok_or_else(|| {
            FixlabError::BridgeNotFound(format!(
                "tried {}",
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}
