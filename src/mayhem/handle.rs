use std::fmt;

/// Identifier printed by `mayhem run`, shaped `<project>/<target>/<run-number>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    raw: String,
}

impl RunHandle {
    /// Parse the stdout of the `run` phase.
    ///
    /// Only the last non-empty line counts, and only its last three segments
    /// are kept. Returns `None` when no well-formed handle is present.
    pub fn parse(stdout: &str) -> Option<Self> {
        let line = stdout.lines().map(str::trim).rfind(|l| !l.is_empty())?;

        let segments: Vec<&str> = line.split('/').collect();
        if segments.len() < 3 {
            return None;
        }
        let tail = &segments[segments.len() - 3..];
        if tail.iter().any(|s| s.is_empty()) || !tail[2].bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            raw: tail.join("/"),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Project segment, the first of the three kept segments.
    pub fn project(&self) -> &str {
        self.raw.split('/').next().unwrap_or_default()
    }

    /// Everything except the run number, e.g. `acme/widget`.
    pub fn target_path(&self) -> &str {
        self.raw
            .rsplit_once('/')
            .map(|(target, _)| target)
            .unwrap_or(&self.raw)
    }

    /// Second-to-last segment; names the generated report files.
    pub fn run_name(&self) -> &str {
        self.raw.rsplit('/').nth(1).unwrap_or_default()
    }

    pub fn run_number(&self) -> &str {
        self.raw.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
