//! Probe script run inside each image, and the parser for its output
//!
//! The script and the parser form a wire contract. On success the container
//! prints:
//!
//! ```text
//! GEMFILE_DIR=<directory holding the Gemfile>
//! <Gemfile content>
//! ===GEMFILE.EOF===
//! <Gemfile.lock content>
//! ```
//!
//! and exits 0. When no candidate exists it prints `ERROR: No Gemfile found`
//! and exits 1. Any change to either side bumps [`PROBE_SCRIPT_VERSION`].

use crate::container::error::ProbeError;

pub const PROBE_SCRIPT_VERSION: u32 = 1;

/// Searched in order; the first existing file wins
pub const CANDIDATE_MANIFEST_PATHS: [&str; 4] = [
    "/metanorma/Gemfile",
    "/setup/Gemfile",
    "/Gemfile",
    "/root/Gemfile",
];

pub const DIR_MARKER: &str = "GEMFILE_DIR=";

pub const SENTINEL: &str = "===GEMFILE.EOF===";

pub const NOT_FOUND_MARKER: &str = "ERROR: No Gemfile found";

/// Builds the shell script passed to `sh -c` inside the container
pub fn probe_script() -> String {
    format!(
        r#"for path in {candidates}; do
  if [ -f "$path" ]; then
    dir=$(dirname "$path")
    echo "{marker}$dir"
    cat "$path"
    echo "{sentinel}"
    cat "$dir/Gemfile.lock"
    exit 0
  fi
done
echo "{not_found}"
exit 1
"#,
        candidates = CANDIDATE_MANIFEST_PATHS.join(" "),
        marker = DIR_MARKER,
        sentinel = SENTINEL,
        not_found = NOT_FOUND_MARKER,
    )
}

/// Artifacts recovered from one probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutput {
    /// Directory reported on the `GEMFILE_DIR=` line, if present
    pub source_dir: Option<String>,
    /// Trimmed manifest, without trailing newline
    pub manifest: String,
    /// Trimmed lock file, without trailing newline
    pub lock: String,
}

impl ProbeOutput {
    /// Manifest as written to disk: exactly one trailing newline
    pub fn manifest_file_content(&self) -> String {
        format!("{}\n", self.manifest)
    }

    /// Lock file as written to disk: exactly one trailing newline
    pub fn lock_file_content(&self) -> String {
        format!("{}\n", self.lock)
    }
}

/// Splits the captured stdout of a successful probe run into its two sections.
///
/// Exit status is checked by the caller; this only validates the text.
pub fn parse_probe_output(raw: &str) -> Result<ProbeOutput, ProbeError> {
    if raw.contains(NOT_FOUND_MARKER) {
        return Err(ProbeError::ManifestNotFound);
    }

    let (head, tail) = raw
        .split_once(SENTINEL)
        .ok_or(ProbeError::MissingSentinel)?;

    let (source_dir, manifest) = split_dir_marker(head);
    let manifest = manifest.trim();
    if manifest.is_empty() {
        return Err(ProbeError::EmptyManifest);
    }

    Ok(ProbeOutput {
        source_dir,
        manifest: manifest.to_string(),
        lock: tail.trim().to_string(),
    })
}

/// Strips a leading `GEMFILE_DIR=<dir>` line, returning the directory and the rest
fn split_dir_marker(head: &str) -> (Option<String>, &str) {
    let Some(after_marker) = head.strip_prefix(DIR_MARKER) else {
        return (None, head);
    };

    let (line, rest) = after_marker.split_once('\n').unwrap_or((after_marker, ""));
    let dir = line.trim_end_matches('\r').trim();

    ((!dir.is_empty()).then(|| dir.to_string()), rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "source \"https://rubygems.org\"\n\ngem \"metanorma-cli\"";
    const LOCK: &str = "GEM\n  remote: https://rubygems.org/\n  specs:\n    metanorma-cli (1.2.3)";

    #[test]
    fn probe_script_checks_candidates_in_order() {
        let script = probe_script();

        assert!(script.starts_with(
            "for path in /metanorma/Gemfile /setup/Gemfile /Gemfile /root/Gemfile; do"
        ));
        assert!(script.contains("echo \"GEMFILE_DIR=$dir\""));
        assert!(script.contains("echo \"===GEMFILE.EOF===\""));
        assert!(script.contains("cat \"$dir/Gemfile.lock\""));
        assert!(script.contains("echo \"ERROR: No Gemfile found\"\nexit 1"));
    }

    #[test]
    fn parse_splits_manifest_and_lock() {
        let raw = format!("GEMFILE_DIR=/metanorma\n{MANIFEST}\n{SENTINEL}\n{LOCK}\n");

        let output = parse_probe_output(&raw).unwrap();

        assert_eq!(output.source_dir.as_deref(), Some("/metanorma"));
        assert_eq!(output.manifest, MANIFEST);
        assert_eq!(output.lock, LOCK);
        assert_eq!(output.manifest_file_content(), format!("{MANIFEST}\n"));
        assert_eq!(output.lock_file_content(), format!("{LOCK}\n"));
    }

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let raw = format!("GEMFILE_DIR=/setup\n\n\n  {MANIFEST}  \n\n{SENTINEL}\n\n{LOCK}\n\n\n");

        let output = parse_probe_output(&raw).unwrap();

        assert_eq!(output.manifest, MANIFEST);
        assert_eq!(output.lock, LOCK);
    }

    #[test]
    fn parse_reports_not_found_marker() {
        assert_eq!(
            parse_probe_output("ERROR: No Gemfile found\n"),
            Err(ProbeError::ManifestNotFound)
        );
    }

    #[test]
    fn parse_requires_sentinel() {
        let raw = format!("GEMFILE_DIR=/metanorma\n{MANIFEST}\n{LOCK}\n");
        assert_eq!(parse_probe_output(&raw), Err(ProbeError::MissingSentinel));
    }

    #[test]
    fn parse_rejects_empty_manifest_section() {
        let raw = format!("GEMFILE_DIR=/metanorma\n{SENTINEL}\n{LOCK}\n");
        assert_eq!(parse_probe_output(&raw), Err(ProbeError::EmptyManifest));
    }

    #[test]
    fn parse_splits_on_first_sentinel_only() {
        let raw = format!("GEMFILE_DIR=/\n{MANIFEST}\n{SENTINEL}\nGEM\n{SENTINEL}\n");

        let output = parse_probe_output(&raw).unwrap();

        assert_eq!(output.lock, format!("GEM\n{SENTINEL}"));
    }

    #[test]
    fn parse_strips_dir_marker_only_at_start() {
        let manifest = format!("gem \"a\"\n{DIR_MARKER}/other");
        let raw = format!("{manifest}\n{SENTINEL}\nGEM\n");

        let output = parse_probe_output(&raw).unwrap();

        assert_eq!(output.source_dir, None);
        assert_eq!(output.manifest, manifest);
    }

    #[test]
    fn parse_strips_only_first_dir_marker_line() {
        let raw = format!("GEMFILE_DIR=/metanorma\r\nGEMFILE_DIR=/kept\n{SENTINEL}\nGEM\n");

        let output = parse_probe_output(&raw).unwrap();

        assert_eq!(output.source_dir.as_deref(), Some("/metanorma"));
        assert_eq!(output.manifest, "GEMFILE_DIR=/kept");
    }
}
