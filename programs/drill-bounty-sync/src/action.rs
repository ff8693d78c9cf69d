//! GitHub Actions workflow plumbing: step outputs and error annotations.

use std::{
    env,
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
};

use tracing::info;

const OUTPUT_FILE_VAR: &str = "GITHUB_OUTPUT";
const MULTILINE_DELIMITER: &str = "DRILL_BOUNTY_SYNC_EOF";

/// Escapes a workflow command message.
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Appends `name=value` to the step output file at `path`.
pub fn write_output(path: &Path, name: &str, value: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if value.contains('\n') {
        writeln!(file, "{name}<<{MULTILINE_DELIMITER}\n{value}\n{MULTILINE_DELIMITER}")
    } else {
        writeln!(file, "{name}={value}")
    }
}

/// Sets a step output. Outside of Actions the value is only logged.
pub fn set_output(name: &str, value: &str) -> io::Result<()> {
    match env::var_os(OUTPUT_FILE_VAR) {
        Some(path) if !path.is_empty() => write_output(Path::new(&path), name, value),
        _ => {
            info!(name, value, "step output");
            Ok(())
        }
    }
}

/// Reports `message` as an error annotation on the workflow run.
pub fn set_failed(message: &str) {
    println!("::error::{}", escape_data(message));
}
