// binfronts/src/classify/subprocess.rs

use super::input::ClassifierInput;
use super::traits::FrontClassifier;
use crate::errors::ClassifyError;
use log::{debug, warn};
use ndarray::Array1;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Runs an external front detector once per granule.
///
/// The grid goes to the child's stdin as one little-endian frame:
///
/// ```text
/// u32 nrows | u64 nbins | i32 sentinel
/// nrows x u64 row bin counts
/// nrows x u64 row bases
/// nbins x f64 values
/// ```
///
/// The child answers on stdout with `nbins` little-endian `i32` codes and
/// exits with status 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubprocessClassifier {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl SubprocessClassifier {
    pub fn new<P: AsRef<Path>>(program: P, args: Vec<String>) -> Self {
        let program = program.as_ref().to_path_buf();
        let name = program.display().to_string();
        Self { program, args, name }
    }

    /// Splits a command line on whitespace; the first word is the program.
    pub fn from_command_line(command: &str) -> Result<Self, ClassifyError> {
        let mut words = command.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| ClassifyError::Subprocess("empty classifier command".to_string()))?;
        Ok(Self::new(program, words.map(String::from).collect()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl FrontClassifier for SubprocessClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, input: &ClassifierInput<'_>) -> Result<Array1<i32>, ClassifyError> {
        let frame = encode_frame(input);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        debug!("Spawned classifier {} (pid {})", self.name, child.id());

        let stdin = child.stdin.take();
        let output = std::thread::scope(|scope| {
            let writer = scope.spawn(move || -> std::io::Result<()> {
                if let Some(mut stdin) = stdin {
                    stdin.write_all(&frame)?;
                }
                Ok(())
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::new(ErrorKind::Other, "stdin writer panicked")));
            (output, written)
        });
        let (output, written) = output;
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClassifyError::Subprocess(format!(
                "{} exited with {}: {}",
                self.name,
                output.status,
                stderr.trim()
            )));
        }
        match written {
            Ok(()) => {}
            // a child may answer without consuming all of its input
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                warn!("Classifier {} closed stdin before reading the whole grid", self.name);
            }
            Err(err) => return Err(err.into()),
        }
        decode_codes(&output.stdout, input.len())
    }
}

pub(crate) fn encode_frame(input: &ClassifierInput<'_>) -> Vec<u8> {
    let nrows = input.nrows();
    let mut frame = Vec::with_capacity(16 + 16 * nrows + 8 * input.len());
    frame.extend_from_slice(&(nrows as u32).to_le_bytes());
    frame.extend_from_slice(&(input.len() as u64).to_le_bytes());
    frame.extend_from_slice(&input.code_sentinel().to_le_bytes());
    for &nbins in input.row_nbins() {
        frame.extend_from_slice(&(nbins as u64).to_le_bytes());
    }
    for &base in input.row_bases() {
        frame.extend_from_slice(&(base as u64).to_le_bytes());
    }
    for &value in input.values().iter() {
        frame.extend_from_slice(&value.to_le_bytes());
    }
    frame
}

pub(crate) fn decode_codes(bytes: &[u8], expected: usize) -> Result<Array1<i32>, ClassifyError> {
    if bytes.len() % 4 != 0 {
        return Err(ClassifyError::Subprocess(format!(
            "classifier wrote {} bytes, not a whole number of i32 codes",
            bytes.len()
        )));
    }
    let found = bytes.len() / 4;
    if found != expected {
        return Err(ClassifyError::OutputLengthMismatch { expected, found });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
