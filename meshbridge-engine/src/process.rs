//! Geometry kernel running as a child process
//!
//! One process per request: the JSON request is written to the child's
//! stdin, the JSON response is read back from its stdout. [`serve`] is the
//! other end of the pipe.

use crate::wire::{WireRequest, WireResponse};
use crate::GeometryEngine;
use meshbridge_core::{Error, Result};
use std::io::{BufRead, ErrorKind, Write};
use std::process::{Command, Stdio};

/// Spawns `program args...` for every request
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl GeometryEngine for CommandEngine {
    fn call(&mut self, request: &WireRequest) -> Result<WireResponse> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| Error::EngineFailure(format!("cannot encode request: {}", e)))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::EngineFailure(format!("cannot start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload) {
                Ok(()) => {}
                // The child may exit without reading; its status tells the rest
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => {
                    // Reap the child before giving up
                    if let Err(kill) = child.kill() {
                        log::debug!("Cannot stop {}: {}", self.program, kill);
                    }
                    let _ = child.wait();
                    return Err(Error::EngineFailure(format!("cannot send request: {}", e)));
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::EngineFailure(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::MalformedResult(format!("cannot decode engine response: {}", e)))
    }
}

/// Answer requests read from `reader`, one JSON document per line
///
/// Undecodable lines get a failure response instead of ending the loop.
pub fn serve<E, R, W>(engine: &mut E, reader: R, mut writer: W) -> Result<usize>
where
    E: GeometryEngine + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut answered = 0;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<WireRequest>(&line) {
            Ok(request) => engine.call(&request)?,
            Err(e) => WireResponse::failure(format!("cannot decode request: {}", e)),
        };
        serde_json::to_writer(&mut writer, &response)
            .map_err(|e| Error::EngineFailure(format!("cannot encode response: {}", e)))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        answered += 1;
    }
    Ok(answered)
}
