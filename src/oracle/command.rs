//! External-process oracle (radamsa by default).

use std::io::Write as _;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::{JfuzzError, JfuzzResult, MutationOracle};

pub const DEFAULT_ORACLE_PROGRAM: &str = "radamsa";

/// Spawns the configured program once per call, writes the whole payload to
/// its stdin and blocks until it exits.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
    seed: Option<u64>,
}

impl CommandOracle {
    /// Checks that the program can be spawned (`<program> -V`) before any
    /// mutation happens.
    pub fn detect(program: impl Into<String>, args: Vec<String>) -> JfuzzResult<Self> {
        let program = program.into();
        let output = Command::new(&program)
            .arg("-V")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| JfuzzError::OracleUnavailable {
                program: program.clone(),
                reason: e.to_string(),
            })?;
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("using oracle {program} ({version})");
        Ok(Self {
            program,
            args,
            seed: None,
        })
    }

    /// Forwards `--seed <n>` to the program, incremented on every call.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl MutationOracle for CommandOracle {
    fn mutate(&mut self, input: &[u8]) -> JfuzzResult<Vec<u8>> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(seed) = self.seed {
            cmd.arg("--seed").arg(seed.to_string());
            self.seed = Some(seed.wrapping_add(1));
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| JfuzzError::Oracle(format!("failed to spawn {:?}: {e}", self.program)))?;

        {
            let Some(mut stdin) = child.stdin.take() else {
                return Err(JfuzzError::Oracle("oracle stdin unavailable".to_string()));
            };
            stdin.write_all(input)?;
        }

        let output = child.wait_with_output()?;
        debug!(
            in_len = input.len(),
            out_len = output.stdout.len(),
            "oracle {} returned",
            self.program
        );
        Ok(output.stdout)
    }
}
