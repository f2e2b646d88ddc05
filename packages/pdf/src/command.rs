//! Engines that run an external program and read its JSON output.

use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;
use statement_tables_table_models::ExtractionMethod;

use crate::{PdfError, RawGrid, TableEngine, output};

/// Argument placeholder replaced with the path of the PDF being read.
pub const PDF_PLACEHOLDER: &str = "{pdf}";

/// Default location of the `tabula-java` jar.
pub const DEFAULT_TABULA_JAR: &str = "tabula.jar";

/// Maximum length of the stderr excerpt kept in error messages.
const STDERR_PREVIEW_LEN: usize = 500;

/// Program and arguments for one engine.
///
/// If no argument contains [`PDF_PLACEHOLDER`] the PDF path is appended as
/// the last argument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandEngineConfig {
    /// Executable to run (looked up on `PATH`).
    pub program: String,
    /// Arguments, possibly containing [`PDF_PLACEHOLDER`].
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandEngineConfig {
    /// `tabula-java` detecting ruled tables on every page.
    #[must_use]
    pub fn tabula_lattice(jar: &str) -> Self {
        Self::tabula(jar, &["--lattice"])
    }

    /// `tabula-java` detecting whitespace-separated tables on every page.
    ///
    /// `--guess` enables table-area detection, so a page holding several
    /// tables yields several grids instead of one page-wide grid.
    #[must_use]
    pub fn tabula_stream(jar: &str) -> Self {
        Self::tabula(jar, &["--stream", "--guess"])
    }

    fn tabula(jar: &str, mode: &[&str]) -> Self {
        let args = ["-jar", jar]
            .into_iter()
            .chain(mode.iter().copied())
            .chain(["--pages", "all", "--format", "JSON", PDF_PLACEHOLDER])
            .map(str::to_owned)
            .collect();
        Self {
            program: "java".to_string(),
            args,
        }
    }

    /// Resolves the argument list for a specific PDF.
    #[must_use]
    pub fn resolve_args(&self, pdf_path: &Path) -> Vec<String> {
        let path = pdf_path.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(PDF_PLACEHOLDER, &path))
            .collect();
        if !self.args.iter().any(|arg| arg.contains(PDF_PLACEHOLDER)) {
            args.push(path.into_owned());
        }
        args
    }
}

/// A [`TableEngine`] backed by an external program.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    name: String,
    method: ExtractionMethod,
    config: CommandEngineConfig,
}

impl CommandEngine {
    /// Creates an engine with an explicit name and kind.
    #[must_use]
    pub fn new(name: &str, method: ExtractionMethod, config: CommandEngineConfig) -> Self {
        Self {
            name: name.to_owned(),
            method,
            config,
        }
    }

    /// The primary (ruled table) engine.
    #[must_use]
    pub fn lattice(config: CommandEngineConfig) -> Self {
        Self::new(
            ExtractionMethod::PrimaryLattice.engine_label(),
            ExtractionMethod::PrimaryLattice,
            config,
        )
    }

    /// The secondary (borderless table) engine.
    #[must_use]
    pub fn stream(config: CommandEngineConfig) -> Self {
        Self::new(
            ExtractionMethod::SecondaryStream.engine_label(),
            ExtractionMethod::SecondaryStream,
            config,
        )
    }

    /// The program configuration this engine runs.
    #[must_use]
    pub const fn config(&self) -> &CommandEngineConfig {
        &self.config
    }
}

impl TableEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> ExtractionMethod {
        self.method
    }

    fn read_tables(&self, pdf_path: &Path) -> Result<Vec<RawGrid>, PdfError> {
        let args = self.config.resolve_args(pdf_path);

        log::debug!(
            "Running {} engine: {} {}",
            self.name,
            self.config.program,
            args.join(" ")
        );

        let output = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| PdfError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let stderr = if stderr.len() > STDERR_PREVIEW_LEN {
                let mut end = STDERR_PREVIEW_LEN;
                while !stderr.is_char_boundary(end) {
                    end -= 1;
                }
                format!("{}...", &stderr[..end])
            } else {
                stderr.to_owned()
            };
            return Err(PdfError::EngineExit {
                engine: self.name.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }

        log::debug!(
            "{} engine wrote {} bytes of output",
            self.name,
            output.stdout.len()
        );

        output::parse_tables(&output.stdout)
    }
}
