/*!
 * Output directory handling and atomic report writes
 */

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{GatewayError, Result};
use crate::upload::report_file_name;

pub const OUTPUT_DIR_NAME: &str = "output";

/// Where a producer keeps its generated artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `output/` next to the running executable, independent of the
    /// working directory the program was started from
    pub fn beside_executable() -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            GatewayError::Config(format!("cannot locate the running executable: {}", e))
        })?;
        let exe = exe.canonicalize().unwrap_or(exe);
        let parent = exe.parent().ok_or_else(|| {
            GatewayError::Config(format!("executable {} has no parent directory", exe.display()))
        })?;
        Ok(Self::new(parent.join(OUTPUT_DIR_NAME)))
    }

    /// Use `explicit` when given, otherwise the directory beside the executable
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(dir) => Ok(Self::new(dir)),
            None => Self::beside_executable(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory if needed
    pub fn ensure(&self) -> Result<&Path> {
        fs::create_dir_all(&self.root).map_err(|e| GatewayError::io(&self.root, e))?;
        Ok(&self.root)
    }

    pub fn report_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Write `bytes` as `file_name` inside the directory, replacing any
    /// previous version atomically
    pub fn write_report(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        validate_file_name(file_name)?;
        self.ensure()?;
        let target = self.report_path(file_name);
        write_atomic(&target, bytes)?;
        Ok(target)
    }

    /// Copy an existing report into the directory (atomic replace).
    /// `rename_to` overrides the base name.
    pub fn import_report(&self, source: &Path, rename_to: Option<&str>) -> Result<PathBuf> {
        let metadata = fs::metadata(source).map_err(|e| GatewayError::io(source, e))?;
        if !metadata.is_file() {
            return Err(GatewayError::NotAFile(source.to_path_buf()));
        }
        let file_name = match rename_to {
            Some(name) => name.to_string(),
            None => report_file_name(source)?,
        };

        let bytes = fs::read(source).map_err(|e| GatewayError::io(source, e))?;
        self.write_report(&file_name, &bytes)
    }
}

fn validate_file_name(file_name: &str) -> Result<()> {
    let candidate = Path::new(file_name);
    let is_plain = candidate.file_name().map(|n| n == candidate.as_os_str()).unwrap_or(false);
    if file_name.is_empty() || !is_plain {
        return Err(GatewayError::Config(format!(
            "report name must be a plain file name, got '{}'",
            file_name
        )));
    }
    Ok(())
}

/// Write through a temp file in the same directory, then rename over `target`.
/// Readers see either the old file or the complete new one, never a partial write.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| GatewayError::io(dir, e))?;
    temp.write_all(bytes).map_err(|e| GatewayError::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| GatewayError::io(temp.path(), e))?;

    temp.persist(target)
        .map_err(|e| GatewayError::io(target, e.error))?;

    debug!(path = %target.display(), bytes = bytes.len(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_report_creates_directory() {
        let base = tempdir().unwrap();
        let output = OutputDir::new(base.path().join("output"));

        let path = output.write_report("stock.xlsx", b"first").unwrap();
        assert_eq!(path, base.path().join("output").join("stock.xlsx"));
        assert_eq!(fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp_files() {
        let base = tempdir().unwrap();
        let output = OutputDir::new(base.path());

        output.write_report("stock.xlsx", b"first").unwrap();
        output.write_report("stock.xlsx", b"second version").unwrap();

        assert_eq!(fs::read(base.path().join("stock.xlsx")).unwrap(), b"second version");
        assert_eq!(entries(base.path()), vec!["stock.xlsx"]);
    }

    #[test]
    fn test_rejects_nested_names() {
        let base = tempdir().unwrap();
        let output = OutputDir::new(base.path());

        assert!(output.write_report("../escape.xlsx", b"x").is_err());
        assert!(output.write_report("sub/dir.xlsx", b"x").is_err());
        assert!(output.write_report("", b"x").is_err());
    }

    #[test]
    fn test_import_report_keeps_source() {
        let base = tempdir().unwrap();
        let source = base.path().join("generated.xlsx");
        fs::write(&source, b"report bytes").unwrap();

        let output = OutputDir::new(base.path().join("output"));
        let copied = output.import_report(&source, None).unwrap();
        assert_eq!(copied.file_name().unwrap(), "generated.xlsx");
        assert_eq!(fs::read(&copied).unwrap(), b"report bytes");
        assert!(source.exists());

        let renamed = output.import_report(&source, Some("order_flow.xlsx")).unwrap();
        assert_eq!(renamed, base.path().join("output").join("order_flow.xlsx"));
    }

    #[test]
    fn test_import_missing_source() {
        let base = tempdir().unwrap();
        let output = OutputDir::new(base.path());
        let err = output.import_report(&base.path().join("nope.xlsx"), None).unwrap_err();
        assert!(matches!(err, GatewayError::FileNotFound(_)));
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        let base = tempdir().unwrap();
        let output = OutputDir::resolve(Some(base.path())).unwrap();
        assert_eq!(output.path(), base.path());

        let beside = OutputDir::resolve(None).unwrap();
        assert!(beside.path().ends_with(OUTPUT_DIR_NAME));
    }
}
