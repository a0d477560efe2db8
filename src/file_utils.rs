use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

// @module: File and path utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @returns: Input path without its extension
    fn base_path(input_file: &Path) -> PathBuf {
        let stem = input_file.file_stem().unwrap_or_default();
        input_file.with_file_name(stem)
    }

    // @generates: Sibling path `<base><suffix>` next to the input
    fn sibling(input_file: &Path, suffix: &str) -> PathBuf {
        let mut name = Self::base_path(input_file).into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    // @generates: Flat text output path, `<base>_translated.txt`
    pub fn text_output_path<P: AsRef<Path>>(input_file: P) -> PathBuf {
        Self::sibling(input_file.as_ref(), "_translated.txt")
    }

    // @generates: Structured output path, `<base>_translated.<extension>`
    pub fn document_output_path<P: AsRef<Path>>(input_file: P, extension: &str) -> PathBuf {
        Self::sibling(input_file.as_ref(), &format!("_translated.{}", extension))
    }

    // @generates: Resumption cache path, `<base>_process.json`
    pub fn cache_path<P: AsRef<Path>>(input_file: P) -> PathBuf {
        Self::sibling(input_file.as_ref(), "_process.json")
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }
}
