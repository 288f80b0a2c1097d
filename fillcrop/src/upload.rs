use anyhow::{Context, Result};

use std::io::{Cursor, Read};
use std::path::Path;

/// Something the user handed us: a file name and a stream of (hopefully) image bytes.
pub trait Upload {
    fn name(&self) -> &str;

    fn open(&self) -> std::io::Result<Box<dyn Read + '_>>;
}

/// An upload that already lives in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .with_context(|| format!("Not a file: {}", path.display()))?
            .to_string_lossy()
            .to_string();

        let data =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

        Ok(Self { name, data })
    }
}

impl Upload for UploadedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(self.data.as_slice())))
    }
}

impl<U> Upload for Box<U>
where
    U: Upload + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + '_>> {
        (**self).open()
    }
}

impl<U> Upload for &U
where
    U: Upload + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + '_>> {
        (**self).open()
    }
}
