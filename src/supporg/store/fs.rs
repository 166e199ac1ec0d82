use super::DocumentStore;
use crate::error::{Result, SupporgError};
use crate::model::Document;
use std::fs;
use std::path::{Path, PathBuf};

const DATA_FILENAME: &str = "data.json";

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_file(&self) -> PathBuf {
        self.root.join(DATA_FILENAME)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(SupporgError::Io)?;
        }
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn load(&self) -> Result<Option<Document>> {
        let data_file = self.data_file();
        if !data_file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(data_file).map_err(SupporgError::Io)?;
        let doc: Document = serde_json::from_str(&content).map_err(SupporgError::Serialization)?;
        Ok(Some(doc))
    }

    fn save(&mut self, doc: &Document) -> Result<()> {
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(doc).map_err(SupporgError::Serialization)?;

        // Temp file, then rename into place.
        let tmp = self.root.join(format!("{}.tmp", DATA_FILENAME));
        fs::write(&tmp, content).map_err(SupporgError::Io)?;
        fs::rename(&tmp, self.data_file()).map_err(SupporgError::Io)?;
        Ok(())
    }

    fn location(&self) -> PathBuf {
        self.data_file()
    }
}
