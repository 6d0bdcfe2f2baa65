use crate::core::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

/// 本機檔案系統。相對路徑以 `base_path` 為起點，絕對路徑照原樣使用。
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    pub fn current_dir() -> Self {
        Self::new(".".to_string())
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn rename_file(&self, from: &str, to: &str) -> Result<()> {
        let base = Path::new(&self.base_path);
        fs::rename(base.join(from), base.join(to))?;
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        fs::remove_file(Path::new(&self.base_path).join(path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        storage.write_file("outputs/assignments.csv", b"a,0,Spain,1\n").await.unwrap();
        let data = storage.read_file("outputs/assignments.csv").await.unwrap();

        assert_eq!(data, b"a,0,Spain,1\n");
    }

    #[tokio::test]
    async fn test_rename_replaces_and_remove_deletes() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        storage.write_file("out/a.csv", b"old").await.unwrap();
        storage.write_file("out/a.csv.tmp", b"new").await.unwrap();
        storage.rename_file("out/a.csv.tmp", "out/a.csv").await.unwrap();

        assert_eq!(storage.read_file("out/a.csv").await.unwrap(), b"new");
        assert!(!temp_dir.path().join("out/a.csv.tmp").exists());

        storage.remove_file("out/a.csv").await.unwrap();
        assert!(!temp_dir.path().join("out/a.csv").exists());
    }

    #[tokio::test]
    async fn test_absolute_paths_ignore_base() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("roster.csv");
        std::fs::write(&file, "x").unwrap();

        let storage = LocalStorage::new("/nonexistent".to_string());
        let data = storage.read_file(file.to_str().unwrap()).await.unwrap();
        assert_eq!(data, b"x");
    }
}
