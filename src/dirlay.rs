//! Раскладка файлов во временной директории для тестов.
//!
//! ```rust,ignore
//! let layout = DirectoryLayout::new()
//!     .file(File::new("app/config.sx", "(class Config)"))
//!     .chdir("app");
//! let dir = layout.create()?;
//! let _cwd = dir.pushd()?;
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;

/// Файл раскладки: относительный путь и содержимое.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub path: PathBuf,
    pub text: String,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Описание раскладки.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLayout {
    pub files: Vec<File>,
    /// Поддиректория, в которую переходит [`LayoutDir::pushd`].
    pub chdir: Option<PathBuf>,
}

impl DirectoryLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, file: File) -> Self {
        self.files.push(file);
        self
    }

    pub fn chdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chdir = Some(dir.into());
        self
    }

    /// Записать файлы в новую временную директорию.
    ///
    /// Директория удаляется вместе с возвращённым [`LayoutDir`].
    pub fn create(&self) -> io::Result<LayoutDir> {
        let root = TempDir::new()?;
        for file in &self.files {
            let path = root.path().join(&file.path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &file.text)?;
        }
        debug!(
            "Created layout with {} files in {}",
            self.files.len(),
            root.path().display()
        );
        Ok(LayoutDir {
            root,
            chdir: self.chdir.clone(),
        })
    }
}

/// Созданная раскладка.
#[derive(Debug)]
pub struct LayoutDir {
    root: TempDir,
    chdir: Option<PathBuf>,
}

impl LayoutDir {
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Рабочая директория раскладки: корень или `chdir` внутри него.
    pub fn cwd(&self) -> PathBuf {
        match &self.chdir {
            Some(dir) => self.root.path().join(dir),
            None => self.root.path().to_path_buf(),
        }
    }

    /// Перейти в [`Self::cwd`] до удаления гарда.
    ///
    /// Меняет рабочую директорию всего процесса.
    pub fn pushd(&self) -> io::Result<PushdGuard> {
        let previous = env::current_dir()?;
        let target = self.cwd();
        fs::create_dir_all(&target)?;
        env::set_current_dir(&target)?;
        Ok(PushdGuard { previous })
    }
}

/// Возвращает прежнюю рабочую директорию при удалении.
#[derive(Debug)]
pub struct PushdGuard {
    previous: PathBuf,
}

impl Drop for PushdGuard {
    fn drop(&mut self) {
        if let Err(err) = env::set_current_dir(&self.previous) {
            warn!(
                "Failed to restore working directory {}: {}",
                self.previous.display(),
                err
            );
        }
    }
}
