//! Represents various directories on the system, including Home, Cache, Config, and current directory.

#[derive(Debug)]
pub enum FsAccess {
    Home,
    Cache,
    Config,
    Current,
}

#[allow(dead_code)]
impl FsAccess {
    /// Default output location for saved annotations, under the current directory.
    pub fn save_out(subs: &[&str]) -> anyhow::Result<std::path::PathBuf> {
        Self::Current.path_with_subs(subs)
    }

    fn base_path(&self) -> anyhow::Result<std::path::PathBuf> {
        let base_path = match self {
            FsAccess::Home => dirs::home_dir(),
            FsAccess::Cache => dirs::cache_dir(),
            FsAccess::Config => dirs::config_dir(),
            FsAccess::Current => std::env::current_dir().ok(),
        };

        base_path.ok_or_else(|| {
            anyhow::anyhow!("Unsupported operating system. Supported OS: Linux, MacOS, Windows.")
        })
    }

    /// Returns the default path for the `bvr` directory, creating it automatically if it does not exist.
    ///
    /// Examples:
    /// `~/.cache/bvr`, `~/.config/bvr`, `~/.bvr`.
    pub fn path(&self) -> anyhow::Result<std::path::PathBuf> {
        let mut d = self.base_path()?;
        if let FsAccess::Home = self {
            d.push(".bvr");
        } else {
            d.push("bvr");
        }
        Self::create_directory(&d)?;
        Ok(d)
    }

    /// Constructs a path under the base directory with the provided subdirectories, creating it automatically.
    pub fn path_with_subs(&self, subs: &[&str]) -> anyhow::Result<std::path::PathBuf> {
        let mut d = self.base_path()?;
        for sub in subs {
            d.push(sub);
        }
        Self::create_directory(&d)?;
        Ok(d)
    }

    fn create_directory(path: &std::path::PathBuf) -> anyhow::Result<()> {
        if !path.exists() {
            std::fs::create_dir_all(path)?;
        }
        Ok(())
    }
}
