use std::{fs, io::Cursor, path::Path};

use anyhow::{Context, Result};

use crate::env::EnvMap;

/// Reads a dotenv file into a fresh map, keeping the file's own ordering
/// semantics (later assignments win).
pub fn load_env_file(path: &Path) -> Result<EnvMap> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading env file {}", path.display()))?;

    let mut env = EnvMap::new();
    for item in dotenvy::from_read_iter(Cursor::new(content)) {
        let (key, value) = item.with_context(|| format!("parsing env file {}", path.display()))?;
        env.insert(key, value);
    }

    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn load_env_file_reads_values() -> Result<()> {
        let temp = tempdir()?;
        let env_path = temp.path().join("vars.env");
        fs::write(&env_path, "PASSWORD=123456789\nBASE=https://serverest.dev\n")?;

        let env = load_env_file(&env_path)?;

        assert_eq!(env.get("PASSWORD"), Some(&"123456789".to_string()));
        assert_eq!(env.get("BASE"), Some(&"https://serverest.dev".to_string()));
        Ok(())
    }

    #[test]
    fn load_env_file_later_assignments_win() -> Result<()> {
        let temp = tempdir()?;
        let env_path = temp.path().join("dup.env");
        fs::write(&env_path, "TOKEN=first\nTOKEN=second\n")?;

        let env = load_env_file(&env_path)?;
        assert_eq!(env.get("TOKEN"), Some(&"second".to_string()));
        Ok(())
    }

    #[test]
    fn load_env_file_propagates_io_errors() {
        let path = PathBuf::from("does-not-exist.env");
        let err = load_env_file(&path).unwrap_err();
        assert!(err.to_string().contains("reading env file"));
    }
}
