use crate::consts::APP_DIR_NAME;
use std::path::PathBuf;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  let userprofile = std::env::var("USERPROFILE").expect("USERPROFILE not set");
  PathBuf::from(userprofile)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  let home = std::env::var("HOME").expect("HOME not set");
  PathBuf::from(home)
}

/// Returns the root directory everything proto manages lives under.
///
/// `PROTO_ROOT` overrides the default `<home>/.proto`.
pub fn root_dir() -> PathBuf {
  if let Ok(path) = std::env::var("PROTO_ROOT") {
    return PathBuf::from(path);
  }

  home_dir().join(APP_DIR_NAME)
}
