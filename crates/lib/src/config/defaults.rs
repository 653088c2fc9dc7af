//! Default content for a freshly created settings file.

use crate::layout::Layout;

use super::{Comments, Settings};

#[cfg(windows)]
const DEFAULT_MAKE: &str = "mingw32-make";
#[cfg(not(windows))]
const DEFAULT_MAKE: &str = "make";

#[cfg(windows)]
const PERL6_BINARY: &str = "perl6.exe";
#[cfg(not(windows))]
const PERL6_BINARY: &str = "perl6";

/// Settings a new installation starts from, with every directory derived
/// from the layout and fixed defaults for the version/tooling keys.
pub(super) fn default_settings(layout: &Layout) -> Settings {
  let path = |p: std::path::PathBuf| p.to_string_lossy().into_owned();

  let mut settings = Settings::new();
  settings.set("Perl 6 library", path(layout.library_dir()));
  settings.set("Proto projects cache", path(layout.cache_dir()));
  settings.set("Rakudo build directory", path(layout.build_dir_for("rakudo")));
  settings.set("Rakudo version", "bleeding");
  settings.set("Parrot build directory", path(layout.build_dir_for("parrot")));
  settings.set("Parrot install directory", path(layout.install_dir_for("parrot")));
  settings.set("Parrot version", "2.3.0");
  settings.set(
    "Perl 6 executable",
    path(layout.build_dir_for("rakudo").join(PERL6_BINARY)),
  );
  settings.set("Make utility", DEFAULT_MAKE);
  settings
}

pub(super) fn default_comments() -> Comments {
  let mut comments = Comments::new();
  comments.set_file(vec![
    "Settings for proto, the Rakudo Perl 6 bootstrapper.".to_string(),
    "Review the values below before running 'proto install rakudo';".to_string(),
    "directories are created on demand, versions decide what gets fetched.".to_string(),
  ]);
  comments.set_for_key(
    "Rakudo version",
    vec![
      "A release like 2010.04, a revision, HEAD, 'bleeding' for a fresh".to_string(),
      "clone of the development branch, or 'Rakudo-decides' to adopt the".to_string(),
      "revision the Parrot checkout was pinned at.".to_string(),
    ],
  );
  comments.set_for_key(
    "Parrot version",
    vec!["A release like 2.3.0, a Subversion revision, or HEAD.".to_string()],
  );
  comments
}
