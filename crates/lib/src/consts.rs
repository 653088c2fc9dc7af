//! Shared constants: fixed file names and upstream distribution locations.

/// Directory under the user's home that holds everything proto manages.
pub const APP_DIR_NAME: &str = ".proto";

/// Name of the settings file inside the state directory.
pub const CONFIG_FILE_NAME: &str = "proto.conf";

/// Stamp file written into a build tree after acquisition/extraction,
/// recording the exact version or revision the tree was produced from.
pub const REVISION_STAMP_FILE: &str = ".revision-stamp";

/// Build-control file generated by a target's configure step.
pub const BUILD_CONTROL_FILE: &str = "Makefile";

/// Output every target's verify invocation is expected to print.
pub const VERIFY_EXPECTED_OUTPUT: &str = "ok";

/// Base URL for Parrot release tarballs; the channel sub-path
/// (`supported` or `devel`) and version are appended.
pub const PARROT_RELEASE_BASE_URL: &str = "http://ftp.parrot.org/releases";

/// Subversion trunk for Parrot revision/HEAD checkouts.
pub const PARROT_SVN_URL: &str = "https://svn.parrot.org/parrot/trunk";

/// Git mirror cloned for Parrot's rolling branch.
pub const PARROT_GIT_URL: &str = "https://github.com/parrot/parrot.git";

/// Base URL for Rakudo release tarballs.
pub const RAKUDO_RELEASE_BASE_URL: &str = "http://cloud.github.com/downloads/rakudo/rakudo";

/// Git repository cloned for Rakudo's rolling branch.
pub const RAKUDO_GIT_URL: &str = "https://github.com/rakudo/rakudo.git";

/// Subversion location of Rakudo for revision/HEAD checkouts.
pub const RAKUDO_SVN_URL: &str = "https://svn.parrot.org/parrot/trunk/languages/perl6";
