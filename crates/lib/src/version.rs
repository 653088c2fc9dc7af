//! Classification of version specifications.
//!
//! A version setting is classified exactly once into an acquisition
//! strategy; everything downstream consumes the strategy as data and never
//! re-inspects the raw string. A spec that matches no rule is fatal: there
//! is no fallback strategy.

use thiserror::Error;

/// Errors from version classification.
#[derive(Debug, Error)]
pub enum VersionError {
  /// The spec matched no known version shape or sentinel.
  #[error("malformed version specification {spec:?}")]
  Malformed { spec: String },
}

/// Distribution channel a release tarball is published under.
///
/// Upstream publishes releases whose middle component falls in a small
/// fixed supported set under `supported/`, everything else under `devel/`.
/// That is the distributor's published policy, kept here as a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseChannel {
  Supported,
  Development,
}

/// Middle components of three-part release numbers on the supported channel.
const SUPPORTED_SERIES: [u32; 4] = [3, 6, 9, 12];

impl ReleaseChannel {
  /// Sub-path of the distribution area this channel publishes under.
  pub fn subpath(self) -> &'static str {
    match self {
      ReleaseChannel::Supported => "supported",
      ReleaseChannel::Development => "devel",
    }
  }
}

/// How a target's source is obtained, derived from its version setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionStrategy {
  /// A numbered release, downloaded as a tarball and extracted.
  ReleaseTarball {
    version: String,
    channel: ReleaseChannel,
  },

  /// A pinned revision (or the repository head) from centralized source
  /// control.
  SourceRevision { revision: String },

  /// The development branch, cloned from scratch on every acquisition.
  RollingBranch,

  /// Defer to the revision the dependency target recorded for itself.
  InheritedFromDependency,
}

/// Classify a version specification.
///
/// Rules, in precedence order: a `YYYY.MM` or three-part dotted numeric
/// release; the `bleeding` sentinel; `HEAD` or a 5-6 digit revision; the
/// cross-target deferral sentinel `Rakudo-decides`; anything else is
/// malformed.
pub fn classify(spec: &str) -> Result<AcquisitionStrategy, VersionError> {
  if is_year_month(spec) {
    return Ok(AcquisitionStrategy::ReleaseTarball {
      version: spec.to_string(),
      channel: ReleaseChannel::Development,
    });
  }

  if let Some(channel) = three_part_channel(spec) {
    return Ok(AcquisitionStrategy::ReleaseTarball {
      version: spec.to_string(),
      channel,
    });
  }

  if spec == "bleeding" {
    return Ok(AcquisitionStrategy::RollingBranch);
  }

  if spec == "HEAD" || is_bare_revision(spec) {
    return Ok(AcquisitionStrategy::SourceRevision {
      revision: spec.to_string(),
    });
  }

  if spec == "Rakudo-decides" {
    return Ok(AcquisitionStrategy::InheritedFromDependency);
  }

  Err(VersionError::Malformed {
    spec: spec.to_string(),
  })
}

/// `YYYY.MM`: four digits, a dot, two digits.
fn is_year_month(spec: &str) -> bool {
  let bytes = spec.as_bytes();
  bytes.len() == 7
    && bytes[..4].iter().all(u8::is_ascii_digit)
    && bytes[4] == b'.'
    && bytes[5..].iter().all(u8::is_ascii_digit)
}

/// Three dotted numeric parts; the middle one selects the channel.
fn three_part_channel(spec: &str) -> Option<ReleaseChannel> {
  let mut parts = spec.split('.');
  let (major, minor, patch) = (parts.next()?, parts.next()?, parts.next()?);
  if parts.next().is_some() {
    return None;
  }

  for part in [major, minor, patch] {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
      return None;
    }
  }

  let series: u32 = minor.parse().ok()?;
  if SUPPORTED_SERIES.contains(&series) {
    Some(ReleaseChannel::Supported)
  } else {
    Some(ReleaseChannel::Development)
  }
}

/// A bare checkout revision: five or six decimal digits.
fn is_bare_revision(spec: &str) -> bool {
  (5..=6).contains(&spec.len()) && spec.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn year_month_release() {
    assert_eq!(
      classify("2010.04").unwrap(),
      AcquisitionStrategy::ReleaseTarball {
        version: "2010.04".to_string(),
        channel: ReleaseChannel::Development,
      }
    );
  }

  #[test]
  fn three_part_release_in_supported_series() {
    for spec in ["2.3.0", "2.6.0", "1.9.1", "3.12.0"] {
      match classify(spec).unwrap() {
        AcquisitionStrategy::ReleaseTarball { channel, version } => {
          assert_eq!(channel, ReleaseChannel::Supported, "{spec}");
          assert_eq!(version, spec);
        }
        other => panic!("{spec} classified as {other:?}"),
      }
    }
  }

  #[test]
  fn three_part_release_outside_supported_series() {
    for spec in ["2.2.0", "2.4.1", "0.1.0"] {
      match classify(spec).unwrap() {
        AcquisitionStrategy::ReleaseTarball { channel, .. } => {
          assert_eq!(channel, ReleaseChannel::Development, "{spec}");
        }
        other => panic!("{spec} classified as {other:?}"),
      }
    }
  }

  #[test]
  fn bleeding_is_the_rolling_branch() {
    assert_eq!(classify("bleeding").unwrap(), AcquisitionStrategy::RollingBranch);
  }

  #[test]
  fn head_and_bare_revisions_are_source_revisions() {
    assert_eq!(
      classify("HEAD").unwrap(),
      AcquisitionStrategy::SourceRevision {
        revision: "HEAD".to_string()
      }
    );
    assert_eq!(
      classify("45822").unwrap(),
      AcquisitionStrategy::SourceRevision {
        revision: "45822".to_string()
      }
    );
    assert_eq!(
      classify("123456").unwrap(),
      AcquisitionStrategy::SourceRevision {
        revision: "123456".to_string()
      }
    );
  }

  #[test]
  fn deferral_sentinel() {
    assert_eq!(
      classify("Rakudo-decides").unwrap(),
      AcquisitionStrategy::InheritedFromDependency
    );
  }

  #[test]
  fn everything_else_is_malformed() {
    for spec in [
      "garbage", "", "2.3", "2.3.0.1", "2010.4", "1234", "1234567", "head", "Bleeding", "2.x.0",
      "HEAD ",
    ] {
      assert!(
        matches!(classify(spec), Err(VersionError::Malformed { .. })),
        "{spec:?} should be malformed"
      );
    }
  }

  #[test]
  fn channel_subpaths() {
    assert_eq!(ReleaseChannel::Supported.subpath(), "supported");
    assert_eq!(ReleaseChannel::Development.subpath(), "devel");
  }
}
