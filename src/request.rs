//! Incoming request representation.

/// How the request was initiated.
///
/// Navigations (address-bar loads, link clicks) are eligible for the
/// app-shell shortcut; sub-resource requests (scripts, images, XHRs) never
/// are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
  Navigate,
  SubResource,
}

/// A request to resolve: a full URL plus how it was initiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub url: String,
  pub mode: RequestMode,
}

impl Request {
  pub fn navigate(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      mode: RequestMode::Navigate,
    }
  }

  pub fn sub_resource(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      mode: RequestMode::SubResource,
    }
  }
}
