pub mod os;
pub mod paths;

pub use os::{Os, UnknownOs};

/// Returns the platform name for the current system (e.g., "darwin")
///
/// Returns `None` if the current platform is not supported
pub fn platform_name() -> Option<&'static str> {
  Os::current().map(|os| os.as_str())
}
