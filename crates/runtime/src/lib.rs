//! Browser engine lifecycle for the rendered-page probe.
//!
//! Launches a Chromium-family browser with remote debugging on a private
//! profile, drives a single page over the Chrome DevTools Protocol, and
//! returns the rendered DOM. The browser process is owned by [`Browser`] and
//! is killed when the handle is closed or dropped.

pub mod browser;
pub mod cdp;
pub mod cdp_probe;
pub mod error;
pub mod finder;
pub mod process;

pub use browser::{Browser, LaunchOptions, RenderedPage};
pub use cdp::CdpSession;
pub use cdp_probe::{CdpTarget, CdpVersionInfo};
pub use error::{Result, RuntimeError};
