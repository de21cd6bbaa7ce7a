// adapters/mod.rs — Transport implementations for HTTP client libraries.
//
// Each client library sits behind its own Cargo feature. A build without the
// feature simply has no adapter for that library; the core is unaffected.

#[cfg(feature = "reqwest")]
pub mod reqwest;

/// Names of the client adapters compiled into this build.
pub fn available() -> &'static [&'static str] {
    if cfg!(feature = "reqwest") {
        &["reqwest"]
    } else {
        &[]
    }
}
