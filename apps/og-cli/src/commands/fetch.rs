// fetch.rs — Send one request through an installed interceptor.
//
// Useful for trying a policy against live traffic: the request goes through
// the same reqwest adapter an agent would use, so blocking, warnings and the
// event log all behave exactly as they would in the host application.

use std::path::Path;

use og_intercept::{Interceptor, InterceptorConfig, SendError, Transport};

pub fn execute(config_path: &Path, method: &str, url: &str) -> anyhow::Result<bool> {
    let config = InterceptorConfig::load_or_default(config_path)?;
    let interceptor = Interceptor::new(config);
    let _installed = interceptor.install_scoped()?;

    let method = reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
    let request = reqwest::blocking::Request::new(method, reqwest::Url::parse(url)?);
    let client = interceptor.wrap(reqwest::blocking::Client::new());

    let allowed = match client.send(request) {
        Ok(response) => {
            println!("{} {}", response.status(), url);
            true
        }
        Err(SendError::Blocked(violation)) => {
            eprintln!("{}", violation);
            false
        }
        Err(SendError::Transport(e)) => return Err(e.into()),
    };

    let stats = interceptor.stats();
    tracing::debug!(
        events_logged = stats.events_logged,
        violations = stats.violations,
        "fetch complete"
    );
    Ok(allowed)
}
