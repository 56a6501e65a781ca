//! Opt-in stderr logging for hosts that load the library.
//!
//! A library should not print into its host's stderr uninvited, so nothing
//! is installed unless `HTTPC_LOG` holds an `EnvFilter` directive such as
//! `httpc=debug,httpc_core=debug`. `try_init` leaves an already-installed
//! global subscriber alone.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const ENV_LOG: &str = "HTTPC_LOG";

pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let Ok(filter) = EnvFilter::try_from_env(ENV_LOG) else {
            return;
        };
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init();
        if installed.is_ok() {
            tracing::debug!("httpc logging enabled via {ENV_LOG}");
        }
    });
}
