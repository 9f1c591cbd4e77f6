//! Turning a model-authored code blob into a registered handler.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::core::sanitize::clean_handler_source;
use crate::io::registry::{HandlerRegistry, RegistryError};

/// Why handler synthesis failed. Either way the authoring session is over;
/// the loop driver reports the outcome and keeps stepping.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("command '{0}' already exists")]
    Collision(String),

    #[error("failed to save command '{name}': {source}")]
    Persist {
        name: String,
        #[source]
        source: RegistryError,
    },
}

/// Sanitize `raw` and persist it as a new handler named `name`.
///
/// The write is all-or-nothing: on collision nothing is touched, and a
/// failed write leaves no partial file behind (the registry renames a
/// completed temp file into place).
pub fn synthesize_handler(
    registry: &HandlerRegistry,
    name: &str,
    raw: &str,
) -> Result<PathBuf, SynthesisError> {
    let code = clean_handler_source(raw);
    match registry.create(name, &code) {
        Ok(path) => {
            info!(name, path = %path.display(), "handler synthesized");
            Ok(path)
        }
        Err(RegistryError::Collision(existing)) => {
            warn!(name, "handler name collision");
            Err(SynthesisError::Collision(existing))
        }
        Err(source) => {
            warn!(name, error = %source, "handler persist failed");
            Err(SynthesisError::Persist {
                name: name.to_string(),
                source,
            })
        }
    }
}
