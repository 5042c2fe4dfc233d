//! Doc-comment types to resolved type sets.
//!
//! [`Converter`] lowers one parsed [`TypeExpr`](verity_doc::TypeExpr) into a
//! list of [`Type`](verity_types::Type)s, registering the shapes and closures
//! it meets on the way. [`DocTypes`] runs the converter over the tags of a
//! function's doc comment and normalizes the result into
//! [`Map`](verity_types::Map)s keyed by parameter name.

mod converter;
mod doc_types;

pub use converter::{Converter, Lowered};
pub use doc_types::{DeprecationInfo, DocTypes, DocWarning, Param, ParamsMap};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=verity_lower=trace`,
/// `RUST_LOG=verity_types=warn` and so on.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            // A host may have installed its own subscriber already.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
