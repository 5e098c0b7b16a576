//! Logging setup for binaries, benches and tests using tensor-gpu.
//!
//! The library itself only emits through the `log` facade:
//!
//! - `warn!`: backend fallbacks and ignored configuration
//! - `info!`: context creation
//! - `debug!`: program compilation, cache hits, dispatch sizes
//! - `trace!`: full assembled kernel sources
//!
//! ```bash
//! RUST_LOG=tensor_gpu=debug cargo test
//! RUST_LOG=tensor_gpu::codegen=trace cargo bench
//! ```

use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Lines read `[LEVEL] target - message`, e.g.
/// `[DEBUG] tensor_gpu::kernel_cache - kernel cache hit (wgpu backend)`.
fn program_logger(mut builder: Builder) -> Builder {
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{:5}] {} - {}",
            record.level(),
            record.target(),
            record.args()
        )
    });
    builder
}

/// Log every crate at `level`, ignoring `RUST_LOG`. Later calls are no-ops.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        let mut builder = program_logger(Builder::new());
        builder.filter_level(level);
        let _ = builder.try_init();
    });
}

/// Filter by `RUST_LOG`, `warn` when unset. Later calls are no-ops.
pub fn init_from_env() {
    INIT.call_once(|| {
        let _ = program_logger(Builder::from_env(Env::default().default_filter_or("warn")))
            .try_init();
    });
}

/// Test-friendly logger; output is captured by the test harness.
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .is_test(true)
        .try_init();
}

/// Whether `init_with_level` or `init_from_env` has run.
pub fn is_initialized() -> bool {
    INIT.is_completed()
}
