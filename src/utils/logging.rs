use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

/// Install the stderr logger shared by the `server` and `client` binaries.
///
/// Each line reads `[HH:MM:SS] [LEVEL] message` in local time. The floor is
/// `info`; `RUST_LOG` takes env_logger directives on top of it, e.g.
/// `RUST_LOG=debug` to see rejected payloads or
/// `RUST_LOG=warn,yolo_inference_server::server=info` to quiet everything but
/// session events. Call it once, before anything logs.
pub fn init_logger() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}
