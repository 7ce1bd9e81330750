#![deny(clippy::all)]

pub mod config;
pub mod cons;
pub mod error;
pub mod exec;
pub mod llm;
pub mod project;
pub mod session;


use std::sync::Once;

pub use config::AppConfig;
pub use error::{CoreError, CoreResult};
pub use session::AssistantSession;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        use log::LevelFilter;
        use log4rs::append::file::FileAppender;
        use log4rs::config::{Appender, Config, Root};
        use log4rs::encode::pattern::PatternEncoder;

        // Try to load log4rs configuration from file first
        let config_path =
            std::env::var("LOG4RS_CONFIG").unwrap_or_else(|_| "log4rs.yaml".to_string());
        let _ = std::fs::create_dir_all("logs");
        match log4rs::init_file(&config_path, Default::default()) {
            Ok(()) => {
                eprintln!("[INIT] Logger initialized from {}", config_path);
                return;
            }
            Err(e) => eprintln!(
                "[INIT] Failed to load {} ({}), falling back to default config",
                config_path, e
            ),
        }

        let pattern = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}\n";

        let logfile = match FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(pattern)))
            .build("logs/aiassist.log")
        {
            Ok(f) => f,
            Err(e) => {
                eprintln!("[INIT] Failed to create log file: {}", e);
                return;
            }
        };

        let config = match Config::builder()
            .appender(Appender::builder().build("logfile", Box::new(logfile)))
            .build(Root::builder().appender("logfile").build(LevelFilter::Debug))
        {
            Ok(c) => c,
            Err(e) => {
                eprintln!("[INIT] Failed to build config: {}", e);
                return;
            }
        };

        if let Err(e) = log4rs::init_config(config) {
            eprintln!("[INIT] Failed to initialize logger: {}", e);
        }
    });
}
