use env_logger::{Builder, Env};
use log::{LevelFilter, SetLoggerError};
use std::io::Write;

/// Фильтр по умолчанию, если `RUST_LOG` не задан
pub const DEFAULT_FILTER: &str = "warn,dub_sync=info";

fn builder() -> Builder {
    // Базовый фильтр, переопределяется через RUST_LOG
    let env = Env::default().filter_or("RUST_LOG", DEFAULT_FILTER);

    let mut builder = Builder::from_env(env);
    builder
        .filter_module("tokio_util", LevelFilter::Error)
        .filter_module("mio", LevelFilter::Error)
        .format(|buf, record| writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args()))
        .target(env_logger::Target::Stderr);
    builder
}

/// Инициализировать логгер; повторный вызов возвращает ошибку
pub fn try_init_logger() -> Result<(), SetLoggerError> {
    builder().try_init()
}

/// Инициализировать логгер, если он ещё не установлен
pub fn init_logger() {
    if try_init_logger().is_err() {
        log::debug!("Logger already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init_logger();
        init_logger();
        assert!(try_init_logger().is_err());
    }
}
