//! Наблюдатели прогресса
//!
//! Конкретные реализации [`ProgressObserver`]: в лог, в память и в канал Tokio.

use std::sync::Arc;

use log::{info, warn};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::progress::{ProgressInfo, ProgressObserver};

/// Наблюдатель, пишущий прогресс в лог
pub struct LogProgressObserver {
    /// Префикс для вывода (опционально)
    prefix: Option<String>,
}

impl LogProgressObserver {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl Default for LogProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for LogProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        let prefix = self.prefix.as_deref().unwrap_or("");
        let details = match progress.details.as_deref() {
            Some(details) if !details.is_empty() => format!(" - {}", details),
            _ => String::new(),
        };

        info!(
            "{}[{:>5.1}%] {} ({:.0}%){}",
            prefix, progress.total_progress, progress.step, progress.step_progress, details
        );
    }
}

/// Наблюдатель, сохраняющий историю прогресса в памяти
pub struct MemoryProgressObserver {
    history: Arc<Mutex<Vec<ProgressInfo>>>,
}

impl MemoryProgressObserver {
    pub fn new() -> Self {
        Self {
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Общая ссылка на историю: остаётся доступной после передачи наблюдателя в трекер
    pub fn handle(&self) -> Arc<Mutex<Vec<ProgressInfo>>> {
        Arc::clone(&self.history)
    }

    /// Копия истории обновлений
    pub fn history(&self) -> Vec<ProgressInfo> {
        self.history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}

impl Default for MemoryProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for MemoryProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        self.history.lock().push(progress);
    }
}

/// Наблюдатель, отправляющий прогресс в канал.
///
/// Отправка неблокирующая: при переполненном канале обновление теряется.
pub struct ChannelProgressObserver {
    sender: mpsc::Sender<ProgressInfo>,
}

impl ChannelProgressObserver {
    pub fn new(sender: mpsc::Sender<ProgressInfo>) -> Self {
        Self { sender }
    }
}

impl ProgressObserver for ChannelProgressObserver {
    fn on_progress_update(&self, progress: ProgressInfo) {
        if let Err(e) = self.sender.try_send(progress) {
            warn!("Dropped progress update: {}", e);
        }
    }
}
