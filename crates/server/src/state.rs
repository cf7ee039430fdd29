use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use events::ProgressChannel;
use orchestrator::Pipeline;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub progress: Arc<ProgressChannel>,
    pub heartbeat_interval: Duration,
    pub app_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            progress: Arc::new(ProgressChannel::new()),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            app_dir: None,
        }
    }

    pub fn with_app_dir(mut self, app_dir: PathBuf) -> Self {
        self.app_dir = Some(app_dir);
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}
