use tracing::info;
use ttlink_core::{Notice, NoticeSink};

/// Writes every notice to the log at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNoticeSink;

impl NoticeSink for TracingNoticeSink {
    fn notify(&self, notice: &Notice) {
        info!(target: "ttlink::notice", "{}", notice);
    }
}

#[cfg(test)]
pub(crate) use recording::RecordingNoticeSink;

#[cfg(test)]
mod recording {
    use std::sync::Mutex;
    use ttlink_core::{Notice, NoticeSink};

    #[derive(Debug, Default)]
    pub(crate) struct RecordingNoticeSink {
        seen: Mutex<Vec<Notice>>,
    }

    impl RecordingNoticeSink {
        /// Drains everything recorded so far.
        pub(crate) fn take(&self) -> Vec<Notice> {
            std::mem::take(&mut *self.seen.lock().unwrap())
        }
    }

    impl NoticeSink for RecordingNoticeSink {
        fn notify(&self, notice: &Notice) {
            self.seen.lock().unwrap().push(notice.clone());
        }
    }
}
