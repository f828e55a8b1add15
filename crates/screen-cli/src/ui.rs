use dockscreen::engine::progress::{Progress, ProgressCallback};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::warn;

#[derive(Debug)]
pub enum UiEvent {
    Progress(Progress),
    Log(String),
}

pub struct UiManager {
    mp: Arc<MultiProgress>,
    state: BarState,
    event_receiver: mpsc::Receiver<UiEvent>,
    shutdown_receiver: watch::Receiver<bool>,
    _sentinel_bar: ProgressBar,
}

#[derive(Default)]
struct BarState {
    active_bar: Option<ProgressBar>,
    base_message: String,
}

impl UiManager {
    pub fn new() -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        let (event_sender, event_receiver) = mpsc::channel(1024);
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let mp = Arc::new(MultiProgress::new());
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        let _sentinel_bar = mp.add(ProgressBar::hidden());
        let manager = Self {
            mp,
            state: BarState::default(),
            event_receiver,
            shutdown_receiver,
            _sentinel_bar,
        };

        (manager, event_sender, shutdown_sender)
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.event_receiver.recv() => {
                    self.handle_event(event);
                }
                result = self.shutdown_receiver.changed() => {
                    if result.is_err() || *self.shutdown_receiver.borrow() {
                        break;
                    }
                }
            }
        }
        // Drain whatever was queued before shutdown so no log line is lost.
        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_event(event);
        }
        self._sentinel_bar.finish_and_clear();
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(msg) => {
                self.mp.println(msg).ok();
            }
            UiEvent::Progress(progress) => self.handle_progress(progress),
        }
    }

    fn handle_progress(&mut self, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => {
                if let Some(bar) = self.state.active_bar.take() {
                    bar.finish_and_clear();
                }

                let pb = self.mp.add(ProgressBar::new_spinner());
                pb.enable_steady_tick(Duration::from_millis(80));
                pb.set_style(Self::spinner_style());
                pb.set_message(name.clone());

                self.state.active_bar = Some(pb);
                self.state.base_message = name;
            }
            Progress::PhaseFinish => {
                if let Some(bar) = self.state.active_bar.take() {
                    bar.finish_and_clear();
                }

                let final_message = format!("✓ {}", self.state.base_message);
                self.mp.println(final_message).ok();

                self.state.base_message.clear();
            }
            Progress::TaskStart { total } => {
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.set_style(Self::bar_style());
                    bar.set_length(total);
                    bar.set_position(0);
                    bar.disable_steady_tick();
                }
            }
            Progress::TaskIncrement => {
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.inc(1);
                }
            }
            Progress::CandidateFinished { tally, .. } => {
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.inc(1);
                    bar.set_message(format!("{} ({})", self.state.base_message, tally));
                }
            }
            Progress::TaskFinish => {
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.finish();
                }
            }
            Progress::Message(msg) => {
                self.mp.println(format!("  {}", msg)).ok();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<60} [{bar:30.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.0}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("━╸ ")
    }
}

#[derive(Clone)]
pub struct CliProgressHandler {
    sender: mpsc::Sender<UiEvent>,
}

impl CliProgressHandler {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    /// Callback for workflows running outside the async runtime (worker threads or a
    /// `block_in_place` region). A full channel makes the caller wait so no tally update
    /// is lost.
    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let sender = self.sender.clone();
        Box::new(move |progress: Progress| {
            if let Err(e) = sender.blocking_send(UiEvent::Progress(progress)) {
                warn!("Failed to send progress update to UI channel: {}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockscreen::core::models::result::OutcomeKind;
    use dockscreen::engine::state::TallySnapshot;

    fn setup_manager() -> UiManager {
        let (manager, _sender, _shutdown) = UiManager::new();
        manager.mp.set_draw_target(ProgressDrawTarget::hidden());
        manager
    }

    fn finished(promoted: usize, discarded: usize) -> UiEvent {
        UiEvent::Progress(Progress::CandidateFinished {
            id: "ZINC01".to_string(),
            outcome: OutcomeKind::Promoted,
            tally: TallySnapshot {
                skipped: 0,
                discarded,
                promoted,
                failed: 0,
            },
        })
    }

    #[test]
    fn handle_phase_start_creates_new_spinner() {
        let mut manager = setup_manager();
        assert!(manager.state.active_bar.is_none());

        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Screening".into(),
        }));

        let bar = manager.state.active_bar.as_ref().unwrap();
        assert_eq!(bar.message(), "Screening");
        assert_eq!(manager.state.base_message, "Screening");
    }

    #[test]
    fn handle_phase_finish_clears_active_bar() {
        let mut manager = setup_manager();
        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Preparation".into(),
        }));

        manager.handle_event(UiEvent::Progress(Progress::PhaseFinish));

        assert!(manager.state.active_bar.is_none());
        assert!(manager.state.base_message.is_empty());
    }

    #[test]
    fn finished_candidates_advance_the_bar_and_show_the_tally() {
        let mut manager = setup_manager();
        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Screening".into(),
        }));
        manager.handle_event(UiEvent::Progress(Progress::TaskStart { total: 10 }));

        manager.handle_event(finished(1, 0));
        manager.handle_event(finished(1, 1));

        let bar = manager.state.active_bar.as_ref().unwrap();
        assert_eq!(bar.length(), Some(10));
        assert_eq!(bar.position(), 2);
        assert_eq!(
            bar.message(),
            "Screening (1 promoted, 1 discarded, 0 skipped, 0 failed)"
        );
    }

    #[test]
    fn handle_task_finish_completes_bar() {
        let mut manager = setup_manager();
        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Screening".into(),
        }));
        manager.handle_event(UiEvent::Progress(Progress::TaskStart { total: 3 }));

        manager.handle_event(UiEvent::Progress(Progress::TaskFinish));

        assert!(manager.state.active_bar.as_ref().unwrap().is_finished());
    }

    #[test]
    fn events_without_an_active_bar_are_ignored() {
        let mut manager = setup_manager();

        manager.handle_event(finished(1, 0));
        manager.handle_event(UiEvent::Log("a log line".to_string()));
        manager.handle_event(UiEvent::Progress(Progress::Message("note".to_string())));

        assert!(manager.state.active_bar.is_none());
    }

    #[test]
    fn cli_progress_handler_sends_progress_event() {
        let (sender, mut receiver) = mpsc::channel(1);
        let handler = CliProgressHandler::new(sender);
        let callback = handler.get_callback();

        callback(Progress::TaskStart { total: 42 });

        match receiver.blocking_recv() {
            Some(UiEvent::Progress(Progress::TaskStart { total })) => assert_eq!(total, 42),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn full_channel_delays_updates_instead_of_dropping_them() {
        let (sender, mut receiver) = mpsc::channel(1);
        let callback = CliProgressHandler::new(sender).get_callback();

        let worker = std::thread::spawn(move || {
            for promoted in 1..=5 {
                callback(Progress::CandidateFinished {
                    id: format!("ZINC0{}", promoted),
                    outcome: OutcomeKind::Promoted,
                    tally: TallySnapshot {
                        promoted,
                        ..Default::default()
                    },
                });
            }
        });

        let mut seen = Vec::new();
        while let Some(UiEvent::Progress(Progress::CandidateFinished { tally, .. })) =
            receiver.blocking_recv()
        {
            seen.push(tally.promoted);
            if seen.len() == 5 {
                break;
            }
        }
        worker.join().unwrap();

        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn task_increments_advance_the_bar() {
        let mut manager = setup_manager();
        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Converting".into(),
        }));
        manager.handle_event(UiEvent::Progress(Progress::TaskStart { total: 4 }));

        manager.handle_event(UiEvent::Progress(Progress::TaskIncrement));

        assert_eq!(manager.state.active_bar.as_ref().unwrap().position(), 1);
    }

    #[tokio::test]
    async fn run_loop_drains_queued_events_and_stops_on_shutdown() {
        let (manager, sender, shutdown) = UiManager::new();
        manager.mp.set_draw_target(ProgressDrawTarget::hidden());
        let handle = tokio::spawn(manager.run());

        sender.send(UiEvent::Log("queued".to_string())).await.unwrap();
        shutdown.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
