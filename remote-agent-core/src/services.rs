//! `Coordinator`: wires the otherwise-global-mutable-singleton components
//! into one explicit, shared-ownership value constructed at process start.
//! Grounded on `warpgate-core/src/services.rs`'s `Services` struct and its
//! `Services::new` wiring (including the background sweep task pattern).

use std::sync::Arc;

use remote_agent_capability::{select_input_capability, select_screen_capability};
use remote_agent_common::config::RemoteAgentConfig;
use tokio::time::Duration;
use tracing::info;

use crate::audit::AuditSink;
use crate::events::{EventHub, EventSender};
use crate::executor::CommandExecutor;
use crate::frame_streamer::FrameStreamer;
use crate::kill_switch::KillSwitchCoordinator;
use crate::pairing::PairingManager;
use crate::queue::CommandQueue;
use crate::rate_limit::RateLimiterRegistry;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct Coordinator {
    pub config: RemoteAgentConfig,
    pub pairing: Arc<PairingManager>,
    pub sessions: Arc<SessionManager>,
    pub queue: Arc<CommandQueue>,
    pub kill_switch: Arc<KillSwitchCoordinator>,
    pub rate_limiters: Arc<RateLimiterRegistry>,
    pub frames: Arc<FrameStreamer>,
    pub audit: Arc<AuditSink>,
    pub events: EventSender,
    pub event_hub: Arc<EventHub>,
}

impl Coordinator {
    pub async fn new(config: RemoteAgentConfig) -> anyhow::Result<Self> {
        let pairing = Arc::new(
            PairingManager::load(
                &config.credential_store_dir,
                config.pairing_challenge_ttl_secs,
                config.lan_mode,
                config.lan_mode_allow_signature_bypass,
            )
            .await?,
        );
        let sessions = Arc::new(SessionManager::new(config.session_max_duration_secs));
        let queue = Arc::new(CommandQueue::new(config.queue_capacity, config.command_timeout_secs));
        let kill_switch = Arc::new(KillSwitchCoordinator::new());
        let rate_limiters = Arc::new(RateLimiterRegistry::new(config.rate_limit.burst_multiplier));
        let audit = Arc::new(AuditSink::new(
            &config.audit_log.directory,
            "audit",
            config.audit_log.max_backups,
        )?);

        let (event_hub, events) = EventHub::setup();
        let event_hub = Arc::new(event_hub);

        let input = select_input_capability();
        let executor = Arc::new(CommandExecutor::new(input));
        queue
            .clone()
            .start_processing(executor, events.clone(), audit.clone())
            .await;

        let screen = select_screen_capability();
        let frames = Arc::new(FrameStreamer::new(
            screen,
            events.clone(),
            config.frame.min_fps,
            config.frame.max_fps,
            config.frame.initial_fps,
            config.frame.min_quality,
            config.frame.max_quality,
            config.frame.initial_quality,
            config.frame.scale,
            config.frame.monitor_index,
        ));

        // Periodic bucket sweep and terminal-command GC, mirroring the 60s
        // cleanup cadence `Services::new` runs for its own background loops.
        // Reclaiming terminal commands here is what keeps `queue_capacity`
        // bounding pending work rather than shrinking to zero over the
        // process lifetime.
        tokio::spawn({
            let rate_limiters = rate_limiters.clone();
            let queue = queue.clone();
            async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    rate_limiters.sweep_idle().await;
                    queue.clear_completed(Duration::from_secs(300)).await;
                }
            }
        });

        info!("coordinator initialized");

        Ok(Self {
            config,
            pairing,
            sessions,
            queue,
            kill_switch,
            rate_limiters,
            frames,
            audit,
            events,
            event_hub,
        })
    }

    /// Graceful shutdown order: stop frame streamer, stop
    /// queue worker, force-end all sessions, flush audit sink (the sink
    /// itself has no explicit flush call; dropping the `AuditSink` flushes
    /// its `tracing-appender` worker).
    pub async fn shutdown(&self) {
        self.frames.stop().await;
        self.queue.stop_processing().await;
        self.sessions.force_end_all().await;
    }
}
