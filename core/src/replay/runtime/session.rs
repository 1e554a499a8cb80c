//! Record/playback session
//!
//! One [`Session`] wraps the host's duty recorder. Every interception point
//! the host exposes is routed through a method here that decides whether to
//! call the host's original behaviour and what to do around it.
//!
//! ```text
//!            zone init (allowed)                 recording ends
//!   Idle ───────────────────────▶ Arming ─▶ Recording ─────────────▶ Idle
//!    │                                                 (auto-rename)
//!    │ request_playback
//!    ├────────────────▶ PlaybackRequested ─▶ Idle   (for the host's call only)
//!    │
//!    │ begin (allowed)
//!    └────────────────▶ PlaybackActive ─────────────▶ Idle
//!                                         playback ends
//! ```
//!
//! A managed replay chosen through [`Session::request_playback`] stays
//! selected until a native slot is requested, so every later begin reloads it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::config::RecorderConfig;
use crate::host::view::DirectorView;
use crate::host::{ClientCommand, ConditionFlag, HookPoint, Host, HostCapabilities, ReplayModule};
use crate::replay::types::{ReplayHeader, SegmentRef};
use crate::store::{MAX_NATIVE_SLOT, ReplayStore, StoreError, naming};

use super::playback::PlaybackFeed;
use super::side_buffer::{AuxPacketKind, PacketSideBuffer};

/// Content types recording is allowed in.
pub const RECORDABLE_CONTENT_TYPES: [u32; 9] = [1, 2, 3, 4, 5, 9, 28, 29, 30];

/// Status bit that tells the host recorder the duty has begun.
const STATUS_DUTY_STARTED: u8 = 64;

/// Observable session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Arming,
    Recording,
    PlaybackRequested,
    PlaybackActive,
}

/// What to play back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackTarget {
    /// One of the host's own slots (0-2)
    Native { slot: u8 },
    /// A replay file from the store, shown to the host through slot 0
    Managed { path: PathBuf, header: ReplayHeader },
}

/// Outcome of a zone-init interception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingDecision {
    /// Recording began into `slot`; `flushed` side-buffer packets were written
    Started { slot: u8, flushed: usize },
    /// The zone-init packet named no content
    NoContent,
    /// No content type is known for the content
    UnknownContent { content_id: u16 },
    /// The content type is not recordable
    NotAllowed { content_type: u32 },
    /// A session is already recording or playing back
    Busy,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session busy: {0:?}")]
    SessionBusy(SessionPhase),

    #[error("slot {0} is not a native replay slot")]
    InvalidSlot(u8),

    #[error(transparent)]
    Store(#[from] StoreError),
}

enum SessionState {
    Idle,
    Arming,
    Recording { slot: u8 },
    PlaybackRequested,
    PlaybackActive { feed: PlaybackFeed },
}

/// Record/playback state machine around the host recorder.
pub struct Session {
    state: SessionState,
    side_buffer: PacketSideBuffer,
    store: ReplayStore,
    config: RecorderConfig,
    capabilities: HostCapabilities,
    recordable: HashSet<u32>,
    /// Managed replay the next begin loads instead of the native slot
    selected: Option<PathBuf>,
    config_dirty: bool,
    clock: fn() -> NaiveDateTime,
}

impl Session {
    pub fn new(store: ReplayStore, config: RecorderConfig, capabilities: HostCapabilities) -> Self {
        Self {
            state: SessionState::Idle,
            side_buffer: PacketSideBuffer::new(),
            store,
            config,
            capabilities,
            recordable: RECORDABLE_CONTENT_TYPES.into_iter().collect(),
            selected: None,
            config_dirty: false,
            clock: || Local::now().naive_local(),
        }
    }

    /// Replace the wall clock used to name finished recordings.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Arming => SessionPhase::Arming,
            SessionState::Recording { .. } => SessionPhase::Recording,
            SessionState::PlaybackRequested => SessionPhase::PlaybackRequested,
            SessionState::PlaybackActive { .. } => SessionPhase::PlaybackActive,
        }
    }

    /// The replay loaded for playback, if any.
    pub fn loaded(&self) -> Option<&PlaybackFeed> {
        match &self.state {
            SessionState::PlaybackActive { feed } => Some(feed),
            _ => None,
        }
    }

    pub fn store(&self) -> &ReplayStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ReplayStore {
        &mut self.store
    }

    /// Current settings. `last_loaded_replay` changes whenever a managed
    /// replay loads; see [`Session::take_config_changes`].
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Settings changed by the session since the last call, for the embedder
    /// to persist (`config::save`). Resume after reload depends on it.
    pub fn take_config_changes(&mut self) -> Option<&RecorderConfig> {
        if std::mem::take(&mut self.config_dirty) {
            Some(&self.config)
        } else {
            None
        }
    }

    /// Managed replay selected for playback, if any.
    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    /// Apply changed settings; retention limits take effect immediately.
    pub fn set_config(&mut self, config: RecorderConfig) {
        self.store.set_limits(config.retention());
        self.config = config;
    }

    pub fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    pub fn side_buffer(&self) -> &PacketSideBuffer {
        &self.side_buffer
    }

    /// Stamp slot headers with the local account and resume a managed replay
    /// the host is still playing from before a reload.
    pub fn initialize(&mut self, module: &mut dyn ReplayModule, host: &dyn Host) {
        module.set_saved_account_ids(host.local_account_id());

        if !module.in_playback() || module.has_loaded_file() {
            return;
        }
        if let Some(path) = self.config.last_loaded_replay.clone() {
            tracing::info!(path = %path.display(), "Resuming playback after reload");
            self.load(path, true);
        }
    }

    /// Disable every interception and return the host to its native state.
    pub fn shutdown(&mut self, module: &mut dyn ReplayModule) {
        self.capabilities.disable_all();
        module.set_saved_account_ids(0);
        self.side_buffer.clear();
        self.unload();
        self.state = SessionState::Idle;
    }

    /// Zone-init interception: decide whether this zone is recorded.
    ///
    /// `original` is the host's own recording initialization and runs only
    /// when recording is allowed.
    pub fn on_zone_init(
        &mut self,
        module: &mut dyn ReplayModule,
        host: &dyn Host,
        original: impl FnOnce(&mut dyn ReplayModule),
    ) -> RecordingDecision {
        if !matches!(self.state, SessionState::Idle) {
            tracing::debug!(phase = ?self.phase(), "Zone init while busy, not recording");
            return RecordingDecision::Busy;
        }
        self.state = SessionState::Arming;

        if let Some(rejected) = self.rejects_recording(module, host) {
            self.state = SessionState::Idle;
            return rejected;
        }

        module.fix_next_save_slot();
        original(module);
        module.begin_recording();

        let mut header = module.replay_header();
        header.account_id = 0;
        module.set_replay_header(header);

        if self.capabilities.director_timer_available() {
            if let Some(hook) = self.capabilities.hook_mut(HookPoint::DirectorTimerUpdate) {
                hook.enable();
            }
        }

        let slot = module.next_save_slot();
        self.state = SessionState::Recording { slot };
        let flushed = self.side_buffer.flush(module);
        tracing::info!(slot, flushed, "Recording started");
        RecordingDecision::Started { slot, flushed }
    }

    /// The reason this zone is not recorded, if any.
    fn rejects_recording(
        &self,
        module: &dyn ReplayModule,
        host: &dyn Host,
    ) -> Option<RecordingDecision> {
        let content_id = module.init_zone_content_id();
        if content_id == 0 {
            return Some(RecordingDecision::NoContent);
        }
        let Some(content_type) = host.content_type(content_id) else {
            tracing::debug!(content_id, "Unknown content, not recording");
            return Some(RecordingDecision::UnknownContent { content_id });
        };
        if !self.recordable.contains(&content_type) {
            tracing::debug!(content_id, content_type, "Content type not recordable");
            return Some(RecordingDecision::NotAllowed { content_type });
        }
        None
    }

    /// Ask the host to play back `target`.
    ///
    /// A managed replay is shown to `original` through slot 0, whose header
    /// is put back before returning. An accepted managed request selects the
    /// replay; a native request clears the selection. The session is Idle
    /// again on return, whatever `original` returned.
    pub fn request_playback(
        &mut self,
        module: &mut dyn ReplayModule,
        host: &dyn Host,
        target: PlaybackTarget,
        original: impl FnOnce(&mut dyn ReplayModule, u8) -> bool,
    ) -> Result<bool, SessionError> {
        if !matches!(self.state, SessionState::Idle) {
            return Err(SessionError::SessionBusy(self.phase()));
        }

        let accepted = match target {
            PlaybackTarget::Native { slot } => {
                if slot > MAX_NATIVE_SLOT {
                    return Err(SessionError::InvalidSlot(slot));
                }
                self.selected = None;
                self.state = SessionState::PlaybackRequested;
                original(module, slot)
            }
            PlaybackTarget::Managed { path, mut header } => {
                header.account_id = host.local_account_id();
                self.state = SessionState::PlaybackRequested;
                let accepted = with_slot_header(module, 0, header, |module| original(module, 0));
                if accepted {
                    self.selected = Some(path);
                }
                accepted
            }
        };
        self.state = SessionState::Idle;

        if accepted {
            tracing::info!(selected = ?self.selected, "Playback requested");
        } else {
            tracing::debug!("Host declined playback request");
        }
        Ok(accepted)
    }

    /// Begin-playback interception. The host decides `allowed`.
    pub fn on_begin_playback(
        &mut self,
        module: &mut dyn ReplayModule,
        host: &dyn Host,
        allowed: bool,
        original: impl FnOnce(&mut dyn ReplayModule, bool),
    ) {
        original(module, allowed);

        if matches!(self.state, SessionState::Arming | SessionState::Recording { .. }) {
            tracing::warn!("Playback began while recording, ignoring");
            return;
        }
        self.unload();
        if !allowed {
            return;
        }

        match self.selected.clone() {
            Some(path) => self.load(path, true),
            None => {
                let slot = module.current_replay_slot();
                let path = self.store.layout().slot_path(host.local_account_id(), slot);
                self.load(path, false);
            }
        }
    }

    fn load(&mut self, path: PathBuf, managed: bool) {
        self.unload();
        match PlaybackFeed::open(&path) {
            Ok(feed) => {
                tracing::info!(path = %path.display(), "Loaded replay");
                if managed {
                    self.selected = Some(path.clone());
                    if self.config.last_loaded_replay.as_ref() != Some(&path) {
                        self.config.last_loaded_replay = Some(path);
                        self.config_dirty = true;
                    }
                }
                self.state = SessionState::PlaybackActive { feed };
            }
            Err(e) => tracing::error!(error = %e, "Failed to load replay"),
        }
    }

    fn unload(&mut self) {
        if !matches!(self.state, SessionState::PlaybackActive { .. }) {
            return;
        }
        if let SessionState::PlaybackActive { feed } =
            std::mem::replace(&mut self.state, SessionState::Idle)
        {
            tracing::debug!(path = %feed.path().display(), "Unloaded replay");
        }
    }

    /// Per-tick interception of the host recorder update.
    pub fn on_update(
        &mut self,
        module: &mut dyn ReplayModule,
        host: &mut dyn Host,
        original: impl FnOnce(&mut dyn ReplayModule),
    ) {
        original(module);
        self.track_recording(module, host);

        if matches!(self.state, SessionState::Recording { .. }) {
            module.chapters_mut().normalize_start_marker();
        }

        if !module.in_playback() {
            if matches!(self.state, SessionState::PlaybackActive { .. }) {
                self.on_playback_end();
            }
            return;
        }

        host.set_condition(ConditionFlag::OccupiedInCutSceneEvent, false);
        if let SessionState::PlaybackActive { feed } = &mut self.state {
            let now = module.playback_ms();
            feed.advance(now, |segment| {
                route_segment(module, segment, |module, segment| module.replay_packet(segment));
            });
        }
    }

    fn track_recording(&mut self, module: &mut dyn ReplayModule, host: &dyn Host) {
        match (&self.state, module.is_recording()) {
            (SessionState::Idle, true) => {
                let slot = module.next_save_slot();
                tracing::debug!(slot, "Host started recording on its own");
                self.state = SessionState::Recording { slot };
            }
            (SessionState::Recording { slot }, false) => {
                let slot = *slot;
                self.state = SessionState::Idle;
                self.finish_recording(module, host, slot);
            }
            _ => {}
        }
    }

    fn finish_recording(&mut self, module: &mut dyn ReplayModule, host: &dyn Host, slot: u8) {
        if let Some(hook) = self.capabilities.hook_mut(HookPoint::DirectorTimerUpdate) {
            hook.disable();
        }

        let account_id = host.local_account_id();
        let slot_file = naming::slot_file_name(account_id, slot);
        let title = module.content_title();
        tracing::info!(slot, "Recording finished");

        // Failures are logged by the store
        if let Ok(Some(_)) = self.store.auto_rename(&slot_file, &title, (self.clock)()) {
            module.set_saved_header(slot, ReplayHeader::default());
        }
        module.set_saved_account_ids(account_id);
    }

    /// Playback has ended; the loaded replay is released.
    pub fn on_playback_end(&mut self) {
        if matches!(self.state, SessionState::PlaybackActive { .. }) {
            tracing::info!("Playback ended");
            self.unload();
        }
    }

    /// Chapter-jump interception: keep the feed cursor in step with the host.
    pub fn on_set_chapter(
        &mut self,
        module: &mut dyn ReplayModule,
        chapter: u8,
        original: impl FnOnce(&mut dyn ReplayModule, u8),
    ) {
        original(module, chapter);
        if let SessionState::PlaybackActive { feed } = &mut self.state {
            if !feed.seek_to_chapter(chapter as usize) {
                tracing::warn!(chapter, "Chapter has no valid segment offset");
            }
        }
    }

    /// Segment replay interception for segments the host feeds itself.
    pub fn on_replay_packet(
        &mut self,
        module: &mut dyn ReplayModule,
        segment: &SegmentRef<'_>,
        original: impl FnOnce(&mut dyn ReplayModule, &SegmentRef<'_>) -> bool,
    ) -> bool {
        route_segment(module, segment, original)
    }

    /// Receive interception for RSV and RSF packets: capture, then deliver.
    pub fn on_aux_packet(
        &mut self,
        kind: AuxPacketKind,
        data: &[u8],
        original: impl FnOnce(&[u8]) -> bool,
    ) -> bool {
        if let Err(e) = self.side_buffer.capture_raw(kind, data) {
            tracing::warn!(kind = ?kind, error = %e, "Failed to capture packet");
        }
        original(data)
    }

    /// Client-command interception. During playback only camera-related
    /// commands reach the server.
    pub fn on_execute_command(
        &mut self,
        module: &dyn ReplayModule,
        host: &mut dyn Host,
        command: ClientCommand,
        original: impl FnOnce(ClientCommand) -> bool,
    ) -> bool {
        if !module.in_playback()
            || command.id == ClientCommand::GROUP_POSE
            || command.id == ClientCommand::IDLE_CAMERA
        {
            return original(command);
        }

        if command.id == ClientCommand::GROUP_POSE_STATE {
            host.set_condition(ConditionFlag::WatchingCutscene, command.params[0] != 0);
        }
        tracing::trace!(command = command.id, "Blocked command during playback");
        false
    }

    /// Event-begin interception: cutscenes are skipped in playback when the
    /// host's skip option is on.
    pub fn on_event_begin<T: Default>(
        &self,
        module: &dyn ReplayModule,
        host: &dyn Host,
        original: impl FnOnce() -> T,
    ) -> T {
        if module.in_playback() && host.skips_cutscenes() {
            T::default()
        } else {
            original()
        }
    }

    /// Director timer interception: once the duty timer starts, mark the
    /// recording and stop watching.
    pub fn on_director_timer_update(
        &mut self,
        module: &mut dyn ReplayModule,
        director: &[u8],
        original: impl FnOnce(),
    ) {
        if let Some(offset) = self.capabilities.director_timer_offset {
            if DirectorView::new(director, offset).timer_started() {
                module.set_status_bits(STATUS_DUTY_STARTED);
                if let Some(hook) = self.capabilities.hook_mut(HookPoint::DirectorTimerUpdate) {
                    hook.disable();
                }
                tracing::debug!("Duty timer started");
            }
        }
        original();
    }

    /// Whether the recording indicator should be shown.
    pub fn show_recording_icon(&self, module: &dyn ReplayModule, host: &dyn Host) -> bool {
        self.config.enable_recording_icon && module.is_recording() && host.can_modify_ui()
    }

    /// Duration suffix for the 1-based chapter `number`, e.g. ` (03:27)`.
    pub fn chapter_timestamp_suffix(
        &self,
        module: &dyn ReplayModule,
        host: &dyn Host,
        number: usize,
    ) -> Option<String> {
        if !host.can_modify_ui() {
            return None;
        }
        let index = number.checked_sub(1)?;
        module
            .chapters()
            .duration_label(index, module.replay_header().total_ms)
    }

    /// Show a managed replay in the host's slot UI through slot 0.
    pub fn display_managed(
        &self,
        module: &mut dyn ReplayModule,
        host: &dyn Host,
        mut header: ReplayHeader,
        display: impl FnOnce(&mut dyn ReplayModule, u8),
    ) {
        header.account_id = host.local_account_id();
        with_slot_header(module, 0, header, |module| display(module, 0));
    }

    /// Copy a managed replay over native slot `slot` and show it there.
    pub fn copy_into_slot(
        &mut self,
        module: &mut dyn ReplayModule,
        host: &dyn Host,
        path: &Path,
        mut header: ReplayHeader,
        slot: u8,
    ) -> Result<PathBuf, SessionError> {
        if slot > MAX_NATIVE_SLOT {
            return Err(SessionError::InvalidSlot(slot));
        }
        let account_id = host.local_account_id();
        let target = self.store.copy_into_slot(path, account_id, slot)?;
        header.account_id = account_id;
        module.set_saved_header(slot, header);
        Ok(target)
    }
}

/// Run `f` with slot `slot` showing `header`, then put the old header back.
fn with_slot_header<R>(
    module: &mut dyn ReplayModule,
    slot: u8,
    header: ReplayHeader,
    f: impl FnOnce(&mut dyn ReplayModule) -> R,
) -> R {
    let previous = module.saved_header(slot);
    module.set_saved_header(slot, header);
    let result = f(module);
    module.set_saved_header(slot, previous);
    result
}

/// Deliver one segment: the reserved opcodes go to the host's own receive
/// handling, everything else to `generic`.
fn route_segment(
    module: &mut dyn ReplayModule,
    segment: &SegmentRef<'_>,
    generic: impl FnOnce(&mut dyn ReplayModule, &SegmentRef<'_>) -> bool,
) -> bool {
    match AuxPacketKind::from_opcode(segment.opcode) {
        Some(AuxPacketKind::Rsv) => module.receive_rsv(segment.payload),
        Some(AuxPacketKind::Rsf) => module.receive_rsf(segment.payload),
        None => generic(module, segment),
    }
}
