//! Interception points and byte patches
//!
//! This module only declares *what* is hooked or patched and why. Locating
//! patterns and installing detours is the host integration's job, reached
//! through [`SignatureResolver`]. Resolution happens once, up front, and
//! produces a [`HostCapabilities`]; session logic never scans memory itself.

/// A located interception point.
pub trait HookHandle {
    fn enable(&mut self);
    fn disable(&mut self);
    fn is_enabled(&self) -> bool;
}

/// Pattern scanning and patching primitives supplied by the host integration.
pub trait SignatureResolver {
    /// Install a (disabled) detour for `point`, or `None` if it cannot be found.
    fn install_hook(&mut self, point: HookPoint) -> Option<Box<dyn HookHandle>>;

    /// Read the little-endian i16 operand at the start of `pattern`'s match.
    fn scan_operand_i16(&self, pattern: &str) -> Option<i16>;

    /// Apply `patch`. Returns `false` if its pattern was not found.
    fn apply_patch(&mut self, patch: &BytePatch) -> bool;
}

/// Every interception point the session relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    InitializeRecording,
    PlaybackUpdate,
    RequestPlayback,
    BeginPlayback,
    OnSetChapter,
    ReplayPacket,
    RsvReceive,
    RsfReceive,
    ExecuteCommand,
    DisplayRecordingIcon,
    DirectorTimerUpdate,
    EventBegin,
    FormatChapterTimestamp,
}

impl HookPoint {
    pub const ALL: [HookPoint; 13] = [
        HookPoint::InitializeRecording,
        HookPoint::PlaybackUpdate,
        HookPoint::RequestPlayback,
        HookPoint::BeginPlayback,
        HookPoint::OnSetChapter,
        HookPoint::ReplayPacket,
        HookPoint::RsvReceive,
        HookPoint::RsfReceive,
        HookPoint::ExecuteCommand,
        HookPoint::DisplayRecordingIcon,
        HookPoint::DirectorTimerUpdate,
        HookPoint::EventBegin,
        HookPoint::FormatChapterTimestamp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HookPoint::InitializeRecording => "InitializeRecording",
            HookPoint::PlaybackUpdate => "PlaybackUpdate",
            HookPoint::RequestPlayback => "RequestPlayback",
            HookPoint::BeginPlayback => "BeginPlayback",
            HookPoint::OnSetChapter => "OnSetChapter",
            HookPoint::ReplayPacket => "ReplayPacket",
            HookPoint::RsvReceive => "RsvReceive",
            HookPoint::RsfReceive => "RsfReceive",
            HookPoint::ExecuteCommand => "ExecuteCommand",
            HookPoint::DisplayRecordingIcon => "DisplayRecordingIcon",
            HookPoint::DirectorTimerUpdate => "DirectorTimerUpdate",
            HookPoint::EventBegin => "EventBegin",
            HookPoint::FormatChapterTimestamp => "FormatChapterTimestamp",
        }
    }

    /// Byte pattern locating the function, when it is not exported by the
    /// host's own structure bindings.
    pub fn signature(self) -> Option<Signature> {
        let (pattern, purpose) = match self {
            HookPoint::RsvReceive => (
                "44 8B 09 4C 8D 41 34",
                "buffer RSV packets before recording starts",
            ),
            HookPoint::RsfReceive => (
                "48 8B 11 4C 8D 41 08",
                "buffer RSF packets before recording starts",
            ),
            HookPoint::ExecuteCommand => (
                "E8 ?? ?? ?? ?? 8D 43 0A",
                "stop client commands leaking to the server during playback",
            ),
            HookPoint::DisplayRecordingIcon => (
                "E8 ?? ?? ?? ?? 44 0F B6 C0 BA 4F 00 00 00",
                "gate the status bar recording icon",
            ),
            HookPoint::DirectorTimerUpdate => (
                "40 53 48 83 EC 20 0F B6 81 ?? ?? ?? ?? 48 8B D9 A8 04 0F 84 ?? ?? ?? ?? A8 08",
                "mark the recording once the duty timer starts",
            ),
            HookPoint::EventBegin => (
                "40 55 53 57 41 55 41 57 48 8D 6C 24 C9",
                "skip cutscenes during playback",
            ),
            HookPoint::FormatChapterTimestamp => (
                "E8 ?? ?? ?? ?? 8D 4E 64",
                "append chapter durations to the seek list",
            ),
            _ => return None,
        };
        Some(Signature {
            name: self.name(),
            pattern,
            purpose,
        })
    }

    /// Session logic cannot run without these.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            HookPoint::InitializeRecording
                | HookPoint::PlaybackUpdate
                | HookPoint::RequestPlayback
                | HookPoint::BeginPlayback
                | HookPoint::OnSetChapter
                | HookPoint::ReplayPacket
                | HookPoint::RsvReceive
                | HookPoint::RsfReceive
        )
    }

    /// Enabled by the session on demand rather than at resolution time.
    fn starts_disabled(self) -> bool {
        self == HookPoint::DirectorTimerUpdate
    }
}

/// A named byte pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub name: &'static str,
    pub pattern: &'static str,
    pub purpose: &'static str,
}

/// Bytes written over the start of a pattern match; `None` keeps the original byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytePatch {
    pub name: &'static str,
    pub pattern: &'static str,
    pub bytes: &'static [Option<u8>],
    pub purpose: &'static str,
}

/// Record every duty regardless of the host's own eligibility check.
pub const ALWAYS_RECORD: BytePatch = BytePatch {
    name: "AlwaysRecord",
    pattern: "A8 04 75 27 A8 02 74 23 48 8B",
    bytes: &[Some(0xEB), Some(0x21)],
    purpose: "jump over the recording eligibility test",
};

/// Drop the "ready to record" toast, which would otherwise fire on every zone.
pub const REMOVE_RECORD_READY_TOAST: BytePatch = BytePatch {
    name: "RemoveRecordReadyToast",
    pattern: "BA CB 07 00 00 48 8B CF E8",
    bytes: &[Some(0x90); 13],
    purpose: "nop the toast call",
};

/// Operand giving the content director's timer flag offset.
pub const DIRECTOR_TIMER_OFFSET: Signature = Signature {
    name: "ContentDirectorTimerOffset",
    pattern: "?? ?? 00 00 01 75 74 85 FF 75 07 E8",
    purpose: "locate the timer flags byte inside the content director",
};

/// Whether `pattern` is a space-separated list of hex bytes and `??` wildcards.
pub fn is_well_formed(pattern: &str) -> bool {
    let mut tokens = pattern.split(' ').peekable();
    tokens.peek().is_some()
        && tokens.all(|token| {
            token == "??" || (token.len() == 2 && token.chars().all(|c| c.is_ascii_hexdigit()))
        })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("required hook {0} could not be located")]
    MissingSignature(&'static str),
}

/// Typed handles produced by resolution.
#[derive(Default)]
pub struct HostCapabilities {
    hooks: Vec<(HookPoint, Box<dyn HookHandle>)>,
    /// Offset of the timer flags byte inside the content director
    pub director_timer_offset: Option<u16>,
    /// Names of the byte patches that were applied
    pub applied_patches: Vec<&'static str>,
}

impl HostCapabilities {
    /// No optional features; used when the host exposes nothing beyond the
    /// required hooks (which the host wires itself).
    pub fn none() -> Self {
        Self::default()
    }

    /// Locate every interception point and apply the recording patches.
    pub fn resolve(resolver: &mut dyn SignatureResolver) -> Result<Self, HookError> {
        let mut capabilities = Self::default();

        for point in HookPoint::ALL {
            match resolver.install_hook(point) {
                Some(mut handle) => {
                    if !point.starts_disabled() {
                        handle.enable();
                    }
                    capabilities.hooks.push((point, handle));
                }
                None if point.is_required() => {
                    return Err(HookError::MissingSignature(point.name()));
                }
                None => tracing::warn!(hook = point.name(), "Optional hook unavailable"),
            }
        }

        capabilities.director_timer_offset = resolver
            .scan_operand_i16(DIRECTOR_TIMER_OFFSET.pattern)
            .filter(|offset| *offset > 0)
            .map(|offset| offset as u16);

        for patch in [&ALWAYS_RECORD, &REMOVE_RECORD_READY_TOAST] {
            if resolver.apply_patch(patch) {
                capabilities.applied_patches.push(patch.name);
            } else {
                tracing::warn!(patch = patch.name, "Byte patch pattern not found");
            }
        }

        Ok(capabilities)
    }

    /// Register an already-installed handle.
    pub fn with_hook(mut self, point: HookPoint, handle: Box<dyn HookHandle>) -> Self {
        self.hooks.retain(|(p, _)| *p != point);
        self.hooks.push((point, handle));
        self
    }

    pub fn has_hook(&self, point: HookPoint) -> bool {
        self.hooks.iter().any(|(p, _)| *p == point)
    }

    pub fn hook_mut(&mut self, point: HookPoint) -> Option<&mut (dyn HookHandle + 'static)> {
        self.hooks
            .iter_mut()
            .find(|(p, _)| *p == point)
            .map(|(_, handle)| handle.as_mut())
    }

    /// The director timer hook is only useful when its offset was resolved.
    pub fn director_timer_available(&self) -> bool {
        self.director_timer_offset.is_some() && self.has_hook(HookPoint::DirectorTimerUpdate)
    }

    pub fn disable_all(&mut self) {
        for (_, handle) in &mut self.hooks {
            handle.disable();
        }
    }
}

impl std::fmt::Debug for HostCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCapabilities")
            .field(
                "hooks",
                &self.hooks.iter().map(|(p, h)| (p.name(), h.is_enabled())).collect::<Vec<_>>(),
            )
            .field("director_timer_offset", &self.director_timer_offset)
            .field("applied_patches", &self.applied_patches)
            .finish()
    }
}
