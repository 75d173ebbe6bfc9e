//! Sidebar, selection and fullscreen bookkeeping for the graph viewport.
//!
//! The controller is pure: it never talks to the host directly. Operations
//! that need the host to do something return a [`ViewportEffect`] which the
//! caller executes.

use std::time::Duration;

use crate::graph_utils::graph::EntityId;

/// Sidebar visibility. Animations are never interrupted: toggling while one
/// is in flight does nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum SidebarPhase {
    Hidden,
    #[default]
    Visible,
    AnimatingIn,
    AnimatingOut,
}

impl SidebarPhase {
    pub fn on_toggle(self) -> SidebarPhase {
        match self {
            SidebarPhase::Visible => SidebarPhase::AnimatingOut,
            SidebarPhase::Hidden => SidebarPhase::AnimatingIn,
            in_flight @ (SidebarPhase::AnimatingIn | SidebarPhase::AnimatingOut) => in_flight,
        }
    }

    pub fn on_animation_end(self) -> SidebarPhase {
        match self {
            SidebarPhase::AnimatingOut => SidebarPhase::Hidden,
            SidebarPhase::AnimatingIn => SidebarPhase::Visible,
            stable @ (SidebarPhase::Hidden | SidebarPhase::Visible) => stable,
        }
    }

    /// Whether the sidebar occupies screen space (fully or while sliding).
    pub fn is_shown(self) -> bool {
        !matches!(self, SidebarPhase::Hidden)
    }

    pub fn is_animating(self) -> bool {
        matches!(self, SidebarPhase::AnimatingIn | SidebarPhase::AnimatingOut)
    }

    /// Where the sidebar is heading: true if it ends up visible.
    pub fn target_visible(self) -> bool {
        matches!(self, SidebarPhase::Visible | SidebarPhase::AnimatingIn)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Node(EntityId),
    Edge(EntityId),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewportState {
    pub sidebar_phase: SidebarPhase,
    pub detail: Option<Selection>,
    pub style_editor_target: Option<String>,
}

/// Side effects the controller asks the host to perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewportEffect {
    Recenter { after: Duration },
    EnterFullscreen,
    ExitFullscreen,
}

#[derive(Debug, Default)]
pub struct ViewportController {
    state: ViewportState,
    recenter_delay: Duration,
    // Target of an in-flight fullscreen request
    fullscreen_pending: Option<bool>,
}

impl ViewportController {
    pub fn new(recenter_delay: Duration) -> Self {
        Self { recenter_delay, ..Self::default() }
    }

    pub fn state(&self) -> &ViewportState { &self.state }
    pub fn sidebar_phase(&self) -> SidebarPhase { self.state.sidebar_phase }
    pub fn detail(&self) -> Option<&Selection> { self.state.detail.as_ref() }
    pub fn style_editor_target(&self) -> Option<&str> { self.state.style_editor_target.as_deref() }
    pub fn fullscreen_pending(&self) -> bool { self.fullscreen_pending.is_some() }

    pub fn toggle_sidebar(&mut self) {
        let next = self.state.sidebar_phase.on_toggle();
        if next != self.state.sidebar_phase {
            log::debug!("sidebar {:?} -> {:?}", self.state.sidebar_phase, next);
        }
        self.state.sidebar_phase = next;
    }

    /// The sidebar finished sliding. Settling into a stable phase asks for a
    /// deferred recenter; a stray completion while stable is ignored.
    pub fn animation_finished(&mut self) -> Option<ViewportEffect> {
        let prev = self.state.sidebar_phase;
        let next = prev.on_animation_end();
        if next == prev {
            return None;
        }
        log::debug!("sidebar {:?} -> {:?}", prev, next);
        self.state.sidebar_phase = next;
        Some(ViewportEffect::Recenter { after: self.recenter_delay })
    }

    pub fn select_node(&mut self, id: EntityId) {
        self.state.detail = Some(Selection::Node(id));
    }

    pub fn select_edge(&mut self, id: EntityId) {
        self.state.detail = Some(Selection::Edge(id));
    }

    pub fn clear_selection(&mut self) {
        self.state.detail = None;
    }

    /// Ask to flip fullscreen. Nothing happens while a previous request is
    /// still settling.
    pub fn toggle_fullscreen(&mut self, currently_fullscreen: bool) -> Option<ViewportEffect> {
        if self.fullscreen_pending.is_some() {
            return None;
        }
        let target = !currently_fullscreen;
        self.fullscreen_pending = Some(target);
        Some(if target { ViewportEffect::EnterFullscreen } else { ViewportEffect::ExitFullscreen })
    }

    /// Completion of the window-system request. Only a successful completion
    /// of a pending request recenters.
    pub fn fullscreen_settled(&mut self, result: Result<(), String>) -> Option<ViewportEffect> {
        let target = self.fullscreen_pending.take()?;
        match result {
            Ok(()) => Some(ViewportEffect::Recenter { after: self.recenter_delay }),
            Err(reason) => {
                log::warn!("fullscreen {} rejected: {}", if target { "request" } else { "exit" }, reason);
                None
            }
        }
    }

    pub fn open_style_editor(&mut self, label: impl Into<String>) {
        self.state.style_editor_target = Some(label.into());
    }

    pub fn close_style_editor(&mut self) {
        self.state.style_editor_target = None;
    }

    /// A new result set replaces everything the selection could point at.
    /// The sidebar phase survives.
    pub fn reset_for_ingestion(&mut self) {
        self.state.detail = None;
        self.state.style_editor_target = None;
    }
}
