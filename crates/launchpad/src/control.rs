//! The UI command boundary.
//!
//! The UI layer sends [`ControlCommand`]s as JSON and receives a
//! [`ControlResponse`] for each. Failures never escape as errors: they are
//! logged and reported as `{ "success": false, "error": "..." }`.
//!
//! ```ignore
//! let reply = shell
//!     .control()
//!     .dispatch_json(r#"{ "command": "detach-surface", "surfaceId": "plugin-content-1" }"#)
//!     .await;
//! ```

use launchpad_core::logging::targets;
use launchpad_core::{Bounds, HostId, Point, ShellError, SurfaceId};
use serde::{Deserialize, Serialize};

use crate::detach::ControlBarAction;
use crate::native::Compositor;
use crate::shell::{FollowingAction, Shell};
use crate::surface::ContentSource;

/// A request from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ControlCommand {
    /// Apply bounds from a window drag or resize.
    MoveHost { host_id: HostId, bounds: Bounds },
    /// Move a host to the position reached by a drag, keeping its size.
    MoveSurface { host_id: HostId, bounds: Bounds },
    CreateSettingsSurface,
    CloseSettingsSurface,
    CreatePluginSurface { content_source: ContentSource },
    ClosePluginSurface { surface_id: SurfaceId },
    DetachSurface { surface_id: SurfaceId },
    ReattachSurface {
        surface_id: SurfaceId,
        #[serde(default)]
        target_host_id: Option<HostId>,
    },
    ManageFollowingWindows { action: FollowingAction },
    ShowFollowingWindows,
    CreateFollowingWindow {
        content_source: ContentSource,
        #[serde(default)]
        owner: Option<SurfaceId>,
        #[serde(default)]
        bounds: Option<Bounds>,
    },
    ShowMain,
    HideMain,
    /// The search UI reports the height of its content.
    ResizeMainHeight { content_height: i32 },
    ControlBarAction { host_id: HostId, action: ControlBarAction },
}

/// Reply to a [`ControlCommand`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_id: Option<SurfaceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<HostId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn with_surface(mut self, surface_id: SurfaceId) -> Self {
        self.surface_id = Some(surface_id);
        self
    }

    pub fn with_host(mut self, host_id: HostId) -> Self {
        self.host_id = Some(host_id);
        self
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// Command dispatcher over a [`Shell`].
pub struct ControlChannel<'a, C: Compositor> {
    shell: &'a Shell<C>,
}

impl<'a, C: Compositor> ControlChannel<'a, C> {
    pub fn new(shell: &'a Shell<C>) -> Self {
        Self { shell }
    }

    /// Run one command.
    pub async fn dispatch(&self, command: ControlCommand) -> ControlResponse {
        tracing::debug!(target: targets::CONTROL, ?command, "command received");
        match self.execute(command).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(target: targets::CONTROL, error = %err, "command failed");
                ControlResponse::failure(err)
            }
        }
    }

    /// Parse a JSON command, run it and serialize the reply.
    pub async fn dispatch_json(&self, request: &str) -> String {
        let response = match serde_json::from_str::<ControlCommand>(request) {
            Ok(command) => self.dispatch(command).await,
            Err(err) => {
                tracing::warn!(target: targets::CONTROL, error = %err, "malformed command");
                ControlResponse::failure(format!("malformed command: {err}"))
            }
        };
        serde_json::to_string(&response).unwrap_or_else(|_| String::from(r#"{"success":false}"#))
    }

    async fn execute(&self, command: ControlCommand) -> Result<ControlResponse, ShellError> {
        let shell = self.shell;
        let response = match command {
            ControlCommand::MoveHost { host_id, bounds } => {
                shell.move_host(host_id, bounds)?;
                ControlResponse::ok().with_host(host_id)
            }
            ControlCommand::MoveSurface { host_id, bounds } => {
                shell.move_host_to(host_id, Point::new(bounds.x, bounds.y))?;
                ControlResponse::ok().with_host(host_id)
            }
            ControlCommand::CreateSettingsSurface => {
                let id = shell.open_settings().await?;
                ControlResponse::ok().with_surface(id)
            }
            ControlCommand::CloseSettingsSurface => {
                shell.close_settings()?;
                ControlResponse::ok()
            }
            ControlCommand::CreatePluginSurface { content_source } => {
                let id = shell.open_plugin(content_source).await?;
                ControlResponse::ok().with_surface(id).with_host(shell.main_host())
            }
            ControlCommand::ClosePluginSurface { surface_id } => {
                shell.close_plugin(&surface_id)?;
                ControlResponse::ok().with_surface(surface_id)
            }
            ControlCommand::DetachSurface { surface_id } => {
                let host = shell.detach().detach(&surface_id).await?;
                ControlResponse::ok().with_surface(surface_id).with_host(host)
            }
            ControlCommand::ReattachSurface {
                surface_id,
                target_host_id,
            } => {
                let host = shell.detach().reattach(&surface_id, target_host_id).await?;
                ControlResponse::ok().with_surface(surface_id).with_host(host)
            }
            ControlCommand::ManageFollowingWindows { action } => {
                shell.manage_following_windows(action)?;
                ControlResponse::ok()
            }
            ControlCommand::ShowFollowingWindows => {
                shell.show_following_windows()?;
                ControlResponse::ok()
            }
            ControlCommand::CreateFollowingWindow {
                content_source,
                owner,
                bounds,
            } => {
                let (host, surface) = shell.create_following_window(content_source, owner, bounds).await?;
                ControlResponse::ok().with_surface(surface).with_host(host)
            }
            ControlCommand::ShowMain => {
                shell.show_main()?;
                ControlResponse::ok().with_host(shell.main_host())
            }
            ControlCommand::HideMain => {
                shell.hide_main()?;
                ControlResponse::ok().with_host(shell.main_host())
            }
            ControlCommand::ResizeMainHeight { content_height } => {
                shell.resize_main_height(content_height)?;
                ControlResponse::ok().with_host(shell.main_host())
            }
            ControlCommand::ControlBarAction { host_id, action } => {
                shell.detach().control_bar_action(host_id, action).await?;
                ControlResponse::ok().with_host(host_id)
            }
        };
        Ok(response)
    }
}
