//! Scene transitions as sequential save/load workflows.
//!
//! A transition is a fixed sequence of steps with suspension only at the
//! `.await` boundaries between them: fade out, save, build the destination
//! scene, restore, place the player, save again, fade in. Steps never
//! interleave and a transition runs to completion once started; starting a
//! second transition while one is in flight is the caller's bug to avoid.
//! The engine-facing pieces (fading, scene construction) live behind
//! [`SceneHost`].

use crate::saving::{SaveError, SaveSystem};
use crate::world::{SceneIndex, World};
use async_trait::async_trait;
use tracing::info;

/// Engine collaborator for the workflow's presentation and scene-building
/// steps.
#[async_trait]
pub trait SceneHost: Send {
    /// Fade the presentation out; resolves when the screen is dark.
    async fn fade_out(&mut self);

    /// Fade the presentation back in.
    async fn fade_in(&mut self);

    /// Construct the world for a scene, with every actor in its authored
    /// default state.
    async fn build_scene(&mut self, scene: SceneIndex) -> World;
}

/// Walk the player through a portal into another scene.
///
/// Progress so far is saved before the current world is torn down, the
/// destination scene is rebuilt and restored from the same slot, the player
/// is placed at the portal's spawn point, and the result is saved again so
/// the slot always reflects where the player actually is.
pub async fn portal_transition(
    host: &mut impl SceneHost,
    saves: &SaveSystem,
    slot: &str,
    world: &mut World,
    destination: SceneIndex,
    spawn_point: [f32; 3],
    player: &str,
) -> Result<(), SaveError> {
    info!(from = world.scene(), to = destination, "portal transition");

    host.fade_out().await;
    saves.save(slot, world).await?;

    *world = host.build_scene(destination).await;
    saves.load(slot, world).await?;

    if let Some(actor) = world.actor_mut(player) {
        if let Some(position) = &mut actor.position {
            position.set(spawn_point);
        }
    }
    saves.save(slot, world).await?;

    host.fade_in().await;
    Ok(())
}

/// Resume a previous session: if the slot was saved in another scene, build
/// that scene first, then restore onto it. A never-saved slot leaves the
/// given world as it is.
pub async fn resume_last_session(
    host: &mut impl SceneHost,
    saves: &SaveSystem,
    slot: &str,
    world: &mut World,
) -> Result<(), SaveError> {
    if let Some(scene) = saves.peek_scene(slot).await? {
        if scene != world.scene() {
            info!(scene, "resuming in last saved scene");
            *world = host.build_scene(scene).await;
        }
    }
    saves.load(slot, world).await
}
