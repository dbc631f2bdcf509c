use glam::Vec2;
use serde::Deserialize;
use std::{fs, path::Path};
use tileforge_sim::InputSnapshot;

#[derive(Debug, Deserialize)]
struct ScriptedInputFile {
    steps: Vec<ScriptedStep>,
}

/// One step of a script, held for `duration` frames.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
struct ScriptedStep {
    duration: f32,
    #[serde(default)]
    move_x: f32,
    #[serde(default)]
    move_y: f32,
    #[serde(default)]
    jump: bool,
    /// Aim offset from the player's centre, in tiles.
    #[serde(default)]
    aim_x: f32,
    #[serde(default)]
    aim_y: f32,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    secondary: bool,
    #[serde(default)]
    select_slot: Option<usize>,
}

/// Plays a looping list of input steps.
pub struct ScriptedInputPlayer {
    steps: Vec<ScriptedStep>,
    index: usize,
    time_in_step: f32,
}

impl ScriptedInputPlayer {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let file: ScriptedInputFile = serde_json::from_str(&contents)?;
        if file.steps.is_empty() {
            anyhow::bail!("scripted input file contains no steps");
        }
        Ok(Self::new(file.steps))
    }

    /// Walk right, dig the tile ahead, place planks behind, walk back.
    pub fn wander() -> Self {
        Self::new(vec![
            ScriptedStep {
                duration: 90.0,
                move_x: 1.0,
                ..ScriptedStep::default()
            },
            ScriptedStep {
                duration: 4.0,
                move_x: 1.0,
                jump: true,
                ..ScriptedStep::default()
            },
            ScriptedStep {
                duration: 60.0,
                aim_x: 1.0,
                aim_y: 1.5,
                primary: true,
                select_slot: Some(0),
                ..ScriptedStep::default()
            },
            ScriptedStep {
                duration: 10.0,
                aim_x: -2.0,
                aim_y: -1.0,
                secondary: true,
                select_slot: Some(2),
                ..ScriptedStep::default()
            },
            ScriptedStep {
                duration: 90.0,
                move_x: -1.0,
                select_slot: Some(0),
                ..ScriptedStep::default()
            },
        ])
    }

    fn new(steps: Vec<ScriptedStep>) -> Self {
        Self {
            steps,
            index: 0,
            time_in_step: 0.0,
        }
    }

    /// Input for the next `dt` frames, aiming relative to `player`.
    pub fn advance(&mut self, dt: f32, player: Vec2) -> InputSnapshot {
        if self.steps.is_empty() {
            return InputSnapshot::idle();
        }

        self.time_in_step += dt;
        while self.time_in_step >= self.steps[self.index].duration {
            self.time_in_step -= self.steps[self.index].duration;
            self.index = (self.index + 1) % self.steps.len();
            if self.steps.iter().all(|step| step.duration <= 0.0) {
                self.time_in_step = 0.0;
                break;
            }
        }

        let step = &self.steps[self.index];
        InputSnapshot {
            move_x: step.move_x,
            move_y: step.move_y,
            jump: step.jump,
            aim: player + Vec2::new(step.aim_x, step.aim_y),
            primary: step.primary,
            secondary: step.secondary,
            select_slot: step.select_slot,
        }
    }
}
