//! Animated transitions to named camera viewpoints.
//!
//! The host calls [`CameraAnimator::advance`] once per frame with its clock;
//! progress is derived from elapsed wall-clock time, so dropped frames only
//! make the motion coarser, never slower.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Vector3};

use crate::config::PresetConfig;
use crate::error::ViewerError;
use crate::projection::{Camera, CameraPose};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewPreset {
    Isometric,
    Front,
    Back,
    Top,
    Bottom,
    Left,
    Right,
    /// Back to the pose the animator was created with
    Reset,
}

impl ViewPreset {
    pub const ALL: [ViewPreset; 8] = [
        ViewPreset::Isometric,
        ViewPreset::Front,
        ViewPreset::Back,
        ViewPreset::Top,
        ViewPreset::Bottom,
        ViewPreset::Left,
        ViewPreset::Right,
        ViewPreset::Reset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewPreset::Isometric => "isometric",
            ViewPreset::Front => "front",
            ViewPreset::Back => "back",
            ViewPreset::Top => "top",
            ViewPreset::Bottom => "bottom",
            ViewPreset::Left => "left",
            ViewPreset::Right => "right",
            ViewPreset::Reset => "reset",
        }
    }

    /// Unit-free offset from the orbit target; `None` for `Reset`.
    fn direction(self) -> Option<Vector3<f64>> {
        match self {
            ViewPreset::Isometric => Some(Vector3::new(1.0, 1.0, 1.0)),
            ViewPreset::Front => Some(Vector3::z()),
            ViewPreset::Back => Some(-Vector3::z()),
            ViewPreset::Top => Some(Vector3::y()),
            ViewPreset::Bottom => Some(-Vector3::y()),
            ViewPreset::Left => Some(-Vector3::x()),
            ViewPreset::Right => Some(Vector3::x()),
            ViewPreset::Reset => None,
        }
    }

    /// Looking straight down or up the Y axis needs a different up vector.
    fn up(self) -> Vector3<f64> {
        match self {
            ViewPreset::Top => -Vector3::z(),
            ViewPreset::Bottom => Vector3::z(),
            _ => Vector3::y(),
        }
    }
}

impl fmt::Display for ViewPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewPreset {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        ViewPreset::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| ViewerError::InvalidPreset(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationStatus {
    /// Nothing in flight
    Idle,
    Animating { progress: f64 },
    /// This frame landed on the end pose
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
struct Animation {
    preset: ViewPreset,
    from: CameraPose,
    to: CameraPose,
    start_ms: f64,
}

#[derive(Debug, Clone)]
pub struct CameraAnimator {
    home: CameraPose,
    distance: f64,
    duration_ms: f64,
    animation: Option<Animation>,
}

impl CameraAnimator {
    /// Captures the camera's current pose as the `reset` target.
    pub fn new(camera: &Camera, config: &PresetConfig) -> Self {
        Self {
            home: camera.pose(),
            distance: config.distance,
            duration_ms: config.duration_ms,
            animation: None,
        }
    }

    pub fn home(&self) -> CameraPose {
        self.home
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn active_preset(&self) -> Option<ViewPreset> {
        self.animation.as_ref().map(|a| a.preset)
    }

    /// Pose a preset would end in, given the camera's current orbit target.
    pub fn target_pose(&self, preset: ViewPreset, camera: &Camera) -> CameraPose {
        match preset.direction() {
            Some(direction) => CameraPose {
                position: camera.target + direction * self.distance,
                target: camera.target,
                up: preset.up(),
            },
            None => self.home,
        }
    }

    /// Start a transition from wherever the camera is now, replacing any
    /// transition already in flight. Returns the end pose.
    pub fn go_to(&mut self, preset: ViewPreset, now_ms: f64, camera: &Camera) -> CameraPose {
        let to = self.target_pose(preset, camera);
        if let Some(previous) = self.animation.take() {
            log::debug!("preset {} superseded by {preset}", previous.preset);
        }
        self.animation = Some(Animation {
            preset,
            from: camera.pose(),
            to,
            start_ms: now_ms,
        });
        log::debug!("animating to preset {preset}");
        to
    }

    /// Like [`go_to`](Self::go_to) with a preset name. An unknown name leaves
    /// any running transition untouched.
    pub fn go_to_named(
        &mut self,
        name: &str,
        now_ms: f64,
        camera: &Camera,
    ) -> Result<CameraPose, ViewerError> {
        let preset = name.parse()?;
        Ok(self.go_to(preset, now_ms, camera))
    }

    /// Drop the running transition, leaving the camera where it is.
    pub fn stop(&mut self) {
        self.animation = None;
    }

    /// Move the camera for the frame at `now_ms`.
    pub fn advance(&mut self, now_ms: f64, camera: &mut Camera) -> AnimationStatus {
        let Some(animation) = &self.animation else {
            return AnimationStatus::Idle;
        };

        let t = progress(now_ms - animation.start_ms, self.duration_ms);
        if t >= 1.0 {
            camera.set_pose(animation.to);
            self.animation = None;
            return AnimationStatus::Finished;
        }

        camera.set_pose(interpolate(&animation.from, &animation.to, t));
        AnimationStatus::Animating { progress: t }
    }
}

/// Fraction of the transition done, clamped to `[0, 1]`.
pub fn progress(elapsed_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    (elapsed_ms / duration_ms).clamp(0.0, 1.0)
}

fn interpolate(from: &CameraPose, to: &CameraPose, t: f64) -> CameraPose {
    let up = if from.up == to.up {
        to.up
    } else {
        // Opposite up vectors pass through zero halfway; fall back to the end up
        from.up
            .lerp(&to.up, t)
            .try_normalize(1e-9)
            .unwrap_or(to.up)
    };
    CameraPose {
        position: lerp_point(&from.position, &to.position, t),
        target: lerp_point(&from.target, &to.target, t),
        up,
    }
}

fn lerp_point(a: &Point3<f64>, b: &Point3<f64>, t: f64) -> Point3<f64> {
    Point3::from(a.coords.lerp(&b.coords, t))
}
