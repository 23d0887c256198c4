//! Affine transform conventions used by the scene graph.
//!
//! The scene graph stores every transform as a [`glam::Affine3A`]. glam uses
//! column vectors, so `a * b` applies `b` first. Scene code reads more
//! naturally in "apply A, then B" order, which [`AffineExt::then`] provides:
//!
//! ```rust
//! use glam::{Affine3A, Vec3};
//! use gsgamelib::math::AffineExt;
//!
//! let local = Affine3A::from_translation(Vec3::new(0.0, 5.0, 0.0));
//! let parent_world = Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0));
//! let world = local.then(&parent_world);
//! assert_eq!(world.translation, glam::Vec3A::new(10.0, 5.0, 0.0));
//! ```

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Affine3A, EulerRot, Mat3A, Quat, Vec3, Vec3A};
use serde::{Deserialize, Serialize};

/// Tolerance on `|sin(pitch)|` beyond which a rotation is treated as gimbal locked.
const GIMBAL_LOCK_SIN: f32 = 0.9999;

/// Tolerance on `|pitch|` used by [`EulerAngles::canonize`].
const GIMBAL_LOCK_PITCH: f32 = 1e-4;

/// Heading/pitch/bank rotation, all in radians.
///
/// - `yaw` rotates about +Y (up)
/// - `pitch` rotates about +X (right)
/// - `roll` rotates about +Z (forward)
///
/// The rotation applies roll first, then pitch, then yaw, which is glam's
/// [`EulerRot::YXZ`] ordering.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerAngles {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl EulerAngles {
    pub const ZERO: Self = Self {
        yaw: 0.0,
        pitch: 0.0,
        roll: 0.0,
    };

    #[must_use]
    pub const fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Rotation equivalent to these angles.
    #[must_use]
    pub fn to_quat(self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    /// Extracts angles from the rotation part of `m`.
    ///
    /// Scale is stripped from each axis before extraction. Near gimbal lock
    /// (looking straight up or down) roll is forced to zero and all rotation
    /// about the vertical axis is assigned to yaw.
    #[must_use]
    pub fn from_affine(m: &Affine3A) -> Self {
        let x_axis = m.matrix3.x_axis.normalize_or_zero();
        let y_axis = m.matrix3.y_axis.normalize_or_zero();
        let z_axis = m.matrix3.z_axis.normalize_or_zero();

        let sin_pitch = -z_axis.y;

        if sin_pitch.abs() > GIMBAL_LOCK_SIN {
            Self {
                yaw: (-y_axis.z).atan2(x_axis.x),
                pitch: FRAC_PI_2 * sin_pitch.signum(),
                roll: 0.0,
            }
        } else {
            Self {
                yaw: z_axis.x.atan2(z_axis.z),
                pitch: sin_pitch.asin(),
                roll: x_axis.y.atan2(y_axis.y),
            }
        }
    }

    /// Brings the triple into canonical form: yaw and roll in `[-PI, PI]`,
    /// pitch in `[-PI/2, PI/2]`, and zero roll in gimbal lock.
    #[must_use]
    pub fn canonize(self) -> Self {
        let mut yaw = self.yaw;
        let mut pitch = wrap_pi(self.pitch);
        let mut roll = self.roll;

        if pitch < -FRAC_PI_2 {
            pitch = -PI - pitch;
            yaw += PI;
            roll += PI;
        } else if pitch > FRAC_PI_2 {
            pitch = PI - pitch;
            yaw += PI;
            roll += PI;
        }

        if pitch.abs() > FRAC_PI_2 - GIMBAL_LOCK_PITCH {
            yaw += roll;
            roll = 0.0;
        } else {
            roll = wrap_pi(roll);
        }

        Self {
            yaw: wrap_pi(yaw),
            pitch,
            roll,
        }
    }
}

/// Wraps an angle into `[-PI, PI]`.
#[must_use]
pub fn wrap_pi(radians: f32) -> f32 {
    let wrapped = (radians + PI).rem_euclid(TAU) - PI;
    // rem_euclid maps +PI to -PI; keep the sign the caller gave us
    if wrapped == -PI && radians > 0.0 { PI } else { wrapped }
}

/// Scene-graph conventions on top of [`Affine3A`].
pub trait AffineExt: Sized {
    /// Builds a transform from Euler angles and a translation.
    fn from_euler_translation(angles: EulerAngles, translation: Vec3) -> Self;

    /// Euler angles of the rotation part.
    fn euler_angles(&self) -> EulerAngles;

    /// Replaces the rotation part, keeping translation (and dropping scale).
    fn set_euler_angles(&mut self, angles: EulerAngles);

    /// Composition in apply order: the result applies `self`, then `next`.
    #[must_use]
    fn then(&self, next: &Self) -> Self;

    /// Inverse of a transform made of scale, rotation and translation, no shear.
    #[must_use]
    fn inverse_srt(&self) -> Self;

    /// Inverse of a transform with uniform scale.
    #[must_use]
    fn inverse_uniform_srt(&self) -> Self;

    /// Inverse of a rigid-body transform (rotation and translation only).
    #[must_use]
    fn inverse_rigid(&self) -> Self;

    /// `true` if all three axes share the same length within `epsilon`.
    fn has_uniform_scale(&self, epsilon: f32) -> bool;
}

impl AffineExt for Affine3A {
    fn from_euler_translation(angles: EulerAngles, translation: Vec3) -> Self {
        Affine3A::from_rotation_translation(angles.to_quat(), translation)
    }

    fn euler_angles(&self) -> EulerAngles {
        EulerAngles::from_affine(self)
    }

    fn set_euler_angles(&mut self, angles: EulerAngles) {
        self.matrix3 = Mat3A::from_quat(angles.to_quat());
    }

    #[inline]
    fn then(&self, next: &Self) -> Self {
        *next * *self
    }

    fn inverse_srt(&self) -> Self {
        let m = &self.matrix3;
        // Each column is a rotated axis scaled by s; dividing by s^2 and
        // transposing yields S^-1 * R^T.
        let x = m.x_axis / m.x_axis.length_squared();
        let y = m.y_axis / m.y_axis.length_squared();
        let z = m.z_axis / m.z_axis.length_squared();
        with_inverse_linear(Mat3A::from_cols(x, y, z).transpose(), self.translation)
    }

    fn inverse_uniform_srt(&self) -> Self {
        let inv_scale_sq = self.matrix3.x_axis.length_squared().recip();
        with_inverse_linear(
            self.matrix3.transpose() * inv_scale_sq,
            self.translation,
        )
    }

    fn inverse_rigid(&self) -> Self {
        with_inverse_linear(self.matrix3.transpose(), self.translation)
    }

    fn has_uniform_scale(&self, epsilon: f32) -> bool {
        let sx = self.matrix3.x_axis.length_squared();
        let sy = self.matrix3.y_axis.length_squared();
        let sz = self.matrix3.z_axis.length_squared();
        (sx - sy).abs() <= epsilon && (sy - sz).abs() <= epsilon
    }
}

fn with_inverse_linear(inverse: Mat3A, translation: Vec3A) -> Affine3A {
    Affine3A {
        matrix3: inverse,
        translation: -(inverse * translation),
    }
}
