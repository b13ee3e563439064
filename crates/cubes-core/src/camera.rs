//! Camera description and screen/world conversions shared by both frontends.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Simple right-handed camera description with perspective projection.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    pub fovy_radians: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for Camera {
    /// Looks down on the lineup from above the shelf, so every drag plane is hit.
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 5.8, 11.5),
            target: Vec3::new(0.0, 1.4, 0.0),
            up: Vec3::Y,
            aspect: 16.0 / 9.0,
            fovy_radians: 42f32.to_radians(),
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

/// World-space ray with a unit direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Hit on the horizontal plane `y = plane_y` in front of the origin.
    pub fn intersect_plane_y(&self, plane_y: f32) -> Option<Vec3> {
        if self.dir.y.abs() < 1e-6 {
            return None;
        }
        let t = (plane_y - self.origin.y) / self.dir.y;
        (t.is_finite() && t >= 0.0).then(|| self.at(t))
    }
}

impl Camera {
    /// Compute the clip-space projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.znear, self.zfar)
    }
    /// Compute the view matrix that transforms world to view space.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.aspect = viewport.x / viewport.y.max(1.0);
    }

    fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through pixel `px` of a `viewport`-sized surface.
    pub fn screen_ray(&self, px: Vec2, viewport: Vec2) -> Ray {
        let w = viewport.x.max(1.0);
        let h = viewport.y.max(1.0);
        let ndc_x = (2.0 * px.x / w) - 1.0;
        let ndc_y = 1.0 - (2.0 * px.y / h);
        let inv = self.view_proj().inverse();
        let p_far = inv * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let p1: Vec3 = p_far.truncate() / p_far.w;
        Ray {
            origin: self.eye,
            dir: (p1 - self.eye).normalize(),
        }
    }

    /// Pixel position of a world point, or `None` when it is behind the camera.
    pub fn world_to_screen(&self, p: Vec3, viewport: Vec2) -> Option<Vec2> {
        let clip = self.view_proj() * p.extend(1.0);
        if clip.w <= 1e-6 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.x,
            (1.0 - ndc.y) * 0.5 * viewport.y,
        ))
    }
}
