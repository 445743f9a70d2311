//! Canned scenes: scripted programs that draw through a captured context.

use crate::seed::SimSeed;
use glcap_api::constant;
use glcap_core::{CoreResult, HostHandle, HostValue, ImageKind, ImageSource, TypedArray};
use glcap_intercept::CapturingContext;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Vertex shader shared by every scene
pub const VERTEX_SHADER: &str = "attribute vec3 position;
attribute vec3 normal;
uniform mat4 u_mvp;
varying vec3 v_normal;
void main() {
  v_normal = normal;
  gl_Position = u_mvp * vec4(position, 1.0);
}";

/// Fragment shader shared by every scene
pub const FRAGMENT_SHADER: &str = "precision mediump float;
uniform vec4 u_color;
uniform sampler2D u_texture;
varying vec3 v_normal;
void main() {
  gl_FragColor = u_color * texture2D(u_texture, v_normal.xy);
}";

/// Which scene to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scene {
    /// One static triangle, recoloured every frame
    Triangle,
    /// A triangle sampling an image texture
    Textured,
    /// Attribute locations queried before link
    Bindings,
    /// Vertex data re-uploaded every frame
    Animated,
}

impl Scene {
    /// Every scene
    pub const ALL: [Scene; 4] = [Scene::Triangle, Scene::Textured, Scene::Bindings, Scene::Animated];

    /// Scene name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scene::Triangle => "triangle",
            Scene::Textured => "textured",
            Scene::Bindings => "bindings",
            Scene::Animated => "animated",
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scene {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scene::ALL
            .into_iter()
            .find(|scene| scene.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// `gl.NAME` as a number
fn gl(name: &str) -> HostValue {
    constant(name).map_or(HostValue::Undefined, |v| HostValue::Number(v as f64))
}

fn num(value: f64) -> HostValue {
    HostValue::Number(value)
}

fn handle(value: &HostValue) -> HostValue {
    value.as_handle().map_or(HostValue::Null, HostValue::Handle)
}

/// Plays one [`Scene`] against one captured context
#[derive(Debug)]
pub struct ScenePlayer {
    scene: Scene,
    rng: ChaCha8Rng,
    color: HostValue,
    mvp: HostValue,
    sampler: HostValue,
    vertex_buffer: HostValue,
}

impl ScenePlayer {
    /// Create a player; all randomness comes from `seed`
    #[must_use]
    pub fn new(scene: Scene, seed: &SimSeed) -> Self {
        Self {
            scene,
            rng: seed.derive(scene.as_str()).rng(),
            color: HostValue::Null,
            mvp: HostValue::Null,
            sampler: HostValue::Null,
            vertex_buffer: HostValue::Null,
        }
    }

    /// Scene being played
    #[must_use]
    pub const fn scene(&self) -> Scene {
        self.scene
    }

    /// Page-load work: shaders, program, buffers, textures
    ///
    /// # Errors
    ///
    /// Returns error if a call fails on the host or in capture
    pub fn setup(&mut self, ctx: &CapturingContext) -> CoreResult<()> {
        ctx.call("viewport", &[num(0.0), num(0.0), num(300.0), num(150.0)])?;
        ctx.call("enable", &[gl("DEPTH_TEST")])?;

        let program = ctx.call("createProgram", &[])?;
        for (kind, source) in [("VERTEX_SHADER", VERTEX_SHADER), ("FRAGMENT_SHADER", FRAGMENT_SHADER)] {
            let shader = ctx.call("createShader", &[gl(kind)])?;
            ctx.call("shaderSource", &[handle(&shader), HostValue::string(source)])?;
            ctx.call("compileShader", &[handle(&shader)])?;
            ctx.call("getShaderParameter", &[handle(&shader), gl("COMPILE_STATUS")])?;
            ctx.call("attachShader", &[handle(&program), handle(&shader)])?;
        }

        if self.scene == Scene::Bindings {
            ctx.call("bindAttribLocation", &[handle(&program), num(2.0), "normal".into()])?;
        }
        ctx.call("linkProgram", &[handle(&program)])?;
        ctx.call("getProgramParameter", &[handle(&program), gl("LINK_STATUS")])?;
        if self.scene == Scene::Bindings {
            ctx.call("linkProgram", &[handle(&program)])?;
        }

        let position = ctx
            .call("getAttribLocation", &[handle(&program), "position".into()])?
            .as_f64()
            .unwrap_or(0.0);
        ctx.call("useProgram", &[handle(&program)])?;

        let vertex_buffer = ctx.call("createBuffer", &[])?;
        ctx.call("bindBuffer", &[gl("ARRAY_BUFFER"), handle(&vertex_buffer)])?;
        let vertices = TypedArray::from_f32(&[0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0]);
        ctx.call("bufferData", &[gl("ARRAY_BUFFER"), vertices.into(), gl("STATIC_DRAW")])?;
        ctx.call(
            "vertexAttribPointer",
            &[position.into(), num(3.0), gl("FLOAT"), false.into(), num(0.0), num(0.0)],
        )?;
        ctx.call("enableVertexAttribArray", &[position.into()])?;

        if self.scene == Scene::Textured {
            self.setup_texture(ctx)?;
        }

        self.color = ctx.call("getUniformLocation", &[handle(&program), "u_color".into()])?;
        self.mvp = ctx.call("getUniformLocation", &[handle(&program), "u_mvp".into()])?;
        self.sampler = ctx.call("getUniformLocation", &[handle(&program), "u_texture".into()])?;
        self.vertex_buffer = vertex_buffer;
        Ok(())
    }

    fn setup_texture(&mut self, ctx: &CapturingContext) -> CoreResult<()> {
        let texture = ctx.call("createTexture", &[])?;
        ctx.call("activeTexture", &[gl("TEXTURE0")])?;
        ctx.call("bindTexture", &[gl("TEXTURE_2D"), handle(&texture)])?;
        ctx.call("pixelStorei", &[gl("UNPACK_FLIP_Y_WEBGL"), num(1.0)])?;
        let image = ImageSource::new(ImageKind::ImageElement, 256, 256, HostHandle::from_raw(u64::MAX))
            .with_src("https://assets.example.com/checker.png");
        ctx.call(
            "texImage2D",
            &[
                gl("TEXTURE_2D"),
                num(0.0),
                gl("RGBA"),
                gl("RGBA"),
                gl("UNSIGNED_BYTE"),
                image.into(),
            ],
        )?;
        ctx.call("texParameteri", &[gl("TEXTURE_2D"), gl("TEXTURE_MIN_FILTER"), gl("LINEAR")])?;
        Ok(())
    }

    /// One frame of drawing
    ///
    /// # Errors
    ///
    /// Returns error if a call fails on the host or in capture
    pub fn frame(&mut self, ctx: &CapturingContext, index: u32) -> CoreResult<()> {
        let shade = f64::from(index % 10) / 10.0;
        ctx.call("clearColor", &[shade.into(), num(0.0), num(0.0), num(1.0)])?;
        let mask = constant("COLOR_BUFFER_BIT").unwrap_or(0) | constant("DEPTH_BUFFER_BIT").unwrap_or(0);
        ctx.call("clear", &[HostValue::Number(mask as f64)])?;

        if self.scene == Scene::Animated {
            let wobble: Vec<f32> = (0..9).map(|_| self.rng.gen_range(-0.5f32..0.5)).collect();
            ctx.call("bindBuffer", &[gl("ARRAY_BUFFER"), handle(&self.vertex_buffer)])?;
            ctx.call(
                "bufferSubData",
                &[gl("ARRAY_BUFFER"), num(0.0), TypedArray::from_f32(&wobble).into()],
            )?;
        }

        let identity = TypedArray::from_f32(&[
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ]);
        ctx.call("uniformMatrix4fv", &[handle(&self.mvp), false.into(), identity.into()])?;
        let red: f64 = self.rng.gen_range(0.0..1.0);
        ctx.call(
            "uniform4f",
            &[handle(&self.color), red.into(), num(0.5), num(0.25), num(1.0)],
        )?;
        if self.scene == Scene::Textured {
            ctx.call("uniform1i", &[handle(&self.sampler), num(0.0)])?;
        }
        ctx.call("drawArrays", &[gl("TRIANGLES"), num(0.0), num(3.0)])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_names() {
        for scene in Scene::ALL {
            assert_eq!(scene.as_str().parse::<Scene>().unwrap(), scene);
        }
        assert!("cube".parse::<Scene>().is_err());
    }

    #[test]
    fn test_gl_constant_lookup() {
        assert_eq!(gl("ARRAY_BUFFER"), HostValue::Number(34962.0));
        assert_eq!(gl("NOT_A_CONSTANT"), HostValue::Undefined);
    }

    #[test]
    fn test_player_seeded_per_scene() {
        let seed = SimSeed::default();
        let mut a = ScenePlayer::new(Scene::Animated, &seed);
        let mut b = ScenePlayer::new(Scene::Animated, &seed);
        let x: u64 = a.rng.r#gen();
        let y: u64 = b.rng.r#gen();
        assert_eq!(x, y);
        assert_eq!(a.scene(), Scene::Animated);
    }
}
