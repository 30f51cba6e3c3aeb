use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use glam::{Mat4, Vec2, Vec3};
use log::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::window::{Window, WindowId};

use crate::camera::Camera;
use crate::config::{Bindings, ViewerConfig};
use crate::input::{InputState, KeyCode, MouseButton, NamedKey};
use crate::loader::ModelData;
use crate::model::Model;
use crate::render::{CameraParams, RenderError, Renderer};

/// Derives per-frame delta time from a monotonic clock.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    /// Returns the seconds elapsed since the previous tick; zero on the
    /// first call.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let delta = self
            .last
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        delta
    }
}

/// Applies one frame of held-key movement to the camera.
pub fn advance_camera(
    camera: &mut Camera,
    input: &InputState,
    bindings: &Bindings,
    speed: f32,
    dt: f32,
) {
    let step = speed * dt;
    if input.is_key_down(bindings.forward) {
        camera.move_forward(step);
    }
    if input.is_key_down(bindings.backward) {
        camera.move_forward(-step);
    }
    if input.is_key_down(bindings.right) {
        camera.move_right(step);
    }
    if input.is_key_down(bindings.left) {
        camera.move_right(-step);
    }
}

/// Owning state created once the window and GPU context exist.
struct ViewerState {
    renderer: Renderer,
    model: Model,
    camera: Camera,
}

/// The viewer application: drives the frame cadence and wires window input
/// into camera state.
pub struct App {
    model_data: Option<ModelData>,
    shader_source: String,
    config: ViewerConfig,
    bindings: Bindings,
    force_wireframe: bool,
    input: InputState,
    clock: FrameClock,
    state: Option<ViewerState>,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(
        model_data: ModelData,
        shader_source: String,
        config: ViewerConfig,
        force_wireframe: bool,
    ) -> Result<Self> {
        let bindings = config.bindings.resolve()?;
        Ok(Self {
            model_data: Some(model_data),
            shader_source,
            config,
            bindings,
            force_wireframe,
            input: InputState::new(),
            clock: FrameClock::default(),
            state: None,
            error: None,
        })
    }

    /// Surfaces any error recorded while the event loop was running.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.error = Some(err);
        event_loop.exit();
    }

    fn init_state(&mut self, event_loop: &ActiveEventLoop) -> Result<ViewerState> {
        let attributes = Window::default_attributes()
            .with_title("objview")
            .with_inner_size(LogicalSize::new(1200.0, 1200.0));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("failed to create window")?,
        );

        let mut renderer = pollster::block_on(Renderer::new(window, &self.shader_source))?;
        let [r, g, b] = self.config.clear_color;
        renderer.set_clear_color(r as f64, g as f64, b as f64);

        let data = self
            .model_data
            .take()
            .context("model data already consumed")?;
        let model = Model::upload(
            renderer.device(),
            renderer.queue(),
            &data,
            renderer.material_layout(),
        )?;
        info!(
            "uploaded {} ({} meshes, {} vertices)",
            model.name,
            model.meshes().len(),
            data.vertex_count()
        );

        let camera = Camera::new(Vec3::new(-5.0, 0.0, 0.0), 0.0, 0.0, self.config.fov);

        Ok(ViewerState {
            renderer,
            model,
            camera,
        })
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let dt = self.clock.tick(Instant::now());

        let camera_params = CameraParams {
            view: state.camera.view_matrix(),
            proj: state.camera.projection(state.renderer.aspect_ratio()),
            model: Mat4::IDENTITY,
            position: state.camera.position(),
        };
        let wireframe = self.force_wireframe || self.input.is_key_down(self.bindings.wireframe);

        match state.renderer.render(&state.model, &camera_params, wireframe) {
            Ok(()) => {}
            Err(RenderError::Surface(
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
            )) => {
                let size = state.renderer.window().inner_size();
                state.renderer.resize(size);
            }
            Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                self.fail(event_loop, anyhow::anyhow!("GPU is out of memory"));
                return;
            }
            Err(RenderError::Surface(err)) => {
                debug!("frame skipped: {err}");
            }
            Err(RenderError::Resource(err)) => {
                self.fail(event_loop, err.into());
                return;
            }
        }

        advance_camera(
            &mut state.camera,
            &self.input,
            &self.bindings,
            self.config.camera_speed,
            dt,
        );

        let delta = self.input.take_mouse_delta();
        if self.input.is_mouse_button_down(MouseButton::LEFT) && delta != Vec2::ZERO {
            let sensitivity = self.config.mouse_sensitivity;
            state
                .camera
                .rotate(delta.x * sensitivity, -delta.y * sensitivity);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        event_loop.set_control_flow(ControlFlow::Poll);
        match self.init_state(event_loop) {
            Ok(state) => {
                state.renderer.window().request_redraw();
                self.state = Some(state);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if window_id != state.renderer.window_id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.renderer.resize(size),
            WindowEvent::KeyboardInput { event, .. } => {
                let Some(key) = map_keycode(&event.physical_key) else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => {
                        if key == self.bindings.exit {
                            event_loop.exit();
                        } else {
                            self.input.set_key_down(key);
                        }
                    }
                    ElementState::Released => self.input.set_key_up(key),
                }
            }
            WindowEvent::MouseInput { state: button_state, button, .. } => {
                let button = map_mouse_button(button);
                match button_state {
                    ElementState::Pressed => self.input.set_mouse_button_down(button),
                    ElementState::Released => self.input.set_mouse_button_up(button),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .set_mouse_position(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.add_mouse_delta(Vec2::new(dx as f32, dy as f32));
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.renderer.window().request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.as_mut() {
            debug!("final camera position: {:?}", state.camera.position());
            if let Err(err) = state.model.release() {
                error!("shutdown: {err}");
            }
        }
    }
}

fn map_keycode(key: &winit::keyboard::PhysicalKey) -> Option<KeyCode> {
    use winit::keyboard::KeyCode as Key;
    let winit::keyboard::PhysicalKey::Code(code) = key else {
        return None;
    };
    Some(match code {
        Key::Space => KeyCode::Named(NamedKey::Space),
        Key::Enter => KeyCode::Named(NamedKey::Enter),
        Key::Tab => KeyCode::Named(NamedKey::Tab),
        Key::ArrowLeft => KeyCode::Named(NamedKey::Left),
        Key::ArrowRight => KeyCode::Named(NamedKey::Right),
        Key::ArrowUp => KeyCode::Named(NamedKey::Up),
        Key::ArrowDown => KeyCode::Named(NamedKey::Down),
        Key::Escape => KeyCode::Named(NamedKey::Escape),
        Key::ShiftLeft => KeyCode::Named(NamedKey::LeftShift),
        Key::ShiftRight => KeyCode::Named(NamedKey::RightShift),
        Key::ControlLeft => KeyCode::Named(NamedKey::LeftCtrl),
        Key::ControlRight => KeyCode::Named(NamedKey::RightCtrl),
        Key::AltLeft => KeyCode::Named(NamedKey::LeftAlt),
        Key::AltRight => KeyCode::Named(NamedKey::RightAlt),
        Key::Digit0 => KeyCode::Digit(0),
        Key::Digit1 => KeyCode::Digit(1),
        Key::Digit2 => KeyCode::Digit(2),
        Key::Digit3 => KeyCode::Digit(3),
        Key::Digit4 => KeyCode::Digit(4),
        Key::Digit5 => KeyCode::Digit(5),
        Key::Digit6 => KeyCode::Digit(6),
        Key::Digit7 => KeyCode::Digit(7),
        Key::Digit8 => KeyCode::Digit(8),
        Key::Digit9 => KeyCode::Digit(9),
        Key::KeyA => KeyCode::Character('A'),
        Key::KeyB => KeyCode::Character('B'),
        Key::KeyC => KeyCode::Character('C'),
        Key::KeyD => KeyCode::Character('D'),
        Key::KeyE => KeyCode::Character('E'),
        Key::KeyF => KeyCode::Character('F'),
        Key::KeyG => KeyCode::Character('G'),
        Key::KeyH => KeyCode::Character('H'),
        Key::KeyI => KeyCode::Character('I'),
        Key::KeyJ => KeyCode::Character('J'),
        Key::KeyK => KeyCode::Character('K'),
        Key::KeyL => KeyCode::Character('L'),
        Key::KeyM => KeyCode::Character('M'),
        Key::KeyN => KeyCode::Character('N'),
        Key::KeyO => KeyCode::Character('O'),
        Key::KeyP => KeyCode::Character('P'),
        Key::KeyQ => KeyCode::Character('Q'),
        Key::KeyR => KeyCode::Character('R'),
        Key::KeyS => KeyCode::Character('S'),
        Key::KeyT => KeyCode::Character('T'),
        Key::KeyU => KeyCode::Character('U'),
        Key::KeyV => KeyCode::Character('V'),
        Key::KeyW => KeyCode::Character('W'),
        Key::KeyX => KeyCode::Character('X'),
        Key::KeyY => KeyCode::Character('Y'),
        Key::KeyZ => KeyCode::Character('Z'),
        Key::F1 => KeyCode::Function(1),
        Key::F2 => KeyCode::Function(2),
        Key::F3 => KeyCode::Function(3),
        Key::F4 => KeyCode::Function(4),
        Key::F5 => KeyCode::Function(5),
        Key::F6 => KeyCode::Function(6),
        Key::F7 => KeyCode::Function(7),
        Key::F8 => KeyCode::Function(8),
        Key::F9 => KeyCode::Function(9),
        Key::F10 => KeyCode::Function(10),
        Key::F11 => KeyCode::Function(11),
        Key::F12 => KeyCode::Function(12),
        _ => return None,
    })
}

fn map_mouse_button(button: winit::event::MouseButton) -> MouseButton {
    use winit::event::MouseButton as Winit;
    let index = match button {
        Winit::Left => 0,
        Winit::Right => 1,
        Winit::Middle => 2,
        Winit::Back => 3,
        Winit::Forward => 4,
        Winit::Other(value) => value.min(u8::MAX as u16) as u8,
    };
    MouseButton::new(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn frame_clock_reports_elapsed_seconds() {
        let t0 = Instant::now();
        let mut clock = FrameClock::default();
        assert_eq!(clock.tick(t0), 0.0);
        let dt = clock.tick(t0 + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-6);
        let dt = clock.tick(t0 + Duration::from_millis(48));
        assert!((dt - 0.032).abs() < 1e-6);
    }

    #[test]
    fn held_forward_key_advances_camera_monotonically() {
        let input = InputState::new();
        input.set_key_down(KeyCode::Character('W'));
        let bindings = Bindings::default();
        let mut camera = Camera::default();
        let (speed, dt) = (5.0, 0.016);

        let mut last_x = camera.position().x;
        for _ in 0..3 {
            advance_camera(&mut camera, &input, &bindings, speed, dt);
            let x = camera.position().x;
            assert!((x - last_x - speed * dt).abs() < 1e-5);
            assert!(x > last_x);
            last_x = x;
        }
    }

    #[test]
    fn opposing_keys_cancel_out() {
        let input = InputState::new();
        input.set_key_down(KeyCode::Character('W'));
        input.set_key_down(KeyCode::Character('S'));
        let bindings = Bindings::default();
        let mut camera = Camera::default();

        advance_camera(&mut camera, &input, &bindings, 5.0, 0.016);
        assert!(camera.position().length() < 1e-6);
    }

    #[test]
    fn maps_movement_keys() {
        use winit::keyboard::{KeyCode as Key, PhysicalKey};
        assert_eq!(
            map_keycode(&PhysicalKey::Code(Key::KeyW)),
            Some(KeyCode::Character('W'))
        );
        assert_eq!(
            map_keycode(&PhysicalKey::Code(Key::Escape)),
            Some(KeyCode::Named(NamedKey::Escape))
        );
        assert_eq!(map_keycode(&PhysicalKey::Code(Key::Home)), None);
    }
}
