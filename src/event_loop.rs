use crate::all::*;

use softbuffer::GraphicsContext;
use std::time::{Duration, Instant};
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::ControlFlow;
use winit::window::Window;

pub struct EventLoopArgs<'a> {
  pub consumer: &'a mut Consumer,
  pub canvas: &'a mut FramebufferCanvas,
  pub mailbox: &'a LatestFrame,
  pub graphics_context: &'a mut GraphicsContext<Window>,
  pub shutdown: &'a ShutdownHandle,
  pub render_interval: Duration,
}

// The receiver thread sends a user event after each mailbox change.
pub fn handle_event(
  event: Event<()>,
  control_flow: &mut ControlFlow,
  args: &mut EventLoopArgs,
) -> Result<()> {
  match event {
    Event::RedrawRequested(window_id) if window_id == args.graphics_context.window().id() => {
      let (w, h) = (args.canvas.width(), args.canvas.height());
      args.graphics_context.set_buffer(&args.canvas.buffer, w as u16, h as u16);
    },
    Event::WindowEvent {
      event,
      window_id,
    } => {
      if event == WindowEvent::CloseRequested && window_id == args.graphics_context.window().id() {
        args.shutdown.request();
        *control_flow = ControlFlow::Exit;
      }
      match event {
        WindowEvent::KeyboardInput {
          input: KeyboardInput {
            state: ElementState::Pressed,
            virtual_keycode: Some(keycode),
            scancode: _,
            ..
          },
          is_synthetic: _,
          device_id: _,
        } => {
          match keycode {
            VirtualKeyCode::Escape | VirtualKeyCode::Q => {
              args.shutdown.request();
              *control_flow = ControlFlow::Exit;
            },
            _ => {}, // Other keys.
          }
        },
        _ => {}, // Other window events.
      }
    },
    Event::UserEvent(()) => {
      if let Some(frame) = args.mailbox.take() {
        args.consumer.process(&frame)?;
      }
      else if args.mailbox.is_closed() {
        if !args.shutdown.is_requested() {
          info!("Publisher closed the connection.");
        }
        *control_flow = ControlFlow::Exit;
      }
    },
    _ => {}, // Other events.
  }
  if *control_flow == ControlFlow::Exit { return Ok(()) }

  args.consumer.render(args.canvas);
  if let Some(title) = args.canvas.take_title() {
    args.graphics_context.window().set_title(&title);
  }
  if args.canvas.take_dirty() {
    args.graphics_context.window().request_redraw();
  }
  // Come back for changes held back by redraw pacing.
  *control_flow = if args.consumer.pending() > 0 {
    ControlFlow::WaitUntil(Instant::now() + args.render_interval)
  }
  else {
    ControlFlow::Wait
  };
  Ok(())
}
