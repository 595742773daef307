use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pollster::FutureExt;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use vista_formats::{load_image_pair, reconstruct};

use crate::cli::Args;
use crate::viewer::ViewerState;

mod camera;
mod cli;
mod cloud_loader;
mod handle;
mod highlight;
mod layout;
mod pick;
mod scenes;
mod sync;
mod texture;
mod viewer;
mod views;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    if args.headless {
        return run_headless(&args);
    }

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Vista Viewer")
            .with_inner_size(PhysicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let mut state = ViewerState::new(window, &args).block_on()?;

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => target.exit(),
                        WindowEvent::KeyboardInput { event, .. } => state.handle_key_event(&event),
                        WindowEvent::CursorMoved { position, .. } => state.cursor_moved(position),
                        WindowEvent::MouseInput {
                            state: element_state,
                            button,
                            ..
                        } => state.mouse_input(element_state, button),
                        WindowEvent::Resized(new_size) => state.resize(new_size),
                        WindowEvent::RedrawRequested => match state.render() {
                            Ok(_) => {}
                            Err(SurfaceError::Lost) => state.resize(state.size()),
                            Err(SurfaceError::OutOfMemory) => target.exit(),
                            Err(err) => eprintln!("[vista_viewer] render error: {err:?}"),
                        },
                        _ => {}
                    }
                }
                Event::AboutToWait => state.window().request_redraw(),
                _ => {}
            }
        })
        .context("running viewer application")?;
    Ok(())
}

/// Runs the reconstruction once and prints a summary, without opening a
/// window. Keeps CI able to exercise the image path on machines with no GPU.
fn run_headless(args: &Args) -> Result<()> {
    let pair = load_image_pair(&args.depth_image, &args.color_image)
        .context("loading depth/color image pair")?;
    let cloud = reconstruct(&pair.depth, &pair.color, args.field_of_view);
    println!(
        "Reconstructed {} points from {}x{} depth raster (fov {:.1} degrees)",
        cloud.len(),
        pair.depth.width,
        pair.depth.height,
        args.field_of_view
    );
    println!("Headless mode requested; viewer window bootstrap skipped.");
    Ok(())
}
