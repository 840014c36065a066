mod audio;

use clap::Parser;
use dotboy_core::GameBoy;
use log::info;
use pixels::{Pixels, SurfaceTexture};
use std::time::Duration;
use winit::{
    event::{ElementState, Event, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

#[derive(Parser)]
struct Args {
    /// Path to ROM file
    rom: Option<std::path::PathBuf>,

    /// Run without opening a window
    #[arg(long)]
    headless: bool,

    /// Number of frames to run in headless mode
    #[arg(long)]
    frames: Option<usize>,

    /// Number of seconds to run in headless mode
    #[arg(long)]
    seconds: Option<u64>,

    /// Print bytes written to the serial port; in headless mode, exit
    /// once a test ROM reports "Passed" (code 0) or "Failed" (code 1)
    #[arg(long)]
    serial: bool,

    /// Log CPU state once per second of emulated time
    #[arg(long)]
    debug: bool,

    /// Window scale factor
    #[arg(long, default_value_t = 3)]
    scale: u32,
}

/// Button id for a key, per the core's A=0..Down=7 numbering.
fn button_id(key: VirtualKeyCode) -> Option<u8> {
    match key {
        VirtualKeyCode::S => Some(0),
        VirtualKeyCode::A => Some(1),
        VirtualKeyCode::LShift | VirtualKeyCode::RShift => Some(2),
        VirtualKeyCode::Return => Some(3),
        VirtualKeyCode::Right => Some(4),
        VirtualKeyCode::Left => Some(5),
        VirtualKeyCode::Up => Some(6),
        VirtualKeyCode::Down => Some(7),
        _ => None,
    }
}

fn dump_serial(bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    print!("[SERIAL] ");
    for b in bytes {
        if b.is_ascii_graphic() || *b == b' ' {
            print!("{}", *b as char);
        } else {
            print!("\\x{:02X}", b);
        }
    }
    println!();
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let rom_path = match &args.rom {
        Some(p) => p.clone(),
        None => {
            eprintln!("No ROM supplied");
            std::process::exit(1);
        }
    };

    let mut gb = GameBoy::new();
    if let Err(e) = gb.load_rom(&rom_path) {
        eprintln!("Failed to load ROM: {e}");
        std::process::exit(1);
    }

    info!("emulator initialized");

    if args.headless {
        run_headless(gb, &args);
        return;
    }

    let _stream = audio::start_stream(gb.mmu.apu.samples());

    let scale = args.scale.max(1);
    let serial_dump = args.serial;
    let debug = args.debug;
    let mut frame = vec![0u32; 160 * 144];
    let mut frame_count = 0u64;

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("dotboy")
        .with_inner_size(winit::dpi::LogicalSize::new(
            (160 * scale) as f64,
            (144 * scale) as f64,
        ))
        .build(&event_loop)
        .expect("Failed to create window");

    let size = window.inner_size();
    let surface = SurfaceTexture::new(size.width, size.height, &window);
    let mut pixels = Pixels::new(160, 144, surface).expect("Pixels error");

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::Resized(size) => {
                    let _ = pixels.resize_surface(size.width, size.height);
                }
                WindowEvent::KeyboardInput { input, .. } => {
                    if let Some(key) = input.virtual_keycode {
                        let pressed = input.state == ElementState::Pressed;
                        if key == VirtualKeyCode::Escape {
                            if pressed {
                                *control_flow = ControlFlow::Exit;
                            }
                        } else if let Some(id) = button_id(key) {
                            gb.set_button_state(id, pressed);
                        }
                    }
                }
                _ => {}
            },
            Event::MainEventsCleared => {
                gb.step_frame();
                frame.copy_from_slice(gb.framebuffer());
                if serial_dump {
                    dump_serial(&gb.take_serial_bytes());
                }
                if debug && frame_count % 60 == 0 {
                    println!("{}", gb.cpu.debug_state());
                }
                frame_count += 1;
                window.request_redraw();
            }
            Event::RedrawRequested(_) => {
                // The shades are gray, so the ARGB/RGBA channel order
                // mismatch is invisible and the raw cast is fine.
                pixels
                    .frame_mut()
                    .copy_from_slice(bytemuck::cast_slice(&frame));
                if pixels.render().is_err() {
                    *control_flow = ControlFlow::Exit;
                }
            }
            _ => {}
        }
    });
}

fn run_headless(mut gb: GameBoy, args: &Args) {
    let frame_limit = args.frames;
    let second_limit = args.seconds.map(Duration::from_secs);
    let start = std::time::Instant::now();
    let mut frame_count = 0usize;
    let mut serial_log: Vec<u8> = Vec::new();

    loop {
        gb.step_frame();
        frame_count += 1;

        if args.debug && frame_count % 60 == 0 {
            println!("{}", gb.cpu.debug_state());
        }

        if args.serial {
            let bytes = gb.take_serial_bytes();
            dump_serial(&bytes);
            serial_log.extend_from_slice(&bytes);
            if contains(&serial_log, b"Passed") {
                std::process::exit(0);
            }
            if contains(&serial_log, b"Failed") {
                std::process::exit(1);
            }
        }

        if let Some(max) = frame_limit {
            if frame_count >= max {
                break;
            }
        }
        if let Some(limit) = second_limit {
            if start.elapsed() >= limit {
                break;
            }
        }
        if frame_limit.is_none() && second_limit.is_none() && frame_count >= 60 * 60 {
            // Default headless bound: one emulated minute.
            break;
        }
    }
}
