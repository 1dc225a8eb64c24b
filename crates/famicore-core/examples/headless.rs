//! Headless runner: boots a ROM, runs a number of frames, and dumps the
//! final frame as a binary PPM next to a timing summary. Handy for smoke
//! testing the core without wiring up a frontend.

use std::{env, fs::File, io::Write as _, time::Instant};

use famicore_core::{
    Nes,
    cartridge::Cartridge,
    ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
};

fn main() -> anyhow::Result<()> {
    let rom = env::args().nth(1).expect("usage: headless <rom> [frames]");
    let frames: usize = env::args()
        .nth(2)
        .map(|s| s.parse().unwrap_or(60))
        .unwrap_or(60);

    let cart = Cartridge::from_file(&rom)?;
    let mut nes = Nes::new(cart);

    let mut audio = Vec::new();
    let started = Instant::now();
    for _ in 0..frames {
        nes.step_one_frame();
        nes.drain_audio(&mut audio);
        if nes.cpu.jammed() {
            println!("CPU jammed at PC={:#06X}", nes.cpu_snapshot().pc);
            break;
        }
    }
    let elapsed = started.elapsed();

    println!(
        "{frames} frame(s) in {:.1} ms ({:.1} fps), {} audio samples",
        elapsed.as_secs_f64() * 1e3,
        frames as f64 / elapsed.as_secs_f64(),
        audio.len(),
    );
    println!("Next: {}", nes.trace_line());

    let mut out = File::create("frame.ppm")?;
    writeln!(out, "P6\n{SCREEN_WIDTH} {SCREEN_HEIGHT}\n255")?;
    for &pixel in nes.frame_buffer() {
        let rgb = [(pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8];
        out.write_all(&rgb)?;
    }
    println!("Wrote frame.ppm");

    Ok(())
}
