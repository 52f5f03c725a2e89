//! CLI binary for the stipple Gaussian-splat rasterizer.

use std::path::Path;
use std::time::Instant;

use glam::UVec2;
use stipple::{
    ppm, Error, Frame, GaussianModel, RasterContext, RenderOptions,
};

fn run(model_path: &str, options: &RenderOptions) -> Result<(), Error> {
    let model = GaussianModel::from_ply(model_path)?;

    let mut frame =
        Frame::new(options.frame.width, options.frame.height);
    let mut camera = options.camera.build(frame.aspect);
    let mut ctx = RasterContext::with_pool(
        &model,
        &frame,
        UVec2::from_array(options.raster.tile_size),
        options.raster.threads,
        options.raster.tile_batch,
    )?;

    let start = Instant::now();
    ctx.preprocess(&mut camera, &frame);
    let preprocess_time = start.elapsed();

    let start = Instant::now();
    frame.clear();
    ctx.render(&mut frame)?;
    let render_time = start.elapsed();

    ppm::write_p3(&frame, &options.output.path)?;
    log::info!(
        "{} splats, {} visible | preprocess {preprocess_time:.1?}, render {render_time:.1?} | wrote {}",
        model.len(),
        ctx.survivors(),
        options.output.path
    );
    Ok(())
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(model_path) = args.next() else {
        log::error!("Usage: stipple <model.ply> [options.toml]");
        std::process::exit(1);
    };

    let options = match args.next() {
        Some(path) => match RenderOptions::load(Path::new(&path)) {
            Ok(options) => options,
            Err(e) => {
                log::error!("{e}");
                std::process::exit(1);
            }
        },
        None => RenderOptions::default(),
    };

    if let Err(e) = run(&model_path, &options) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
